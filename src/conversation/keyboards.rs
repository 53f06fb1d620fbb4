//! Inline keyboards shown with bot replies.

use tracing::warn;

use crate::bridge::dictionary::DictionaryCache;
use crate::common::error::LocaleResult;
use crate::common::messages::{Button, Keyboard};
use crate::conversation::actions::Action;
use crate::locale::keys;
use crate::locale::Catalog;

/// Class buttons per row.
const CLASSES_PER_ROW: usize = 5;
const LOCALES_PER_ROW: usize = 3;
/// Telegram rejects the whole message if any button carries more callback data.
pub const MAX_CALLBACK_DATA_LEN: usize = 64;

/// `None` (with a warning) when the callback data does not fit into a button.
fn fitting_button(label: String, action: Action) -> Option<Button> {
    let data = action.data();
    if data.len() > MAX_CALLBACK_DATA_LEN {
        warn!("Skipping button '{}': callback data is {} bytes", label, data.len());
        return None;
    }
    Some(Button::new(label, data))
}

fn button(catalog: &Catalog, key: &str, action: Action) -> LocaleResult<Button> {
    Ok(Button::new(catalog.message(key)?, action.data()))
}

/// Main menu. Admins get an extra row leading to the admin menu.
pub fn main_menu(catalog: &Catalog, is_admin: bool) -> LocaleResult<Keyboard> {
    let mut rows = vec![
        vec![
            button(catalog, keys::NEW_CHARACTER, Action::Create)?,
            button(catalog, keys::GET_CHARACTER, Action::Status)?,
        ],
        vec![
            button(catalog, keys::DELETE_CHARACTER, Action::Delete)?,
            button(catalog, keys::ABOUT_LABEL, Action::About)?,
        ],
        vec![
            button(catalog, keys::FEEDBACK_LABEL, Action::Feedback)?,
            button(catalog, keys::SETTINGS_LABEL, Action::Settings)?,
        ],
    ];
    if is_admin {
        rows.push(vec![button(catalog, keys::ADMIN_LABEL, Action::AdminMenu)?]);
    }
    Ok(Keyboard::new(rows))
}

pub fn admin_menu(catalog: &Catalog) -> LocaleResult<Keyboard> {
    Ok(Keyboard::new(vec![
        vec![button(catalog, keys::SERVER_STATS, Action::ServerStats)?],
        vec![button(catalog, keys::GET_FEEDBACK_LABEL, Action::GetFeedback)?],
        vec![button(catalog, keys::SHUTDOWN_LABEL, Action::ShutdownPanel)?],
    ]))
}

pub fn shutdown_menu(catalog: &Catalog) -> LocaleResult<Keyboard> {
    Ok(Keyboard::new(vec![
        vec![button(catalog, keys::SHUTDOWN_NORMAL, Action::ShutdownNormal)?],
        vec![button(catalog, keys::SHUTDOWN_IMMEDIATE, Action::ShutdownImmediate)?],
        vec![button(catalog, keys::SHUTDOWN_BOT, Action::ShutdownBot)?],
    ]))
}

/// Done/reply buttons under a feedback item.
pub fn review_menu(catalog: &Catalog) -> LocaleResult<Keyboard> {
    Ok(Keyboard::new(vec![vec![
        button(catalog, keys::FEEDBACK_DONE, Action::FeedbackDone)?,
        button(catalog, keys::FEEDBACK_REPLY_LABEL, Action::FeedbackReply)?,
    ]]))
}

/// One button per known class, labelled in the user's locale.
pub fn class_menu(dictionary: &DictionaryCache, locale: &str) -> Keyboard {
    let buttons = dictionary
        .snapshot_classes()
        .into_iter()
        .filter_map(|class| {
            let label = dictionary.label(&class, locale);
            fitting_button(label, Action::SelectClass(class))
        })
        .collect();
    Keyboard::wrapped(buttons, CLASSES_PER_ROW)
}

pub fn locale_menu(available: Vec<(String, String)>) -> Keyboard {
    let buttons = available
        .into_iter()
        .filter_map(|(code, name)| fitting_button(name, Action::SelectLocale(code)))
        .collect();
    Keyboard::wrapped(buttons, LOCALES_PER_ROW)
}
