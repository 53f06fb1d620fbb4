//! Canonical message types for chat communication.
//!
//! These types are platform-neutral: the Telegram adapter converts its own
//! updates into `InboundEvent`s and renders `Keyboard`s as inline keyboards.

use crate::common::types::UserId;

/// An event received from a chat user.
#[derive(Debug, Clone, PartialEq)]
pub struct InboundEvent {
    /// The user (and private chat) the event came from.
    pub user_id: UserId,
    /// Language code reported by the chat platform, if any.
    pub language_hint: Option<String>,
    /// What the user did.
    pub kind: EventKind,
}

/// Kind of inbound chat event.
#[derive(Debug, Clone, PartialEq)]
pub enum EventKind {
    /// Slash command without the leading slash (e.g. "start").
    Command(String),
    /// Inline keyboard button press carrying its callback data.
    Callback(String),
    /// Free text message.
    Text(String),
}

impl InboundEvent {
    pub fn command(user_id: UserId, name: &str) -> Self {
        Self {
            user_id,
            language_hint: None,
            kind: EventKind::Command(name.to_string()),
        }
    }

    pub fn callback(user_id: UserId, data: &str) -> Self {
        Self {
            user_id,
            language_hint: None,
            kind: EventKind::Callback(data.to_string()),
        }
    }

    pub fn text(user_id: UserId, text: &str) -> Self {
        Self {
            user_id,
            language_hint: None,
            kind: EventKind::Text(text.to_string()),
        }
    }

    pub fn with_language(mut self, code: &str) -> Self {
        self.language_hint = Some(code.to_string());
        self
    }
}

/// A single inline keyboard button.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Button {
    pub label: String,
    pub data: String,
}

impl Button {
    pub fn new(label: impl Into<String>, data: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            data: data.into(),
        }
    }
}

/// Inline keyboard attached to an outgoing message.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Keyboard {
    pub rows: Vec<Vec<Button>>,
}

impl Keyboard {
    pub fn new(rows: Vec<Vec<Button>>) -> Self {
        Self { rows }
    }

    /// Lay buttons out in rows of at most `per_row` buttons.
    pub fn wrapped(buttons: Vec<Button>, per_row: usize) -> Self {
        let per_row = per_row.max(1);
        let mut rows: Vec<Vec<Button>> = Vec::new();
        for button in buttons {
            match rows.last_mut() {
                Some(row) if row.len() < per_row => row.push(button),
                _ => rows.push(vec![button]),
            }
        }
        Self { rows }
    }

    /// Iterate over all callback data values, row by row.
    pub fn callback_data(&self) -> impl Iterator<Item = &str> {
        self.rows.iter().flatten().map(|b| b.data.as_str())
    }
}
