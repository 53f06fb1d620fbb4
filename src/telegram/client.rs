//! Telegram implementation of `ChatSender`.

use async_trait::async_trait;
use teloxide::prelude::*;
use teloxide::types::{InlineKeyboardButton, InlineKeyboardMarkup};
use tracing::debug;

use crate::common::chat::ChatSender;
use crate::common::error::ChatError;
use crate::common::messages::Keyboard;
use crate::common::types::UserId;

/// Sends bot replies through the Telegram Bot API.
#[derive(Clone)]
pub struct TelegramChat {
    bot: Bot,
}

impl TelegramChat {
    pub fn new(bot: Bot) -> Self {
        Self { bot }
    }
}

#[async_trait]
impl ChatSender for TelegramChat {
    async fn send_message(
        &self,
        user_id: UserId,
        text: &str,
        keyboard: Option<Keyboard>,
    ) -> Result<(), ChatError> {
        let mut request = self.bot.send_message(ChatId(user_id.0), text);
        if let Some(keyboard) = keyboard {
            request = request.reply_markup(to_markup(&keyboard));
        }

        request.await.map_err(|e| ChatError::SendFailed {
            user_id,
            message: e.to_string(),
        })?;
        debug!("Sent message to user {}", user_id);
        Ok(())
    }
}

/// Render a keyboard as an inline keyboard of callback buttons.
pub fn to_markup(keyboard: &Keyboard) -> InlineKeyboardMarkup {
    InlineKeyboardMarkup::new(keyboard.rows.iter().map(|row| {
        row.iter()
            .map(|b| InlineKeyboardButton::callback(b.label.clone(), b.data.clone()))
            .collect::<Vec<_>>()
    }))
}
