//! Outbound chat primitive shared by the event handlers and the response
//! consumers.

use async_trait::async_trait;

use crate::common::error::ChatError;
use crate::common::messages::Keyboard;
use crate::common::types::UserId;

/// Sends a message to a chat user.
#[async_trait]
pub trait ChatSender: Send + Sync {
    async fn send_message(
        &self,
        user_id: UserId,
        text: &str,
        keyboard: Option<Keyboard>,
    ) -> Result<(), ChatError>;
}
