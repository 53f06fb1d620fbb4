//! Routes decoded backend responses to the dictionary, sessions and chat.

use std::collections::HashSet;
use std::sync::Arc;

use anyhow::Result;
use tracing::{debug, error, info, warn};

use crate::bridge::dictionary::DictionaryCache;
use crate::bridge::protocol::{Response, ResponseKind};
use crate::bridge::session::{Flow, SessionRegistry, Stage, PAYLOAD_FEEDBACK_ID};
use crate::common::chat::ChatSender;
use crate::common::error::RouteError;
use crate::common::messages::Keyboard;
use crate::common::types::UserId;
use crate::conversation::keyboards;
use crate::locale::{keys, Catalog, LocaleResolver};

/// Shared by both response consumers.
pub struct ResponseHandler {
    dictionary: Arc<DictionaryCache>,
    sessions: Arc<SessionRegistry>,
    locales: Arc<LocaleResolver>,
    chat: Arc<dyn ChatSender>,
    admins: HashSet<UserId>,
}

impl ResponseHandler {
    pub fn new(
        dictionary: Arc<DictionaryCache>,
        sessions: Arc<SessionRegistry>,
        locales: Arc<LocaleResolver>,
        chat: Arc<dyn ChatSender>,
        admins: HashSet<UserId>,
    ) -> Self {
        Self {
            dictionary,
            sessions,
            locales,
            chat,
            admins,
        }
    }

    /// Decode and process one message body.
    pub async fn route(&self, body: &[u8]) -> Result<(), RouteError> {
        let response = Response::decode(body).map_err(RouteError::Decode)?;
        debug!("Received {}: {}", response.cmd_type, String::from_utf8_lossy(body));
        self.process(response).await.map_err(RouteError::Processing)
    }

    async fn process(&self, response: Response) -> Result<()> {
        let Response {
            user_id,
            cmd_type,
            kind,
        } = response;

        match kind {
            ResponseKind::SetClassList { class_list } => {
                self.dictionary.merge_class_list(&class_list);
                info!("Class list updated, {} classes known", self.dictionary.snapshot_classes().len());
                return Ok(());
            }
            ResponseKind::SetClassDescription {
                class_name,
                locale,
                description,
            } => {
                self.dictionary
                    .merge_class_description(&class_name, &locale, &description);
                debug!("Description of {} updated for locale '{}'", class_name, locale);
                return Ok(());
            }
            ResponseKind::Unknown => {
                error!("Unknown response type '{}' for user {:?}", cmd_type, user_id);
                if let Some(user_id) = user_id {
                    let catalog = self.locales.resolve(user_id, None);
                    let text = catalog.message(keys::UNKNOWN_MESSAGE)?.to_string();
                    self.reply_main(user_id, &catalog, &text).await?;
                }
                return Ok(());
            }
            _ => {}
        }

        let Some(user_id) = user_id else {
            warn!("Dropping '{}' response without user_id", cmd_type);
            return Ok(());
        };
        let catalog = self.locales.resolve(user_id, None);
        info!("Handling '{}' for user {}", cmd_type, user_id);

        match kind {
            ResponseKind::ServerStats { server_info } => {
                self.reply_admin(user_id, &catalog, &server_info).await
            }
            ResponseKind::ServerOk { message } => {
                let text = text_or(&catalog, message, keys::SERVER_OK)?;
                self.reply_admin(user_id, &catalog, &text).await
            }
            ResponseKind::GetCharacterStatus { char_info } => {
                self.reply_main(user_id, &catalog, &char_info).await
            }
            ResponseKind::SentFeedback {
                feedback_id: Some(feedback_id),
                feedback_text: Some(feedback_text),
            } => {
                self.sessions
                    .start_flow(user_id, Flow::ReadingFeedback, Stage::Review);
                self.sessions.advance(
                    user_id,
                    Stage::Review,
                    [(PAYLOAD_FEEDBACK_ID, feedback_id.as_str())],
                )?;
                let text = catalog.format(keys::FEEDBACK_ITEM, &[feedback_id.as_str(), feedback_text.as_str()])?;
                self.send(user_id, &text, keyboards::review_menu(&catalog)?).await
            }
            ResponseKind::SentFeedback { .. } => {
                self.sessions.clear_flow(user_id, &[Flow::ReadingFeedback]);
                let text = catalog.message(keys::NO_FEEDBACK)?.to_string();
                self.reply_admin(user_id, &catalog, &text).await
            }
            ResponseKind::FeedbackReceive { message } => {
                let text = catalog.format(keys::FEEDBACK_REPLY, &[message.as_str()])?;
                self.reply_main(user_id, &catalog, &text).await
            }
            ResponseKind::CreateCharacter { message } => {
                self.acknowledge(user_id, &catalog, message, &[Flow::Creating]).await
            }
            ResponseKind::DeleteCharacter { message } => {
                self.acknowledge(user_id, &catalog, message, &[Flow::Deleting]).await
            }
            ResponseKind::Feedback { message } => {
                self.acknowledge(user_id, &catalog, message, &[Flow::SendingFeedback])
                    .await
            }
            ResponseKind::ConfirmFeedback { message } => {
                self.acknowledge(user_id, &catalog, message, &[Flow::ReadingFeedback])
                    .await
            }
            ResponseKind::ReplyFeedback { message } => {
                self.acknowledge(
                    user_id,
                    &catalog,
                    message,
                    &[Flow::ReplyingFeedback, Flow::ReadingFeedback],
                )
                .await
            }
            ResponseKind::SetClassList { .. }
            | ResponseKind::SetClassDescription { .. }
            | ResponseKind::Unknown => Ok(()),
        }
    }

    /// Backend finished a command: report it and end the matching flow.
    async fn acknowledge(
        &self,
        user_id: UserId,
        catalog: &Catalog,
        message: Option<String>,
        flows: &[Flow],
    ) -> Result<()> {
        if let Some(session) = self.sessions.clear_flow(user_id, flows) {
            debug!("User {} finished {:?} at stage {}", user_id, session.flow, session.stage);
        }
        let text = text_or(catalog, message, keys::REQUEST_DONE)?;
        self.reply_main(user_id, catalog, &text).await
    }

    async fn reply_main(&self, user_id: UserId, catalog: &Catalog, text: &str) -> Result<()> {
        let keyboard = keyboards::main_menu(catalog, self.admins.contains(&user_id))?;
        self.send(user_id, text, keyboard).await
    }

    async fn reply_admin(&self, user_id: UserId, catalog: &Catalog, text: &str) -> Result<()> {
        self.send(user_id, text, keyboards::admin_menu(catalog)?).await
    }

    async fn send(&self, user_id: UserId, text: &str, keyboard: Keyboard) -> Result<()> {
        self.chat.send_message(user_id, text, Some(keyboard)).await?;
        Ok(())
    }
}

/// Backend-supplied text, or the catalog message for `key` when absent.
fn text_or(catalog: &Catalog, message: Option<String>, key: &str) -> Result<String> {
    match message {
        Some(message) if !message.is_empty() => Ok(message),
        _ => Ok(catalog.message(key)?.to_string()),
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use super::*;
    use crate::common::chat::testing::RecordingChat;
    use crate::locale::resolver::test_resolver;

    pub struct Fixture {
        pub handler: ResponseHandler,
        pub dictionary: Arc<DictionaryCache>,
        pub sessions: Arc<SessionRegistry>,
        pub chat: Arc<RecordingChat>,
    }

    pub fn fixture(admins: &[i64]) -> Fixture {
        let dictionary = Arc::new(DictionaryCache::new());
        let sessions = Arc::new(SessionRegistry::new());
        let chat = Arc::new(RecordingChat::default());
        let handler = ResponseHandler::new(
            dictionary.clone(),
            sessions.clone(),
            Arc::new(test_resolver()),
            chat.clone(),
            admins.iter().copied().map(UserId).collect(),
        );
        Fixture {
            handler,
            dictionary,
            sessions,
            chat,
        }
    }
}
