//! Handles inbound chat events: commands, menu callbacks and free text.

use std::collections::HashSet;
use std::sync::Arc;

use anyhow::Result;
use tokio::sync::watch;
use tracing::{debug, error, info, warn};

use crate::bridge::dictionary::DictionaryCache;
use crate::bridge::dispatcher::Dispatcher;
use crate::bridge::protocol::{Command, CommandKind};
use crate::bridge::session::{
    Flow, SessionRegistry, Stage, PAYLOAD_CLASS, PAYLOAD_FEEDBACK_ID, PAYLOAD_NAME,
};
use crate::common::chat::ChatSender;
use crate::common::error::{LocaleError, SessionError};
use crate::common::messages::{EventKind, InboundEvent, Keyboard};
use crate::common::types::UserId;
use crate::conversation::actions::Action;
use crate::conversation::keyboards;
use crate::locale::{keys, Catalog, LocaleResolver};

/// Longest accepted character name, in characters.
pub const MAX_NAME_LENGTH: usize = 255;
/// Longest accepted feedback or feedback reply, in characters.
pub const MAX_FEEDBACK_LENGTH: usize = 2048;
/// Exact text that confirms character deletion.
pub const CONFIRM_TOKEN: &str = "CONFIRM";

/// Platform-neutral conversation logic.
pub struct Conversation {
    sessions: Arc<SessionRegistry>,
    locales: Arc<LocaleResolver>,
    dictionary: Arc<DictionaryCache>,
    dispatcher: Arc<Dispatcher>,
    chat: Arc<dyn ChatSender>,
    admins: HashSet<UserId>,
    shutdown_tx: watch::Sender<bool>,
}

impl Conversation {
    pub fn new(
        sessions: Arc<SessionRegistry>,
        locales: Arc<LocaleResolver>,
        dictionary: Arc<DictionaryCache>,
        dispatcher: Arc<Dispatcher>,
        chat: Arc<dyn ChatSender>,
        admins: HashSet<UserId>,
        shutdown_tx: watch::Sender<bool>,
    ) -> Self {
        Self {
            sessions,
            locales,
            dictionary,
            dispatcher,
            chat,
            admins,
            shutdown_tx,
        }
    }

    pub async fn handle(&self, event: InboundEvent) -> Result<()> {
        let user_id = event.user_id;
        let catalog = self.locales.resolve(user_id, event.language_hint.as_deref());

        let result = match event.kind {
            EventKind::Command(name) => self.on_command(user_id, &catalog, &name).await,
            EventKind::Callback(data) => match Action::parse(&data) {
                Some(action) => {
                    info!("Received {:?} from user {}", action, user_id);
                    self.on_action(user_id, &catalog, action).await
                }
                None => {
                    error!("Received unknown callback '{}' from user {}", data, user_id);
                    self.reply(user_id, &catalog, keys::UNKNOWN_COMMAND, None).await
                }
            },
            EventKind::Text(text) => self.on_text(user_id, &catalog, &text).await,
        };

        match result {
            Err(e) if e.is::<SessionError>() => {
                warn!("User {} is out of sync with its flow: {}", user_id, e);
                self.sessions.clear(user_id);
                let keyboard = self.main_menu(user_id, &catalog)?;
                self.reply(user_id, &catalog, keys::START_OVER, Some(keyboard)).await
            }
            other => other,
        }
    }

    async fn on_command(&self, user_id: UserId, catalog: &Catalog, name: &str) -> Result<()> {
        info!("Received /{} from user {}", name, user_id);
        match name {
            "start" => self.start(user_id, catalog).await,
            "create" => self.on_action(user_id, catalog, Action::Create).await,
            "delete" => self.on_action(user_id, catalog, Action::Delete).await,
            "status" => self.on_action(user_id, catalog, Action::Status).await,
            "feedback" => self.on_action(user_id, catalog, Action::Feedback).await,
            "settings" => self.on_action(user_id, catalog, Action::Settings).await,
            "about" => self.on_action(user_id, catalog, Action::About).await,
            _ => self.reply(user_id, catalog, keys::UNKNOWN_COMMAND, None).await,
        }
    }

    async fn on_action(&self, user_id: UserId, catalog: &Catalog, action: Action) -> Result<()> {
        if action.requires_admin() && !self.is_admin(user_id) {
            error!("Illegal access to {:?} from user {}", action, user_id);
            return Ok(());
        }

        match action {
            Action::Create => self.begin_creation(user_id, catalog).await,
            Action::Status => {
                if self.dispatch(user_id, catalog, CommandKind::GetCharacterStatus, false).await? {
                    self.reply(user_id, catalog, keys::REQUESTED_STATUS, None).await?;
                }
                Ok(())
            }
            Action::Delete => {
                self.sessions
                    .start_flow(user_id, Flow::Deleting, Stage::ConfirmDeletion);
                self.reply(user_id, catalog, keys::PRINT_CONFIRM, None).await
            }
            Action::About => {
                let keyboard = self.main_menu(user_id, catalog)?;
                self.reply(user_id, catalog, keys::ABOUT_TEXT, Some(keyboard)).await
            }
            Action::Settings => {
                let keyboard = keyboards::locale_menu(self.locales.available());
                self.reply(user_id, catalog, keys::CHOOSE_LOCALE, Some(keyboard)).await
            }
            Action::Feedback => {
                self.sessions
                    .start_flow(user_id, Flow::SendingFeedback, Stage::EnterFeedback);
                self.reply(user_id, catalog, keys::ENTER_FEEDBACK, None).await
            }
            Action::AdminMenu => {
                let keyboard = keyboards::admin_menu(catalog)?;
                self.reply(user_id, catalog, keys::ADMIN_LABEL, Some(keyboard)).await
            }
            Action::ServerStats => {
                self.admin_command(user_id, catalog, CommandKind::GetServerStats, keys::REQUESTED_SERVER_STATUS)
                    .await
            }
            Action::ShutdownPanel => {
                let keyboard = keyboards::shutdown_menu(catalog)?;
                self.reply(user_id, catalog, keys::SHUTDOWN_PANEL, Some(keyboard)).await
            }
            Action::GetFeedback => {
                self.sessions
                    .start_flow(user_id, Flow::ReadingFeedback, Stage::AwaitingFeedback);
                self.admin_command(user_id, catalog, CommandKind::GetFeedback, keys::REQUESTED_FEEDBACK)
                    .await
            }
            Action::ShutdownNormal => {
                self.admin_command(user_id, catalog, CommandKind::ShutdownNormal, keys::SENT_SHUTDOWN)
                    .await
            }
            Action::ShutdownImmediate => {
                self.admin_command(
                    user_id,
                    catalog,
                    CommandKind::ShutdownImmediate,
                    keys::SENT_SHUTDOWN_IMMEDIATE,
                )
                .await
            }
            Action::ShutdownBot => {
                info!("Bot shutdown requested by user {}", user_id);
                self.reply(user_id, catalog, keys::SENT_SHUTDOWN_BOT, None).await?;
                if let Err(e) = self.shutdown_tx.send(true) {
                    debug!("Shutdown channel closed: {}", e);
                }
                Ok(())
            }
            Action::FeedbackDone => {
                let feedback_id = self.reviewed_feedback(user_id)?;
                let kind = CommandKind::ConfirmFeedback { feedback_id };
                self.admin_command(user_id, catalog, kind, keys::CONFIRM_SENT).await
            }
            Action::FeedbackReply => {
                let feedback_id = self.reviewed_feedback(user_id)?;
                self.sessions
                    .start_flow(user_id, Flow::ReplyingFeedback, Stage::EnterReply);
                self.sessions.advance(
                    user_id,
                    Stage::EnterReply,
                    [(PAYLOAD_FEEDBACK_ID, feedback_id)],
                )?;
                self.reply(user_id, catalog, keys::ENTER_REPLY, None).await
            }
            Action::SelectClass(class) => self.select_class(user_id, catalog, class).await,
            Action::SelectLocale(code) => self.select_locale(user_id, catalog, &code).await,
        }
    }

    async fn on_text(&self, user_id: UserId, catalog: &Catalog, text: &str) -> Result<()> {
        let Some(session) = self.sessions.get(user_id) else {
            info!("User {} sent a message outside of any flow", user_id);
            let keyboard = self.main_menu(user_id, catalog)?;
            return self.reply(user_id, catalog, keys::START_OVER, Some(keyboard)).await;
        };
        debug!("User {} sent text at {:?}/{}", user_id, session.flow, session.stage);

        match (session.flow, session.stage) {
            (Flow::Creating, Stage::ChooseName) => {
                let name = text.trim();
                if name.is_empty() || name.chars().count() > MAX_NAME_LENGTH {
                    return self.reply(user_id, catalog, keys::NAME_INVALID, None).await;
                }
                let class = session
                    .get(PAYLOAD_CLASS)
                    .ok_or(SessionError::NoActiveFlow { user_id })?
                    .to_string();
                self.sessions
                    .advance(user_id, Stage::Confirm, [(PAYLOAD_NAME, name)])?;

                let kind = CommandKind::CreateCharacter {
                    name: name.to_string(),
                    class,
                };
                if self.dispatch(user_id, catalog, kind, false).await? {
                    self.reply(user_id, catalog, keys::CHECK_NAME, None).await?;
                }
                Ok(())
            }
            (Flow::Deleting, Stage::ConfirmDeletion) => {
                if text == CONFIRM_TOKEN {
                    if self.dispatch(user_id, catalog, CommandKind::DeleteCharacter, false).await? {
                        self.reply(user_id, catalog, keys::SENT_CHAR_DELETE, None).await?;
                    }
                    return Ok(());
                }
                info!("User {} cancelled character deletion", user_id);
                self.sessions.clear(user_id);
                self.reply(user_id, catalog, keys::CANCEL_REQUEST, None).await?;
                self.start(user_id, catalog).await
            }
            (Flow::SendingFeedback, Stage::EnterFeedback) => {
                let Some(text) = self.check_feedback_text(user_id, catalog, text).await? else {
                    return Ok(());
                };
                self.sessions.set_stage(user_id, Stage::AwaitingAck)?;
                if self.dispatch(user_id, catalog, CommandKind::Feedback { text }, false).await? {
                    self.reply(user_id, catalog, keys::FEEDBACK_SENT, None).await?;
                }
                Ok(())
            }
            (Flow::ReplyingFeedback, Stage::EnterReply) => {
                if !self.is_admin(user_id) {
                    error!("Illegal feedback reply from user {}", user_id);
                    self.sessions.clear(user_id);
                    return Ok(());
                }
                let Some(reply) = self.check_feedback_text(user_id, catalog, text).await? else {
                    return Ok(());
                };
                let feedback_id = session
                    .get(PAYLOAD_FEEDBACK_ID)
                    .ok_or(SessionError::NoActiveFlow { user_id })?
                    .to_string();
                let kind = CommandKind::ReplyFeedback { feedback_id, reply };
                self.admin_command(user_id, catalog, kind, keys::REPLY_SENT).await
            }
            (flow, stage) => {
                info!("User {} sent text while {:?} is at stage {}", user_id, flow, stage);
                let keyboard = self.main_menu(user_id, catalog)?;
                self.reply(user_id, catalog, keys::START_OVER, Some(keyboard)).await
            }
        }
    }

    async fn start(&self, user_id: UserId, catalog: &Catalog) -> Result<()> {
        let keyboard = self.main_menu(user_id, catalog)?;
        self.reply(user_id, catalog, keys::ABOUT_ME, Some(keyboard)).await
    }

    async fn begin_creation(&self, user_id: UserId, catalog: &Catalog) -> Result<()> {
        if !self.dictionary.is_ready() {
            warn!("Class list not received yet, asking the backend again");
            self.reply(user_id, catalog, keys::CLASSES_NOT_READY, None).await?;
            if let Err(e) = self
                .dispatcher
                .publish(Command::system(CommandKind::GetClassList), true)
                .await
            {
                warn!("Failed to request class list: {}", e);
            }
            return Ok(());
        }

        self.sessions
            .start_flow(user_id, Flow::Creating, Stage::SelectClass);
        let keyboard = keyboards::class_menu(&self.dictionary, catalog.code());
        self.reply(user_id, catalog, keys::CHOOSE_CLASS, Some(keyboard)).await?;
        info!("Initialized character creation for user {}", user_id);
        Ok(())
    }

    async fn select_class(&self, user_id: UserId, catalog: &Catalog, class: String) -> Result<()> {
        let selecting = self
            .sessions
            .get(user_id)
            .is_some_and(|s| s.is_at(Flow::Creating, Stage::SelectClass));
        if !selecting || !self.dictionary.contains(&class) {
            warn!(
                "Character creation by user {} not advanced to name input (class '{}')",
                user_id, class
            );
            return self.begin_creation(user_id, catalog).await;
        }

        self.sessions
            .advance(user_id, Stage::ChooseName, [(PAYLOAD_CLASS, class.as_str())])?;
        let label = self.dictionary.label(&class, catalog.code());
        let mut text = catalog.format(keys::ENTER_NAME, &[label.as_str()])?;
        if let Some(description) = self.dictionary.describe(&class, catalog.code()) {
            text = format!("{}\n\n{}", description, text);
        }
        self.send(user_id, &text, None).await?;
        info!("Character creation by user {} advanced to name input", user_id);
        Ok(())
    }

    async fn select_locale(&self, user_id: UserId, catalog: &Catalog, code: &str) -> Result<()> {
        match self.locales.assign(user_id, code).await {
            Ok(selected) => {
                let keyboard = self.main_menu(user_id, &selected)?;
                self.reply(user_id, &selected, keys::LOCALE_CHANGED, Some(keyboard)).await
            }
            Err(LocaleError::UnknownLocale { code }) => {
                warn!("User {} picked unknown locale '{}'", user_id, code);
                self.reply(user_id, catalog, keys::UNKNOWN_COMMAND, None).await
            }
            Err(LocaleError::Store(e)) => {
                error!("Locale choice of user {} not saved: {}", user_id, e);
                let keyboard = self.main_menu(user_id, catalog)?;
                self.reply(user_id, catalog, keys::COMMAND_FAILED, Some(keyboard)).await
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Feedback id of the item an admin is reviewing.
    fn reviewed_feedback(&self, user_id: UserId) -> Result<String, SessionError> {
        self.sessions
            .get(user_id)
            .filter(|s| s.is_at(Flow::ReadingFeedback, Stage::Review))
            .and_then(|s| s.get(PAYLOAD_FEEDBACK_ID).map(str::to_string))
            .ok_or(SessionError::NoActiveFlow { user_id })
    }

    /// Returns the trimmed text, or `None` after asking the user to retry.
    async fn check_feedback_text(
        &self,
        user_id: UserId,
        catalog: &Catalog,
        text: &str,
    ) -> Result<Option<String>> {
        let text = text.trim();
        if text.is_empty() {
            self.reply(user_id, catalog, keys::ENTER_FEEDBACK, None).await?;
            return Ok(None);
        }
        if text.chars().count() > MAX_FEEDBACK_LENGTH {
            self.reply(user_id, catalog, keys::FEEDBACK_TOO_LONG, None).await?;
            return Ok(None);
        }
        Ok(Some(text.to_string()))
    }

    /// Publish an admin command to the init queue and confirm it to the admin.
    async fn admin_command(
        &self,
        user_id: UserId,
        catalog: &Catalog,
        kind: CommandKind,
        sent_key: &str,
    ) -> Result<()> {
        if self.dispatch(user_id, catalog, kind, true).await? {
            self.reply(user_id, catalog, sent_key, None).await?;
        }
        Ok(())
    }

    /// Publish a command for the user. On failure the user is told, the
    /// active flow is dropped and `false` is returned.
    async fn dispatch(
        &self,
        user_id: UserId,
        catalog: &Catalog,
        kind: CommandKind,
        is_system: bool,
    ) -> Result<bool> {
        let command = Command::for_user(user_id, catalog.code(), kind);
        match self.dispatcher.publish(command, is_system).await {
            Ok(_) => Ok(true),
            Err(e) => {
                warn!("Command from user {} not sent: {}", user_id, e);
                self.sessions.clear(user_id);
                let keyboard = self.main_menu(user_id, catalog)?;
                self.reply(user_id, catalog, keys::COMMAND_FAILED, Some(keyboard)).await?;
                Ok(false)
            }
        }
    }

    fn is_admin(&self, user_id: UserId) -> bool {
        self.admins.contains(&user_id)
    }

    fn main_menu(&self, user_id: UserId, catalog: &Catalog) -> Result<Keyboard> {
        Ok(keyboards::main_menu(catalog, self.is_admin(user_id))?)
    }

    async fn reply(
        &self,
        user_id: UserId,
        catalog: &Catalog,
        key: &str,
        keyboard: Option<Keyboard>,
    ) -> Result<()> {
        let text = catalog.message(key)?;
        self.send(user_id, text, keyboard).await
    }

    async fn send(&self, user_id: UserId, text: &str, keyboard: Option<Keyboard>) -> Result<()> {
        self.chat.send_message(user_id, text, keyboard).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bridge::memory::MemoryBroker;
    use crate::bridge::protocol::{ClassEntry, Queue};
    use crate::bridge::responses::ResponseHandler;
    use crate::common::chat::testing::RecordingChat;
    use crate::locale::catalog::test_catalogs;
    use crate::locale::store::testing::MemoryStore;
    use std::collections::HashMap;
    use std::sync::atomic::Ordering;
    use serde_json::{json, Value};

    const ADMIN: UserId = UserId(1);
    const PLAYER: UserId = UserId(42);

    struct Harness {
        conversation: Conversation,
        responses: ResponseHandler,
        sessions: Arc<SessionRegistry>,
        locales: Arc<LocaleResolver>,
        store: Arc<MemoryStore>,
        dictionary: Arc<DictionaryCache>,
        broker: MemoryBroker,
        chat: Arc<RecordingChat>,
        shutdown_rx: watch::Receiver<bool>,
    }

    fn harness() -> Harness {
        let sessions = Arc::new(SessionRegistry::new());
        let store = Arc::new(MemoryStore::default());
        let locales = Arc::new(LocaleResolver::new(
            test_catalogs(),
            HashMap::new(),
            "en",
            store.clone(),
        ));
        let dictionary = Arc::new(DictionaryCache::new());
        let broker = MemoryBroker::new();
        let chat = Arc::new(RecordingChat::default());
        let admins = HashSet::from([ADMIN]);
        let dispatcher = Arc::new(Dispatcher::new(Arc::new(broker.clone()), admins.clone()));
        let (shutdown_tx, shutdown_rx) = watch::channel(false);

        let conversation = Conversation::new(
            sessions.clone(),
            locales.clone(),
            dictionary.clone(),
            dispatcher,
            chat.clone(),
            admins.clone(),
            shutdown_tx,
        );
        let responses = ResponseHandler::new(
            dictionary.clone(),
            sessions.clone(),
            locales.clone(),
            chat.clone(),
            admins,
        );

        Harness {
            conversation,
            responses,
            sessions,
            locales,
            store,
            dictionary,
            broker,
            chat,
            shutdown_rx,
        }
    }

    impl Harness {
        fn with_classes(self) -> Self {
            self.dictionary.merge_class_list(&[
                ClassEntry::Name("Warrior".to_string()),
                ClassEntry::Name("Mage".to_string()),
            ]);
            self
        }

        async fn callback(&self, user: UserId, data: &str) {
            self.conversation
                .handle(InboundEvent::callback(user, data))
                .await
                .unwrap();
        }

        async fn text(&self, user: UserId, text: &str) {
            self.conversation
                .handle(InboundEvent::text(user, text))
                .await
                .unwrap();
        }

        fn last_text(&self) -> String {
            self.chat.last().unwrap().text
        }

        fn published(&self) -> Vec<(Queue, Value)> {
            self.broker
                .published()
                .into_iter()
                .map(|(queue, body)| (queue, serde_json::from_slice(&body).unwrap()))
                .collect()
        }

        fn stage(&self, user: UserId) -> Option<(Flow, Stage)> {
            self.sessions.get(user).map(|s| (s.flow, s.stage))
        }
    }

    #[tokio::test]
    async fn test_creation_round_trip() {
        let h = harness().with_classes();

        h.callback(PLAYER, "main_create").await;
        assert_eq!(h.last_text(), "en:choose_class");
        let keyboard = h.chat.last().unwrap().keyboard.unwrap();
        assert_eq!(
            keyboard.callback_data().collect::<Vec<_>>(),
            vec!["class_Warrior", "class_Mage"]
        );

        h.callback(PLAYER, "class_Warrior").await;
        assert_eq!(h.last_text(), "en:enter_name Warrior");
        assert_eq!(h.stage(PLAYER), Some((Flow::Creating, Stage::ChooseName)));

        h.text(PLAYER, "Conan").await;
        assert_eq!(h.last_text(), "en:check_name");
        assert_eq!(h.stage(PLAYER), Some((Flow::Creating, Stage::Confirm)));
        assert_eq!(
            h.published(),
            vec![(
                Queue::Command,
                json!({
                    "user_id": 42,
                    "cmd_type": "create_character",
                    "name": "Conan",
                    "class": "Warrior",
                    "locale": "en",
                    "sent_by_admin": false,
                })
            )]
        );

        h.responses
            .route(br#"{"user_id": 42, "cmd_type": "create_character", "message": "Welcome, Conan"}"#)
            .await
            .unwrap();
        assert_eq!(h.stage(PLAYER), None);
        assert_eq!(h.last_text(), "Welcome, Conan");
    }

    #[tokio::test]
    async fn test_class_description_is_shown() {
        let h = harness().with_classes();
        h.dictionary
            .merge_class_description("Mage", "en", "Casts spells");

        h.callback(PLAYER, "main_create").await;
        h.callback(PLAYER, "class_Mage").await;

        assert_eq!(h.last_text(), "Casts spells\n\nen:enter_name Mage");
    }

    #[tokio::test]
    async fn test_creation_waits_for_class_list() {
        let h = harness();

        h.callback(PLAYER, "main_create").await;

        assert_eq!(h.last_text(), "en:classes_not_ready");
        assert_eq!(h.stage(PLAYER), None);
        let published = h.published();
        assert_eq!(published.len(), 1);
        assert_eq!(published[0].0, Queue::Init);
        assert_eq!(published[0].1["cmd_type"], "get_class_list");
    }

    #[tokio::test]
    async fn test_class_pick_outside_flow_restarts_creation() {
        let h = harness().with_classes();

        h.callback(PLAYER, "class_Warrior").await;
        assert_eq!(h.last_text(), "en:choose_class");
        assert_eq!(h.stage(PLAYER), Some((Flow::Creating, Stage::SelectClass)));

        h.callback(PLAYER, "class_Necromancer").await;
        assert_eq!(h.stage(PLAYER), Some((Flow::Creating, Stage::SelectClass)));
    }

    #[tokio::test]
    async fn test_invalid_names_are_rejected() {
        let h = harness().with_classes();
        h.callback(PLAYER, "main_create").await;
        h.callback(PLAYER, "class_Mage").await;

        h.text(PLAYER, "   ").await;
        assert_eq!(h.last_text(), "en:name_invalid");
        h.text(PLAYER, &"x".repeat(MAX_NAME_LENGTH + 1)).await;
        assert_eq!(h.last_text(), "en:name_invalid");

        assert_eq!(h.stage(PLAYER), Some((Flow::Creating, Stage::ChooseName)));
        assert!(h.published().is_empty());
    }

    #[tokio::test]
    async fn test_deletion_requires_exact_token() {
        let h = harness();

        h.callback(PLAYER, "main_delete").await;
        assert_eq!(h.last_text(), "en:print_confirm");
        h.text(PLAYER, "confirm").await;

        assert_eq!(h.stage(PLAYER), None);
        assert!(h.published().is_empty());
        let texts = h.chat.texts_for(PLAYER);
        assert_eq!(&texts[texts.len() - 2..], ["en:cancel_request", "en:about_me"]);

        h.callback(PLAYER, "main_delete").await;
        h.text(PLAYER, "CONFIRM").await;

        assert_eq!(h.last_text(), "en:sent_char_delete");
        assert_eq!(h.stage(PLAYER), Some((Flow::Deleting, Stage::ConfirmDeletion)));
        let published = h.published();
        assert_eq!(published.len(), 1);
        assert_eq!(published[0].1["cmd_type"], "delete_character");
    }

    #[tokio::test]
    async fn test_admin_command_is_stamped() {
        let h = harness();

        h.callback(ADMIN, "admin_stats").await;

        assert_eq!(h.last_text(), "en:requested_server_status");
        let published = h.published();
        assert_eq!(published.len(), 1);
        assert_eq!(published[0].0, Queue::Init);
        assert_eq!(published[0].1["cmd_type"], "get_server_stats");
        assert_eq!(published[0].1["sent_by_admin"], true);
    }

    #[tokio::test]
    async fn test_admin_actions_ignored_for_players() {
        let h = harness();

        for data in ["main_admin", "admin_stats", "shutdown_immediate", "shutdown_bot"] {
            h.callback(PLAYER, data).await;
        }

        assert!(h.published().is_empty());
        assert!(h.chat.sent().is_empty());
        assert!(!*h.shutdown_rx.borrow());
    }

    #[tokio::test]
    async fn test_shutdown_bot_flips_signal() {
        let h = harness();

        h.callback(ADMIN, "admin_shutdown_basic").await;
        assert_eq!(h.last_text(), "en:shutdown_panel");
        h.callback(ADMIN, "shutdown_bot").await;

        assert_eq!(h.last_text(), "en:sent_shutdown_bot");
        assert!(*h.shutdown_rx.borrow());
        assert!(h.published().is_empty());
    }

    #[tokio::test]
    async fn test_dispatch_failure_drops_flow() {
        let h = harness();
        h.callback(PLAYER, "main_feedback").await;

        h.broker.fail_next_publishes(2);
        h.text(PLAYER, "Great game").await;

        assert_eq!(h.last_text(), "en:command_failed");
        assert_eq!(h.stage(PLAYER), None);
        assert!(h.published().is_empty());
    }

    #[tokio::test]
    async fn test_feedback_flow() {
        let h = harness();
        h.callback(PLAYER, "main_feedback").await;

        h.text(PLAYER, &"a".repeat(MAX_FEEDBACK_LENGTH + 1)).await;
        assert_eq!(h.last_text(), "en:feedback_too_long");
        assert_eq!(h.stage(PLAYER), Some((Flow::SendingFeedback, Stage::EnterFeedback)));

        h.text(PLAYER, "More dragons").await;
        assert_eq!(h.last_text(), "en:feedback_sent");
        assert_eq!(h.stage(PLAYER), Some((Flow::SendingFeedback, Stage::AwaitingAck)));
        assert_eq!(h.published()[0].1["text"], "More dragons");

        h.responses
            .route(br#"{"user_id": 42, "cmd_type": "feedback"}"#)
            .await
            .unwrap();
        assert_eq!(h.stage(PLAYER), None);
    }

    #[tokio::test]
    async fn test_feedback_review_and_reply() {
        let h = harness();

        h.callback(ADMIN, "admin_get_feedback").await;
        assert_eq!(h.stage(ADMIN), Some((Flow::ReadingFeedback, Stage::AwaitingFeedback)));
        assert_eq!(h.published()[0].1["cmd_type"], "get_feedback");

        h.responses
            .route(br#"{"user_id": 1, "cmd_type": "sent_feedback", "feedback_id": "17", "feedback_text": "More dragons"}"#)
            .await
            .unwrap();
        h.callback(ADMIN, "confirm_reply").await;
        assert_eq!(h.last_text(), "en:enter_reply");
        assert_eq!(h.stage(ADMIN), Some((Flow::ReplyingFeedback, Stage::EnterReply)));

        h.text(ADMIN, "Coming soon").await;
        assert_eq!(h.last_text(), "en:reply_sent");
        let (queue, reply) = h.published().pop().unwrap();
        assert_eq!(queue, Queue::Init);
        assert_eq!(reply["cmd_type"], "reply_feedback");
        assert_eq!(reply["feedback_id"], "17");
        assert_eq!(reply["reply"], "Coming soon");
        assert_eq!(reply["sent_by_admin"], true);
    }

    #[tokio::test]
    async fn test_review_action_without_item_asks_to_start_over() {
        let h = harness();

        h.callback(ADMIN, "confirm_done").await;

        assert_eq!(h.last_text(), "en:start_over");
        assert!(h.published().is_empty());
    }

    #[tokio::test]
    async fn test_locale_selection() {
        let h = harness();

        h.callback(PLAYER, "main_setting").await;
        assert_eq!(h.last_text(), "en:choose_locale");

        h.callback(PLAYER, "LOCALE_ru").await;
        assert_eq!(h.locales.assignment(PLAYER).as_deref(), Some("ru"));
        // ru has no such message and falls back to en.
        assert_eq!(h.last_text(), "en:locale_changed");

        h.callback(PLAYER, "LOCALE_xx").await;
        assert_eq!(h.last_text(), "en:unknown_command");
        assert_eq!(h.locales.assignment(PLAYER).as_deref(), Some("ru"));
    }

    #[tokio::test]
    async fn test_locale_selection_not_saved() {
        let h = harness();
        h.store.fail_upserts.store(true, Ordering::SeqCst);

        h.callback(PLAYER, "LOCALE_ru").await;

        assert_eq!(h.last_text(), "en:command_failed");
        assert!(h.chat.last().unwrap().keyboard.is_some());
        assert_eq!(h.locales.assignment(PLAYER), None);
    }

    #[tokio::test]
    async fn test_start_uses_platform_language() {
        let h = harness();

        h.conversation
            .handle(InboundEvent::command(PLAYER, "start").with_language("ru"))
            .await
            .unwrap();

        let last = h.chat.last().unwrap();
        assert_eq!(last.text, "ru:about_me");
        assert!(!last.keyboard.unwrap().callback_data().any(|d| d == "main_admin"));
    }

    #[tokio::test]
    async fn test_text_without_flow() {
        let h = harness();

        h.text(PLAYER, "hello?").await;

        assert_eq!(h.last_text(), "en:start_over");
        assert!(h.published().is_empty());
    }
}
