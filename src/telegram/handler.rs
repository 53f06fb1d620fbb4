//! Converts Telegram updates into `InboundEvent`s for the conversation layer.

use std::sync::Arc;

use teloxide::dispatching::{DefaultKey, UpdateFilterExt};
use teloxide::error_handlers::LoggingErrorHandler;
use teloxide::prelude::*;
use teloxide::types::Update;
use teloxide::RequestError;
use tracing::{debug, error, warn};

use crate::common::messages::InboundEvent;
use crate::common::types::UserId;
use crate::conversation::Conversation;

/// Command name from a `/command[@bot] [args]` message.
pub fn parse_command(text: &str) -> Option<&str> {
    let word = text.trim().strip_prefix('/')?.split_whitespace().next()?;
    let name = word.split('@').next().unwrap_or(word);
    (!name.is_empty()).then_some(name)
}

/// Event for an incoming text message: a command if it starts with `/`.
pub fn message_event(user_id: UserId, text: &str, language: Option<&str>) -> InboundEvent {
    let event = match parse_command(text) {
        Some(name) => InboundEvent::command(user_id, name),
        None => InboundEvent::text(user_id, text),
    };
    match language {
        Some(code) => event.with_language(code),
        None => event,
    }
}

async fn on_message(msg: Message, conversation: Arc<Conversation>) -> ResponseResult<()> {
    let Some(text) = msg.text() else {
        debug!("Ignoring non-text message in chat {}", msg.chat.id);
        return Ok(());
    };
    let language = msg.from.as_ref().and_then(|u| u.language_code.as_deref());
    let event = message_event(UserId(msg.chat.id.0), text, language);

    if let Err(e) = conversation.handle(event).await {
        error!("Failed to handle message from user {}: {:#}", msg.chat.id, e);
    }
    Ok(())
}

async fn on_callback(
    bot: Bot,
    query: CallbackQuery,
    conversation: Arc<Conversation>,
) -> ResponseResult<()> {
    if let Err(e) = bot.answer_callback_query(&query.id).await {
        warn!("Failed to answer callback query {}: {}", query.id, e);
    }

    let Some(data) = query.data.as_deref() else {
        return Ok(());
    };
    let user_id = UserId(query.from.id.0 as i64);
    let mut event = InboundEvent::callback(user_id, data);
    if let Some(code) = query.from.language_code.as_deref() {
        event = event.with_language(code);
    }

    if let Err(e) = conversation.handle(event).await {
        error!("Failed to handle callback from user {}: {:#}", user_id, e);
    }
    Ok(())
}

/// Build the update dispatcher. Stop it through its shutdown token.
pub fn build_dispatcher(
    bot: Bot,
    conversation: Arc<Conversation>,
) -> Dispatcher<Bot, RequestError, DefaultKey> {
    let handler = dptree::entry()
        .branch(Update::filter_message().endpoint(on_message))
        .branch(Update::filter_callback_query().endpoint(on_callback));

    Dispatcher::builder(bot, handler)
        .dependencies(dptree::deps![conversation])
        .default_handler(|update| async move {
            debug!("Unhandled update: {:?}", update.kind);
        })
        .error_handler(LoggingErrorHandler::with_custom_text(
            "Error in Telegram handler",
        ))
        .build()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    use tokio::sync::watch;

    use crate::bridge::dictionary::DictionaryCache;
    use crate::bridge::dispatcher::Dispatcher;
    use crate::bridge::memory::MemoryBroker;
    use crate::bridge::session::SessionRegistry;
    use crate::common::chat::testing::RecordingChat;
    use crate::common::messages::EventKind;
    use crate::locale::resolver::test_resolver;

    #[test]
    fn test_parse_command() {
        assert_eq!(parse_command("/start"), Some("start"));
        assert_eq!(parse_command("/create@IdleRpgBot"), Some("create"));
        assert_eq!(parse_command("  /status now"), Some("status"));
        assert_eq!(parse_command("CONFIRM"), None);
        assert_eq!(parse_command("/"), None);
        assert_eq!(parse_command("/@bot"), None);
    }

    #[test]
    fn test_message_event() {
        let event = message_event(UserId(5), "/start", Some("ru"));
        assert_eq!(event.kind, EventKind::Command("start".to_string()));
        assert_eq!(event.language_hint.as_deref(), Some("ru"));

        let event = message_event(UserId(5), "Conan", None);
        assert_eq!(event.kind, EventKind::Text("Conan".to_string()));
        assert_eq!(event.language_hint, None);
    }

    #[tokio::test]
    async fn test_callback_handled_when_answer_fails() {
        let chat = Arc::new(RecordingChat::default());
        let (shutdown_tx, _shutdown_rx) = watch::channel(false);
        let conversation = Arc::new(Conversation::new(
            Arc::new(SessionRegistry::new()),
            Arc::new(test_resolver()),
            Arc::new(DictionaryCache::new()),
            Arc::new(Dispatcher::new(Arc::new(MemoryBroker::new()), HashSet::new())),
            chat.clone(),
            HashSet::new(),
            shutdown_tx,
        ));
        // Nothing listens here, so answering the query fails.
        let bot = Bot::new("123:test").set_api_url("http://127.0.0.1:1/".parse().unwrap());
        let query: CallbackQuery = serde_json::from_value(serde_json::json!({
            "id": "4382",
            "from": {"id": 42, "is_bot": false, "first_name": "Conan"},
            "chat_instance": "-1",
            "data": "main_about"
        }))
        .unwrap();

        on_callback(bot, query, conversation).await.unwrap();

        let last = chat.last().unwrap();
        assert_eq!(last.user_id, UserId(42));
        assert_eq!(last.text, "en:about_text");
    }
}
