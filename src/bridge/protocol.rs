//! Broker wire contract shared with the game backend.
//!
//! Every message is a JSON object tagged by `cmd_type`. Outbound commands are
//! published to the init queue (system/admin commands) or the command queue
//! (user commands); responses arrive on the responses queue (addressed to a
//! user) or the dictionary queue (broadcasts).

use std::collections::{HashMap, HashSet};
use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::common::types::UserId;

/// Application id stamped on every published message.
pub const QUEUE_APP_ID: &str = "Telegram bot";

/// Content type of every published message.
pub const CONTENT_TYPE: &str = "application/json";

/// Content encoding of every published message.
pub const CONTENT_ENCODING: &str = "UTF-8";

/// AMQP delivery mode for persistent messages.
pub const DELIVERY_MODE_PERSISTENT: u8 = 2;

/// The four queues the bot talks to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Queue {
    /// System commands (class list request, admin commands). Not durable.
    Init,
    /// User commands.
    Command,
    /// Replies addressed to a user.
    Responses,
    /// Broadcast dictionary updates.
    Dictionary,
}

impl Queue {
    pub const ALL: [Queue; 4] = [Queue::Init, Queue::Command, Queue::Responses, Queue::Dictionary];

    pub fn name(&self) -> &'static str {
        match self {
            Queue::Init => "InitQueue",
            Queue::Command => "CommandQueue",
            Queue::Responses => "ResponsesQueue",
            Queue::Dictionary => "DictionaryQueue",
        }
    }

    pub fn durable(&self) -> bool {
        !matches!(self, Queue::Init)
    }
}

impl fmt::Display for Queue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Command-specific part of an outbound message.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "cmd_type", rename_all = "snake_case")]
pub enum CommandKind {
    GetClassList,
    CreateCharacter { name: String, class: String },
    DeleteCharacter,
    GetCharacterStatus,
    GetServerStats,
    ShutdownNormal,
    ShutdownImmediate,
    Feedback { text: String },
    GetFeedback,
    ConfirmFeedback { feedback_id: String },
    ReplyFeedback { feedback_id: String, reply: String },
}

impl CommandKind {
    /// The `cmd_type` string for logs.
    pub fn cmd_type(&self) -> &'static str {
        match self {
            CommandKind::GetClassList => "get_class_list",
            CommandKind::CreateCharacter { .. } => "create_character",
            CommandKind::DeleteCharacter => "delete_character",
            CommandKind::GetCharacterStatus => "get_character_status",
            CommandKind::GetServerStats => "get_server_stats",
            CommandKind::ShutdownNormal => "shutdown_normal",
            CommandKind::ShutdownImmediate => "shutdown_immediate",
            CommandKind::Feedback { .. } => "feedback",
            CommandKind::GetFeedback => "get_feedback",
            CommandKind::ConfirmFeedback { .. } => "confirm_feedback",
            CommandKind::ReplyFeedback { .. } => "reply_feedback",
        }
    }
}

/// An outbound command.
///
/// `sent_by_admin` can only be set by the dispatcher, from the admin
/// allowlist, right before publishing.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Command {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_id: Option<UserId>,
    #[serde(flatten)]
    pub kind: CommandKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub locale: Option<String>,
    sent_by_admin: bool,
}

impl Command {
    /// A command issued on behalf of a chat user.
    pub fn for_user(user_id: UserId, locale: &str, kind: CommandKind) -> Self {
        Self {
            user_id: Some(user_id),
            kind,
            locale: Some(locale.to_string()),
            sent_by_admin: false,
        }
    }

    /// A command issued by the bot itself.
    pub fn system(kind: CommandKind) -> Self {
        Self {
            user_id: None,
            kind,
            locale: None,
            sent_by_admin: false,
        }
    }

    /// Attach a locale to a command that has no user.
    pub fn with_locale(mut self, locale: &str) -> Self {
        self.locale = Some(locale.to_string());
        self
    }

    pub fn sent_by_admin(&self) -> bool {
        self.sent_by_admin
    }

    pub(crate) fn stamp_admin(&mut self, admins: &HashSet<UserId>) {
        self.sent_by_admin = self.user_id.is_some_and(|id| admins.contains(&id));
    }
}

/// A class entry in a `set_class_list` broadcast.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum ClassEntry {
    /// Bare class name.
    Name(String),
    /// Class name with per-locale labels.
    Localized {
        name: String,
        #[serde(default)]
        labels: HashMap<String, String>,
    },
}

impl ClassEntry {
    pub fn name(&self) -> &str {
        match self {
            ClassEntry::Name(name) => name,
            ClassEntry::Localized { name, .. } => name,
        }
    }
}

/// Response-specific part of an inbound message.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "cmd_type", rename_all = "snake_case")]
pub enum ResponseKind {
    SetClassList {
        class_list: Vec<ClassEntry>,
    },
    SetClassDescription {
        #[serde(alias = "class")]
        class_name: String,
        locale: String,
        description: String,
    },
    ServerStats {
        server_info: String,
    },
    ServerOk {
        #[serde(default)]
        message: Option<String>,
    },
    GetCharacterStatus {
        char_info: String,
    },
    SentFeedback {
        #[serde(default)]
        feedback_id: Option<String>,
        #[serde(default)]
        feedback_text: Option<String>,
    },
    FeedbackReceive {
        message: String,
    },
    CreateCharacter {
        #[serde(default)]
        message: Option<String>,
    },
    DeleteCharacter {
        #[serde(default)]
        message: Option<String>,
    },
    Feedback {
        #[serde(default)]
        message: Option<String>,
    },
    ConfirmFeedback {
        #[serde(default)]
        message: Option<String>,
    },
    ReplyFeedback {
        #[serde(default)]
        message: Option<String>,
    },
    #[serde(other)]
    Unknown,
}

/// A decoded inbound message.
#[derive(Debug, Clone, PartialEq)]
pub struct Response {
    /// Target user; `None` for broadcasts.
    pub user_id: Option<UserId>,
    /// Raw `cmd_type`, kept for logging unknown types.
    pub cmd_type: String,
    pub kind: ResponseKind,
}

impl Response {
    /// Decode a message body.
    pub fn decode(body: &[u8]) -> Result<Self, serde_json::Error> {
        let value: Value = serde_json::from_slice(body)?;
        let user_id = value.get("user_id").and_then(Value::as_i64).map(UserId);
        let cmd_type = value
            .get("cmd_type")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string();
        let kind = serde_json::from_value(value)?;

        Ok(Self {
            user_id,
            cmd_type,
            kind,
        })
    }
}
