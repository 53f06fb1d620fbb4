//! Per-user conversation flows.
//!
//! A user has at most one active flow. Starting a flow always replaces the
//! previous one, whatever stage it was in.

use std::collections::HashMap;
use std::fmt;
use std::sync::{Mutex, PoisonError};

use tracing::debug;

use crate::common::error::SessionError;
use crate::common::types::UserId;

/// Payload key holding the selected character class.
pub const PAYLOAD_CLASS: &str = "class";
/// Payload key holding the entered character name.
pub const PAYLOAD_NAME: &str = "name";
/// Payload key holding the feedback item under review.
pub const PAYLOAD_FEEDBACK_ID: &str = "feedback_id";

/// Multi-step process a user can be in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Flow {
    Creating,
    Deleting,
    SendingFeedback,
    ReadingFeedback,
    ReplyingFeedback,
}

/// Position within a flow.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Stage {
    SelectClass,
    ChooseName,
    Confirm,
    ConfirmDeletion,
    EnterFeedback,
    AwaitingAck,
    AwaitingFeedback,
    Review,
    EnterReply,
}

impl Stage {
    pub fn as_str(&self) -> &'static str {
        match self {
            Stage::SelectClass => "select_class",
            Stage::ChooseName => "choose_name",
            Stage::Confirm => "confirm",
            Stage::ConfirmDeletion => "confirm_deletion",
            Stage::EnterFeedback => "enter_feedback",
            Stage::AwaitingAck => "awaiting_ack",
            Stage::AwaitingFeedback => "awaiting_feedback",
            Stage::Review => "review",
            Stage::EnterReply => "enter_reply",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// State of one user's active flow.
#[derive(Debug, Clone, PartialEq)]
pub struct UserSession {
    pub user_id: UserId,
    pub flow: Flow,
    pub stage: Stage,
    pub payload: HashMap<String, String>,
}

impl UserSession {
    pub fn get(&self, key: &str) -> Option<&str> {
        self.payload.get(key).map(String::as_str)
    }

    /// True if the session is in `flow` at `stage`.
    pub fn is_at(&self, flow: Flow, stage: Stage) -> bool {
        self.flow == flow && self.stage == stage
    }
}

/// Process-wide registry of active flows.
#[derive(Debug, Default)]
pub struct SessionRegistry {
    sessions: Mutex<HashMap<UserId, UserSession>>,
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start a flow, discarding any previous flow and its payload.
    pub fn start_flow(&self, user_id: UserId, flow: Flow, stage: Stage) -> UserSession {
        let session = UserSession {
            user_id,
            flow,
            stage,
            payload: HashMap::new(),
        };
        if let Some(previous) = self.lock().insert(user_id, session.clone()) {
            debug!(
                "User {} started {:?}, discarding {:?} at stage {}",
                user_id, flow, previous.flow, previous.stage
            );
        }
        session
    }

    /// Move the active flow to `stage`, merging `patch` into its payload.
    pub fn advance<I, K, V>(
        &self,
        user_id: UserId,
        stage: Stage,
        patch: I,
    ) -> Result<UserSession, SessionError>
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        let mut sessions = self.lock();
        let session = sessions
            .get_mut(&user_id)
            .ok_or(SessionError::NoActiveFlow { user_id })?;

        session
            .payload
            .extend(patch.into_iter().map(|(k, v)| (k.into(), v.into())));
        session.stage = stage;
        Ok(session.clone())
    }

    /// Move the active flow to `stage` without touching its payload.
    pub fn set_stage(&self, user_id: UserId, stage: Stage) -> Result<UserSession, SessionError> {
        self.advance(user_id, stage, std::iter::empty::<(String, String)>())
    }

    /// Remove the user's flow, if any. Returns the removed session.
    pub fn clear(&self, user_id: UserId) -> Option<UserSession> {
        self.lock().remove(&user_id)
    }

    /// Remove the user's flow only if it is one of `flows`.
    pub fn clear_flow(&self, user_id: UserId, flows: &[Flow]) -> Option<UserSession> {
        let mut sessions = self.lock();
        match sessions.get(&user_id) {
            Some(session) if flows.contains(&session.flow) => sessions.remove(&user_id),
            _ => None,
        }
    }

    pub fn get(&self, user_id: UserId) -> Option<UserSession> {
        self.lock().get(&user_id).cloned()
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<UserId, UserSession>> {
        self.sessions.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
