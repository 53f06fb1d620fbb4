//! Error types for the application.

use thiserror::Error;

use crate::common::types::UserId;

/// Configuration-related errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file '{path}': {source}")]
    IoError {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config: {message}")]
    ParseError { message: String },

    #[error("Config validation failed: {message}")]
    ValidationError { message: String },

    #[error("Invalid value for '{field}': {message}")]
    InvalidValue { field: String, message: String },
}

/// Translation catalog and locale assignment errors.
#[derive(Debug, Error)]
pub enum LocaleError {
    #[error("Can't find message '{key}' in locale '{locale}' (default locale '{default}')")]
    MessageNotFound {
        key: String,
        locale: String,
        default: String,
    },

    #[error("Unknown locale: {code}")]
    UnknownLocale { code: String },

    #[error("Default locale '{code}' has no catalog")]
    MissingDefault { code: String },

    #[error("Failed to read catalog '{path}': {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse catalog '{path}': {source}")]
    Parse {
        path: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("Locale store error: {0}")]
    Store(#[from] StoreError),
}

/// Persistent locale store errors.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Failed to access locale store '{path}': {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Locale store '{path}' is corrupted: {source}")]
    Corrupted {
        path: String,
        #[source]
        source: serde_json::Error,
    },
}

/// Session registry errors.
#[derive(Debug, Error)]
pub enum SessionError {
    #[error("No active flow for user {user_id}")]
    NoActiveFlow { user_id: UserId },
}

/// Broker-level errors (connection, channel, confirms).
#[derive(Debug, Error)]
pub enum BrokerError {
    #[error("AMQP error: {0}")]
    Amqp(#[from] lapin::Error),

    #[error("Connection closed by broker")]
    ConnectionClosed,

    #[error("Publish to '{queue}' was not confirmed by broker")]
    Nacked { queue: String },
}

/// Outbound command dispatch errors.
#[derive(Debug, Error)]
pub enum DispatchError {
    #[error("Failed to encode command: {0}")]
    Encode(#[from] serde_json::Error),

    #[error("Command dropped after reconnect attempt: {0}")]
    Broker(#[source] BrokerError),
}

/// Chat platform errors.
#[derive(Debug, Error)]
pub enum ChatError {
    #[error("Failed to send message to user {user_id}: {message}")]
    SendFailed { user_id: UserId, message: String },
}

/// Result type alias for broker operations.
pub type BrokerResult<T> = std::result::Result<T, BrokerError>;

/// Result type alias for locale operations.
pub type LocaleResult<T> = std::result::Result<T, LocaleError>;

/// Failure to handle one inbound broker message.
#[derive(Debug, Error)]
pub enum RouteError {
    /// The body is not a valid response; retrying cannot help.
    #[error("Failed to decode response: {0}")]
    Decode(#[source] serde_json::Error),

    #[error("Failed to process response: {0}")]
    Processing(anyhow::Error),
}
