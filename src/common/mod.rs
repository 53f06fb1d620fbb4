//! Common utilities and types shared across the application.

pub mod chat;
pub mod error;
pub mod messages;
pub mod types;

pub use chat::ChatSender;
