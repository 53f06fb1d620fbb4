//! Telegram front end (teloxide).

pub mod client;
pub mod handler;

pub use client::TelegramChat;
pub use handler::build_dispatcher;
