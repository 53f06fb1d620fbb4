//! Platform-neutral conversation layer: menus, flows and their keyboards.

pub mod actions;
pub mod handler;
pub mod keyboards;

pub use handler::Conversation;
