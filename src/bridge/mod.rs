//! Queue-based bridge between chat users and the game backend.
//!
//! ## Module Structure
//!
//! - `protocol`: wire contract (queues, commands, responses)
//! - `broker`: broker ports; `amqp` implements them with lapin
//! - `dispatcher`: outbound commands, at-most-once
//! - `consumer`: inbound response loops, at-least-once
//! - `responses`: routing of decoded responses
//! - `session`: per-user flow registry
//! - `dictionary`: class catalog built from broadcasts
//! - `seed`: bulk test character creation

pub mod amqp;
pub mod broker;
pub mod consumer;
pub mod dictionary;
pub mod dispatcher;
#[cfg(test)]
pub mod memory;
pub mod protocol;
pub mod responses;
pub mod seed;
pub mod session;

pub use amqp::AmqpBroker;
pub use consumer::ResponseConsumer;
pub use dictionary::DictionaryCache;
pub use dispatcher::Dispatcher;
pub use responses::ResponseHandler;
pub use session::SessionRegistry;
