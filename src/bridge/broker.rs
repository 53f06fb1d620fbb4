//! Broker ports used by the dispatcher and the consumers.
//!
//! A link owns its own connection. Dropping a link closes it; reconnecting is
//! opening a new one.

use std::time::Duration;

use async_trait::async_trait;

use crate::bridge::protocol::Queue;
use crate::common::error::BrokerResult;

/// A message taken from an inbound queue, not yet settled.
#[derive(Debug, Clone, PartialEq)]
pub struct Delivery {
    pub tag: u64,
    pub body: Vec<u8>,
    /// Set by the broker when this message was delivered before and not acked.
    pub redelivered: bool,
}

/// Opens connections to the message broker.
#[async_trait]
pub trait Broker: Send + Sync {
    /// Connect for publishing, with publisher confirms enabled.
    async fn open_outbound(&self) -> BrokerResult<Box<dyn OutboundLink>>;

    /// Connect and start consuming `queue` with manual acknowledgement.
    async fn open_inbound(&self, queue: Queue) -> BrokerResult<Box<dyn InboundLink>>;
}

/// A publishing connection.
#[async_trait]
pub trait OutboundLink: Send {
    /// Publish and wait for the broker to confirm the message.
    async fn publish(&mut self, queue: Queue, body: &[u8]) -> BrokerResult<()>;
}

/// A consuming connection bound to one queue.
#[async_trait]
pub trait InboundLink: Send {
    /// Wait up to `timeout` for the next delivery. `Ok(None)` means the queue
    /// stayed idle for the whole timeout.
    async fn next(&mut self, timeout: Duration) -> BrokerResult<Option<Delivery>>;

    async fn ack(&mut self, tag: u64) -> BrokerResult<()>;

    async fn reject(&mut self, tag: u64, requeue: bool) -> BrokerResult<()>;
}
