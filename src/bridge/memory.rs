//! In-memory broker for tests, with fault injection.

use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::Notify;

use crate::bridge::broker::{Broker, Delivery, InboundLink, OutboundLink};
use crate::bridge::protocol::Queue;
use crate::common::error::{BrokerError, BrokerResult};

#[derive(Default)]
struct State {
    queues: HashMap<Queue, VecDeque<(Vec<u8>, bool)>>,
    published: Vec<(Queue, Vec<u8>)>,
    next_tag: u64,
    fail_publishes: usize,
    fail_opens: usize,
    fail_polls: usize,
    opens: usize,
}

#[derive(Default)]
struct Shared {
    state: Mutex<State>,
    notify: Notify,
}

/// Broker whose queues live in a shared map.
#[derive(Clone, Default)]
pub struct MemoryBroker {
    shared: Arc<Shared>,
}

impl MemoryBroker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Put a message on a queue as if the backend had published it.
    pub fn push(&self, queue: Queue, body: &[u8]) {
        self.state()
            .queues
            .entry(queue)
            .or_default()
            .push_back((body.to_vec(), false));
        self.shared.notify.notify_waiters();
    }

    /// Messages published through outbound links.
    pub fn published(&self) -> Vec<(Queue, Vec<u8>)> {
        self.state().published.clone()
    }

    /// Messages still waiting on a queue.
    pub fn pending(&self, queue: Queue) -> usize {
        self.state().queues.get(&queue).map_or(0, VecDeque::len)
    }

    pub fn fail_next_publishes(&self, count: usize) {
        self.state().fail_publishes = count;
    }

    pub fn fail_next_opens(&self, count: usize) {
        self.state().fail_opens = count;
    }

    /// Make the next `count` polls fail as if the connection dropped.
    pub fn fail_next_polls(&self, count: usize) {
        self.state().fail_polls = count;
        self.shared.notify.notify_waiters();
    }

    /// Links opened so far, inbound and outbound.
    pub fn opens(&self) -> usize {
        self.state().opens
    }

    fn state(&self) -> std::sync::MutexGuard<'_, State> {
        self.shared.state.lock().unwrap()
    }

    fn open(&self) -> BrokerResult<()> {
        let mut state = self.state();
        state.opens += 1;
        if state.fail_opens > 0 {
            state.fail_opens -= 1;
            return Err(BrokerError::ConnectionClosed);
        }
        Ok(())
    }
}

#[async_trait]
impl Broker for MemoryBroker {
    async fn open_outbound(&self) -> BrokerResult<Box<dyn OutboundLink>> {
        self.open()?;
        Ok(Box::new(MemoryOutbound {
            broker: self.clone(),
        }))
    }

    async fn open_inbound(&self, queue: Queue) -> BrokerResult<Box<dyn InboundLink>> {
        self.open()?;
        Ok(Box::new(MemoryInbound {
            broker: self.clone(),
            queue,
            unacked: HashMap::new(),
        }))
    }
}

struct MemoryOutbound {
    broker: MemoryBroker,
}

#[async_trait]
impl OutboundLink for MemoryOutbound {
    async fn publish(&mut self, queue: Queue, body: &[u8]) -> BrokerResult<()> {
        let mut state = self.broker.state();
        if state.fail_publishes > 0 {
            state.fail_publishes -= 1;
            return Err(BrokerError::ConnectionClosed);
        }
        state.published.push((queue, body.to_vec()));
        Ok(())
    }
}

struct MemoryInbound {
    broker: MemoryBroker,
    queue: Queue,
    unacked: HashMap<u64, Vec<u8>>,
}

impl MemoryInbound {
    fn try_take(&mut self) -> BrokerResult<Option<Delivery>> {
        let mut state = self.broker.state();
        if state.fail_polls > 0 {
            state.fail_polls -= 1;
            return Err(BrokerError::ConnectionClosed);
        }
        let Some((body, redelivered)) = state.queues.get_mut(&self.queue).and_then(VecDeque::pop_front)
        else {
            return Ok(None);
        };
        state.next_tag += 1;
        let tag = state.next_tag;
        self.unacked.insert(tag, body.clone());
        Ok(Some(Delivery {
            tag,
            body,
            redelivered,
        }))
    }

    fn requeue(&self, body: Vec<u8>) {
        self.broker
            .state()
            .queues
            .entry(self.queue)
            .or_default()
            .push_front((body, true));
    }
}

#[async_trait]
impl InboundLink for MemoryInbound {
    async fn next(&mut self, timeout: Duration) -> BrokerResult<Option<Delivery>> {
        let deadline = tokio::time::Instant::now() + timeout;
        let shared = self.broker.shared.clone();
        loop {
            let notified = shared.notify.notified();
            if let Some(delivery) = self.try_take()? {
                return Ok(Some(delivery));
            }
            if tokio::time::timeout_at(deadline, notified).await.is_err() {
                return Ok(None);
            }
        }
    }

    async fn ack(&mut self, tag: u64) -> BrokerResult<()> {
        self.unacked.remove(&tag);
        Ok(())
    }

    async fn reject(&mut self, tag: u64, requeue: bool) -> BrokerResult<()> {
        if let Some(body) = self.unacked.remove(&tag) {
            if requeue {
                self.requeue(body);
            }
        }
        Ok(())
    }
}

// Unsettled deliveries go back to the queue, like on a real broker.
impl Drop for MemoryInbound {
    fn drop(&mut self) {
        let bodies: Vec<Vec<u8>> = self.unacked.drain().map(|(_, body)| body).collect();
        for body in bodies {
            self.requeue(body);
        }
    }
}
