//! Outbound bridge: publishes commands to the backend.

use std::collections::HashSet;
use std::sync::Arc;

use tokio::sync::Mutex;
use tracing::{debug, error, info, warn};

use crate::bridge::broker::{Broker, OutboundLink};
use crate::bridge::protocol::{Command, Queue};
use crate::common::error::{BrokerResult, DispatchError};
use crate::common::types::UserId;

/// Successful publish report.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Ack {
    pub queue: Queue,
    /// 1 when the first attempt succeeded, 2 after a reconnect.
    pub attempts: u32,
}

/// Publishes commands over a single shared outbound link.
///
/// Delivery is at-most-once: a failed publish is retried exactly once on a
/// fresh connection, then the command is dropped.
pub struct Dispatcher {
    broker: Arc<dyn Broker>,
    admins: HashSet<UserId>,
    link: Mutex<Option<Box<dyn OutboundLink>>>,
}

impl Dispatcher {
    pub fn new(broker: Arc<dyn Broker>, admins: HashSet<UserId>) -> Self {
        Self {
            broker,
            admins,
            link: Mutex::new(None),
        }
    }

    /// Publish a command to the init queue (`is_system`) or the command queue.
    pub async fn publish(&self, mut command: Command, is_system: bool) -> Result<Ack, DispatchError> {
        command.stamp_admin(&self.admins);
        let body = serde_json::to_vec(&command)?;
        let queue = if is_system { Queue::Init } else { Queue::Command };
        debug!("Publishing to {}: {}", queue, String::from_utf8_lossy(&body));

        let mut link = self.link.lock().await;

        if let Err(e) = attempt(self.broker.as_ref(), &mut link, queue, &body).await {
            warn!(
                "Publishing {} to {} failed, reconnecting: {}",
                command.kind.cmd_type(),
                queue,
                e
            );
        } else {
            info!("Sent {} to {}", command.kind.cmd_type(), queue);
            return Ok(Ack { queue, attempts: 1 });
        }

        match attempt(self.broker.as_ref(), &mut link, queue, &body).await {
            Ok(()) => {
                info!("Sent {} to {} after reconnect", command.kind.cmd_type(), queue);
                Ok(Ack { queue, attempts: 2 })
            }
            Err(e) => {
                error!(
                    "Dropping {} for user {:?}: {}",
                    command.kind.cmd_type(),
                    command.user_id,
                    e
                );
                Err(DispatchError::Broker(e))
            }
        }
    }
}

/// One publish attempt. A link that failed is not put back.
async fn attempt(
    broker: &dyn Broker,
    slot: &mut Option<Box<dyn OutboundLink>>,
    queue: Queue,
    body: &[u8],
) -> BrokerResult<()> {
    let mut link = match slot.take() {
        Some(link) => link,
        None => broker.open_outbound().await?,
    };
    link.publish(queue, body).await?;
    *slot = Some(link);
    Ok(())
}
