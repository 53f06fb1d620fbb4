//! Inbound bridge: one long-running consumer per response queue.

use std::sync::Arc;
use std::time::Duration;

use backon::BackoffBuilder;
use tokio::sync::watch;
use tracing::{debug, error, info, warn};

use crate::bridge::broker::{Broker, Delivery, InboundLink};
use crate::bridge::protocol::Queue;
use crate::bridge::responses::ResponseHandler;
use crate::common::error::{BrokerResult, RouteError};
use crate::config::QueueConfig;

/// Consumes one queue until shutdown, reconnecting on broker failures.
///
/// Messages are acknowledged only after the handler succeeded, so a crash
/// or disconnect mid-processing leads to redelivery.
pub struct ResponseConsumer {
    queue: Queue,
    broker: Arc<dyn Broker>,
    handler: Arc<ResponseHandler>,
    poll_timeout: Duration,
    reconnect_min: Duration,
    reconnect_max: Duration,
    shutdown_rx: watch::Receiver<bool>,
}

impl ResponseConsumer {
    pub fn new(
        queue: Queue,
        broker: Arc<dyn Broker>,
        handler: Arc<ResponseHandler>,
        config: &QueueConfig,
        shutdown_rx: watch::Receiver<bool>,
    ) -> Self {
        Self {
            queue,
            broker,
            handler,
            poll_timeout: config.poll_timeout(),
            reconnect_min: config.reconnect_min(),
            reconnect_max: config.reconnect_max(),
            shutdown_rx,
        }
    }

    /// Exponential backoff between reconnection attempts, unlimited retries.
    fn backoff(&self) -> impl Iterator<Item = Duration> {
        backon::ExponentialBuilder::default()
            .with_min_delay(self.reconnect_min)
            .with_max_delay(self.reconnect_max)
            .with_factor(2.0)
            .with_jitter()
            .without_max_times()
            .build()
    }

    pub async fn run(mut self) {
        info!("Starting consumer for {}", self.queue);
        let mut link: Option<Box<dyn InboundLink>> = None;
        let mut backoff = self.backoff();

        loop {
            if *self.shutdown_rx.borrow() {
                info!("Shutdown signal detected, stopping consumer for {}", self.queue);
                break;
            }

            if link.is_none() {
                match self.broker.open_inbound(self.queue).await {
                    Ok(opened) => {
                        link = Some(opened);
                        backoff = self.backoff();
                    }
                    Err(e) => {
                        error!("Connecting to {} failed: {}", self.queue, e);
                        if !self.wait(&mut backoff).await {
                            break;
                        }
                        continue;
                    }
                }
            }
            let Some(current) = link.as_mut() else {
                continue;
            };

            let failure = match current.next(self.poll_timeout).await {
                Ok(None) => {
                    debug!("No more messages in {}", self.queue);
                    None
                }
                Ok(Some(delivery)) => self.settle(&mut **current, delivery).await.err(),
                Err(e) => Some(e),
            };

            if let Some(e) = failure {
                error!("Lost connection while consuming {}: {}", self.queue, e);
                link = None;
                if !self.wait(&mut backoff).await {
                    break;
                }
            }
        }

        info!("Consumer for {} stopped", self.queue);
    }

    /// Process a delivery and settle it with the broker.
    async fn settle(&self, link: &mut dyn InboundLink, delivery: Delivery) -> BrokerResult<()> {
        match self.handler.route(&delivery.body).await {
            Ok(()) => link.ack(delivery.tag).await,
            Err(RouteError::Decode(e)) => {
                error!(
                    "Rejecting undecodable message from {}: {} ({})",
                    self.queue,
                    e,
                    String::from_utf8_lossy(&delivery.body)
                );
                link.reject(delivery.tag, false).await
            }
            Err(RouteError::Processing(e)) if delivery.redelivered => {
                error!("Dropping message from {} after second failure: {:#}", self.queue, e);
                link.reject(delivery.tag, false).await
            }
            Err(RouteError::Processing(e)) => {
                warn!("Requeueing message from {}: {:#}", self.queue, e);
                link.reject(delivery.tag, true).await
            }
        }
    }

    /// Sleep for the next backoff delay. Returns false if shutdown was requested.
    async fn wait(&mut self, backoff: &mut impl Iterator<Item = Duration>) -> bool {
        let delay = backoff.next().unwrap_or(self.reconnect_max);
        info!("Reconnecting to {} in {:.1} seconds...", self.queue, delay.as_secs_f64());

        tokio::select! {
            _ = tokio::time::sleep(delay) => true,
            changed = self.shutdown_rx.changed() => {
                if changed.is_err() || *self.shutdown_rx.borrow() {
                    info!("Shutdown signal received during backoff");
                    return false;
                }
                true
            }
        }
    }
}
