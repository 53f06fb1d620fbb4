//! RabbitMQ implementation of the broker ports, built on lapin.

use std::time::Duration;

use async_trait::async_trait;
use futures::StreamExt;
use lapin::options::{
    BasicAckOptions, BasicConsumeOptions, BasicPublishOptions, BasicQosOptions,
    BasicRejectOptions, ConfirmSelectOptions, QueueDeclareOptions,
};
use lapin::publisher_confirm::Confirmation;
use lapin::types::FieldTable;
use lapin::uri::{AMQPUri, AMQPUserInfo};
use lapin::{BasicProperties, Channel, Connection, ConnectionProperties, Consumer};
use tracing::{debug, info};

use crate::bridge::broker::{Broker, Delivery, InboundLink, OutboundLink};
use crate::bridge::protocol::{
    Queue, CONTENT_ENCODING, CONTENT_TYPE, DELIVERY_MODE_PERSISTENT, QUEUE_APP_ID,
};
use crate::common::error::{BrokerError, BrokerResult};
use crate::config::QueueConfig;

/// Unacknowledged deliveries a consumer may hold at once.
const PREFETCH_COUNT: u16 = 10;

/// Connects to RabbitMQ using the `queue` config section.
pub struct AmqpBroker {
    uri: AMQPUri,
}

impl AmqpBroker {
    pub fn new(config: &QueueConfig) -> Self {
        let mut uri = AMQPUri::default();
        uri.authority.host = config.host.clone();
        uri.authority.port = config.port;
        if let Some(user) = &config.user {
            uri.authority.userinfo = AMQPUserInfo {
                username: user.clone(),
                password: config.password.clone().unwrap_or_default(),
            };
        }
        Self { uri }
    }

    async fn connect(&self) -> BrokerResult<(Connection, Channel)> {
        debug!(
            "Connecting to broker at {}:{}",
            self.uri.authority.host, self.uri.authority.port
        );
        let connection =
            Connection::connect_uri(self.uri.clone(), ConnectionProperties::default()).await?;
        let channel = connection.create_channel().await?;
        declare_queues(&channel).await?;
        Ok((connection, channel))
    }
}

/// Declare every queue of the contract so either side may start first.
async fn declare_queues(channel: &Channel) -> BrokerResult<()> {
    for queue in Queue::ALL {
        channel
            .queue_declare(
                queue.name(),
                QueueDeclareOptions {
                    durable: queue.durable(),
                    ..QueueDeclareOptions::default()
                },
                FieldTable::default(),
            )
            .await?;
    }
    Ok(())
}

#[async_trait]
impl Broker for AmqpBroker {
    async fn open_outbound(&self) -> BrokerResult<Box<dyn OutboundLink>> {
        let (connection, channel) = self.connect().await?;
        channel.confirm_select(ConfirmSelectOptions::default()).await?;
        info!("Connected to broker for publishing");

        Ok(Box::new(AmqpOutbound {
            _connection: connection,
            channel,
        }))
    }

    async fn open_inbound(&self, queue: Queue) -> BrokerResult<Box<dyn InboundLink>> {
        let (connection, channel) = self.connect().await?;
        channel
            .basic_qos(PREFETCH_COUNT, BasicQosOptions::default())
            .await?;
        let consumer = channel
            .basic_consume(
                queue.name(),
                &format!("idle-rpg-bot-{}", queue.name()),
                BasicConsumeOptions::default(),
                FieldTable::default(),
            )
            .await?;
        info!("Connected to broker, consuming {}", queue);

        Ok(Box::new(AmqpInbound {
            _connection: connection,
            channel,
            consumer,
        }))
    }
}

struct AmqpOutbound {
    _connection: Connection,
    channel: Channel,
}

#[async_trait]
impl OutboundLink for AmqpOutbound {
    async fn publish(&mut self, queue: Queue, body: &[u8]) -> BrokerResult<()> {
        let properties = BasicProperties::default()
            .with_delivery_mode(DELIVERY_MODE_PERSISTENT)
            .with_content_type(CONTENT_TYPE.into())
            .with_content_encoding(CONTENT_ENCODING.into())
            .with_app_id(QUEUE_APP_ID.into());

        let confirmation = self
            .channel
            .basic_publish(
                "",
                queue.name(),
                BasicPublishOptions::default(),
                body,
                properties,
            )
            .await?
            .await?;

        match confirmation {
            Confirmation::Nack(_) => Err(BrokerError::Nacked {
                queue: queue.name().to_string(),
            }),
            _ => Ok(()),
        }
    }
}

struct AmqpInbound {
    _connection: Connection,
    channel: Channel,
    consumer: Consumer,
}

#[async_trait]
impl InboundLink for AmqpInbound {
    async fn next(&mut self, timeout: Duration) -> BrokerResult<Option<Delivery>> {
        match tokio::time::timeout(timeout, self.consumer.next()).await {
            Err(_) => Ok(None),
            Ok(None) => Err(BrokerError::ConnectionClosed),
            Ok(Some(delivery)) => {
                let delivery = delivery?;
                Ok(Some(Delivery {
                    tag: delivery.delivery_tag,
                    body: delivery.data,
                    redelivered: delivery.redelivered,
                }))
            }
        }
    }

    async fn ack(&mut self, tag: u64) -> BrokerResult<()> {
        self.channel
            .basic_ack(tag, BasicAckOptions::default())
            .await?;
        Ok(())
    }

    async fn reject(&mut self, tag: u64, requeue: bool) -> BrokerResult<()> {
        self.channel
            .basic_reject(tag, BasicRejectOptions { requeue })
            .await?;
        Ok(())
    }
}
