//! `AMQP` publisher backed by a durable topic exchange.

use anyhow::{Context, Result, anyhow};
use async_trait::async_trait;
use lapin::{
    BasicProperties, Channel, Connection, ConnectionProperties, ExchangeKind,
    options::{
        BasicPublishOptions, ConfirmSelectOptions, ExchangeDeclareOptions, QueueBindOptions,
        QueueDeclareOptions,
    },
    publisher_confirm::Confirmation,
    types::FieldTable,
};
use secrecy::{ExposeSecret, SecretString};
use serde_json::Value;
use tracing::{Instrument, debug, info_span};

use super::EventPublisher;

/// Queues declared on start-up and the routing patterns bound to them.
pub const QUEUE_BINDINGS: [(&str, &str); 2] = [
    ("notification", "user.notification.*"),
    ("club", "user.club.*"),
];

const PERSISTENT_DELIVERY: u8 = 2;

pub struct AmqpEventPublisher {
    // Dropping the connection closes the channel.
    _connection: Connection,
    channel: Channel,
    exchange: String,
}

impl AmqpEventPublisher {
    /// Connect and declare the exchange, queues and bindings.
    ///
    /// # Errors
    /// Returns an error if the broker is unreachable or rejects a declaration.
    pub async fn connect(url: &SecretString, exchange: &str) -> Result<Self> {
        let connection = Connection::connect(url.expose_secret(), ConnectionProperties::default())
            .await
            .context("failed to connect to amqp broker")?;
        let channel = connection
            .create_channel()
            .await
            .context("failed to open amqp channel")?;
        channel
            .confirm_select(ConfirmSelectOptions::default())
            .await
            .context("failed to enable publisher confirms")?;

        declare_topology(&channel, exchange).await?;

        Ok(Self {
            _connection: connection,
            channel,
            exchange: exchange.to_string(),
        })
    }
}

async fn declare_topology(channel: &Channel, exchange: &str) -> Result<()> {
    channel
        .exchange_declare(
            exchange,
            ExchangeKind::Topic,
            ExchangeDeclareOptions {
                durable: true,
                ..ExchangeDeclareOptions::default()
            },
            FieldTable::default(),
        )
        .await
        .with_context(|| format!("failed to declare exchange {exchange}"))?;

    for (queue, pattern) in QUEUE_BINDINGS {
        channel
            .queue_declare(
                queue,
                QueueDeclareOptions {
                    durable: true,
                    ..QueueDeclareOptions::default()
                },
                FieldTable::default(),
            )
            .await
            .with_context(|| format!("failed to declare queue {queue}"))?;

        channel
            .queue_bind(
                queue,
                exchange,
                pattern,
                QueueBindOptions::default(),
                FieldTable::default(),
            )
            .await
            .with_context(|| format!("failed to bind queue {queue} to {pattern}"))?;

        debug!(queue, pattern, exchange, "amqp queue bound");
    }

    Ok(())
}

fn publish_properties() -> BasicProperties {
    BasicProperties::default()
        .with_content_type("application/json".into())
        .with_delivery_mode(PERSISTENT_DELIVERY)
}

/// The channel runs in confirm mode, so anything but an ack is a lost event.
fn check_confirmation(confirmation: &Confirmation) -> Result<()> {
    match confirmation {
        Confirmation::Ack(_) => Ok(()),
        Confirmation::Nack(_) => Err(anyhow!("broker rejected event")),
        Confirmation::NotRequested => Err(anyhow!("publisher confirms are not enabled")),
    }
}

#[async_trait]
impl EventPublisher for AmqpEventPublisher {
    async fn publish(&self, routing_key: &str, payload: &Value) -> Result<()> {
        let body = serde_json::to_vec(payload).context("failed to encode event")?;
        let span = info_span!(
            "amqp.publish",
            messaging.system = "rabbitmq",
            messaging.destination = %self.exchange,
            messaging.routing_key = routing_key
        );

        async {
            let confirmation = self
                .channel
                .basic_publish(
                    &self.exchange,
                    routing_key,
                    BasicPublishOptions::default(),
                    &body,
                    publish_properties(),
                )
                .await
                .context("failed to publish event")?
                .await
                .context("broker did not confirm event")?;
            check_confirmation(&confirmation)
        }
        .instrument(span)
        .await
    }
}
