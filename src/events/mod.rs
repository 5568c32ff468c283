//! Domain events published to the message broker.
//!
//! The engine only sees [`EventPublisher`]; production wires the `AMQP`
//! publisher from [`amqp`], local runs log events with [`LogEventPublisher`].

use anyhow::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::sync::Mutex;
use tracing::info;

pub mod amqp;

/// Routing key for registration events; matches the notification queue's
/// `user.notification.*` binding.
pub const USER_REGISTERED_ROUTING_KEY: &str = "user.notification.registered";

/// Payload sent after a successful registration so the notification service
/// can mail the activation link.
#[derive(Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct UserRegistered {
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub token: String,
}

impl std::fmt::Debug for UserRegistered {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UserRegistered")
            .field("first_name", &self.first_name)
            .field("last_name", &self.last_name)
            .field("email", &self.email)
            .field("token", &"***")
            .finish()
    }
}

#[async_trait]
pub trait EventPublisher: Send + Sync {
    /// Publish a JSON payload under `routing_key`.
    async fn publish(&self, routing_key: &str, payload: &Value) -> Result<()>;
}

/// Local dev publisher that logs events instead of sending them.
#[derive(Clone, Debug)]
pub struct LogEventPublisher;

#[async_trait]
impl EventPublisher for LogEventPublisher {
    async fn publish(&self, routing_key: &str, payload: &Value) -> Result<()> {
        info!(routing_key, email = recipient(payload), "event logged, not delivered");
        Ok(())
    }
}

/// Payloads carry activation tokens; only the recipient is safe to log.
fn recipient(payload: &Value) -> &str {
    payload
        .get("email")
        .and_then(Value::as_str)
        .unwrap_or("unknown")
}

#[derive(Clone, Debug, PartialEq)]
pub struct PublishedEvent {
    pub routing_key: String,
    pub payload: Value,
}

/// Keeps every published event in memory.
#[derive(Debug, Default)]
pub struct MemoryEventPublisher {
    events: Mutex<Vec<PublishedEvent>>,
}

impl MemoryEventPublisher {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn published(&self) -> Vec<PublishedEvent> {
        self.events.lock().await.clone()
    }

    /// Most recent registration event sent to `email`, if any.
    pub async fn last_registration(&self, email: &str) -> Option<UserRegistered> {
        let events = self.events.lock().await;
        events
            .iter()
            .rev()
            .filter(|event| event.routing_key == USER_REGISTERED_ROUTING_KEY)
            .filter_map(|event| serde_json::from_value::<UserRegistered>(event.payload.clone()).ok())
            .find(|event| event.email == email)
    }
}

#[async_trait]
impl EventPublisher for MemoryEventPublisher {
    async fn publish(&self, routing_key: &str, payload: &Value) -> Result<()> {
        self.events.lock().await.push(PublishedEvent {
            routing_key: routing_key.to_string(),
            payload: payload.clone(),
        });
        Ok(())
    }
}
