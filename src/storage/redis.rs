//! `Redis` token store. Each instance owns one key prefix, so session and
//! activation tokens never share a key space even on the same server.

use anyhow::{Context, Result};
use async_trait::async_trait;
use redis::{AsyncCommands, aio::ConnectionManager};
use std::time::Duration;
use tracing::Instrument;

use super::{StorageError, StorageResult, TokenStore};

/// Open a reconnecting connection to `Redis`.
///
/// # Errors
/// Returns an error if the URL is invalid or the server is unreachable.
pub async fn connect(url: &str) -> Result<ConnectionManager> {
    let client = redis::Client::open(url).context("invalid redis url")?;
    ConnectionManager::new(client)
        .await
        .context("failed to connect to redis")
}

#[derive(Clone)]
pub struct RedisTokenStore {
    connection: ConnectionManager,
    prefix: String,
}

impl RedisTokenStore {
    #[must_use]
    pub fn new(connection: ConnectionManager, prefix: impl Into<String>) -> Self {
        Self {
            connection,
            prefix: prefix.into(),
        }
    }

    fn key(&self, token: &str) -> String {
        namespaced_key(&self.prefix, token)
    }
}

fn namespaced_key(prefix: &str, token: &str) -> String {
    format!("{prefix}{token}")
}

fn redis_span(command: &'static str, prefix: &str) -> tracing::Span {
    tracing::info_span!(
        "redis.command",
        db.system = "redis",
        db.operation = command,
        key.prefix = prefix
    )
}

#[async_trait]
impl TokenStore for RedisTokenStore {
    async fn create(&self, token: &str, user_id: i64, ttl: Duration) -> StorageResult<()> {
        let mut connection = self.connection.clone();
        // SETEX rejects a zero expiry.
        let seconds = ttl.as_secs().max(1);
        connection
            .set_ex::<_, _, ()>(self.key(token), user_id, seconds)
            .instrument(redis_span("SETEX", &self.prefix))
            .await
            .context("failed to store token")?;
        Ok(())
    }

    async fn get(&self, token: &str) -> StorageResult<i64> {
        let mut connection = self.connection.clone();
        let user_id: Option<i64> = connection
            .get(self.key(token))
            .instrument(redis_span("GET", &self.prefix))
            .await
            .context("failed to read token")?;
        user_id.ok_or(StorageError::TokenNotExists)
    }

    async fn delete(&self, token: &str) -> StorageResult<()> {
        let mut connection = self.connection.clone();
        connection
            .del::<_, ()>(self.key(token))
            .instrument(redis_span("DEL", &self.prefix))
            .await
            .context("failed to delete token")?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::namespaced_key;
    use crate::storage::{ACTIVATION_PREFIX, SESSION_PREFIX};

    #[test]
    fn namespaces_do_not_collide() {
        let token = "00ff";
        let session = namespaced_key(SESSION_PREFIX, token);
        let activation = namespaced_key(ACTIVATION_PREFIX, token);
        assert_eq!(session, "session:00ff");
        assert_eq!(activation, "activation:00ff");
        assert_ne!(session, activation);
    }
}
