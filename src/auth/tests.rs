//! Engine tests against the in-memory stores.

use super::{AuthConfig, AuthError, AuthService};
use crate::domain::{Registration, Role};
use crate::events::{EventPublisher, MemoryEventPublisher, USER_REGISTERED_ROUTING_KEY};
use crate::storage::memory::{MemoryTokenStore, MemoryUserStore};
use crate::storage::{StorageError, StorageResult, TokenStore};
use anyhow::{Context, Result, anyhow};
use async_trait::async_trait;
use secrecy::SecretString;
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;

struct Harness {
    service: AuthService,
    users: Arc<MemoryUserStore>,
    sessions: Arc<MemoryTokenStore>,
    activations: Arc<MemoryTokenStore>,
    events: Arc<MemoryEventPublisher>,
}

impl Harness {
    fn new() -> Self {
        Self::with_config(AuthConfig::new().with_bcrypt_cost(4))
    }

    fn with_config(config: AuthConfig) -> Self {
        let users = Arc::new(MemoryUserStore::new());
        let sessions = Arc::new(MemoryTokenStore::new());
        let activations = Arc::new(MemoryTokenStore::new());
        let events = Arc::new(MemoryEventPublisher::new());
        let service = AuthService::new(
            users.clone(),
            sessions.clone(),
            activations.clone(),
            events.clone(),
            config,
        );
        Self {
            service,
            users,
            sessions,
            activations,
            events,
        }
    }

    async fn activation_token(&self, email: &str) -> Result<String> {
        self.events
            .last_registration(email)
            .await
            .map(|event| event.token)
            .context("no user.registered event for email")
    }

    /// Register and activate, returning the user id.
    async fn activated_user(&self, email: &str, password: &str) -> Result<i64> {
        let user_id = self.service.register(registration(email, password)).await?;
        let token = self.activation_token(email).await?;
        self.service.activate_user(&token).await?;
        Ok(user_id)
    }
}

fn registration(email: &str, password: &str) -> Registration {
    Registration {
        first_name: "Ada".to_string(),
        last_name: "Lovelace".to_string(),
        email: email.to_string(),
        password: SecretString::from(password.to_string()),
        barcode: "210107".to_string(),
        major: "Computer Science".to_string(),
        group_name: "CS-2101".to_string(),
        year: 2,
    }
}

fn secret(value: &str) -> SecretString {
    SecretString::from(value.to_string())
}

struct FailingPublisher;

#[async_trait]
impl EventPublisher for FailingPublisher {
    async fn publish(&self, _routing_key: &str, _payload: &Value) -> Result<()> {
        Err(anyhow!("broker unavailable"))
    }
}

/// Reads work, deletes always fail.
struct StickyTokenStore {
    inner: MemoryTokenStore,
}

#[async_trait]
impl TokenStore for StickyTokenStore {
    async fn create(&self, token: &str, user_id: i64, ttl: Duration) -> StorageResult<()> {
        self.inner.create(token, user_id, ttl).await
    }

    async fn get(&self, token: &str) -> StorageResult<i64> {
        self.inner.get(token).await
    }

    async fn delete(&self, _token: &str) -> StorageResult<()> {
        Err(StorageError::Other(anyhow!("connection reset")))
    }
}

/// Every write fails; reads find nothing.
struct BrokenTokenStore;

#[async_trait]
impl TokenStore for BrokenTokenStore {
    async fn create(&self, _token: &str, _user_id: i64, _ttl: Duration) -> StorageResult<()> {
        Err(StorageError::Other(anyhow!("redis down")))
    }

    async fn get(&self, _token: &str) -> StorageResult<i64> {
        Err(StorageError::TokenNotExists)
    }

    async fn delete(&self, _token: &str) -> StorageResult<()> {
        Err(StorageError::Other(anyhow!("redis down")))
    }
}

#[tokio::test]
async fn register_publishes_activation_token() -> Result<()> {
    let harness = Harness::new();
    let user_id = harness
        .service
        .register(registration("  Ada@Example.COM ", "password1"))
        .await?;

    let events = harness.events.published().await;
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].routing_key, USER_REGISTERED_ROUTING_KEY);

    let event = harness
        .events
        .last_registration("ada@example.com")
        .await
        .context("missing event")?;
    assert_eq!(event.first_name, "Ada");
    assert_eq!(event.last_name, "Lovelace");
    assert_eq!(event.token.len(), 32);
    assert_eq!(harness.activations.get(&event.token).await?, user_id);
    Ok(())
}

#[tokio::test]
async fn login_requires_activation() -> Result<()> {
    let harness = Harness::new();
    harness
        .service
        .register(registration("ada@example.com", "password1"))
        .await?;

    let before = harness
        .service
        .login("ada@example.com", secret("password1"))
        .await;
    assert!(matches!(before, Err(AuthError::UserNotExist)));

    let token = harness.activation_token("ada@example.com").await?;
    harness.service.activate_user(&token).await?;

    let session = harness
        .service
        .login("ADA@example.com", secret("password1"))
        .await?;
    assert_eq!(session.len(), 64);
    Ok(())
}

#[tokio::test]
async fn login_rejects_wrong_password() -> Result<()> {
    let harness = Harness::new();
    harness
        .activated_user("ada@example.com", "password1")
        .await?;

    let result = harness
        .service
        .login("ada@example.com", secret("password2"))
        .await;
    assert!(matches!(result, Err(AuthError::InvalidCredentials)));
    assert!(harness.sessions.is_empty().await);
    Ok(())
}

#[tokio::test]
async fn login_unknown_email() {
    let harness = Harness::new();
    let result = harness
        .service
        .login("nobody@example.com", secret("password1"))
        .await;
    assert!(matches!(result, Err(AuthError::UserNotExist)));
}

#[tokio::test]
async fn concurrent_registrations_with_same_email() -> Result<()> {
    let harness = Harness::new();
    let (first, second) = tokio::join!(
        harness
            .service
            .register(registration("twin@example.com", "password1")),
        harness
            .service
            .register(registration("TWIN@example.com", "password2")),
    );

    let outcomes = [first, second];
    let successes = outcomes.iter().filter(|outcome| outcome.is_ok()).count();
    let conflicts = outcomes
        .iter()
        .filter(|outcome| matches!(outcome, Err(AuthError::UserAlreadyExists)))
        .count();
    assert_eq!(successes, 1);
    assert_eq!(conflicts, 1);
    assert_eq!(harness.events.published().await.len(), 1);
    Ok(())
}

#[tokio::test]
async fn authenticate_until_logout() -> Result<()> {
    let harness = Harness::new();
    let user_id = harness
        .activated_user("ada@example.com", "password1")
        .await?;
    let session = harness
        .service
        .login("ada@example.com", secret("password1"))
        .await?;

    for _ in 0..3 {
        assert_eq!(harness.service.authenticate(&session).await?, user_id);
    }

    harness.service.logout(&session).await?;
    assert!(matches!(
        harness.service.authenticate(&session).await,
        Err(AuthError::SessionNotExists)
    ));

    // logout is idempotent
    harness.service.logout(&session).await?;
    harness.service.logout("never-issued").await?;
    Ok(())
}

#[tokio::test]
async fn sessions_expire_with_ttl() -> Result<()> {
    let harness = Harness::with_config(
        AuthConfig::new()
            .with_bcrypt_cost(4)
            .with_session_ttl_seconds(1),
    );
    harness
        .activated_user("ada@example.com", "password1")
        .await?;
    let session = harness
        .service
        .login("ada@example.com", secret("password1"))
        .await?;
    assert!(harness.service.authenticate(&session).await.is_ok());

    tokio::time::sleep(Duration::from_millis(1100)).await;
    assert!(matches!(
        harness.service.authenticate(&session).await,
        Err(AuthError::SessionNotExists)
    ));
    Ok(())
}

#[tokio::test]
async fn activation_token_is_single_use() -> Result<()> {
    let harness = Harness::new();
    harness
        .service
        .register(registration("ada@example.com", "password1"))
        .await?;
    let token = harness.activation_token("ada@example.com").await?;

    harness.service.activate_user(&token).await?;
    assert!(matches!(
        harness.service.activate_user(&token).await,
        Err(AuthError::ActivationTokenNotExists)
    ));
    assert!(harness.activations.is_empty().await);
    Ok(())
}

#[tokio::test]
async fn activation_survives_failed_token_delete() -> Result<()> {
    let users = Arc::new(MemoryUserStore::new());
    let activations = Arc::new(StickyTokenStore {
        inner: MemoryTokenStore::new(),
    });
    let events = Arc::new(MemoryEventPublisher::new());
    let service = AuthService::new(
        users.clone(),
        Arc::new(MemoryTokenStore::new()),
        activations.clone(),
        events.clone(),
        AuthConfig::new().with_bcrypt_cost(4),
    );

    let user_id = service
        .register(registration("ada@example.com", "password1"))
        .await?;
    let token = events
        .last_registration("ada@example.com")
        .await
        .map(|event| event.token)
        .context("missing event")?;

    service.activate_user(&token).await?;
    assert!(service.check_user_role(user_id, &[Role::User]).await?);
    Ok(())
}

#[tokio::test]
async fn check_role_is_exact_match() -> Result<()> {
    let harness = Harness::new();
    let user_id = harness
        .activated_user("ada@example.com", "password1")
        .await?;

    assert!(harness.service.check_user_role(user_id, &[Role::User]).await?);
    assert!(!harness.service.check_user_role(user_id, &[Role::Admin]).await?);

    harness.users.set_role(user_id, Role::Admin).await?;
    assert!(harness.service.check_user_role(user_id, &[Role::Admin]).await?);
    assert!(
        harness
            .service
            .check_user_role(user_id, &[Role::Guest, Role::Admin])
            .await?
    );

    harness.users.set_role(user_id, Role::Moder).await?;
    assert!(!harness.service.check_user_role(user_id, &[Role::Admin]).await?);
    Ok(())
}

#[tokio::test]
async fn check_role_unknown_user() {
    let harness = Harness::new();
    assert!(matches!(
        harness.service.check_user_role(99, &[Role::User]).await,
        Err(AuthError::UserNotExist)
    ));
}

#[tokio::test]
async fn register_fails_when_event_cannot_be_published() -> Result<()> {
    let users = Arc::new(MemoryUserStore::new());
    let service = AuthService::new(
        users.clone(),
        Arc::new(MemoryTokenStore::new()),
        Arc::new(MemoryTokenStore::new()),
        Arc::new(FailingPublisher),
        AuthConfig::new().with_bcrypt_cost(4),
    );

    let result = service
        .register(registration("ada@example.com", "password1"))
        .await;
    assert!(matches!(result, Err(AuthError::Internal(_))));

    // no compensation: the row is committed and the email stays taken
    let retry = service
        .register(registration("ada@example.com", "password1"))
        .await;
    assert!(matches!(retry, Err(AuthError::UserAlreadyExists)));
    Ok(())
}

#[tokio::test]
async fn full_scenario() -> Result<()> {
    let harness = Harness::new();
    let user_id = harness
        .service
        .register(registration("grace@example.com", "navy-cobol"))
        .await?;
    let token = harness.activation_token("grace@example.com").await?;
    harness.service.activate_user(&token).await?;

    let session = harness
        .service
        .login("grace@example.com", secret("navy-cobol"))
        .await?;
    assert_eq!(harness.service.authenticate(&session).await?, user_id);

    harness.service.logout(&session).await?;
    assert!(matches!(
        harness.service.authenticate(&session).await,
        Err(AuthError::SessionNotExists)
    ));
    Ok(())
}

#[tokio::test]
async fn register_fails_when_activation_token_cannot_be_stored() -> Result<()> {
    let users = Arc::new(MemoryUserStore::new());
    let events = Arc::new(MemoryEventPublisher::new());
    let service = AuthService::new(
        users.clone(),
        Arc::new(MemoryTokenStore::new()),
        Arc::new(BrokenTokenStore),
        events.clone(),
        AuthConfig::new().with_bcrypt_cost(4),
    );

    let result = service
        .register(registration("ada@example.com", "password1"))
        .await;
    assert!(matches!(result, Err(AuthError::Internal(_))));
    assert!(events.published().await.is_empty());

    let retry = service
        .register(registration("ada@example.com", "password1"))
        .await;
    assert!(matches!(retry, Err(AuthError::UserAlreadyExists)));
    Ok(())
}

#[tokio::test]
async fn register_hash_failure_persists_nothing() -> Result<()> {
    let users = Arc::new(MemoryUserStore::new());
    let events = Arc::new(MemoryEventPublisher::new());
    let broken = AuthService::new(
        users.clone(),
        Arc::new(MemoryTokenStore::new()),
        Arc::new(MemoryTokenStore::new()),
        events.clone(),
        AuthConfig::new().with_bcrypt_cost(99),
    );

    let result = broken
        .register(registration("ada@example.com", "password1"))
        .await;
    assert!(matches!(result, Err(AuthError::Internal(_))));
    assert!(events.published().await.is_empty());

    // the email was never taken
    let working = AuthService::new(
        users,
        Arc::new(MemoryTokenStore::new()),
        Arc::new(MemoryTokenStore::new()),
        events,
        AuthConfig::new().with_bcrypt_cost(4),
    );
    working
        .register(registration("ada@example.com", "password1"))
        .await?;
    Ok(())
}

#[tokio::test]
async fn register_rejects_password_beyond_bcrypt_input() -> Result<()> {
    let harness = Harness::new();
    let long = format!("{}a", "\u{e9}".repeat(36));
    assert_eq!(long.len(), 73);

    let result = harness
        .service
        .register(registration("long@example.com", &long))
        .await;
    assert!(matches!(result, Err(AuthError::Internal(_))));
    assert!(harness.events.published().await.is_empty());
    Ok(())
}

#[tokio::test]
async fn login_does_not_truncate_long_passwords() -> Result<()> {
    let harness = Harness::new();
    let stored = "\u{e9}".repeat(36);
    assert_eq!(stored.len(), 72);
    harness.activated_user("ada@example.com", &stored).await?;

    for attempt in [format!("{stored}a"), format!("{stored}b")] {
        let result = harness.service.login("ada@example.com", secret(&attempt)).await;
        assert!(matches!(result, Err(AuthError::InvalidCredentials)));
    }
    assert!(harness.service.login("ada@example.com", secret(&stored)).await.is_ok());
    Ok(())
}

#[tokio::test]
async fn token_namespaces_are_not_interchangeable() -> Result<()> {
    let harness = Harness::new();
    harness
        .service
        .register(registration("ada@example.com", "password1"))
        .await?;
    let activation_token = harness.activation_token("ada@example.com").await?;

    assert!(matches!(
        harness.service.authenticate(&activation_token).await,
        Err(AuthError::SessionNotExists)
    ));

    harness.service.activate_user(&activation_token).await?;
    let session = harness
        .service
        .login("ada@example.com", secret("password1"))
        .await?;
    assert!(matches!(
        harness.service.activate_user(&session).await,
        Err(AuthError::ActivationTokenNotExists)
    ));
    Ok(())
}

#[tokio::test]
async fn login_fails_when_session_cannot_be_stored() -> Result<()> {
    let users = Arc::new(MemoryUserStore::new());
    let events = Arc::new(MemoryEventPublisher::new());
    let service = AuthService::new(
        users,
        Arc::new(BrokenTokenStore),
        Arc::new(MemoryTokenStore::new()),
        events.clone(),
        AuthConfig::new().with_bcrypt_cost(4),
    );

    service
        .register(registration("ada@example.com", "password1"))
        .await?;
    let token = events
        .last_registration("ada@example.com")
        .await
        .map(|event| event.token)
        .context("missing event")?;
    service.activate_user(&token).await?;

    let result = service.login("ada@example.com", secret("password1")).await;
    assert!(matches!(result, Err(AuthError::Internal(_))));
    Ok(())
}
