use anyhow::Context;
use secrecy::SecretString;
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};

use super::{AuthConfig, AuthError, password, token};
use crate::domain::{NewUser, Registration, Role};
use crate::events::{EventPublisher, USER_REGISTERED_ROUTING_KEY, UserRegistered};
use crate::storage::{CredentialStore, StorageError, TokenStore};

/// Trim and lowercase an email before it reaches a store.
#[must_use]
pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

/// Registration, activation and session authority.
///
/// Holds no mutable state of its own; every call goes straight to the
/// injected stores, so one instance is shared by all requests.
#[derive(Clone)]
pub struct AuthService {
    users: Arc<dyn CredentialStore>,
    sessions: Arc<dyn TokenStore>,
    activations: Arc<dyn TokenStore>,
    events: Arc<dyn EventPublisher>,
    config: AuthConfig,
}

impl AuthService {
    #[must_use]
    pub fn new(
        users: Arc<dyn CredentialStore>,
        sessions: Arc<dyn TokenStore>,
        activations: Arc<dyn TokenStore>,
        events: Arc<dyn EventPublisher>,
        config: AuthConfig,
    ) -> Self {
        Self {
            users,
            sessions,
            activations,
            events,
            config,
        }
    }

    #[must_use]
    pub fn config(&self) -> &AuthConfig {
        &self.config
    }

    /// Create an unactivated user, store its activation token and announce
    /// the registration. Returns the new user id.
    ///
    /// Steps run in order and are not rolled back: if the token or the event
    /// fails, the user row stays committed.
    ///
    /// # Errors
    /// `UserAlreadyExists` when the email is taken, `Internal` otherwise.
    #[instrument(skip_all, fields(email = %registration.email))]
    pub async fn register(&self, registration: Registration) -> Result<i64, AuthError> {
        let Registration {
            first_name,
            last_name,
            email,
            password,
            barcode,
            major,
            group_name,
            year,
        } = registration;
        let email = normalize_email(&email);

        let password_hash = password::hash(password, self.config.bcrypt_cost()).await?;

        let user_id = self
            .users
            .save_user(NewUser {
                email: email.clone(),
                password_hash,
                first_name: first_name.clone(),
                last_name: last_name.clone(),
                barcode,
                major,
                group_name,
                year,
            })
            .await
            .map_err(|err| match err {
                StorageError::UserExists => AuthError::UserAlreadyExists,
                err => AuthError::internal(err, "failed to save user"),
            })?;

        let activation_token = token::generate(token::ACTIVATION_TOKEN_BYTES)?;
        self.activations
            .create(&activation_token, user_id, self.config.activation_ttl())
            .await
            .map_err(|err| AuthError::internal(err, "failed to store activation token"))?;

        let event = UserRegistered {
            first_name,
            last_name,
            email,
            token: activation_token,
        };
        let payload = serde_json::to_value(&event).context("failed to encode user.registered")?;
        self.events
            .publish(USER_REGISTERED_ROUTING_KEY, &payload)
            .await
            .context("failed to publish user.registered")?;

        info!(user_id, "user registered");
        Ok(user_id)
    }

    /// Verify credentials of an activated user and open a session.
    ///
    /// # Errors
    /// `UserNotExist` for unknown or unactivated emails, `InvalidCredentials`
    /// on a password mismatch, `Internal` otherwise.
    #[instrument(skip_all)]
    pub async fn login(&self, email: &str, password: SecretString) -> Result<String, AuthError> {
        let user = self
            .users
            .get_user_by_email(&normalize_email(email))
            .await
            .map_err(|err| match err {
                StorageError::UserNotExists => AuthError::UserNotExist,
                err => AuthError::internal(err, "failed to load user"),
            })?;

        if !password::verify(password, user.password_hash).await? {
            debug!(user_id = user.id, "password mismatch");
            return Err(AuthError::InvalidCredentials);
        }

        let session_token = token::generate(token::SESSION_TOKEN_BYTES)?;
        self.sessions
            .create(&session_token, user.id, self.config.session_ttl())
            .await
            .map_err(|err| AuthError::internal(err, "failed to store session"))?;

        info!(user_id = user.id, "user logged in");
        Ok(session_token)
    }

    /// End a session. Unknown tokens are fine.
    ///
    /// # Errors
    /// `Internal` when the token store fails.
    #[instrument(skip_all)]
    pub async fn logout(&self, session_token: &str) -> Result<(), AuthError> {
        self.sessions
            .delete(session_token)
            .await
            .map_err(|err| AuthError::internal(err, "failed to delete session"))
    }

    /// Resolve a session token to its user id.
    ///
    /// # Errors
    /// `SessionNotExists` for missing or expired sessions.
    #[instrument(skip_all)]
    pub async fn authenticate(&self, session_token: &str) -> Result<i64, AuthError> {
        self.sessions
            .get(session_token)
            .await
            .map_err(|err| match err {
                StorageError::TokenNotExists => AuthError::SessionNotExists,
                err => AuthError::internal(err, "failed to read session"),
            })
    }

    /// Exact-match role check against the stored role; no hierarchy.
    ///
    /// # Errors
    /// `UserNotExist` for unknown or unactivated users.
    #[instrument(skip(self))]
    pub async fn check_user_role(&self, user_id: i64, roles: &[Role]) -> Result<bool, AuthError> {
        let role = self
            .users
            .get_user_role(user_id)
            .await
            .map_err(|err| match err {
                StorageError::UserNotExists => AuthError::UserNotExist,
                err => AuthError::internal(err, "failed to load user role"),
            })?;
        Ok(roles.contains(&role))
    }

    /// Redeem an activation token. The token is removed afterwards on a
    /// best-effort basis; the TTL reclaims it if the delete fails.
    ///
    /// # Errors
    /// `ActivationTokenNotExists` for unknown or expired tokens,
    /// `UserNotExist` when the user row is gone.
    #[instrument(skip_all)]
    pub async fn activate_user(&self, activation_token: &str) -> Result<(), AuthError> {
        let user_id = self
            .activations
            .get(activation_token)
            .await
            .map_err(|err| match err {
                StorageError::TokenNotExists => AuthError::ActivationTokenNotExists,
                err => AuthError::internal(err, "failed to read activation token"),
            })?;

        self.users
            .activate_user(user_id)
            .await
            .map_err(|err| match err {
                StorageError::UserNotExists => AuthError::UserNotExist,
                err => AuthError::internal(err, "failed to activate user"),
            })?;

        if let Err(err) = self.activations.delete(activation_token).await {
            warn!(user_id, "failed to delete activation token: {err}");
        }

        info!(user_id, "user activated");
        Ok(())
    }
}
