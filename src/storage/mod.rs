//! Store contracts consumed by the auth engine and the profile service.
//!
//! The credential store is durable and owns user rows; token stores are
//! expiring key-value namespaces. Implementations classify their own failures
//! into [`StorageError`] so callers never inspect driver errors.

use async_trait::async_trait;
use std::time::Duration;

use crate::domain::{Filters, Metadata, NewUser, Role, User};

pub mod memory;
pub mod postgres;
pub mod redis;

/// Key prefix for session tokens in the ephemeral store.
pub const SESSION_PREFIX: &str = "session:";
/// Key prefix for activation tokens in the ephemeral store.
pub const ACTIVATION_PREFIX: &str = "activation:";

#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("user already exists")]
    UserExists,
    #[error("user does not exist")]
    UserNotExists,
    #[error("token does not exist")]
    TokenNotExists,
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

pub type StorageResult<T> = Result<T, StorageError>;

/// Durable user records.
#[async_trait]
pub trait CredentialStore: Send + Sync {
    /// Insert a new, unactivated user and return its id.
    ///
    /// Returns [`StorageError::UserExists`] when the email is already taken.
    async fn save_user(&self, user: NewUser) -> StorageResult<i64>;

    /// Look up an **activated** user by email. Unactivated rows are reported
    /// as [`StorageError::UserNotExists`].
    async fn get_user_by_email(&self, email: &str) -> StorageResult<User>;

    async fn get_user_by_id(&self, user_id: i64) -> StorageResult<User>;

    /// Role of an activated user.
    async fn get_user_role(&self, user_id: i64) -> StorageResult<Role>;

    async fn activate_user(&self, user_id: i64) -> StorageResult<()>;
}

/// Profile maintenance on top of the credential store. Every method only
/// touches activated users.
#[async_trait]
pub trait ProfileStore: CredentialStore {
    async fn update_user(&self, user: &User) -> StorageResult<()>;

    async fn delete_user(&self, user_id: i64) -> StorageResult<()>;

    /// Case-insensitive substring search over email, first and last name.
    /// An empty query matches every activated user.
    async fn search_users(&self, query: &str, filters: Filters)
        -> StorageResult<(Vec<User>, Metadata)>;
}

/// Expiring token → user id mapping. One instance per namespace.
#[async_trait]
pub trait TokenStore: Send + Sync {
    async fn create(&self, token: &str, user_id: i64, ttl: Duration) -> StorageResult<()>;

    /// Returns [`StorageError::TokenNotExists`] for missing or expired tokens.
    async fn get(&self, token: &str) -> StorageResult<i64>;

    /// Idempotent: deleting a missing token is not an error.
    async fn delete(&self, token: &str) -> StorageResult<()>;
}
