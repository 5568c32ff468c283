//! In-process stores for local runs and tests.
//!
//! They honor the same contracts as the `PostgreSQL` and `Redis` stores:
//! case-insensitive unique emails, activated-only lookups and expiring tokens.

use anyhow::anyhow;
use async_trait::async_trait;
use std::collections::{BTreeMap, HashMap};
use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};
use tokio::sync::Mutex;

use super::{CredentialStore, ProfileStore, StorageError, StorageResult, TokenStore};
use crate::domain::{Filters, Metadata, NewUser, Role, User};

#[derive(Default)]
struct Users {
    next_id: i64,
    rows: BTreeMap<i64, User>,
}

#[derive(Default)]
pub struct MemoryUserStore {
    users: Mutex<Users>,
}

impl MemoryUserStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Overwrite a user's role; there is no API for this, so tests and local
    /// seeding go through here.
    pub async fn set_role(&self, user_id: i64, role: Role) -> StorageResult<()> {
        let mut users = self.users.lock().await;
        let user = users
            .rows
            .get_mut(&user_id)
            .ok_or(StorageError::UserNotExists)?;
        user.role = role;
        Ok(())
    }
}

fn now_unix() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_or(0, |elapsed| i64::try_from(elapsed.as_secs()).unwrap_or(i64::MAX))
}

fn matches_query(user: &User, needle: &str) -> bool {
    needle.is_empty()
        || [&user.email, &user.first_name, &user.last_name]
            .iter()
            .any(|field| field.to_lowercase().contains(needle))
}

#[async_trait]
impl CredentialStore for MemoryUserStore {
    async fn save_user(&self, user: NewUser) -> StorageResult<i64> {
        let mut users = self.users.lock().await;
        let email = user.email.to_lowercase();
        if users
            .rows
            .values()
            .any(|existing| existing.email.to_lowercase() == email)
        {
            return Err(StorageError::UserExists);
        }

        users.next_id += 1;
        let id = users.next_id;
        users.rows.insert(
            id,
            User {
                id,
                email: user.email,
                password_hash: user.password_hash,
                first_name: user.first_name,
                last_name: user.last_name,
                role: Role::User,
                activated: false,
                created_at_unix: now_unix(),
                barcode: user.barcode,
                major: user.major,
                group_name: user.group_name,
                year: user.year,
                phone_number: None,
                avatar_url: None,
            },
        );
        Ok(id)
    }

    async fn get_user_by_email(&self, email: &str) -> StorageResult<User> {
        let email = email.to_lowercase();
        let users = self.users.lock().await;
        users
            .rows
            .values()
            .find(|user| user.activated && user.email.to_lowercase() == email)
            .cloned()
            .ok_or(StorageError::UserNotExists)
    }

    async fn get_user_by_id(&self, user_id: i64) -> StorageResult<User> {
        let users = self.users.lock().await;
        users
            .rows
            .get(&user_id)
            .cloned()
            .ok_or(StorageError::UserNotExists)
    }

    async fn get_user_role(&self, user_id: i64) -> StorageResult<Role> {
        let users = self.users.lock().await;
        users
            .rows
            .get(&user_id)
            .filter(|user| user.activated)
            .map(|user| user.role)
            .ok_or(StorageError::UserNotExists)
    }

    async fn activate_user(&self, user_id: i64) -> StorageResult<()> {
        let mut users = self.users.lock().await;
        let user = users
            .rows
            .get_mut(&user_id)
            .ok_or(StorageError::UserNotExists)?;
        user.activated = true;
        Ok(())
    }
}

#[async_trait]
impl ProfileStore for MemoryUserStore {
    async fn update_user(&self, user: &User) -> StorageResult<()> {
        let mut users = self.users.lock().await;
        let stored = users
            .rows
            .get_mut(&user.id)
            .filter(|stored| stored.activated)
            .ok_or(StorageError::UserNotExists)?;
        stored.first_name.clone_from(&user.first_name);
        stored.last_name.clone_from(&user.last_name);
        stored.phone_number.clone_from(&user.phone_number);
        stored.major.clone_from(&user.major);
        stored.group_name.clone_from(&user.group_name);
        stored.year = user.year;
        stored.avatar_url.clone_from(&user.avatar_url);
        Ok(())
    }

    async fn delete_user(&self, user_id: i64) -> StorageResult<()> {
        let mut users = self.users.lock().await;
        match users.rows.get(&user_id) {
            Some(user) if user.activated => {
                users.rows.remove(&user_id);
                Ok(())
            }
            _ => Err(StorageError::UserNotExists),
        }
    }

    async fn search_users(
        &self,
        query: &str,
        filters: Filters,
    ) -> StorageResult<(Vec<User>, Metadata)> {
        let needle = query.to_lowercase();
        let users = self.users.lock().await;
        let matching: Vec<&User> = users
            .rows
            .values()
            .filter(|user| user.activated && matches_query(user, &needle))
            .collect();

        let total_records = matching.len() as u64;
        let offset = usize::try_from(filters.offset()).unwrap_or(usize::MAX);
        let limit = usize::try_from(filters.limit()).unwrap_or(usize::MAX);
        let page = matching
            .into_iter()
            .skip(offset)
            .take(limit)
            .cloned()
            .collect();

        Ok((page, Metadata::calculate(total_records, filters)))
    }
}

struct TokenEntry {
    user_id: i64,
    expires_at: Instant,
}

/// Expiring token map. Use one instance per namespace.
#[derive(Default)]
pub struct MemoryTokenStore {
    tokens: Mutex<HashMap<String, TokenEntry>>,
}

impl MemoryTokenStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of live (unexpired) tokens.
    pub async fn len(&self) -> usize {
        let tokens = self.tokens.lock().await;
        let now = Instant::now();
        tokens.values().filter(|entry| entry.expires_at > now).count()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

#[async_trait]
impl TokenStore for MemoryTokenStore {
    async fn create(&self, token: &str, user_id: i64, ttl: Duration) -> StorageResult<()> {
        let mut tokens = self.tokens.lock().await;
        let now = Instant::now();
        let expires_at = now
            .checked_add(ttl)
            .ok_or_else(|| StorageError::Other(anyhow!("token ttl of {ttl:?} is out of range")))?;
        tokens.retain(|_, entry| entry.expires_at > now);
        tokens.insert(token.to_string(), TokenEntry { user_id, expires_at });
        Ok(())
    }

    async fn get(&self, token: &str) -> StorageResult<i64> {
        let tokens = self.tokens.lock().await;
        match tokens.get(token) {
            Some(entry) if entry.expires_at > Instant::now() => Ok(entry.user_id),
            _ => Err(StorageError::TokenNotExists),
        }
    }

    async fn delete(&self, token: &str) -> StorageResult<()> {
        self.tokens.lock().await.remove(token);
        Ok(())
    }
}
