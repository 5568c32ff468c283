//! Profile lookups and maintenance for activated users.

use std::sync::Arc;
use tracing::{info, instrument};

use crate::auth::AuthError;
use crate::domain::{Filters, Metadata, User, UserPatch};
use crate::storage::{ProfileStore, StorageError};

fn classify(err: StorageError, context: &'static str) -> AuthError {
    match err {
        StorageError::UserNotExists => AuthError::UserNotExist,
        err => AuthError::internal(err, context),
    }
}

#[derive(Clone)]
pub struct ProfileService {
    users: Arc<dyn ProfileStore>,
}

impl ProfileService {
    #[must_use]
    pub fn new(users: Arc<dyn ProfileStore>) -> Self {
        Self { users }
    }

    /// # Errors
    /// `UserNotExist` for unknown or unactivated users.
    #[instrument(skip(self))]
    pub async fn get_user(&self, user_id: i64) -> Result<User, AuthError> {
        let user = self
            .users
            .get_user_by_id(user_id)
            .await
            .map_err(|err| classify(err, "failed to load user"))?;
        if !user.activated {
            return Err(AuthError::UserNotExist);
        }
        Ok(user)
    }

    /// Apply the present fields of `patch` and return the user id.
    ///
    /// # Errors
    /// `UserNotExist` for unknown or unactivated users.
    #[instrument(skip(self))]
    pub async fn update_user(&self, user_id: i64, patch: UserPatch) -> Result<i64, AuthError> {
        let mut user = self.get_user(user_id).await?;
        patch.apply(&mut user);
        self.users
            .update_user(&user)
            .await
            .map_err(|err| classify(err, "failed to update user"))?;
        info!(user_id, "user profile updated");
        Ok(user.id)
    }

    /// # Errors
    /// `UserNotExist` for unknown or unactivated users.
    #[instrument(skip(self))]
    pub async fn delete_user(&self, user_id: i64) -> Result<(), AuthError> {
        self.users
            .delete_user(user_id)
            .await
            .map_err(|err| classify(err, "failed to delete user"))?;
        info!(user_id, "user deleted");
        Ok(())
    }

    /// # Errors
    /// `Internal` when the store fails.
    #[instrument(skip(self))]
    pub async fn search_users(
        &self,
        query: &str,
        filters: Filters,
    ) -> Result<(Vec<User>, Metadata), AuthError> {
        self.users
            .search_users(query.trim(), filters)
            .await
            .map_err(|err| AuthError::internal(err, "failed to search users"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::NewUser;
    use crate::storage::CredentialStore;
    use crate::storage::memory::MemoryUserStore;
    use anyhow::Result;

    fn new_user(email: &str, first_name: &str) -> NewUser {
        NewUser {
            email: email.to_string(),
            password_hash: b"hash".to_vec(),
            first_name: first_name.to_string(),
            last_name: "Turing".to_string(),
            barcode: "190001".to_string(),
            major: "Math".to_string(),
            group_name: "M-1901".to_string(),
            year: 4,
        }
    }

    async fn seeded() -> Result<(ProfileService, Arc<MemoryUserStore>, i64, i64)> {
        let store = Arc::new(MemoryUserStore::new());
        let active = store.save_user(new_user("alan@x.com", "Alan")).await?;
        store.activate_user(active).await?;
        let pending = store.save_user(new_user("joan@x.com", "Joan")).await?;
        Ok((ProfileService::new(store.clone()), store, active, pending))
    }

    #[tokio::test]
    async fn get_hides_unactivated_users() -> Result<()> {
        let (service, _, active, pending) = seeded().await?;
        assert_eq!(service.get_user(active).await?.email, "alan@x.com");
        assert!(matches!(
            service.get_user(pending).await,
            Err(AuthError::UserNotExist)
        ));
        assert!(matches!(
            service.get_user(404).await,
            Err(AuthError::UserNotExist)
        ));
        Ok(())
    }

    #[tokio::test]
    async fn update_applies_patch() -> Result<()> {
        let (service, store, active, pending) = seeded().await?;
        let patch = UserPatch {
            last_name: Some("Mathison".to_string()),
            year: Some(5),
            phone_number: Some("+44 20 0000 0000".to_string()),
            ..UserPatch::default()
        };
        assert_eq!(service.update_user(active, patch.clone()).await?, active);

        let stored = store.get_user_by_id(active).await?;
        assert_eq!(stored.last_name, "Mathison");
        assert_eq!(stored.first_name, "Alan");
        assert_eq!(stored.year, 5);
        assert_eq!(stored.phone_number.as_deref(), Some("+44 20 0000 0000"));

        assert!(matches!(
            service.update_user(pending, patch).await,
            Err(AuthError::UserNotExist)
        ));
        Ok(())
    }

    #[tokio::test]
    async fn delete_then_get() -> Result<()> {
        let (service, _, active, _) = seeded().await?;
        service.delete_user(active).await?;
        assert!(matches!(
            service.get_user(active).await,
            Err(AuthError::UserNotExist)
        ));
        assert!(matches!(
            service.delete_user(active).await,
            Err(AuthError::UserNotExist)
        ));
        Ok(())
    }

    #[tokio::test]
    async fn search_only_returns_activated_users() -> Result<()> {
        let (service, _, active, _) = seeded().await?;
        let (users, metadata) = service.search_users("  ", Filters::new(1, 10)).await?;
        assert_eq!(users.iter().map(|user| user.id).collect::<Vec<_>>(), vec![active]);
        assert_eq!(metadata.total_records, 1);

        let (users, metadata) = service.search_users("joan", Filters::new(1, 10)).await?;
        assert!(users.is_empty());
        assert_eq!(metadata, Metadata::default());
        Ok(())
    }
}
