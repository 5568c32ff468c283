use crate::storage::StorageError;

/// Every failure the auth engine and the profile service can report.
#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    #[error("invalid credentials")]
    InvalidCredentials,
    #[error("user already exists")]
    UserAlreadyExists,
    #[error("user does not exist")]
    UserNotExist,
    #[error("session does not exist")]
    SessionNotExists,
    #[error("activation token does not exist")]
    ActivationTokenNotExists,
    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl AuthError {
    /// Wrap a store failure that has no meaning for the current operation.
    pub(crate) fn internal(err: StorageError, context: &'static str) -> Self {
        match err {
            StorageError::Other(source) => Self::Internal(source.context(context)),
            unexpected => Self::Internal(anyhow::Error::new(unexpected).context(context)),
        }
    }
}
