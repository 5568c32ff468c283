pub mod auth;
pub mod health;
pub mod types;
pub mod users;
pub mod validation;

// common functions for the handlers
use anyhow::anyhow;
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use std::{future::Future, time::Duration};
use tracing::error;

use crate::auth::AuthError;

pub(crate) fn bad_request(message: impl Into<String>) -> Response {
    (StatusCode::BAD_REQUEST, message.into()).into_response()
}

/// Map an engine error to its HTTP status. Internal details are logged and
/// never returned to the caller.
pub(crate) fn error_response(err: &AuthError) -> Response {
    let (status, message) = match err {
        AuthError::InvalidCredentials => (StatusCode::BAD_REQUEST, "Invalid credentials"),
        AuthError::UserAlreadyExists => (StatusCode::CONFLICT, "User already exists"),
        AuthError::UserNotExist => (StatusCode::NOT_FOUND, "User not found"),
        AuthError::SessionNotExists => (StatusCode::NOT_FOUND, "Session not found"),
        AuthError::ActivationTokenNotExists => {
            (StatusCode::NOT_FOUND, "Activation token not found")
        }
        AuthError::Internal(source) => {
            error!("Request failed: {source:#}");
            (StatusCode::INTERNAL_SERVER_ERROR, "Internal error")
        }
    };
    (status, message.to_string()).into_response()
}

/// Run an engine call under the per-request deadline. Hitting the deadline
/// drops the call at its next await point and reports `Internal`.
pub(crate) async fn with_deadline<T, F>(deadline: Duration, operation: F) -> Result<T, AuthError>
where
    F: Future<Output = Result<T, AuthError>>,
{
    tokio::time::timeout(deadline, operation)
        .await
        .map_err(|_| AuthError::Internal(anyhow!("request deadline of {deadline:?} exceeded")))?
}
