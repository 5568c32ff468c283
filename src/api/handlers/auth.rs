//! Registration, activation and session endpoints.

use axum::{Json, extract::Extension, http::StatusCode, response::IntoResponse};
use secrecy::SecretString;
use std::sync::Arc;
use tracing::debug;

use super::types::{
    ActivateRequest, AuthenticateResponse, CheckRoleRequest, CheckRoleResponse, LoginRequest,
    LoginResponse, RegisterRequest, RegisterResponse, SessionRequest,
};
use super::validation::{
    first_blank, parse_roles, valid_activation_token, valid_email, valid_password,
};
use super::{bad_request, error_response, with_deadline};
use crate::api::AppState;
use crate::domain::Registration;

#[utoipa::path(
    post,
    path = "/v1/auth/register",
    request_body = RegisterRequest,
    responses(
        (status = 201, description = "User registered, activation pending", body = RegisterResponse),
        (status = 400, description = "Invalid input", body = String),
        (status = 409, description = "Email already registered", body = String),
        (status = 500, description = "Internal error", body = String)
    ),
    tag = "auth"
)]
pub async fn register(
    state: Extension<Arc<AppState>>,
    payload: Option<Json<RegisterRequest>>,
) -> impl IntoResponse {
    let request: RegisterRequest = match payload {
        Some(Json(payload)) => payload,
        None => return bad_request("Missing payload"),
    };

    debug!("register request: {:?}", request);

    if let Some(field) = first_blank(&[
        ("first_name", request.first_name.as_str()),
        ("last_name", request.last_name.as_str()),
        ("email", request.email.as_str()),
        ("barcode", request.barcode.as_str()),
        ("major", request.major.as_str()),
        ("group_name", request.group_name.as_str()),
    ]) {
        return bad_request(format!("Missing {field}"));
    }
    if !valid_email(&request.email) {
        return bad_request("Invalid email");
    }
    if !valid_password(&request.password) {
        return bad_request("Password must be 6 to 64 characters and at most 72 bytes");
    }
    if request.year < 1 {
        return bad_request("Year must be at least 1");
    }

    let registration = Registration {
        first_name: request.first_name.trim().to_string(),
        last_name: request.last_name.trim().to_string(),
        email: request.email,
        password: SecretString::from(request.password),
        barcode: request.barcode.trim().to_string(),
        major: request.major.trim().to_string(),
        group_name: request.group_name.trim().to_string(),
        year: request.year,
    };

    match with_deadline(state.request_timeout(), state.auth().register(registration)).await {
        Ok(user_id) => (StatusCode::CREATED, Json(RegisterResponse { user_id })).into_response(),
        Err(err) => error_response(&err),
    }
}

#[utoipa::path(
    post,
    path = "/v1/auth/login",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Session opened", body = LoginResponse),
        (status = 400, description = "Invalid input or credentials", body = String),
        (status = 404, description = "No activated user with this email", body = String),
        (status = 500, description = "Internal error", body = String)
    ),
    tag = "auth"
)]
pub async fn login(
    state: Extension<Arc<AppState>>,
    payload: Option<Json<LoginRequest>>,
) -> impl IntoResponse {
    let request: LoginRequest = match payload {
        Some(Json(payload)) => payload,
        None => return bad_request("Missing payload"),
    };

    if !valid_email(&request.email) {
        return bad_request("Invalid email");
    }
    if !valid_password(&request.password) {
        return bad_request("Password must be 6 to 64 characters and at most 72 bytes");
    }

    let password = SecretString::from(request.password);
    match with_deadline(
        state.request_timeout(),
        state.auth().login(&request.email, password),
    )
    .await
    {
        Ok(session_token) => Json(LoginResponse { session_token }).into_response(),
        Err(err) => error_response(&err),
    }
}

#[utoipa::path(
    post,
    path = "/v1/auth/logout",
    request_body = SessionRequest,
    responses(
        (status = 204, description = "Session closed"),
        (status = 400, description = "Missing session token", body = String),
        (status = 500, description = "Internal error", body = String)
    ),
    tag = "auth"
)]
pub async fn logout(
    state: Extension<Arc<AppState>>,
    payload: Option<Json<SessionRequest>>,
) -> impl IntoResponse {
    let request: SessionRequest = match payload {
        Some(Json(payload)) => payload,
        None => return bad_request("Missing payload"),
    };

    let session_token = request.session_token.trim();
    if session_token.is_empty() {
        return bad_request("Missing session token");
    }

    match with_deadline(state.request_timeout(), state.auth().logout(session_token)).await {
        Ok(()) => StatusCode::NO_CONTENT.into_response(),
        Err(err) => error_response(&err),
    }
}

#[utoipa::path(
    post,
    path = "/v1/auth/authenticate",
    request_body = SessionRequest,
    responses(
        (status = 200, description = "Session is valid", body = AuthenticateResponse),
        (status = 400, description = "Missing session token", body = String),
        (status = 404, description = "Session missing or expired", body = String),
        (status = 500, description = "Internal error", body = String)
    ),
    tag = "auth"
)]
pub async fn authenticate(
    state: Extension<Arc<AppState>>,
    payload: Option<Json<SessionRequest>>,
) -> impl IntoResponse {
    let request: SessionRequest = match payload {
        Some(Json(payload)) => payload,
        None => return bad_request("Missing payload"),
    };

    let session_token = request.session_token.trim();
    if session_token.is_empty() {
        return bad_request("Missing session token");
    }

    match with_deadline(
        state.request_timeout(),
        state.auth().authenticate(session_token),
    )
    .await
    {
        Ok(user_id) => Json(AuthenticateResponse { user_id }).into_response(),
        Err(err) => error_response(&err),
    }
}

#[utoipa::path(
    post,
    path = "/v1/auth/check-role",
    request_body = CheckRoleRequest,
    responses(
        (status = 200, description = "Whether the user holds one of the roles", body = CheckRoleResponse),
        (status = 400, description = "Invalid user id or roles", body = String),
        (status = 404, description = "User not found", body = String),
        (status = 500, description = "Internal error", body = String)
    ),
    tag = "auth"
)]
pub async fn check_role(
    state: Extension<Arc<AppState>>,
    payload: Option<Json<CheckRoleRequest>>,
) -> impl IntoResponse {
    let request: CheckRoleRequest = match payload {
        Some(Json(payload)) => payload,
        None => return bad_request("Missing payload"),
    };

    if request.user_id < 1 {
        return bad_request("Invalid user id");
    }
    let roles = match parse_roles(&request.roles) {
        Ok(roles) => roles,
        Err(message) => return bad_request(message),
    };

    match with_deadline(
        state.request_timeout(),
        state.auth().check_user_role(request.user_id, &roles),
    )
    .await
    {
        Ok(has_role) => Json(CheckRoleResponse { has_role }).into_response(),
        Err(err) => error_response(&err),
    }
}

#[utoipa::path(
    post,
    path = "/v1/auth/activate",
    request_body = ActivateRequest,
    responses(
        (status = 204, description = "User activated"),
        (status = 400, description = "Malformed activation token", body = String),
        (status = 404, description = "Activation token or user not found", body = String),
        (status = 500, description = "Internal error", body = String)
    ),
    tag = "auth"
)]
pub async fn activate(
    state: Extension<Arc<AppState>>,
    payload: Option<Json<ActivateRequest>>,
) -> impl IntoResponse {
    let request: ActivateRequest = match payload {
        Some(Json(payload)) => payload,
        None => return bad_request("Missing payload"),
    };

    let token = request.token.trim();
    if !valid_activation_token(token) {
        return bad_request("Invalid activation token");
    }

    match with_deadline(state.request_timeout(), state.auth().activate_user(token)).await {
        Ok(()) => StatusCode::NO_CONTENT.into_response(),
        Err(err) => error_response(&err),
    }
}
