//! Profile endpoints. Only activated users are visible.

use axum::{
    Json,
    extract::{Extension, Path, Query},
    http::StatusCode,
    response::IntoResponse,
};
use std::sync::Arc;

use super::types::{
    SearchUsersParams, SearchUsersResponse, UpdateUserRequest, UpdateUserResponse, UserResponse,
};
use super::validation;
use super::{bad_request, error_response, with_deadline};
use crate::api::AppState;
use crate::domain::UserPatch;

#[utoipa::path(
    get,
    path = "/v1/users/{id}",
    params(("id" = i64, Path, description = "User id")),
    responses(
        (status = 200, description = "User profile", body = UserResponse),
        (status = 404, description = "User not found", body = String),
        (status = 500, description = "Internal error", body = String)
    ),
    tag = "users"
)]
pub async fn get_user(
    Path(user_id): Path<i64>,
    state: Extension<Arc<AppState>>,
) -> impl IntoResponse {
    match with_deadline(state.request_timeout(), state.profiles().get_user(user_id)).await {
        Ok(user) => Json(UserResponse::from(user)).into_response(),
        Err(err) => error_response(&err),
    }
}

#[utoipa::path(
    patch,
    path = "/v1/users/{id}",
    params(("id" = i64, Path, description = "User id")),
    request_body = UpdateUserRequest,
    responses(
        (status = 200, description = "Profile updated", body = UpdateUserResponse),
        (status = 400, description = "Invalid input", body = String),
        (status = 404, description = "User not found", body = String),
        (status = 500, description = "Internal error", body = String)
    ),
    tag = "users"
)]
pub async fn update_user(
    Path(user_id): Path<i64>,
    state: Extension<Arc<AppState>>,
    payload: Option<Json<UpdateUserRequest>>,
) -> impl IntoResponse {
    let request: UpdateUserRequest = match payload {
        Some(Json(payload)) => payload,
        None => return bad_request("Missing payload"),
    };

    if request.year.is_some_and(|year| year < 1) {
        return bad_request("Year must be at least 1");
    }
    let present: Vec<(&str, &str)> = [
        ("first_name", request.first_name.as_deref()),
        ("last_name", request.last_name.as_deref()),
        ("major", request.major.as_deref()),
        ("group_name", request.group_name.as_deref()),
    ]
    .into_iter()
    .filter_map(|(name, value)| value.map(|value| (name, value)))
    .collect();
    if let Some(field) = validation::first_blank(&present) {
        return bad_request(format!("{field} must not be blank"));
    }

    let patch = UserPatch::from(request);
    if patch.is_empty() {
        return bad_request("Nothing to update");
    }

    match with_deadline(
        state.request_timeout(),
        state.profiles().update_user(user_id, patch),
    )
    .await
    {
        Ok(user_id) => Json(UpdateUserResponse { user_id }).into_response(),
        Err(err) => error_response(&err),
    }
}

#[utoipa::path(
    delete,
    path = "/v1/users/{id}",
    params(("id" = i64, Path, description = "User id")),
    responses(
        (status = 204, description = "User deleted"),
        (status = 404, description = "User not found", body = String),
        (status = 500, description = "Internal error", body = String)
    ),
    tag = "users"
)]
pub async fn delete_user(
    Path(user_id): Path<i64>,
    state: Extension<Arc<AppState>>,
) -> impl IntoResponse {
    match with_deadline(state.request_timeout(), state.profiles().delete_user(user_id)).await {
        Ok(()) => StatusCode::NO_CONTENT.into_response(),
        Err(err) => error_response(&err),
    }
}

#[utoipa::path(
    get,
    path = "/v1/users",
    params(SearchUsersParams),
    responses(
        (status = 200, description = "Matching users and pagination metadata", body = SearchUsersResponse),
        (status = 400, description = "Invalid pagination", body = String),
        (status = 500, description = "Internal error", body = String)
    ),
    tag = "users"
)]
pub async fn search_users(
    Query(params): Query<SearchUsersParams>,
    state: Extension<Arc<AppState>>,
) -> impl IntoResponse {
    let filters = match validation::filters(params.page, params.page_size) {
        Ok(filters) => filters,
        Err(message) => return bad_request(message),
    };
    let query = params.query.unwrap_or_default();

    match with_deadline(
        state.request_timeout(),
        state.profiles().search_users(&query, filters),
    )
    .await
    {
        Ok((users, metadata)) => Json(SearchUsersResponse {
            users: users.into_iter().map(UserResponse::from).collect(),
            metadata,
        })
        .into_response(),
        Err(err) => error_response(&err),
    }
}
