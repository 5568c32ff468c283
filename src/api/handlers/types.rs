//! Request/response types for the HTTP API.

use serde::{Deserialize, Serialize};
use std::fmt;
use utoipa::{IntoParams, ToSchema};

use crate::domain::{Metadata, Role, User, UserPatch};

#[derive(ToSchema, Serialize, Deserialize)]
pub struct RegisterRequest {
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub password: String,
    pub barcode: String,
    pub major: String,
    pub group_name: String,
    pub year: i32,
}

impl fmt::Debug for RegisterRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RegisterRequest")
            .field("first_name", &self.first_name)
            .field("last_name", &self.last_name)
            .field("email", &self.email)
            .field("password", &"***")
            .field("barcode", &self.barcode)
            .field("major", &self.major)
            .field("group_name", &self.group_name)
            .field("year", &self.year)
            .finish()
    }
}

#[derive(ToSchema, Serialize, Deserialize, Debug)]
pub struct RegisterResponse {
    pub user_id: i64,
}

#[derive(ToSchema, Serialize, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

impl fmt::Debug for LoginRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LoginRequest")
            .field("email", &self.email)
            .field("password", &"***")
            .finish()
    }
}

#[derive(ToSchema, Serialize, Deserialize, Debug)]
pub struct LoginResponse {
    pub session_token: String,
}

/// Body of `logout` and `authenticate`.
#[derive(ToSchema, Serialize, Deserialize)]
pub struct SessionRequest {
    pub session_token: String,
}

impl fmt::Debug for SessionRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SessionRequest")
            .field("session_token", &"***")
            .finish()
    }
}

#[derive(ToSchema, Serialize, Deserialize, Debug)]
pub struct AuthenticateResponse {
    pub user_id: i64,
}

#[derive(ToSchema, Serialize, Deserialize, Debug)]
pub struct CheckRoleRequest {
    pub user_id: i64,
    /// Role names: GUEST, USER, MODER, ADMIN, DSVR.
    pub roles: Vec<String>,
}

#[derive(ToSchema, Serialize, Deserialize, Debug)]
pub struct CheckRoleResponse {
    pub has_role: bool,
}

#[derive(ToSchema, Serialize, Deserialize)]
pub struct ActivateRequest {
    pub token: String,
}

impl fmt::Debug for ActivateRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ActivateRequest")
            .field("token", &"***")
            .finish()
    }
}

/// Public view of a user; the password hash never leaves the service.
#[derive(ToSchema, Serialize, Deserialize, Debug, PartialEq, Eq)]
pub struct UserResponse {
    pub user_id: i64,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub role: Role,
    pub barcode: String,
    pub major: String,
    pub group_name: String,
    pub year: i32,
    pub phone_number: Option<String>,
    pub avatar_url: Option<String>,
    /// Seconds since the Unix epoch.
    pub created_at: i64,
}

impl From<User> for UserResponse {
    fn from(user: User) -> Self {
        Self {
            user_id: user.id,
            email: user.email,
            first_name: user.first_name,
            last_name: user.last_name,
            role: user.role,
            barcode: user.barcode,
            major: user.major,
            group_name: user.group_name,
            year: user.year,
            phone_number: user.phone_number,
            avatar_url: user.avatar_url,
            created_at: user.created_at_unix,
        }
    }
}

#[derive(ToSchema, Serialize, Deserialize, Debug, Default)]
pub struct UpdateUserRequest {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub major: Option<String>,
    pub group_name: Option<String>,
    pub year: Option<i32>,
    pub phone_number: Option<String>,
}

impl From<UpdateUserRequest> for UserPatch {
    fn from(request: UpdateUserRequest) -> Self {
        Self {
            first_name: request.first_name,
            last_name: request.last_name,
            major: request.major,
            group_name: request.group_name,
            year: request.year,
            phone_number: request.phone_number,
        }
    }
}

#[derive(ToSchema, Serialize, Deserialize, Debug)]
pub struct UpdateUserResponse {
    pub user_id: i64,
}

#[derive(IntoParams, Deserialize, Debug, Default)]
#[into_params(parameter_in = Query)]
pub struct SearchUsersParams {
    /// Case-insensitive substring of email, first or last name.
    pub query: Option<String>,
    /// 1-based page number (default 1).
    pub page: Option<u32>,
    /// Page size, 1 to 100 (default 20).
    pub page_size: Option<u32>,
}

#[derive(ToSchema, Serialize, Deserialize, Debug)]
pub struct SearchUsersResponse {
    pub users: Vec<UserResponse>,
    pub metadata: Metadata,
}
