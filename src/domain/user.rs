use secrecy::SecretString;
use serde::{Deserialize, Serialize};
use std::{fmt, str::FromStr};
use utoipa::ToSchema;

/// Fixed set of roles a user can hold. Role checks are exact matches; there is
/// no hierarchy between variants.
#[derive(ToSchema, Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[serde(rename_all = "UPPERCASE")]
pub enum Role {
    Guest,
    User,
    Moder,
    Admin,
    Dsvr,
}

impl Role {
    pub const ALL: [Self; 5] = [Self::Guest, Self::User, Self::Moder, Self::Admin, Self::Dsvr];

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Guest => "GUEST",
            Self::User => "USER",
            Self::Moder => "MODER",
            Self::Admin => "ADMIN",
            Self::Dsvr => "DSVR",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
#[error("unknown role: {0}")]
pub struct UnknownRole(pub String);

impl FromStr for Role {
    type Err = UnknownRole;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|role| role.as_str() == value)
            .ok_or_else(|| UnknownRole(value.to_string()))
    }
}

/// A persisted user row.
#[derive(Clone)]
pub struct User {
    pub id: i64,
    pub email: String,
    pub password_hash: Vec<u8>,
    pub first_name: String,
    pub last_name: String,
    pub role: Role,
    pub activated: bool,
    pub created_at_unix: i64,
    pub barcode: String,
    pub major: String,
    pub group_name: String,
    pub year: i32,
    pub phone_number: Option<String>,
    pub avatar_url: Option<String>,
}

impl fmt::Debug for User {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("User")
            .field("id", &self.id)
            .field("email", &self.email)
            .field("password_hash", &"***")
            .field("first_name", &self.first_name)
            .field("last_name", &self.last_name)
            .field("role", &self.role)
            .field("activated", &self.activated)
            .field("created_at_unix", &self.created_at_unix)
            .field("barcode", &self.barcode)
            .field("major", &self.major)
            .field("group_name", &self.group_name)
            .field("year", &self.year)
            .field("phone_number", &self.phone_number)
            .field("avatar_url", &self.avatar_url)
            .finish()
    }
}

/// Registration input as received from the API boundary.
#[derive(Debug)]
pub struct Registration {
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub password: SecretString,
    pub barcode: String,
    pub major: String,
    pub group_name: String,
    pub year: i32,
}

/// Row handed to the credential store on registration. The store assigns the
/// id, the default role and the creation time; `activated` starts false.
#[derive(Clone)]
pub struct NewUser {
    pub email: String,
    pub password_hash: Vec<u8>,
    pub first_name: String,
    pub last_name: String,
    pub barcode: String,
    pub major: String,
    pub group_name: String,
    pub year: i32,
}

impl fmt::Debug for NewUser {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NewUser")
            .field("email", &self.email)
            .field("password_hash", &"***")
            .field("first_name", &self.first_name)
            .field("last_name", &self.last_name)
            .finish_non_exhaustive()
    }
}

/// Partial profile update; `None` fields are left untouched.
#[derive(Clone, Debug, Default)]
pub struct UserPatch {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub major: Option<String>,
    pub group_name: Option<String>,
    pub year: Option<i32>,
    pub phone_number: Option<String>,
}

impl UserPatch {
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.first_name.is_none()
            && self.last_name.is_none()
            && self.major.is_none()
            && self.group_name.is_none()
            && self.year.is_none()
            && self.phone_number.is_none()
    }

    pub fn apply(self, user: &mut User) {
        if let Some(first_name) = self.first_name {
            user.first_name = first_name;
        }
        if let Some(last_name) = self.last_name {
            user.last_name = last_name;
        }
        if let Some(major) = self.major {
            user.major = major;
        }
        if let Some(group_name) = self.group_name {
            user.group_name = group_name;
        }
        if let Some(year) = self.year {
            user.year = year;
        }
        if let Some(phone_number) = self.phone_number {
            user.phone_number = Some(phone_number);
        }
    }
}
