use utoipa::OpenApi;
use utoipa::openapi::{Contact, License};

use super::handlers::{auth, health, types, users};
use crate::domain::{Metadata, Role};

#[derive(OpenApi)]
#[openapi(
    paths(
        health::health,
        auth::register,
        auth::login,
        auth::logout,
        auth::authenticate,
        auth::check_role,
        auth::activate,
        users::get_user,
        users::update_user,
        users::delete_user,
        users::search_users,
    ),
    components(schemas(
        health::Health,
        types::RegisterRequest,
        types::RegisterResponse,
        types::LoginRequest,
        types::LoginResponse,
        types::SessionRequest,
        types::AuthenticateResponse,
        types::CheckRoleRequest,
        types::CheckRoleResponse,
        types::ActivateRequest,
        types::UserResponse,
        types::UpdateUserRequest,
        types::UpdateUserResponse,
        types::SearchUsersResponse,
        Metadata,
        Role,
    )),
    tags(
        (name = "auth", description = "Registration, activation and sessions"),
        (name = "users", description = "Profiles of activated users"),
        (name = "health", description = "Liveness and build information"),
    )
)]
struct ApiDoc;

/// `OpenAPI` document served at `/api-docs/openapi.json`, with info taken
/// from Cargo metadata.
#[must_use]
pub fn openapi() -> utoipa::openapi::OpenApi {
    let mut doc = ApiDoc::openapi();
    doc.info.title = env!("CARGO_PKG_NAME").to_string();
    doc.info.version = env!("CARGO_PKG_VERSION").to_string();
    doc.info.description = optional_str(env!("CARGO_PKG_DESCRIPTION")).map(str::to_string);
    doc.info.contact = cargo_contact();
    doc.info.license = cargo_license();
    doc
}

fn cargo_contact() -> Option<Contact> {
    // Cargo authors are `:` separated and may include "Name <email>".
    let authors = env!("CARGO_PKG_AUTHORS");
    let primary = authors.split(':').next().map(str::trim)?;
    if primary.is_empty() {
        return None;
    }

    let (name, email) = parse_author(primary);
    if name.is_none() && email.is_none() {
        return None;
    }

    let mut contact = Contact::new();
    contact.name = name.map(str::to_string);
    contact.email = email.map(str::to_string);
    Some(contact)
}

fn cargo_license() -> Option<License> {
    let identifier = optional_str(env!("CARGO_PKG_LICENSE"))?;
    let mut license = License::new(identifier);
    license.identifier = Some(identifier.to_string());
    Some(license)
}

fn optional_str(value: &'static str) -> Option<&'static str> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed)
    }
}

fn parse_author<'a>(author: &'a str) -> (Option<&'a str>, Option<&'a str>) {
    let non_empty = |value: &'a str| -> Option<&'a str> {
        let value = value.trim();
        (!value.is_empty()).then_some(value)
    };
    match author.find('<') {
        Some(start) => (
            non_empty(&author[..start]),
            non_empty(author[start + 1..].trim_end_matches('>')),
        ),
        None => (non_empty(author), None),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn openapi_info_from_cargo() {
        let spec = openapi();
        assert_eq!(spec.info.title, env!("CARGO_PKG_NAME"));
        assert_eq!(spec.info.version, env!("CARGO_PKG_VERSION"));

        let contact = spec.info.contact;
        assert!(contact.is_some());
        if let Some(contact) = contact {
            assert_eq!(contact.name.as_deref(), Some("UniClubs Team"));
            assert_eq!(contact.email.as_deref(), Some("team@uniclubs.dev"));
        }

        let license = spec.info.license;
        assert!(license.is_some());
        if let Some(license) = license {
            assert_eq!(license.name, "BSD-3-Clause");
        }
    }

    #[test]
    fn openapi_tags_and_paths() {
        let spec = openapi();
        let tags = spec.tags.clone().unwrap_or_default();
        assert!(tags.iter().any(|tag| tag.name == "auth"));
        assert!(tags.iter().any(|tag| tag.name == "users"));
        for path in [
            "/health",
            "/v1/auth/register",
            "/v1/auth/login",
            "/v1/auth/logout",
            "/v1/auth/authenticate",
            "/v1/auth/check-role",
            "/v1/auth/activate",
            "/v1/users",
            "/v1/users/{id}",
        ] {
            assert!(spec.paths.paths.contains_key(path), "missing {path}");
        }
    }

    #[test]
    fn parse_author_variants() {
        assert_eq!(
            parse_author("Jane <jane@x.dev>"),
            (Some("Jane"), Some("jane@x.dev"))
        );
        assert_eq!(parse_author("Jane"), (Some("Jane"), None));
        assert_eq!(parse_author("<jane@x.dev>"), (None, Some("jane@x.dev")));
    }
}
