//! Input checks applied before a request reaches the engine.

use regex::Regex;

use crate::auth::password::MAX_PASSWORD_BYTES;
use crate::domain::{Filters, Role};

pub const PASSWORD_MIN_CHARS: usize = 6;
pub const PASSWORD_MAX_CHARS: usize = 64;
pub const ACTIVATION_TOKEN_MIN_CHARS: usize = 31;
pub const ACTIVATION_TOKEN_MAX_CHARS: usize = 33;
pub const DEFAULT_PAGE_SIZE: u32 = 20;
pub const MAX_PAGE_SIZE: u32 = 100;

/// Basic email format check.
pub fn valid_email(email: &str) -> bool {
    Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").is_ok_and(|regex| regex.is_match(email.trim()))
}

/// 6 to 64 characters, and no more bytes than bcrypt reads.
pub fn valid_password(password: &str) -> bool {
    (PASSWORD_MIN_CHARS..=PASSWORD_MAX_CHARS).contains(&password.chars().count())
        && password.len() <= MAX_PASSWORD_BYTES
}

pub fn valid_activation_token(token: &str) -> bool {
    (ACTIVATION_TOKEN_MIN_CHARS..=ACTIVATION_TOKEN_MAX_CHARS).contains(&token.len())
}

/// Returns the first blank field name, if any.
pub fn first_blank<'a>(fields: &[(&'a str, &str)]) -> Option<&'a str> {
    fields
        .iter()
        .find(|(_, value)| value.trim().is_empty())
        .map(|(name, _)| *name)
}

/// Parse role names; empty lists and unknown names are rejected.
pub fn parse_roles(names: &[String]) -> Result<Vec<Role>, String> {
    if names.is_empty() {
        return Err("roles must not be empty".to_string());
    }
    names
        .iter()
        .map(|name| name.trim().parse::<Role>().map_err(|err| err.to_string()))
        .collect()
}

pub fn filters(page: Option<u32>, page_size: Option<u32>) -> Result<Filters, String> {
    let page = page.unwrap_or(1);
    let page_size = page_size.unwrap_or(DEFAULT_PAGE_SIZE);
    if page == 0 {
        return Err("page must be at least 1".to_string());
    }
    if page_size == 0 || page_size > MAX_PAGE_SIZE {
        return Err(format!("page_size must be between 1 and {MAX_PAGE_SIZE}"));
    }
    Ok(Filters::new(page, page_size))
}
