//! Registration, activation, login and session checks.
//!
//! ### Flow
//!
//! 1. `register` hashes the password (bcrypt), inserts an unactivated user,
//!    stores a 16-byte activation token and publishes `user.registered`.
//! 2. `activate_user` redeems that token and flips the user to activated.
//! 3. `login` only sees activated users; on a password match it stores a
//!    32-byte session token with the session TTL.
//! 4. `authenticate` resolves the token, `logout` deletes it.
//!
//! Tokens are random hex strings with no embedded meaning; the token stores
//! are the only source of truth for them.

mod config;
mod engine;
mod error;
pub mod password;
pub mod token;

#[cfg(test)]
mod tests;

pub use config::AuthConfig;
pub use engine::{AuthService, normalize_email};
pub use error::AuthError;
