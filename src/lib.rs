//! # uniclubs-user (Identity & Session Authority)
//!
//! `uniclubs-user` registers users, verifies their credentials, issues opaque
//! session tokens and answers role checks for the rest of the UniClubs services.
//!
//! ## Activation Gating
//!
//! New accounts start unactivated. Registration stores a single-use activation
//! token in the ephemeral store and publishes a registration event carrying
//! it; the notification service mails the link. Until the token is redeemed the
//! account is invisible to login, role checks and the profile endpoints.
//!
//! ## Stores
//!
//! - **Credential store** (`PostgreSQL`): durable user rows, unique on email.
//! - **Token stores** (`Redis`): two key namespaces, `session:` and `activation:`,
//!   each entry expiring after its configured TTL.
//! - **Event publisher** (`AMQP`): topic exchange feeding the notification and
//!   club queues.
//!
//! Every store is injected behind a trait, so the engine holds no global state and
//! the in-memory implementations can stand in for local runs and tests.

pub mod api;
pub mod auth;
pub mod cli;
pub mod domain;
pub mod events;
pub mod management;
pub mod storage;

#[allow(clippy::doc_markdown, clippy::needless_raw_string_hashes)]
pub mod built_info {
    include!(concat!(env!("OUT_DIR"), "/built.rs"));
}

pub const GIT_COMMIT_HASH: &str = match built_info::GIT_COMMIT_HASH {
    Some(hash) => hash,
    None => "unknown",
};
