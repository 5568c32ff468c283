//! Opaque token generation.

use anyhow::{Context, Result};
use rand::{RngCore, rngs::OsRng};

/// Session tokens carry 32 random bytes (64 hex characters).
pub const SESSION_TOKEN_BYTES: usize = 32;
/// Activation tokens carry 16 random bytes (32 hex characters).
pub const ACTIVATION_TOKEN_BYTES: usize = 16;

/// Draw `byte_len` bytes from the OS CSPRNG and hex-encode them.
///
/// # Errors
/// Returns an error if the OS entropy source fails; there is no fallback.
pub fn generate(byte_len: usize) -> Result<String> {
    let mut bytes = vec![0u8; byte_len];
    OsRng
        .try_fill_bytes(&mut bytes)
        .context("failed to generate token")?;
    Ok(hex::encode(bytes))
}
