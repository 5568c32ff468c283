//! bcrypt hashing, run on the blocking pool so the executor keeps serving
//! other requests while a hash is computed.

use anyhow::{Context, Result, bail};
use secrecy::{ExposeSecret, SecretString};
use tracing::debug;

/// bcrypt only reads this many bytes of input; anything longer is refused
/// instead of being silently truncated.
pub const MAX_PASSWORD_BYTES: usize = 72;

/// Hash a plaintext password with the given bcrypt cost.
///
/// # Errors
/// Returns an error if the password is longer than [`MAX_PASSWORD_BYTES`],
/// the cost is out of range or the blocking task fails.
pub async fn hash(password: SecretString, cost: u32) -> Result<Vec<u8>> {
    if password.expose_secret().len() > MAX_PASSWORD_BYTES {
        bail!("password exceeds {MAX_PASSWORD_BYTES} bytes");
    }
    let hashed = tokio::task::spawn_blocking(move || bcrypt::hash(password.expose_secret(), cost))
        .await
        .context("password hashing task failed")?
        .context("failed to hash password")?;
    Ok(hashed.into_bytes())
}

/// Compare a plaintext password against a stored hash.
///
/// A stored value that is not a valid bcrypt hash never verifies, and neither
/// does a password longer than [`MAX_PASSWORD_BYTES`].
///
/// # Errors
/// Returns an error only if the blocking task itself fails.
pub async fn verify(password: SecretString, stored_hash: Vec<u8>) -> Result<bool> {
    tokio::task::spawn_blocking(move || {
        if password.expose_secret().len() > MAX_PASSWORD_BYTES {
            debug!("password longer than {MAX_PASSWORD_BYTES} bytes");
            return false;
        }
        let Ok(stored_hash) = std::str::from_utf8(&stored_hash) else {
            debug!("stored password hash is not valid UTF-8");
            return false;
        };
        match bcrypt::verify(password.expose_secret(), stored_hash) {
            Ok(matches) => matches,
            Err(err) => {
                debug!("malformed password hash: {err}");
                false
            }
        }
    })
    .await
    .context("password verification task failed")
}
