//! Password hashing and verification.
//!
//! Passwords are stored as Argon2id PHC strings with a per-password random salt.

use argon2::{Argon2, PasswordHash, PasswordHasher, PasswordVerifier, password_hash::SaltString};
use tracing::{error, warn};

/// Number of random salt bytes mixed into each hash.
const SALT_LEN: usize = 16;

/// Errors that can occur while hashing a password.
#[derive(Debug, thiserror::Error)]
pub enum PasswordError {
    #[error("Failed to encode salt: {0}")]
    Salt(argon2::password_hash::Error),
    #[error("Failed to hash password: {0}")]
    Hash(argon2::password_hash::Error),
    #[error("Hashing task failed: {0}")]
    Join(#[from] tokio::task::JoinError),
}

/// Hash a plaintext password with Argon2id and a fresh random salt.
pub fn hash_password(plaintext: &str) -> Result<String, PasswordError> {
    let mut salt_bytes = [0u8; SALT_LEN];
    rand::RngCore::fill_bytes(&mut rand::rng(), &mut salt_bytes);
    let salt = SaltString::encode_b64(&salt_bytes).map_err(PasswordError::Salt)?;

    let hash = Argon2::default()
        .hash_password(plaintext.as_bytes(), &salt)
        .map_err(PasswordError::Hash)?;

    Ok(hash.to_string())
}

/// Check a plaintext password against a stored PHC hash.
/// A stored value that does not parse as a PHC string never verifies.
pub fn verify_password(plaintext: &str, stored_hash: &str) -> bool {
    let parsed = match PasswordHash::new(stored_hash) {
        Ok(parsed) => parsed,
        Err(e) => {
            warn!(error = %e, "Stored password hash is malformed");
            return false;
        }
    };

    Argon2::default()
        .verify_password(plaintext.as_bytes(), &parsed)
        .is_ok()
}

/// Run [`hash_password`] on the blocking thread pool.
pub async fn spawn_hash_password(plaintext: String) -> Result<String, PasswordError> {
    tokio::task::spawn_blocking(move || hash_password(&plaintext)).await?
}

/// Run [`verify_password`] on the blocking thread pool.
pub async fn spawn_verify_password(plaintext: String, stored_hash: String) -> bool {
    match tokio::task::spawn_blocking(move || verify_password(&plaintext, &stored_hash)).await {
        Ok(verified) => verified,
        Err(e) => {
            error!(error = %e, "Password verification task failed");
            false
        }
    }
}
