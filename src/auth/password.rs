//! Argon2 password hashing. Stored hashes are PHC strings carrying their own salt and params.

use argon2::{
    password_hash::{self, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use rand::rngs::OsRng;
use tracing::warn;

/// Outcome of checking a plaintext against a stored hash.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PasswordCheck {
    Match,
    Mismatch,
    /// The stored value is not a PHC string argon2 can read.
    UnreadableHash,
}

pub fn hash_password(plain: &str) -> anyhow::Result<String> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(plain.as_bytes(), &salt)
        .map(|phc| phc.to_string())
        .map_err(|e| anyhow::anyhow!("argon2 hashing failed: {e}"))
}

pub fn check_password(plain: &str, stored: &str) -> PasswordCheck {
    let Ok(parsed) = PasswordHash::new(stored) else {
        return PasswordCheck::UnreadableHash;
    };
    match Argon2::default().verify_password(plain.as_bytes(), &parsed) {
        Ok(()) => PasswordCheck::Match,
        Err(password_hash::Error::Password) => PasswordCheck::Mismatch,
        Err(e) => {
            // Unsupported algorithm or params in an otherwise valid PHC string.
            warn!(error = %e, "argon2 could not verify stored hash");
            PasswordCheck::UnreadableHash
        }
    }
}
