//! Password hashing for staff accounts.
//!
//! PBKDF2-SHA256 through the PHC `password_hash` API: the stored string
//! carries algorithm, salt, and parameters, so iteration counts can be
//! raised later without invalidating existing rows.

use pbkdf2::password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString};
use pbkdf2::Pbkdf2;
use rand::rngs::OsRng;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum PasswordError {
    #[error("Password hashing failed: {0}")]
    Hash(String),
}

/// One-way hash with a fresh random salt.
pub fn hash_password(password: &str) -> Result<String, PasswordError> {
    let salt = SaltString::generate(&mut OsRng);
    Pbkdf2
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| PasswordError::Hash(e.to_string()))
}

/// Verify a candidate against a stored PHC string. Malformed stored hashes
/// verify as false rather than erroring; login treats both the same way.
pub fn verify_password(password: &str, stored_hash: &str) -> bool {
    let Ok(parsed) = PasswordHash::new(stored_hash) else {
        return false;
    };
    Pbkdf2
        .verify_password(password.as_bytes(), &parsed)
        .is_ok()
}
