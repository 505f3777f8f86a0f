//! Password hashing and session tokens
//!
//! Pure helpers only; storage lives in [`crate::db::users`] and the HTTP
//! extractor lives in the web crate.

use crate::{Error, Result};
use rand::distributions::Alphanumeric;
use rand::Rng;

/// bcrypt work factor for stored passwords
pub const BCRYPT_COST: u32 = bcrypt::DEFAULT_COST;

/// Length of generated session tokens
pub const SESSION_TOKEN_LENGTH: usize = 48;

pub fn hash_password(password: &str) -> Result<String> {
    hash_password_with_cost(password, BCRYPT_COST)
}

pub fn hash_password_with_cost(password: &str, cost: u32) -> Result<String> {
    if password.is_empty() {
        return Err(Error::InvalidInput("password is empty".to_string()));
    }
    bcrypt::hash(password, cost).map_err(|e| Error::Internal(format!("Password hashing failed: {}", e)))
}

/// Check a password against a stored bcrypt hash
///
/// Malformed hashes verify as false.
pub fn verify_password(password: &str, hash: &str) -> bool {
    if hash.is_empty() {
        return false;
    }
    bcrypt::verify(password, hash).unwrap_or(false)
}

/// Random alphanumeric session token
pub fn generate_session_token() -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(SESSION_TOKEN_LENGTH)
        .map(char::from)
        .collect()
}
