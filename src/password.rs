//! Password hashing and verification.
//!
//! Hashes are Argon2id PHC strings with a per-password random salt.

use std::sync::LazyLock;

use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum PasswordError {
    #[error("password must not be empty")]
    Empty,
    #[error("failed to hash password: {0}")]
    Hash(String),
}

// Used to spend the same verification work when the username does not exist.
static DUMMY_HASH: LazyLock<Option<String>> =
    LazyLock::new(|| hash_password("dummy-password-for-unknown-users").ok());

/// Build the dummy hash now so the first unknown-user login costs no more than later ones.
pub fn warm_up() {
    LazyLock::force(&DUMMY_HASH);
}

/// Derive a storable hash from `password`.
pub fn hash_password(password: &str) -> Result<String, PasswordError> {
    if password.is_empty() {
        return Err(PasswordError::Empty);
    }

    let salt = SaltString::generate(&mut OsRng);
    let hash = Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map_err(|e| PasswordError::Hash(e.to_string()))?
        .to_string();

    Ok(hash)
}

/// Compare `candidate` against `stored_hash`.
///
/// Any failure to parse or verify the stored hash counts as a mismatch.
pub fn verify_password(stored_hash: &str, candidate: &str) -> bool {
    let Ok(parsed_hash) = PasswordHash::new(stored_hash) else {
        return false;
    };

    Argon2::default()
        .verify_password(candidate.as_bytes(), &parsed_hash)
        .is_ok()
}

/// Burn one verification for a login whose username is unknown. Always `false`.
pub fn verify_against_dummy(candidate: &str) -> bool {
    if let Some(hash) = DUMMY_HASH.as_deref() {
        let _ = verify_password(hash, candidate);
    }
    false
}
