//! Secret hashing with Argon2id.
//!
//! Login passwords and special PINs are both stored as PHC strings produced
//! here; nothing else in the system ever sees the plaintext.

use argon2::{
    Argon2, PasswordHash,
    password_hash::{PasswordHasher, PasswordVerifier, SaltString, rand_core::OsRng},
};
use thiserror::Error;

/// Errors that can occur while hashing or checking a secret.
#[derive(Debug, Error)]
pub enum PasswordError {
    /// The secret was empty or whitespace.
    #[error("secret must not be blank")]
    Blank,

    /// Failed to hash the secret.
    #[error("failed to hash secret: {0}")]
    HashError(String),

    /// Failed to verify the secret.
    #[error("failed to verify secret: {0}")]
    VerifyError(String),

    /// Stored hash is not a PHC string.
    #[error("invalid password hash format")]
    InvalidHash,
}

/// Hashes a password or PIN using Argon2id with a random salt.
///
/// # Errors
///
/// Returns `PasswordError::Blank` for an empty secret and
/// `PasswordError::HashError` if hashing fails.
///
/// # Example
///
/// ```
/// use ledgerbank_core::auth::hash_password;
///
/// let hash = hash_password("correct horse").unwrap();
/// assert!(hash.starts_with("$argon2id$"));
/// ```
pub fn hash_password(secret: &str) -> Result<String, PasswordError> {
    if secret.trim().is_empty() {
        return Err(PasswordError::Blank);
    }

    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(secret.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| PasswordError::HashError(e.to_string()))
}

/// Checks a password or PIN against a stored PHC hash.
///
/// # Errors
///
/// Returns `PasswordError::InvalidHash` if `hash` cannot be parsed and
/// `PasswordError::VerifyError` if verification fails for another reason
/// than a mismatch.
///
/// # Example
///
/// ```
/// use ledgerbank_core::auth::{hash_password, verify_password};
///
/// let hash = hash_password("4321").unwrap();
/// assert!(verify_password("4321", &hash).unwrap());
/// assert!(!verify_password("1234", &hash).unwrap());
/// ```
pub fn verify_password(secret: &str, hash: &str) -> Result<bool, PasswordError> {
    let parsed = PasswordHash::new(hash).map_err(|_| PasswordError::InvalidHash)?;

    match Argon2::default().verify_password(secret.as_bytes(), &parsed) {
        Ok(()) => Ok(true),
        Err(argon2::password_hash::Error::Password) => Ok(false),
        Err(e) => Err(PasswordError::VerifyError(e.to_string())),
    }
}
