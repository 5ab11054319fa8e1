//! Credential rules and password hashing.
//!
//! Passwords are stored as Argon2id PHC strings (`$argon2id$v=19$...`) with a
//! per-password random salt. Hashing and verification are CPU bound, so the
//! async entry points move the work onto Tokio's blocking pool.

use argon2::password_hash::rand_core::OsRng;
use argon2::password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString};
use argon2::Argon2;
use thiserror::Error;

pub const MIN_USERNAME_CHARS: usize = 3;
pub const MIN_PASSWORD_CHARS: usize = 8;

/// Well-formed hash with the default Argon2id parameters that no password
/// matches in practice. Checked against when a username does not exist so
/// that login costs the same either way.
const UNKNOWN_USER_HASH: &str =
    "$argon2id$v=19$m=19456,t=2,p=1$c29tZXNhbHRzb21lc2FsdA$AAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAA";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum CredentialError {
    #[error("username shorter than 3 characters")]
    UsernameTooShort,
    #[error("password shorter than 8 characters")]
    PasswordTooShort,
}

#[derive(Debug, Error)]
pub enum PasswordError {
    #[error("failed to hash password: {0}")]
    Hash(String),
    #[error("stored password hash is malformed: {0}")]
    MalformedHash(String),
    #[error("password task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}

/// Checks the minimal signup constraints. Lengths count characters, not bytes.
pub fn validate_signup(username: &str, password: &str) -> Result<(), CredentialError> {
    if username.chars().count() < MIN_USERNAME_CHARS {
        return Err(CredentialError::UsernameTooShort);
    }
    if password.chars().count() < MIN_PASSWORD_CHARS {
        return Err(CredentialError::PasswordTooShort);
    }
    Ok(())
}

pub async fn hash_password(password: String) -> Result<String, PasswordError> {
    tokio::task::spawn_blocking(move || hash_password_blocking(&password)).await?
}

pub async fn verify_password(password: String, hash: String) -> Result<bool, PasswordError> {
    tokio::task::spawn_blocking(move || verify_password_blocking(&password, &hash)).await?
}

/// Runs a full verification against [`UNKNOWN_USER_HASH`] and reports no
/// match regardless of the outcome.
pub async fn verify_unknown_user(password: String) -> Result<bool, PasswordError> {
    verify_password(password, String::from(UNKNOWN_USER_HASH)).await?;
    Ok(false)
}

fn hash_password_blocking(password: &str) -> Result<String, PasswordError> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|err| PasswordError::Hash(err.to_string()))
}

fn verify_password_blocking(password: &str, hash: &str) -> Result<bool, PasswordError> {
    let parsed =
        PasswordHash::new(hash).map_err(|err| PasswordError::MalformedHash(err.to_string()))?;
    Ok(Argon2::default()
        .verify_password(password.as_bytes(), &parsed)
        .is_ok())
}
