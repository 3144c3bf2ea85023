//! Password hashing with argon2.
//!
//! Hashing and verification are CPU-bound, so both run on tokio's blocking
//! pool rather than on the request-handling threads.

use argon2::{
  Argon2, PasswordHash, PasswordHasher, PasswordVerifier,
  password_hash::SaltString,
};
use rand_core::OsRng;

use crate::{Error, Result};

/// Produce an argon2 PHC string for `password`.
pub fn hash_password_blocking(password: &str) -> Result<String> {
  let salt = SaltString::generate(&mut OsRng);
  Argon2::default()
    .hash_password(password.as_bytes(), &salt)
    .map(|h| h.to_string())
    .map_err(|e| Error::Credential(e.to_string()))
}

/// Check `password` against a stored PHC string. A malformed stored hash
/// never verifies.
pub fn verify_password_blocking(password: &str, phc: &str) -> bool {
  let Ok(parsed) = PasswordHash::new(phc) else {
    return false;
  };
  Argon2::default()
    .verify_password(password.as_bytes(), &parsed)
    .is_ok()
}

pub async fn hash_password(password: String) -> Result<String> {
  tokio::task::spawn_blocking(move || hash_password_blocking(&password))
    .await
    .map_err(|e| Error::Credential(e.to_string()))?
}

pub async fn verify_password(password: String, phc: String) -> Result<bool> {
  tokio::task::spawn_blocking(move || verify_password_blocking(&password, &phc))
    .await
    .map_err(|e| Error::Credential(e.to_string()))
}
