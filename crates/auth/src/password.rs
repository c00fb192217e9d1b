//! Credential hashing (Argon2id, PHC string format).
//!
//! Cost parameters are the `argon2` crate defaults and are not configurable.

use argon2::password_hash::rand_core::{OsRng, RngCore};
use argon2::password_hash::{PasswordHash, PasswordHasher as _, PasswordVerifier as _, SaltString};
use argon2::Argon2;
use thiserror::Error;

const SALT_LEN: usize = 16;

#[derive(Debug, Error)]
pub enum PasswordError {
    /// The OS random source could not produce a salt.
    #[error("could not generate salt: {0}")]
    Entropy(String),

    #[error("password hashing failed: {0}")]
    Hash(String),
}

/// Salted, adaptive password hasher.
#[derive(Debug, Clone, Copy, Default)]
pub struct PasswordHasher;

impl PasswordHasher {
    pub fn new() -> Self {
        Self
    }

    fn argon2(&self) -> Argon2<'static> {
        Argon2::default()
    }

    /// Hash `password` with a fresh random salt.
    pub fn hash(&self, password: &str) -> Result<String, PasswordError> {
        let mut salt = [0u8; SALT_LEN];
        OsRng
            .try_fill_bytes(&mut salt)
            .map_err(|e| PasswordError::Entropy(e.to_string()))?;
        let salt = SaltString::encode_b64(&salt).map_err(|e| PasswordError::Hash(e.to_string()))?;

        let digest = self
            .argon2()
            .hash_password(password.as_bytes(), &salt)
            .map_err(|e| PasswordError::Hash(e.to_string()))?;
        Ok(digest.to_string())
    }

    /// Constant-time check of `password` against a stored digest.
    ///
    /// Malformed digests verify as `false`.
    pub fn verify(&self, password: &str, digest: &str) -> bool {
        let Ok(parsed) = PasswordHash::new(digest) else {
            return false;
        };
        self.argon2()
            .verify_password(password.as_bytes(), &parsed)
            .is_ok()
    }
}

pub fn hash_password(password: &str) -> Result<String, PasswordError> {
    PasswordHasher::new().hash(password)
}

pub fn verify_password(password: &str, digest: &str) -> bool {
    PasswordHasher::new().verify(password, digest)
}
