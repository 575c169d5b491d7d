//! Password hashing using Argon2id
//!
//! Hashes are stored in PHC string format, so the salt and parameters travel
//! with the hash and verification needs no extra configuration.

use argon2::{
    password_hash::{
        rand_core::OsRng, PasswordHash, PasswordHasher as Argon2Hasher, PasswordVerifier,
        SaltString,
    },
    Argon2,
};

use crate::config::PasswordConfig;
use crate::error::Error;

/// Argon2id password hasher with a minimum-length policy
#[derive(Clone)]
pub struct PasswordHasher {
    argon2: Argon2<'static>,
    min_password_length: usize,
}

impl Default for PasswordHasher {
    fn default() -> Self {
        Self::new(&PasswordConfig::default())
    }
}

impl PasswordHasher {
    /// Create a hasher using Argon2id v19 with default cost parameters
    pub fn new(config: &PasswordConfig) -> Self {
        Self {
            argon2: Argon2::default(),
            min_password_length: config.min_length,
        }
    }

    /// Hash a password
    ///
    /// # Errors
    ///
    /// Returns `ValidationError` if the password is shorter than the policy
    /// allows.
    pub fn hash(&self, password: &str) -> Result<String, Error> {
        if password.chars().count() < self.min_password_length {
            return Err(Error::ValidationError(format!(
                "password: must be at least {} characters",
                self.min_password_length
            )));
        }

        let salt = SaltString::generate(&mut OsRng);
        let hash = self
            .argon2
            .hash_password(password.as_bytes(), &salt)
            .map_err(|e| Error::PasswordHash(format!("Failed to hash password: {}", e)))?;

        Ok(hash.to_string())
    }

    /// Verify a password against a stored hash in constant time
    ///
    /// Returns `Ok(false)` on mismatch; `Err` only for malformed hashes.
    pub fn verify(&self, password: &str, hash: &str) -> Result<bool, Error> {
        let parsed_hash = PasswordHash::new(hash)
            .map_err(|e| Error::PasswordHash(format!("Invalid password hash format: {}", e)))?;

        match self.argon2.verify_password(password.as_bytes(), &parsed_hash) {
            Ok(()) => Ok(true),
            Err(argon2::password_hash::Error::Password) => Ok(false),
            Err(e) => Err(Error::PasswordHash(format!(
                "Password verification failed: {}",
                e
            ))),
        }
    }

    /// [`hash`](Self::hash) on the blocking thread pool
    pub async fn hash_blocking(&self, password: String) -> Result<String, Error> {
        let hasher = self.clone();
        tokio::task::spawn_blocking(move || hasher.hash(&password))
            .await
            .map_err(|e| Error::Internal(format!("Password hashing task failed: {}", e)))?
    }

    /// [`verify`](Self::verify) on the blocking thread pool
    pub async fn verify_blocking(&self, password: String, hash: String) -> Result<bool, Error> {
        let hasher = self.clone();
        tokio::task::spawn_blocking(move || hasher.verify(&password, &hash))
            .await
            .map_err(|e| Error::Internal(format!("Password verification task failed: {}", e)))?
    }

    /// Minimum accepted password length
    pub fn min_password_length(&self) -> usize {
        self.min_password_length
    }
}
