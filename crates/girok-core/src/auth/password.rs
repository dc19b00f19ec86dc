//! Password hashing and verification using Argon2
//!
//! This module provides secure credential hashing and verification
//! using the Argon2id algorithm. The PHC string stores salt and KDF
//! parameters, so old hashes keep verifying after a parameter bump;
//! re-hashing on password change picks up the current defaults.

use argon2::{
    password_hash::{
        rand_core::OsRng, Error as Argon2Error, PasswordHash, PasswordHasher as _,
        PasswordVerifier as _, SaltString,
    },
    Algorithm, Argon2, Params, Version,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Password hashing configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PasswordConfig {
    /// Memory cost in KiB (default: 65536 = 64 MiB)
    pub memory_cost: u32,

    /// Number of iterations (default: 3)
    pub time_cost: u32,

    /// Degree of parallelism (default: 4)
    pub parallelism: u32,

    /// Output hash length (default: 32)
    pub output_length: Option<usize>,
}

impl Default for PasswordConfig {
    fn default() -> Self {
        Self {
            memory_cost: 65536, // 64 MiB
            time_cost: 3,
            parallelism: 4,
            output_length: Some(32),
        }
    }
}

/// Password hasher using Argon2id
#[derive(Clone)]
pub struct PasswordHasher {
    argon2: Arc<Argon2<'static>>,
}

impl PasswordHasher {
    /// Create a new password hasher with default configuration
    pub fn new() -> Self {
        Self::with_config(&PasswordConfig::default())
    }

    /// Create a new password hasher with custom configuration
    pub fn with_config(config: &PasswordConfig) -> Self {
        let params = Params::new(
            config.memory_cost,
            config.time_cost,
            config.parallelism,
            config.output_length,
        )
        .unwrap_or_default();

        let argon2 = Argon2::new(Algorithm::Argon2id, Version::V0x13, params);

        Self {
            argon2: Arc::new(argon2),
        }
    }

    /// Hash a password into a PHC string
    pub fn hash_password(&self, password: &str) -> Result<String, PasswordError> {
        let salt = SaltString::generate(&mut OsRng);

        let password_hash = self
            .argon2
            .hash_password(password.as_bytes(), &salt)
            .map_err(|e| PasswordError::HashingFailed(e.to_string()))?;

        Ok(password_hash.to_string())
    }
}

impl Default for PasswordHasher {
    fn default() -> Self {
        Self::new()
    }
}

/// Password verifier
///
/// Verification reads salt and parameters from the stored PHC string,
/// so a default Argon2 instance suffices.
#[derive(Clone)]
pub struct PasswordVerifier {
    argon2: Arc<Argon2<'static>>,
}

impl PasswordVerifier {
    /// Create a new password verifier
    pub fn new() -> Self {
        Self {
            argon2: Arc::new(Argon2::default()),
        }
    }

    /// Verify a password against a stored PHC hash
    pub fn verify_password(&self, password: &str, hash: &str) -> Result<(), PasswordError> {
        let parsed_hash =
            PasswordHash::new(hash).map_err(|e| PasswordError::InvalidHash(e.to_string()))?;

        self.argon2
            .verify_password(password.as_bytes(), &parsed_hash)
            .map_err(|e| match e {
                Argon2Error::Password => PasswordError::VerificationFailed,
                other => PasswordError::InvalidHash(other.to_string()),
            })?;

        Ok(())
    }
}

impl Default for PasswordVerifier {
    fn default() -> Self {
        Self::new()
    }
}

/// Password-related errors
#[derive(Debug, thiserror::Error)]
pub enum PasswordError {
    #[error("Password hashing failed: {0}")]
    HashingFailed(String),

    #[error("Invalid password hash: {0}")]
    InvalidHash(String),

    #[error("Password verification failed")]
    VerificationFailed,
}

/// A process-constant dummy hash used to equalize login timing
///
/// When the account for a login attempt does not exist, the caller still
/// performs a full Argon2 verification against this hash so that the
/// unknown-email and wrong-password paths are indistinguishable.
pub fn dummy_hash(hasher: &PasswordHasher) -> Result<String, PasswordError> {
    hasher.hash_password("girok-timing-equalizer")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_password_hashing() {
        let hasher = PasswordHasher::new();
        let password = "MySecureP@ssw0rd";

        let hash = hasher.hash_password(password).unwrap();
        assert!(!hash.is_empty());
        assert!(hash.starts_with("$argon2id$"));
    }

    #[test]
    fn test_password_verification() {
        let hasher = PasswordHasher::new();
        let verifier = PasswordVerifier::new();
        let password = "MySecureP@ssw0rd";

        let hash = hasher.hash_password(password).unwrap();

        assert!(verifier.verify_password(password, &hash).is_ok());
        assert!(matches!(
            verifier.verify_password("WrongPassword123", &hash),
            Err(PasswordError::VerificationFailed)
        ));
    }

    #[test]
    fn test_different_hashes_for_same_password() {
        let hasher = PasswordHasher::new();
        let password = "MySecureP@ssw0rd";

        let hash1 = hasher.hash_password(password).unwrap();
        let hash2 = hasher.hash_password(password).unwrap();

        // Different salts produce different PHC strings
        assert_ne!(hash1, hash2);

        let verifier = PasswordVerifier::new();
        assert!(verifier.verify_password(password, &hash1).is_ok());
        assert!(verifier.verify_password(password, &hash2).is_ok());
    }

    #[test]
    fn test_dummy_hash_verifies_like_a_real_one() {
        let hasher = PasswordHasher::new();
        let verifier = PasswordVerifier::new();

        let dummy = dummy_hash(&hasher).unwrap();
        // Any candidate password fails verification but exercises the
        // same code path as a wrong password on a real account.
        assert!(verifier.verify_password("whatever", &dummy).is_err());
    }
}
