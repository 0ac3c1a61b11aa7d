//! Credential hashing.
//!
//! The store only needs `hash` and `verify`; [`Argon2Hasher`] is the
//! production implementation. Hashes are PHC strings, so the cost
//! parameters and salt travel with each stored credential and verification
//! keeps working after the configured cost changes.

use argon2::password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString};
use argon2::{Algorithm, Argon2, Params, Version};
use rand::rngs::OsRng;

use crate::config::HashingConfig;
use crate::error::{Result, UserDbError};

/// Password hashing collaborator.
///
/// Both methods are CPU-bound and may take tens of milliseconds; async
/// callers should run them on the blocking pool.
pub trait CredentialHasher: Send + Sync + 'static {
    /// Hash a plaintext password into an opaque credential string.
    fn hash(&self, plain: &str) -> Result<String>;

    /// Check a plaintext password against a stored credential.
    ///
    /// Returns `Ok(false)` on mismatch, including when the stored credential
    /// is not something this hasher produced.
    fn verify(&self, plain: &str, hashed: &str) -> Result<bool>;
}

/// Argon2id password hasher.
#[derive(Debug, Clone)]
pub struct Argon2Hasher {
    params: Params,
}

impl Argon2Hasher {
    /// Create a hasher with the given cost.
    ///
    /// # Errors
    ///
    /// Returns `UserDbError::InvalidInput` if Argon2 rejects the parameters.
    pub fn new(config: &HashingConfig) -> Result<Self> {
        Ok(Self {
            params: config.params()?,
        })
    }

    fn argon2(&self) -> Argon2<'static> {
        Argon2::new(Algorithm::Argon2id, Version::V0x13, self.params.clone())
    }
}

impl Default for Argon2Hasher {
    fn default() -> Self {
        Self {
            params: Params::default(),
        }
    }
}

impl CredentialHasher for Argon2Hasher {
    fn hash(&self, plain: &str) -> Result<String> {
        let salt = SaltString::generate(&mut OsRng);
        let hash = self
            .argon2()
            .hash_password(plain.as_bytes(), &salt)
            .map_err(|e| UserDbError::Crypto(format!("Password hashing failed: {}", e)))?;
        Ok(hash.to_string())
    }

    fn verify(&self, plain: &str, hashed: &str) -> Result<bool> {
        let parsed = match PasswordHash::new(hashed) {
            Ok(parsed) => parsed,
            Err(e) => {
                tracing::debug!(error = %e, "Stored credential is not a PHC string");
                return Ok(false);
            }
        };
        // Cost parameters come from the stored hash, not from `self`.
        match Argon2::default().verify_password(plain.as_bytes(), &parsed) {
            Ok(()) => Ok(true),
            Err(argon2::password_hash::Error::Password) => Ok(false),
            Err(e) => Err(UserDbError::Crypto(format!(
                "Password verification failed: {}",
                e
            ))),
        }
    }
}

/// Stores passwords verbatim.
///
/// DO NOT USE outside throughput benchmarks. Only compiled with the
/// `insecure-plaintext` feature.
#[cfg(feature = "insecure-plaintext")]
#[derive(Debug, Clone, Copy, Default)]
pub struct PlaintextHasher;

#[cfg(feature = "insecure-plaintext")]
impl CredentialHasher for PlaintextHasher {
    fn hash(&self, plain: &str) -> Result<String> {
        Ok(plain.to_string())
    }

    fn verify(&self, plain: &str, hashed: &str) -> Result<bool> {
        Ok(plain == hashed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn hasher() -> Argon2Hasher {
        Argon2Hasher::new(&HashingConfig::minimal()).unwrap()
    }

    #[test]
    fn test_hash_is_not_plaintext() {
        let hashed = hasher().hash("test123").unwrap();
        assert_ne!(hashed, "test123");
        assert!(hashed.starts_with("$argon2id$"));
    }

    #[test]
    fn test_hash_is_salted() {
        let hasher = hasher();
        let first = hasher.hash("same-password").unwrap();
        let second = hasher.hash("same-password").unwrap();
        assert_ne!(first, second);
    }

    #[test]
    fn test_verify_match_and_mismatch() {
        let hasher = hasher();
        let hashed = hasher.hash("supersecret").unwrap();
        assert!(hasher.verify("supersecret", &hashed).unwrap());
        assert!(!hasher.verify("BADPASSWORD", &hashed).unwrap());
    }

    #[test]
    fn test_verify_uses_cost_from_hash() {
        let cheap = hasher();
        let hashed = cheap.hash("supersecret").unwrap();
        let other = Argon2Hasher::new(&HashingConfig {
            memory_kib: 64,
            iterations: 3,
            parallelism: 2,
        })
        .unwrap();
        assert!(other.verify("supersecret", &hashed).unwrap());
    }

    #[test]
    fn test_verify_garbage_is_mismatch() {
        assert!(!hasher().verify("supersecret", "supersecret").unwrap());
        assert!(!hasher().verify("x", "").unwrap());
    }

    #[cfg(feature = "insecure-plaintext")]
    #[test]
    fn test_plaintext_hasher() {
        let hashed = PlaintextHasher.hash("supersecret").unwrap();
        assert_eq!(hashed, "supersecret");
        assert!(PlaintextHasher.verify("supersecret", &hashed).unwrap());
        assert!(!PlaintextHasher.verify("other", &hashed).unwrap());
    }
}
