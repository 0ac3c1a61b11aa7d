//! Store configuration.
//!
//! Both structs deserialize from partial input; missing fields fall back to
//! their defaults, so a config file only needs to name what it overrides.

use serde::{Deserialize, Serialize};

use crate::error::{Result, UserDbError};

/// Argon2id defaults (argon2 crate recommendation):
/// - Memory: 19 MiB
/// - Iterations: 2
/// - Parallelism: 1
pub const DEFAULT_MEMORY_KIB: u32 = 19 * 1024;
pub const DEFAULT_ITERATIONS: u32 = 2;
pub const DEFAULT_PARALLELISM: u32 = 1;

/// Upper bound on write queue shards.
pub const MAX_WRITE_SHARDS: usize = 1024;

/// Configuration for an [`AccountStore`](crate::AccountStore).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    /// Number of independent write queues.
    ///
    /// `1` (the default) admits one read-modify-write sequence at a time
    /// for the whole store. Larger values shard the queue by email hash;
    /// operations on the same email still run in arrival order.
    pub write_shards: usize,

    /// Password hashing cost.
    pub hashing: HashingConfig,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            write_shards: 1,
            hashing: HashingConfig::default(),
        }
    }
}

impl StoreConfig {
    pub fn with_write_shards(mut self, shards: usize) -> Self {
        self.write_shards = shards;
        self
    }

    pub fn with_hashing(mut self, hashing: HashingConfig) -> Self {
        self.hashing = hashing;
        self
    }

    /// Check the configuration is usable.
    ///
    /// # Errors
    ///
    /// Returns `UserDbError::InvalidInput` if the shard count is zero or
    /// above [`MAX_WRITE_SHARDS`], or if the hashing cost is rejected.
    pub fn validate(&self) -> Result<()> {
        if self.write_shards == 0 {
            return Err(UserDbError::InvalidInput(
                "write_shards must be at least 1".to_string(),
            ));
        }
        if self.write_shards > MAX_WRITE_SHARDS {
            return Err(UserDbError::InvalidInput(format!(
                "write_shards must be at most {} (got {})",
                MAX_WRITE_SHARDS, self.write_shards
            )));
        }
        self.hashing.validate()
    }
}

/// Argon2id cost parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct HashingConfig {
    pub memory_kib: u32,
    pub iterations: u32,
    pub parallelism: u32,
}

impl Default for HashingConfig {
    fn default() -> Self {
        Self {
            memory_kib: DEFAULT_MEMORY_KIB,
            iterations: DEFAULT_ITERATIONS,
            parallelism: DEFAULT_PARALLELISM,
        }
    }
}

impl HashingConfig {
    /// Cheapest parameters Argon2 accepts. Test use only.
    pub fn minimal() -> Self {
        Self {
            memory_kib: argon2::Params::MIN_M_COST,
            iterations: argon2::Params::MIN_T_COST,
            parallelism: argon2::Params::MIN_P_COST,
        }
    }

    pub(crate) fn params(&self) -> Result<argon2::Params> {
        argon2::Params::new(self.memory_kib, self.iterations, self.parallelism, None)
            .map_err(|e| UserDbError::InvalidInput(format!("Invalid hashing parameters: {}", e)))
    }

    pub fn validate(&self) -> Result<()> {
        self.params().map(|_| ())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_single_queue() {
        let config = StoreConfig::default();
        assert_eq!(config.write_shards, 1);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_zero_shards_rejected() {
        let result = StoreConfig::default().with_write_shards(0).validate();
        assert!(result.is_err());
        assert!(result
            .unwrap_err()
            .to_string()
            .contains("write_shards must be at least 1"));
    }

    #[test]
    fn test_too_many_shards_rejected() {
        let config = StoreConfig::default().with_write_shards(MAX_WRITE_SHARDS + 1);
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_invalid_hashing_rejected() {
        let hashing = HashingConfig {
            memory_kib: 1,
            iterations: 0,
            parallelism: 1,
        };
        assert!(StoreConfig::default()
            .with_hashing(hashing)
            .validate()
            .is_err());
    }

    #[test]
    fn test_minimal_hashing_is_valid() {
        assert!(HashingConfig::minimal().validate().is_ok());
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let config: StoreConfig =
            serde_json::from_str(r#"{ "hashing": { "iterations": 4 } }"#).unwrap();
        assert_eq!(config.write_shards, 1);
        assert_eq!(config.hashing.iterations, 4);
        assert_eq!(config.hashing.memory_kib, DEFAULT_MEMORY_KIB);
    }
}
