//! # userdb Core
//!
//! Core library for userdb - a small account store on top of an embedded,
//! ordered key-value engine.
//!
//! ## Architecture
//!
//! - **keys**: order-preserving key codec, namespacing account records
//! - **record**: stored record shape, timestamps, record builder
//! - **password**: credential hashing (Argon2id)
//! - **storage**: key-value engine trait plus memory and sled engines
//! - **serializer**: single-worker queue for read-modify-write operations
//! - **store**: the account store API
//! - **stream**: lazy iteration over stored accounts
//!
//! Reads and plain writes go straight to the engine. Operations whose write
//! depends on a prior read (`modify_user`, `change_password`,
//! `change_email`) are admitted one at a time through the write queue, so
//! they never interleave.

pub mod config;
pub mod error;
pub mod keys;
pub mod password;
pub mod record;
pub mod serializer;
pub mod storage;
pub mod store;
pub mod stream;

pub use config::{HashingConfig, StoreConfig};
pub use error::{Result, UserDbError};
pub use record::{StoredUser, Timestamp, User};
pub use storage::KvEngine;
pub use store::{AccountStore, StoreBuilder};
pub use stream::{UserRange, UserStream};

/// Core version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version() {
        assert!(!VERSION.is_empty());
    }
}
