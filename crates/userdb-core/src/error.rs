//! Error types for userdb core operations.
//!
//! Errors are descriptive at the core level; the CLI layer maps these
//! to exit codes and user-facing messages.

use thiserror::Error;

/// Result type alias for userdb operations.
pub type Result<T> = std::result::Result<T, UserDbError>;

/// Core error type for userdb operations.
#[derive(Debug, Error)]
pub enum UserDbError {
    /// No account stored under the given email
    #[error("Not found: {0}")]
    NotFound(String),

    /// The account exists but the supplied password does not match
    #[error("Password mismatch")]
    PasswordMismatch,

    /// A stored key or value could not be decoded
    #[error("Decode error: {0}")]
    Decode(String),

    /// Storage engine failure
    #[error("Storage error: {0}")]
    Storage(String),

    /// Password hashing failure
    #[error("Hashing error: {0}")]
    Crypto(String),

    /// Invalid caller input or configuration
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// The write queue has been shut down
    #[error("Write queue is closed")]
    QueueClosed,

    /// Async runtime failure (no runtime, worker panicked)
    #[error("Runtime error: {0}")]
    Runtime(String),
}

impl UserDbError {
    /// Whether this error means "no such account".
    pub fn is_not_found(&self) -> bool {
        matches!(self, UserDbError::NotFound(_))
    }
}

impl From<sled::Error> for UserDbError {
    fn from(err: sled::Error) -> Self {
        UserDbError::Storage(err.to_string())
    }
}

impl From<std::io::Error> for UserDbError {
    fn from(err: std::io::Error) -> Self {
        UserDbError::Storage(err.to_string())
    }
}

impl From<serde_json::Error> for UserDbError {
    fn from(err: serde_json::Error) -> Self {
        UserDbError::Decode(err.to_string())
    }
}

impl From<tokio::task::JoinError> for UserDbError {
    fn from(err: tokio::task::JoinError) -> Self {
        UserDbError::Runtime(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_not_found_is_distinct_from_mismatch() {
        assert!(UserDbError::NotFound("a@example.com".to_string()).is_not_found());
        assert!(!UserDbError::PasswordMismatch.is_not_found());
    }

    #[test]
    fn test_messages() {
        assert_eq!(
            UserDbError::NotFound("a@example.com".to_string()).to_string(),
            "Not found: a@example.com"
        );
        assert_eq!(UserDbError::QueueClosed.to_string(), "Write queue is closed");
    }
}
