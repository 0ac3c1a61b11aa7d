//! Typed CLI failures and their exit codes.
//!
//! Anything that is not a `CliError` (or a store error that maps onto one)
//! exits with status 1.

use std::fmt;

use userdb_core::UserDbError;

use crate::constants::exit_codes;

/// Failure classes that have a dedicated exit code.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    NotFound,
    AuthFailed,
    InvalidInput,
}

impl ErrorKind {
    pub fn exit_code(self) -> i32 {
        match self {
            ErrorKind::NotFound => exit_codes::NOT_FOUND,
            ErrorKind::AuthFailed => exit_codes::AUTH_FAILED,
            ErrorKind::InvalidInput => exit_codes::INVALID_INPUT,
        }
    }
}

/// A user-facing failure, with an optional hint on what to try next.
#[derive(Debug)]
pub struct CliError {
    kind: ErrorKind,
    message: String,
    hint: Option<String>,
}

impl CliError {
    fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            hint: None,
        }
    }

    pub fn with_hint(mut self, hint: impl Into<String>) -> Self {
        self.hint = Some(hint.into());
        self
    }

    pub fn not_found(message: impl Into<String>, hint: impl Into<String>) -> Self {
        Self::new(ErrorKind::NotFound, message).with_hint(hint)
    }

    pub fn auth_failed(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::AuthFailed, message)
    }

    pub fn invalid_input(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::InvalidInput, message)
    }

    /// Map a store error onto a typed CLI error.
    ///
    /// Returns `None` for failures that have no dedicated exit code.
    pub fn from_store(err: &UserDbError) -> Option<Self> {
        let mapped = match err {
            UserDbError::NotFound(email) => CliError::not_found(
                format!("No account found for {}", email),
                "Hint: Run `userdb list` to see stored accounts.",
            ),
            UserDbError::PasswordMismatch => CliError::auth_failed("Password mismatch."),
            UserDbError::InvalidInput(message) => CliError::invalid_input(message.clone()),
            _ => return None,
        };
        Some(mapped)
    }

    pub fn exit_code(&self) -> i32 {
        self.kind.exit_code()
    }

    /// Print to stderr and exit with this error's code.
    pub fn exit(&self) -> ! {
        eprintln!("Error: {}", self);
        std::process::exit(self.exit_code())
    }
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)?;
        if let Some(hint) = &self.hint {
            write!(f, "\n{}", hint)?;
        }
        Ok(())
    }
}

impl std::error::Error for CliError {}
