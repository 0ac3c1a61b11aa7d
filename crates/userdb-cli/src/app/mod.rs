//! Application-level utilities for the userdb CLI.
//!
//! - Application context for unified CLI + config handling
//! - Path resolution for config and database files
//! - Password input

mod context;
mod password;
mod resolver;

pub use context::AppContext;
pub use password::{read_password, PasswordPrompt};
