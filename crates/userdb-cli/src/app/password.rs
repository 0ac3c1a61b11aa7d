//! Password input.

use std::io::IsTerminal;

use dialoguer::Password;
use zeroize::Zeroizing;

use crate::errors::CliError;

/// How to prompt when no password was given on the command line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PasswordPrompt {
    /// Ask once.
    Once,
    /// Ask twice and require both entries to match.
    Confirm,
}

/// Take the password from `--password`, or prompt for it with hidden input.
///
/// Fails with an invalid-input error when no password was given and stdin
/// is not a terminal.
pub fn read_password(
    given: Option<&str>,
    prompt: PasswordPrompt,
) -> anyhow::Result<Zeroizing<String>> {
    if let Some(value) = given {
        return Ok(Zeroizing::new(value.to_string()));
    }

    if !std::io::stdin().is_terminal() {
        return Err(CliError::invalid_input(
            "No password given. Pass --password or run in a terminal to be prompted.",
        )
        .into());
    }

    let mut input = Password::new().with_prompt("Password");
    if prompt == PasswordPrompt::Confirm {
        input = input.with_confirmation("Confirm password", "Passwords do not match.");
    }
    let password = input
        .interact()
        .map_err(|e| anyhow::anyhow!("Failed to read password: {}", e))?;
    Ok(Zeroizing::new(password))
}
