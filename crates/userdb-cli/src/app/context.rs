//! Application context for the userdb CLI.
//!
//! Bundles CLI arguments with the lazily-loaded config file.

use std::path::PathBuf;

use once_cell::unsync::OnceCell;
use tracing::debug;
use userdb_core::{AccountStore, StoreConfig};

use crate::cli::Cli;
use crate::config::{read_config, UserDbConfig};
use crate::errors::CliError;

use super::resolver::{resolve_config_path, resolve_db_path};

pub struct AppContext<'a> {
    cli: &'a Cli,
    config: OnceCell<UserDbConfig>,
}

impl<'a> AppContext<'a> {
    pub fn new(cli: &'a Cli) -> Self {
        Self {
            cli,
            config: OnceCell::new(),
        }
    }

    /// Check if quiet mode is enabled.
    pub fn quiet(&self) -> bool {
        self.cli.quiet
    }

    /// The config file, loaded on first use.
    ///
    /// A missing default config file means defaults; a missing explicit one
    /// is an error.
    pub fn config(&self) -> anyhow::Result<&UserDbConfig> {
        self.config.get_or_try_init(|| {
            let (path, explicit) = resolve_config_path(self.cli)?;
            if path.exists() {
                debug!(path = %path.display(), "Loading config");
                read_config(&path)
            } else if explicit {
                Err(CliError::not_found(
                    format!("Config file not found: {}", path.display()),
                    "Hint: Check --config or USERDB_CONFIG.",
                )
                .into())
            } else {
                Ok(UserDbConfig::default())
            }
        })
    }

    pub fn store_config(&self) -> anyhow::Result<StoreConfig> {
        Ok(self.config()?.store_config())
    }

    pub fn db_path(&self) -> anyhow::Result<PathBuf> {
        resolve_db_path(self.cli, self.config()?)
    }

    /// Resolve the database path and create its parent directory.
    pub fn prepare_db_path(&self) -> anyhow::Result<PathBuf> {
        let path = self.db_path()?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| {
                anyhow::anyhow!(
                    "Failed to create database directory {}: {}",
                    parent.display(),
                    e
                )
            })?;
        }
        Ok(path)
    }

    /// Open the sled-backed store, creating the database if needed.
    ///
    /// Must be called inside the Tokio runtime.
    pub fn open_store(&self) -> anyhow::Result<AccountStore> {
        let path = self.prepare_db_path()?;
        debug!(path = %path.display(), "Opening account store");
        Ok(AccountStore::open_sled(&path, self.store_config()?)?)
    }
}
