//! Path resolution for config and database files.

use std::path::PathBuf;

use crate::cli::Cli;
use crate::config::{default_config_path, default_db_path, UserDbConfig};

/// Resolve the config file path.
///
/// Returns the path and whether it was given explicitly (`--config` or
/// `USERDB_CONFIG`). An explicit path must exist; the default may not.
pub fn resolve_config_path(cli: &Cli) -> anyhow::Result<(PathBuf, bool)> {
    if let Some(path) = cli.config.as_deref() {
        if !path.trim().is_empty() {
            return Ok((PathBuf::from(path), true));
        }
    }
    Ok((default_config_path()?, false))
}

/// Resolve the database path: `--db` / `USERDB_PATH`, then the config
/// file's `[database] path`, then the XDG data directory.
pub fn resolve_db_path(cli: &Cli, config: &UserDbConfig) -> anyhow::Result<PathBuf> {
    if let Some(path) = cli.db.as_deref() {
        if !path.trim().is_empty() {
            return Ok(PathBuf::from(path));
        }
    }
    if let Some(path) = config.database.path.as_deref() {
        return Ok(PathBuf::from(path));
    }
    default_db_path()
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    #[test]
    fn test_db_flag_wins_over_config() {
        let cli = Cli::try_parse_from(["userdb", "--db", "/flag/users.db", "list"]).unwrap();
        let config: UserDbConfig = toml::from_str("[database]\npath = \"/config/users.db\"\n").unwrap();
        assert_eq!(
            resolve_db_path(&cli, &config).unwrap(),
            PathBuf::from("/flag/users.db")
        );
    }

    #[test]
    fn test_config_path_used_without_flag() {
        let cli = Cli::try_parse_from(["userdb", "list"]).unwrap();
        if cli.db.is_some() {
            // USERDB_PATH is set in this environment.
            return;
        }
        let config: UserDbConfig = toml::from_str("[database]\npath = \"/config/users.db\"\n").unwrap();
        assert_eq!(
            resolve_db_path(&cli, &config).unwrap(),
            PathBuf::from("/config/users.db")
        );
    }

    #[test]
    fn test_explicit_config_flag() {
        let cli = Cli::try_parse_from(["userdb", "--config", "/etc/userdb.toml", "list"]).unwrap();
        let (path, explicit) = resolve_config_path(&cli).unwrap();
        assert_eq!(path, PathBuf::from("/etc/userdb.toml"));
        assert!(explicit);
    }
}
