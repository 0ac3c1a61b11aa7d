use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use userdb_core::{HashingConfig, StoreConfig};

/// Contents of `config.toml`. Every section is optional.
#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct UserDbConfig {
    pub database: DatabaseSection,
    pub store: StoreSection,
    pub hashing: HashingConfig,
}

#[derive(Debug, Default, Serialize, Deserialize)]
pub struct DatabaseSection {
    pub path: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreSection {
    pub write_shards: usize,
}

impl Default for StoreSection {
    fn default() -> Self {
        Self {
            write_shards: StoreConfig::default().write_shards,
        }
    }
}

impl UserDbConfig {
    /// Store settings described by this file.
    pub fn store_config(&self) -> StoreConfig {
        StoreConfig::default()
            .with_write_shards(self.store.write_shards)
            .with_hashing(self.hashing)
    }
}

pub fn default_config_path() -> anyhow::Result<PathBuf> {
    Ok(xdg_config_dir()?.join("config.toml"))
}

pub fn default_db_path() -> anyhow::Result<PathBuf> {
    Ok(xdg_data_dir()?.join("users.db"))
}

pub fn read_config(path: &Path) -> anyhow::Result<UserDbConfig> {
    let contents = std::fs::read_to_string(path)
        .map_err(|e| anyhow::anyhow!("Failed to read config {}: {}", path.display(), e))?;
    toml::from_str(&contents)
        .map_err(|e| anyhow::anyhow!("Failed to parse config {}: {}", path.display(), e))
}

pub fn xdg_config_dir() -> anyhow::Result<PathBuf> {
    if let Ok(value) = std::env::var("XDG_CONFIG_HOME") {
        if !value.trim().is_empty() {
            return Ok(PathBuf::from(value).join("userdb"));
        }
    }
    Ok(home_dir()?.join(".config").join("userdb"))
}

pub fn xdg_data_dir() -> anyhow::Result<PathBuf> {
    if let Ok(value) = std::env::var("XDG_DATA_HOME") {
        if !value.trim().is_empty() {
            return Ok(PathBuf::from(value).join("userdb"));
        }
    }
    Ok(home_dir()?.join(".local").join("share").join("userdb"))
}

fn home_dir() -> anyhow::Result<PathBuf> {
    let home = std::env::var("HOME")
        .map_err(|_| anyhow::anyhow!("HOME is not set; cannot resolve default paths"))?;
    Ok(PathBuf::from(home))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_config_uses_defaults() {
        let config: UserDbConfig = toml::from_str("").unwrap();
        assert!(config.database.path.is_none());
        assert_eq!(config.store_config(), StoreConfig::default());
    }

    #[test]
    fn test_full_config() {
        let config: UserDbConfig = toml::from_str(
            r#"
[database]
path = "/tmp/users.db"

[store]
write_shards = 8

[hashing]
memory_kib = 4096
iterations = 3
parallelism = 2
"#,
        )
        .unwrap();
        assert_eq!(config.database.path.as_deref(), Some("/tmp/users.db"));
        let store = config.store_config();
        assert_eq!(store.write_shards, 8);
        assert_eq!(store.hashing.memory_kib, 4096);
        assert_eq!(store.hashing.iterations, 3);
        assert_eq!(store.hashing.parallelism, 2);
    }

    #[test]
    fn test_partial_hashing_section() {
        let config: UserDbConfig = toml::from_str("[hashing]\niterations = 5\n").unwrap();
        assert_eq!(config.hashing.iterations, 5);
        assert_eq!(config.hashing.memory_kib, HashingConfig::default().memory_kib);
    }

    #[test]
    fn test_unknown_value_type_is_error() {
        let result: Result<UserDbConfig, _> = toml::from_str("[store]\nwrite_shards = \"many\"\n");
        assert!(result.is_err());
    }

    #[test]
    fn test_read_config_reports_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("missing.toml");
        let err = read_config(&path).unwrap_err();
        assert!(err.to_string().contains("missing.toml"));
    }
}
