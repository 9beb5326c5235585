//! Configuration loading and management
//!
//! Handles parsing of the optional `.tasks/config.toml` file.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::storage::Storage;
use crate::task::Status;

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Default author recorded on notes
    #[serde(default = "default_author")]
    pub author: String,

    /// Listing defaults
    #[serde(default)]
    pub list: ListConfig,

    /// Context summary window
    #[serde(default)]
    pub context: ContextConfig,

    /// Viewer server settings
    #[serde(default)]
    pub serve: ServeConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            author: default_author(),
            list: ListConfig::default(),
            context: ContextConfig::default(),
            serve: ServeConfig::default(),
        }
    }
}

fn default_author() -> String {
    "human".to_string()
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ListConfig {
    /// Status shown by `list` when none is given; "all" disables filtering
    #[serde(default = "default_list_status")]
    pub default_status: String,
}

fn default_list_status() -> String {
    "active".to_string()
}

impl Default for ListConfig {
    fn default() -> Self {
        Self {
            default_status: default_list_status(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContextConfig {
    /// How far back a done task still counts as recently completed
    #[serde(default = "default_recent_days")]
    pub recent_days: u32,

    /// Maximum recently completed tasks to show
    #[serde(default = "default_recent_limit")]
    pub recent_limit: usize,
}

/// A century; anything longer is a typo
pub const MAX_RECENT_DAYS: u32 = 36_500;

fn default_recent_days() -> u32 {
    7
}

fn default_recent_limit() -> usize {
    5
}

impl Default for ContextConfig {
    fn default() -> Self {
        Self {
            recent_days: default_recent_days(),
            recent_limit: default_recent_limit(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServeConfig {
    #[serde(default = "default_port")]
    pub port: u16,
}

fn default_port() -> u16 {
    8080
}

impl Default for ServeConfig {
    fn default() -> Self {
        Self {
            port: default_port(),
        }
    }
}

impl Config {
    /// Load configuration from a TOML file
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration for a store, or return defaults
    pub fn load_from_store(storage: &Storage) -> Self {
        let path = storage.config_file();
        if !path.exists() {
            return Self::default();
        }
        Self::load(&path).unwrap_or_else(|err| {
            tracing::warn!(path = %path.display(), "ignoring invalid config: {err}");
            Self::default()
        })
    }

    /// Save configuration to a file
    pub fn save(&self, path: &Path) -> Result<()> {
        let content = toml::to_string_pretty(self)?;
        crate::atomic::write_atomic(path, content.as_bytes())
    }

    fn validate(&self) -> Result<()> {
        if self.author.trim().is_empty() {
            return Err(Error::InvalidConfig("author cannot be empty".to_string()));
        }

        let status = self.list.default_status.trim();
        if !status.eq_ignore_ascii_case("all") && status.parse::<Status>().is_err() {
            return Err(Error::InvalidConfig(format!(
                "list.default_status '{status}' is not a known status or 'all'"
            )));
        }

        if self.context.recent_days == 0 || self.context.recent_days > MAX_RECENT_DAYS {
            return Err(Error::InvalidConfig(format!(
                "context.recent_days must be between 1 and {MAX_RECENT_DAYS}"
            )));
        }
        if self.context.recent_limit == 0 {
            return Err(Error::InvalidConfig(
                "context.recent_limit must be > 0".to_string(),
            ));
        }
        if self.serve.port == 0 {
            return Err(Error::InvalidConfig("serve.port must be > 0".to_string()));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn defaults_are_expected() {
        let cfg = Config::default();
        assert_eq!(cfg.author, "human");
        assert_eq!(cfg.list.default_status, "active");
        assert_eq!(cfg.context.recent_days, 7);
        assert_eq!(cfg.context.recent_limit, 5);
        assert_eq!(cfg.serve.port, 8080);
    }

    #[test]
    fn load_parses_overrides() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("config.toml");
        let content = r#"
author = "alice"

[list]
default_status = "all"

[context]
recent_days = 14
recent_limit = 3

[serve]
port = 9000
"#;
        fs::write(&path, content).expect("write config");

        let cfg = Config::load(&path).expect("load");
        assert_eq!(cfg.author, "alice");
        assert_eq!(cfg.list.default_status, "all");
        assert_eq!(cfg.context.recent_days, 14);
        assert_eq!(cfg.context.recent_limit, 3);
        assert_eq!(cfg.serve.port, 9000);
    }

    #[test]
    fn partial_file_keeps_defaults() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("config.toml");
        fs::write(&path, "[context]\nrecent_limit = 2\n").expect("write config");

        let cfg = Config::load(&path).expect("load");
        assert_eq!(cfg.author, "human");
        assert_eq!(cfg.context.recent_days, 7);
        assert_eq!(cfg.context.recent_limit, 2);
    }

    #[test]
    fn oversized_recent_days_rejected() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("config.toml");
        fs::write(&path, "[context]\nrecent_days = 4000000000\n").expect("write");

        let err = Config::load(&path).unwrap_err();
        assert!(matches!(err, Error::InvalidConfig(_)));

        fs::write(&path, "[context]\nrecent_days = 36500\n").expect("write");
        assert_eq!(Config::load(&path).unwrap().context.recent_days, MAX_RECENT_DAYS);
    }

    #[test]
    fn invalid_default_status_rejected() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("config.toml");
        fs::write(&path, "[list]\ndefault_status = \"someday\"\n").expect("write config");

        let err = Config::load(&path).expect_err("should reject");
        assert!(matches!(err, Error::InvalidConfig(_)));
    }

    #[test]
    fn load_from_store_defaults_when_missing_or_invalid() {
        let dir = tempfile::tempdir().expect("tempdir");
        let storage = Storage::new(dir.path());
        storage.initialize().expect("init");

        let cfg = Config::load_from_store(&storage);
        assert_eq!(cfg.serve.port, 8080);

        fs::write(storage.config_file(), "[serve]\nport = 0\n").expect("write config");
        let cfg = Config::load_from_store(&storage);
        assert_eq!(cfg.serve.port, 8080);

        fs::write(storage.config_file(), "author = \"bot\"\n").expect("write config");
        let cfg = Config::load_from_store(&storage);
        assert_eq!(cfg.author, "bot");
    }

    #[test]
    fn save_writes_toml() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("config.toml");
        let mut cfg = Config::default();
        cfg.context.recent_limit = 9;

        cfg.save(&path).expect("save");
        let content = fs::read_to_string(&path).expect("read");
        assert!(content.contains("recent_limit = 9"));

        let loaded = Config::load(&path).expect("load");
        assert_eq!(loaded.context.recent_limit, 9);
    }
}
