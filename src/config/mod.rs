//! # Configuration
//!
//! Settings for a tool mode host process, read from a TOML file.
//!
//! ## Sections
//!
//! - [`SystemConfig`] - which side this process runs and the default asset domain
//! - [`StorageConfig`] - where authoritative selections are persisted
//! - [`AssetsConfig`] - group definition directory and object definition file
//! - [`LoggingConfig`] - log level and optional log file
//! - `[[modes]]` - data-driven label modes registered at start-up
//!
//! ## Usage
//!
//! ```rust,no_run
//! use toolmodes::config::Config;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = Config::load("toolmodes.toml").await?;
//!     config.validate()?;
//!     println!("side: {}", config.system.side);
//!     Ok(())
//! }
//! ```
//!
//! ## File format
//!
//! ```toml
//! [system]
//! side = "authoritative"
//! default_domain = "game"
//!
//! [storage]
//! data_dir = "./data"
//!
//! [assets]
//! groups_dir = "./data/toolmodegroups"
//! objects_file = "./data/objects.json"
//!
//! [logging]
//! level = "info"
//!
//! [[modes]]
//! code = "scythe-trim"
//! name = "Trim"
//! ```

use anyhow::{anyhow, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::PathBuf;
use std::str::FromStr;
use tokio::fs;

use crate::code::{AssetCode, DEFAULT_DOMAIN};
use crate::modes::LabelModeConfig;
use crate::system::Side;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub system: SystemConfig,
    pub storage: StorageConfig,
    #[serde(default)]
    pub assets: AssetsConfig,
    pub logging: LoggingConfig,
    #[serde(default)]
    pub modes: Vec<LabelModeConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SystemConfig {
    #[serde(default)]
    pub side: Side,
    #[serde(default = "default_domain")]
    pub default_domain: String,
}

fn default_domain() -> String {
    DEFAULT_DOMAIN.to_string()
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    pub data_dir: String,
    /// Selection database path; defaults to `<data_dir>/selections`.
    #[serde(default)]
    pub selections_db: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AssetsConfig {
    #[serde(default)]
    pub groups_dir: Option<String>,
    #[serde(default)]
    pub objects_file: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    pub level: String,
    pub file: Option<String>,
}

impl Config {
    /// Load configuration from a file
    pub async fn load(path: &str) -> Result<Self> {
        let content = fs::read_to_string(path)
            .await
            .map_err(|e| anyhow!("Failed to read config file {}: {}", path, e))?;

        let config: Config = toml::from_str(&content)
            .map_err(|e| anyhow!("Failed to parse config file {}: {}", path, e))?;

        Ok(config)
    }

    /// Create a default configuration file
    pub async fn create_default(path: &str) -> Result<()> {
        let config = Config::default();
        let content = toml::to_string_pretty(&config)
            .map_err(|e| anyhow!("Failed to serialize default config: {}", e))?;

        fs::write(path, content)
            .await
            .map_err(|e| anyhow!("Failed to write config file {}: {}", path, e))?;

        Ok(())
    }

    pub fn selections_path(&self) -> PathBuf {
        match &self.storage.selections_db {
            Some(path) => PathBuf::from(path),
            None => PathBuf::from(&self.storage.data_dir).join("selections"),
        }
    }

    /// Check values that parse fine but cannot work.
    pub fn validate(&self) -> Result<()> {
        AssetCode::new(&self.system.default_domain, "check")
            .map_err(|e| anyhow!("Invalid system.default_domain: {}", e))?;

        if self.storage.data_dir.trim().is_empty() {
            return Err(anyhow!("storage.data_dir must not be empty"));
        }

        log::LevelFilter::from_str(&self.logging.level)
            .map_err(|_| anyhow!("Invalid logging.level '{}'", self.logging.level))?;

        let mut seen = HashSet::new();
        for mode in &self.modes {
            let code = AssetCode::parse_with_domain(&mode.code, &self.system.default_domain)
                .map_err(|e| anyhow!("Invalid mode code '{}': {}", mode.code, e))?;
            if mode.name.trim().is_empty() {
                return Err(anyhow!("Mode {} has an empty name", code));
            }
            if !seen.insert(code.clone()) {
                return Err(anyhow!("Mode {} is configured twice", code));
            }
        }
        Ok(())
    }
}

impl Default for Config {
    fn default() -> Self {
        let label = |code: &str, name: &str, help: &str| LabelModeConfig {
            code: code.to_string(),
            name: name.to_string(),
            icon: None,
            hotkey: None,
            help: Some(help.to_string()),
        };

        Config {
            system: SystemConfig {
                side: Side::Authoritative,
                default_domain: default_domain(),
            },
            storage: StorageConfig {
                data_dir: "./data".to_string(),
                selections_db: None,
            },
            assets: AssetsConfig {
                groups_dir: Some("./data/toolmodegroups".to_string()),
                objects_file: Some("./data/objects.json".to_string()),
            },
            logging: LoggingConfig {
                level: "info".to_string(),
                file: Some("toolmodes.log".to_string()),
            },
            modes: vec![
                label("scythe-trim", "Trim", "heldhelp-trim"),
                label("scythe-remove", "Remove", "heldhelp-remove"),
                label("hoe-till", "Till", "heldhelp-till"),
            ],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        let config = Config::default();
        config.validate().unwrap();
        assert_eq!(config.system.side, Side::Authoritative);
        assert_eq!(config.selections_path(), PathBuf::from("./data").join("selections"));
    }

    #[test]
    fn default_config_round_trips_through_toml() {
        let text = toml::to_string_pretty(&Config::default()).unwrap();
        let parsed: Config = toml::from_str(&text).unwrap();
        assert_eq!(parsed.modes.len(), 3);
        assert_eq!(parsed.assets.groups_dir.as_deref(), Some("./data/toolmodegroups"));
    }

    #[test]
    fn minimal_file_uses_defaults() {
        let text = r#"
            [system]
            side = "observing"

            [storage]
            data_dir = "/tmp/tm"
            selections_db = "/tmp/tm/db"

            [logging]
            level = "debug"
        "#;
        let config: Config = toml::from_str(text).unwrap();
        assert_eq!(config.system.side, Side::Observing);
        assert_eq!(config.system.default_domain, "game");
        assert!(config.modes.is_empty());
        assert!(config.assets.groups_dir.is_none());
        assert_eq!(config.selections_path(), PathBuf::from("/tmp/tm/db"));
        config.validate().unwrap();
    }

    #[test]
    fn validate_rejects_bad_values() {
        let mut config = Config::default();
        config.logging.level = "loud".to_string();
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.modes.push(config.modes[0].clone());
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.storage.data_dir = " ".to_string();
        assert!(config.validate().is_err());
    }
}
