//! Configuration loading and management
//!
//! Configuration is loaded from `~/.config/courselens/config.toml`
//!
//! This module follows the XDG Base Directory Specification:
//! - Config: `$XDG_CONFIG_HOME/courselens/` (~/.config/courselens/)
//! - Data: `$XDG_DATA_HOME/courselens/` (~/.local/share/courselens/)
//! - State/Logs: `$XDG_STATE_HOME/courselens/` (~/.local/state/courselens/)

use crate::error::{Error, Result};
use serde::Deserialize;
use std::path::PathBuf;

/// Returns a best-effort home directory path.
fn home_dir() -> PathBuf {
    std::env::var_os("HOME")
        .map(PathBuf::from)
        .or_else(dirs::home_dir)
        .unwrap_or_else(|| PathBuf::from("."))
}

/// Returns XDG_CONFIG_HOME or ~/.config
fn xdg_config_home() -> PathBuf {
    std::env::var("XDG_CONFIG_HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| home_dir().join(".config"))
}

/// Returns XDG_DATA_HOME or ~/.local/share
fn xdg_data_home() -> PathBuf {
    std::env::var("XDG_DATA_HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| home_dir().join(".local/share"))
}

/// Returns XDG_STATE_HOME or ~/.local/state
fn xdg_state_home() -> PathBuf {
    std::env::var("XDG_STATE_HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| home_dir().join(".local/state"))
}

/// Main configuration struct
#[derive(Debug, Deserialize, Default)]
pub struct Config {
    /// Report pipeline configuration
    #[serde(default)]
    pub report: ReportConfig,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,

    /// API server configuration
    #[serde(default)]
    pub server: ServerConfig,
}

/// Report pipeline configuration
#[derive(Debug, Deserialize)]
pub struct ReportConfig {
    /// Adapters excluded from the default engine, by name
    /// (e.g. "core.behavioral")
    #[serde(default)]
    pub disabled_adapters: Vec<String>,
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            disabled_adapters: vec![],
        }
    }
}

/// Logging configuration
#[derive(Debug, Deserialize)]
pub struct LoggingConfig {
    /// Log level filter (e.g. "info", "courselens_core=debug")
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

/// API server configuration
#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    /// Bind address for the report surface
    #[serde(default = "default_bind_addr")]
    pub bind_addr: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: default_bind_addr(),
        }
    }
}

fn default_bind_addr() -> String {
    "127.0.0.1:8740".to_string()
}

impl Config {
    /// Load configuration from the default path, falling back to defaults
    /// when no config file exists.
    pub fn load() -> Result<Self> {
        let path = Self::config_path();
        if !path.exists() {
            return Ok(Self::default());
        }
        let contents = std::fs::read_to_string(&path)?;
        toml::from_str(&contents)
            .map_err(|e| Error::Config(format!("failed to parse {}: {}", path.display(), e)))
    }

    /// Path to the config file
    pub fn config_path() -> PathBuf {
        xdg_config_home().join("courselens/config.toml")
    }

    /// Directory for persistent data (the snapshot database)
    pub fn data_dir() -> PathBuf {
        xdg_data_home().join("courselens")
    }

    /// Directory for state files (logs)
    pub fn state_dir() -> PathBuf {
        xdg_state_home().join("courselens")
    }

    /// Default path of the snapshot database
    pub fn database_path() -> PathBuf {
        Self::data_dir().join("courselens.db")
    }

    /// Path of the rotating log file
    pub fn log_path() -> PathBuf {
        Self::state_dir().join("courselens.log")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert!(config.report.disabled_adapters.is_empty());
        assert_eq!(config.logging.level, "info");
        assert_eq!(config.server.bind_addr, "127.0.0.1:8740");
    }

    #[test]
    fn test_parse_config() {
        let config: Config = toml::from_str(
            r#"
            [report]
            disabled_adapters = ["core.behavioral"]

            [logging]
            level = "debug"
            "#,
        )
        .unwrap();
        assert_eq!(config.report.disabled_adapters, vec!["core.behavioral"]);
        assert_eq!(config.logging.level, "debug");
    }

    #[test]
    fn test_paths_end_with_crate_name() {
        assert!(Config::database_path().ends_with("courselens/courselens.db"));
        assert!(Config::log_path().ends_with("courselens/courselens.log"));
    }
}
