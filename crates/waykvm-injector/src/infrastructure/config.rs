//! TOML configuration for the injector.
//!
//! Loaded from `$XDG_CONFIG_HOME/waykvm/injector.toml` (falling back to
//! `~/.config/waykvm/injector.toml`) when present; every field has a
//! default.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Error type for configuration file operations.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("I/O error accessing config at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config TOML: {0}")]
    Parse(#[from] toml::de::Error),
}

/// Top-level injector configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct InjectorConfig {
    #[serde(default)]
    pub server: ServerConfig,
    /// Name the virtual keyboard registers under.
    #[serde(default = "default_device_name")]
    pub device_name: String,
    /// `tracing` log level used when `RUST_LOG` is not set.
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

/// Listener address settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ServerConfig {
    /// IP address to bind.  `"0.0.0.0"` binds all interfaces.
    #[serde(default = "default_bind_address")]
    pub bind_address: String,
    #[serde(default = "default_port")]
    pub port: u16,
}

impl Default for InjectorConfig {
    fn default() -> Self {
        Self {
            server: ServerConfig::default(),
            device_name: default_device_name(),
            log_level: default_log_level(),
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_address: default_bind_address(),
            port: default_port(),
        }
    }
}

impl ServerConfig {
    pub fn addr(&self) -> String {
        format!("{}:{}", self.bind_address, self.port)
    }
}

fn default_bind_address() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    3001
}

fn default_device_name() -> String {
    "waykvm-virtual-kbd".to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

fn config_path() -> Option<PathBuf> {
    if let Some(dir) = std::env::var_os("XDG_CONFIG_HOME") {
        return Some(PathBuf::from(dir).join("waykvm").join("injector.toml"));
    }
    std::env::var_os("HOME")
        .map(|home| PathBuf::from(home).join(".config").join("waykvm").join("injector.toml"))
}

/// Loads the config file if it exists, otherwise returns the defaults.
pub fn load() -> Result<InjectorConfig, ConfigError> {
    let Some(path) = config_path() else {
        return Ok(InjectorConfig::default());
    };
    if !path.exists() {
        return Ok(InjectorConfig::default());
    }
    let text = std::fs::read_to_string(&path).map_err(|source| ConfigError::Io {
        path: path.clone(),
        source,
    })?;
    parse(&text)
}

/// Parses a config document.
pub fn parse(text: &str) -> Result<InjectorConfig, ConfigError> {
    Ok(toml::from_str(text)?)
}
