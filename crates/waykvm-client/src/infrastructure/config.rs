//! TOML configuration for the capture client.
//!
//! Loaded from `$XDG_CONFIG_HOME/waykvm/config.toml` (falling back to
//! `~/.config/waykvm/config.toml`) when the file exists; every field has
//! a default, so a missing file means a fully defaulted config.  The
//! compositor socket itself is resolved from the environment, not from
//! this file (see [`crate::infrastructure::compositor::socket_path`]).

use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use waykvm_core::SurfaceGeometry;

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

// ── Config schema types ───────────────────────────────────────────────────────

/// Top-level client configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ClientConfig {
    #[serde(default)]
    pub relay: RelayConfig,
    #[serde(default)]
    pub surface: SurfaceConfig,
    /// `tracing` log level used when `RUST_LOG` is not set.
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

/// Where the injector listens.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RelayConfig {
    #[serde(default = "default_relay_host")]
    pub host: String,
    #[serde(default = "default_relay_port")]
    pub port: u16,
}

/// Window surface dimensions in pixels.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SurfaceConfig {
    #[serde(default = "default_surface_side")]
    pub width: u32,
    #[serde(default = "default_surface_side")]
    pub height: u32,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            relay: RelayConfig::default(),
            surface: SurfaceConfig::default(),
            log_level: default_log_level(),
        }
    }
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            host: default_relay_host(),
            port: default_relay_port(),
        }
    }
}

impl Default for SurfaceConfig {
    fn default() -> Self {
        Self {
            width: default_surface_side(),
            height: default_surface_side(),
        }
    }
}

impl RelayConfig {
    /// The `host:port` string handed to the TCP connector.
    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

impl SurfaceConfig {
    pub fn geometry(&self) -> SurfaceGeometry {
        SurfaceGeometry::new(self.width, self.height)
    }
}

fn default_relay_host() -> String {
    "127.0.0.1".to_string()
}

fn default_relay_port() -> u16 {
    3001
}

fn default_surface_side() -> u32 {
    700
}

fn default_log_level() -> String {
    "info".to_string()
}

// ── Loading ───────────────────────────────────────────────────────────────────

fn config_path() -> Option<PathBuf> {
    if let Some(dir) = std::env::var_os("XDG_CONFIG_HOME") {
        return Some(PathBuf::from(dir).join("waykvm").join("config.toml"));
    }
    std::env::var_os("HOME")
        .map(|home| PathBuf::from(home).join(".config").join("waykvm").join("config.toml"))
}

/// Loads the config file if it exists, otherwise returns the defaults.
pub fn load() -> Result<ClientConfig, ConfigError> {
    let Some(path) = config_path() else {
        return Ok(ClientConfig::default());
    };
    if !path.exists() {
        return Ok(ClientConfig::default());
    }
    let text = std::fs::read_to_string(&path).map_err(|source| ConfigError::Io {
        path: path.clone(),
        source,
    })?;
    parse(&text)
}

/// Parses a config document.
pub fn parse(text: &str) -> Result<ClientConfig, ConfigError> {
    Ok(toml::from_str(text)?)
}

// ── Tests ─────────────────────────────────────────────────────────────────────
