//! Client configuration loading from TOML and environment variables.
//!
//! The client reads its configuration from:
//! 1. A TOML config file (default: config/vaultlink.toml)
//! 2. Environment variables (override TOML values)
//!
//! Environment variable prefix: VAULTLINK_

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use vaultlink_protocol::{DEFAULT_CONNECT_TIMEOUT_SECS, DEFAULT_REQUEST_TIMEOUT_SECS};

/// Top-level client configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClientConfig {
    /// Relay server configuration.
    #[serde(default)]
    pub relay: RelayConfig,
    /// Vault storage configuration.
    #[serde(default)]
    pub vault: VaultConfig,
    /// Logging configuration.
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Relay connection configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RelayConfig {
    /// Base URL of the relay server.
    #[serde(default = "default_relay_url")]
    pub url: String,
    /// Request timeout in seconds.
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,
    /// Connect timeout in seconds.
    #[serde(default = "default_connect_timeout")]
    pub connect_timeout_secs: u64,
}

/// Vault storage configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VaultConfig {
    /// Directory holding the vault record. The vault is always
    /// constructed from this explicit path, never from ambient lookup.
    #[serde(default = "default_vault_dir")]
    pub dir: PathBuf,
}

/// Logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level filter (e.g., "info", "debug", "vaultlink=debug").
    #[serde(default = "default_log_level")]
    pub level: String,
}

// -- Defaults --

fn default_relay_url() -> String {
    "http://127.0.0.1:9470".to_string()
}
fn default_request_timeout() -> u64 {
    DEFAULT_REQUEST_TIMEOUT_SECS
}
fn default_connect_timeout() -> u64 {
    DEFAULT_CONNECT_TIMEOUT_SECS
}
fn default_log_level() -> String {
    "info".to_string()
}

/// Default vault directory: ~/.vaultlink, falling back to the working
/// directory when no home directory is resolvable.
pub fn default_vault_dir() -> PathBuf {
    dirs::home_dir()
        .map(|home| home.join(".vaultlink"))
        .unwrap_or_else(|| PathBuf::from(".vaultlink"))
}

// -- Trait impls --

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            url: default_relay_url(),
            request_timeout_secs: default_request_timeout(),
            connect_timeout_secs: default_connect_timeout(),
        }
    }
}

impl Default for VaultConfig {
    fn default() -> Self {
        Self {
            dir: default_vault_dir(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            relay: RelayConfig::default(),
            vault: VaultConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

impl ClientConfig {
    /// Load configuration from a TOML file.
    pub fn from_file(path: &Path) -> Result<Self, anyhow::Error> {
        let content = std::fs::read_to_string(path)?;
        let config: ClientConfig = toml::from_str(&content)?;
        Ok(config)
    }

    /// Load configuration from a TOML file, with environment variable
    /// overrides.
    pub fn load(path: Option<&Path>) -> Result<Self, anyhow::Error> {
        let mut config = if let Some(path) = path {
            if path.exists() {
                Self::from_file(path)?
            } else {
                tracing::warn!(
                    path = %path.display(),
                    "Config file not found, using defaults"
                );
                Self::default()
            }
        } else {
            Self::default()
        };

        config.apply_env_overrides();

        Ok(config)
    }

    /// Apply environment variable overrides to the configuration.
    fn apply_env_overrides(&mut self) {
        if let Ok(val) = std::env::var("VAULTLINK_RELAY_URL") {
            self.relay.url = val;
        }
        if let Ok(val) = std::env::var("VAULTLINK_REQUEST_TIMEOUT_SECS") {
            if let Ok(secs) = val.parse() {
                self.relay.request_timeout_secs = secs;
            }
        }
        if let Ok(val) = std::env::var("VAULTLINK_CONNECT_TIMEOUT_SECS") {
            if let Ok(secs) = val.parse() {
                self.relay.connect_timeout_secs = secs;
            }
        }
        if let Ok(val) = std::env::var("VAULTLINK_VAULT_DIR") {
            self.vault.dir = PathBuf::from(val);
        }
        if let Ok(val) = std::env::var("VAULTLINK_LOG_LEVEL") {
            self.logging.level = val;
        }
    }
}
