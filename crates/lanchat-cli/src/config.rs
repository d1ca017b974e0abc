//! Configuration system for the LANCHAT CLI.

use lanchat_core::{SessionConfig, TransferConfig as CoreTransferConfig};
use lanchat_transport::TransportConfig;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// LANCHAT configuration
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    /// Relay configuration
    #[serde(default)]
    pub relay: RelayConfig,
    /// Identity configuration
    #[serde(default)]
    pub identity: IdentityConfig,
    /// Transfer configuration
    #[serde(default)]
    pub transfer: TransferConfig,
    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Relay configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RelayConfig {
    /// Relay host, with optional `:port`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub host: Option<String>,
    /// Port used when the host carries none
    #[serde(default = "default_relay_port")]
    pub port: u16,
    /// Connect timeout in seconds
    #[serde(default = "default_timeout_secs")]
    pub connect_timeout_secs: u64,
    /// Longest accepted inbound line in bytes
    #[serde(default = "default_max_line_length")]
    pub max_line_length: usize,
    /// Set `TCP_NODELAY` on relay and transfer streams
    #[serde(default = "default_nodelay")]
    pub nodelay: bool,
}

/// Identity configuration
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct IdentityConfig {
    /// Display name registered with the relay
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

/// Transfer configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransferConfig {
    /// Chunk size in bytes
    #[serde(default = "default_chunk_size")]
    pub chunk_size: usize,
    /// Directory for received files
    #[serde(default = "default_download_dir")]
    pub download_dir: PathBuf,
    /// Side-channel connect timeout in seconds
    #[serde(default = "default_timeout_secs")]
    pub connect_timeout_secs: u64,
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level
    #[serde(default = "default_log_level")]
    pub level: String,
}

// Default values

fn default_relay_port() -> u16 {
    lanchat_core::DEFAULT_RELAY_PORT
}

fn default_timeout_secs() -> u64 {
    10
}

fn default_max_line_length() -> usize {
    lanchat_core::DEFAULT_MAX_LINE_LENGTH
}

fn default_nodelay() -> bool {
    TransportConfig::default().nodelay
}

fn default_chunk_size() -> usize {
    lanchat_files::DEFAULT_CHUNK_SIZE
}

fn default_download_dir() -> PathBuf {
    dirs::download_dir()
        .or_else(dirs::home_dir)
        .unwrap_or_else(|| PathBuf::from("."))
        .join("lanchat")
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            host: None,
            port: default_relay_port(),
            connect_timeout_secs: default_timeout_secs(),
            max_line_length: default_max_line_length(),
            nodelay: default_nodelay(),
        }
    }
}

impl Default for TransferConfig {
    fn default() -> Self {
        Self {
            chunk_size: default_chunk_size(),
            download_dir: default_download_dir(),
            connect_timeout_secs: default_timeout_secs(),
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

impl Config {
    /// Load configuration from file
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn load<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let contents = fs::read_to_string(path)?;
        let config: Self = toml::from_str(&contents)?;
        Ok(config)
    }

    /// Save configuration to file
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be written.
    pub fn save<P: AsRef<Path>>(&self, path: P) -> anyhow::Result<()> {
        let contents = toml::to_string_pretty(self)?;

        if let Some(parent) = path.as_ref().parent() {
            fs::create_dir_all(parent)?;
        }

        fs::write(path, contents)?;
        Ok(())
    }

    /// Get default config path
    #[must_use]
    pub fn default_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("/tmp"))
            .join("lanchat/config.toml")
    }

    /// Load config from default path, or create default if it doesn't exist
    ///
    /// # Errors
    ///
    /// Returns an error if reading or creating the config fails.
    pub fn load_or_default() -> anyhow::Result<Self> {
        let path = Self::default_path();

        if path.exists() {
            Self::load(&path)
        } else {
            let config = Self::default();
            config.save(&path)?;
            Ok(config)
        }
    }

    /// Validate configuration
    ///
    /// # Errors
    ///
    /// Returns an error if configuration is invalid.
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.relay.port == 0 {
            anyhow::bail!("Relay port must be between 1 and 65535");
        }

        if let Some(host) = &self.relay.host {
            if host.trim().is_empty() {
                anyhow::bail!("Relay host is empty");
            }
        }

        if let Some(name) = &self.identity.name {
            if name.is_empty() || name.contains(['\n', '\r']) {
                anyhow::bail!("Identity name must be a non-empty single line");
            }
        }

        if self.relay.connect_timeout_secs == 0 || self.transfer.connect_timeout_secs == 0 {
            anyhow::bail!("Connect timeouts must be at least 1 second");
        }

        if self.relay.max_line_length == 0 {
            anyhow::bail!("Max line length must be positive");
        }

        let valid_log_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_log_levels.contains(&self.logging.level.to_lowercase().as_str()) {
            anyhow::bail!(
                "Invalid log level: {}. Must be one of: {}",
                self.logging.level,
                valid_log_levels.join(", ")
            );
        }

        if self.transfer.chunk_size == 0 || self.transfer.chunk_size > 16 * 1024 * 1024 {
            anyhow::bail!("Chunk size must be between 1 and 16MB");
        }

        Ok(())
    }

    /// Build the socket options for every stream the client opens
    #[must_use]
    pub fn to_transport_config(&self) -> TransportConfig {
        TransportConfig {
            nodelay: self.relay.nodelay,
        }
    }

    /// Build the core session configuration
    #[must_use]
    pub fn to_session_config(&self) -> SessionConfig {
        SessionConfig::new()
            .with_relay_port(self.relay.port)
            .with_connect_timeout(Duration::from_secs(self.relay.connect_timeout_secs))
            .with_max_line_length(self.relay.max_line_length)
            .with_transfer(
                CoreTransferConfig::default()
                    .with_chunk_size(self.transfer.chunk_size)
                    .with_download_dir(self.transfer.download_dir.clone())
                    .with_connect_timeout(Duration::from_secs(self.transfer.connect_timeout_secs)),
            )
    }
}
