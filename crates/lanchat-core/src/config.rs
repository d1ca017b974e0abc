//! Session and transfer configuration

use crate::{DEFAULT_MAX_LINE_LENGTH, DEFAULT_RELAY_PORT};
use lanchat_files::DEFAULT_CHUNK_SIZE;
use std::path::PathBuf;
use std::time::Duration;

/// Session configuration
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Relay port used when the address has none
    pub relay_port: u16,

    /// Upper bound on opening the primary connection
    pub connect_timeout: Duration,

    /// Longest accepted inbound line in bytes
    pub max_line_length: usize,

    /// File transfer configuration
    pub transfer: TransferConfig,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            relay_port: DEFAULT_RELAY_PORT,
            connect_timeout: Duration::from_secs(10),
            max_line_length: DEFAULT_MAX_LINE_LENGTH,
            transfer: TransferConfig::default(),
        }
    }
}

impl SessionConfig {
    /// Create the default configuration
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the default relay port
    #[must_use]
    pub fn with_relay_port(mut self, port: u16) -> Self {
        self.relay_port = port;
        self
    }

    /// Set the primary connect timeout
    #[must_use]
    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    /// Set the inbound line length limit
    #[must_use]
    pub fn with_max_line_length(mut self, limit: usize) -> Self {
        self.max_line_length = limit;
        self
    }

    /// Replace the transfer configuration
    #[must_use]
    pub fn with_transfer(mut self, transfer: TransferConfig) -> Self {
        self.transfer = transfer;
        self
    }
}

/// File transfer configuration
#[derive(Debug, Clone)]
pub struct TransferConfig {
    /// Upper bound on opening the side-channel connection
    pub connect_timeout: Duration,

    /// Bytes per chunk when streaming a file
    pub chunk_size: usize,

    /// Where received files are stored
    pub download_dir: PathBuf,
}

impl Default for TransferConfig {
    fn default() -> Self {
        Self {
            connect_timeout: Duration::from_secs(10),
            chunk_size: DEFAULT_CHUNK_SIZE,
            download_dir: PathBuf::from("."),
        }
    }
}

impl TransferConfig {
    /// Set the side-channel connect timeout
    #[must_use]
    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    /// Set the chunk size
    #[must_use]
    pub fn with_chunk_size(mut self, size: usize) -> Self {
        self.chunk_size = size;
        self
    }

    /// Set the download directory
    #[must_use]
    pub fn with_download_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.download_dir = dir.into();
        self
    }
}
