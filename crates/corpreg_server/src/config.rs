//! Server configuration.

use corpreg_core::{StoreConfig, MIN_INTERVAL};
use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

/// Configuration for the registry server.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Address to bind to.
    pub bind_addr: SocketAddr,
    /// CSV file the store writes through to.
    pub data_file: PathBuf,
    /// Store settings, including the compaction interval.
    pub store: StoreConfig,
    /// Maximum request body size in bytes.
    pub body_limit: usize,
}

impl ServerConfig {
    /// Creates a new server configuration.
    pub fn new(bind_addr: SocketAddr) -> Self {
        Self {
            bind_addr,
            data_file: PathBuf::from("companies.csv"),
            store: StoreConfig::default(),
            body_limit: 1024 * 1024,
        }
    }

    /// Sets the backing CSV file.
    pub fn with_data_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.data_file = path.into();
        self
    }

    /// Sets how often the compaction check runs, at least
    /// [`MIN_INTERVAL`].
    pub fn with_compaction_interval(mut self, interval: Duration) -> Self {
        self.store.compaction_interval = interval.max(MIN_INTERVAL);
        self
    }

    /// Sets the maximum request body size.
    pub fn with_body_limit(mut self, bytes: usize) -> Self {
        self.body_limit = bytes;
        self
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self::new(SocketAddr::from(([127, 0, 0, 1], 8080)))
    }
}
