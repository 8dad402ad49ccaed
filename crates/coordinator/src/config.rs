//! Validated core configuration.

use std::path::PathBuf;
use std::time::Duration;

use ftpwatch_connection::ConnectConfig;
use ftpwatch_ftp::FtpEndpoint;
use ftpwatch_transfer::RetryPolicy;

use crate::error::ConfigError;

/// Everything the coordinator needs. Immutable once the run starts.
#[derive(Debug, Clone)]
pub struct Config {
    pub endpoint: FtpEndpoint,
    pub watched_path: PathBuf,
    pub connect: ConnectConfig,
    pub retry: RetryPolicy,
    /// Deadline for a single store attempt. `None` waits indefinitely.
    pub transfer_timeout: Option<Duration>,
}

impl Config {
    /// Creates a configuration with default retry settings.
    pub fn new(endpoint: FtpEndpoint, watched_path: impl Into<PathBuf>) -> Self {
        Self {
            endpoint,
            watched_path: watched_path.into(),
            connect: ConnectConfig::default(),
            retry: RetryPolicy::default(),
            transfer_timeout: None,
        }
    }

    /// Checks mandatory fields and that the watched path is a directory.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.endpoint.host.trim().is_empty() {
            return Err(ConfigError::MissingField("host"));
        }
        if self.endpoint.username.is_empty() {
            return Err(ConfigError::MissingField("username"));
        }
        if self.watched_path.as_os_str().is_empty() {
            return Err(ConfigError::MissingField("watched_path"));
        }
        if self.connect.max_attempts == 0 {
            return Err(ConfigError::ZeroAttempts("connect attempts"));
        }
        if self.retry.max_attempts == 0 {
            return Err(ConfigError::ZeroAttempts("upload attempts"));
        }
        if !self.watched_path.is_dir() {
            return Err(ConfigError::NotADirectory(self.watched_path.clone()));
        }
        Ok(())
    }
}
