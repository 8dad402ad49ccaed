//! Coordinator error types.

use std::path::PathBuf;

use ftpwatch_connection::ConnectError;
use ftpwatch_watcher::WatchError;

/// Invalid configuration. Fatal before the core starts.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("missing configuration value: {0}")]
    MissingField(&'static str),

    #[error("watched path is not a directory: {}", .0.display())]
    NotADirectory(PathBuf),

    #[error("{0} must be at least 1")]
    ZeroAttempts(&'static str),
}

/// Errors that stop [`TransferCoordinator::run`](crate::TransferCoordinator::run).
///
/// Per-file failures never surface here; they end as abandoned reports.
#[derive(Debug, thiserror::Error)]
pub enum CoordinatorError {
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Connect(#[from] ConnectError),

    #[error("cannot watch directory: {0}")]
    Watch(#[from] WatchError),
}

impl CoordinatorError {
    /// Operator-facing hint on how to fix the failure.
    pub fn hint(&self) -> &'static str {
        match self {
            Self::Config(ConfigError::NotADirectory(_)) | Self::Watch(_) => {
                "check that watched_path points to an existing folder"
            }
            Self::Config(_) => "check the values in the configuration file",
            Self::Connect(_) => {
                "check the server address, port and credentials, and that the server is running"
            }
        }
    }
}
