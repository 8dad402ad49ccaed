//! Transfer coordinator: the long-running core of ftpwatch.
//!
//! Validates the configuration, opens the FTP session, then drains the
//! directory watcher one event at a time, uploading each new file before
//! looking at the next. Cancellation stops the loop between files.

mod config;
mod coordinator;
mod error;

pub use config::Config;
pub use coordinator::{Phase, RunSummary, TransferCoordinator};
pub use error::{ConfigError, CoordinatorError};
