//! Delivery of one watched file to the remote server.
//!
//! A [`TransferTask`] is created per creation event and handed to the
//! [`Uploader`], which streams the file through the connection manager's
//! session and retries every failure on a fixed [`RetryPolicy`] until the
//! task succeeds or is abandoned.

mod retry;
mod types;
mod uploader;
mod validation;

pub use retry::{RetryPolicy, RetryState, should_retry};
pub use types::{Outcome, TaskStatus, TransferReport, TransferTask};
pub use uploader::Uploader;
pub use validation::{remote_name_for, validate_remote_name};

use std::time::Duration;

use ftpwatch_connection::ConnectError;
use ftpwatch_ftp::FtpError;

/// Errors from a single upload attempt. Every variant is retried.
#[derive(Debug, thiserror::Error)]
pub enum TransferError {
    #[error("cannot read local file: {0}")]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Connect(#[from] ConnectError),

    #[error("store failed: {0}")]
    Store(#[from] FtpError),

    #[error("transfer timed out after {0:?}")]
    TimedOut(Duration),

    #[error("invalid path: {0}")]
    InvalidPath(String),
}
