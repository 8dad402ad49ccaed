//! Connection error types.

use ftpwatch_ftp::FtpError;

/// Connect+login failed on every configured attempt.
#[derive(Debug, thiserror::Error)]
#[error("could not connect to {address} after {attempts} attempt(s): {source}")]
pub struct ConnectError {
    pub address: String,
    pub attempts: u32,
    /// Failure of the last attempt.
    #[source]
    pub source: FtpError,
}
