//! Public types for the connection manager.

use std::time::Duration;

use ftpwatch_ftp::{DEFAULT_CONNECT_TIMEOUT, FtpError};

/// State of the managed session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConnectionState {
    /// No session; the next acquire connects.
    Disconnected,
    /// Connect+login in progress.
    Connecting { attempt: u32 },
    /// Authenticated session available.
    Connected,
}

/// Configuration for connect+login retries.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectConfig {
    /// Connect+login attempts per acquire.
    pub max_attempts: u32,
    /// Delay after a generic failure.
    pub retry_delay: Duration,
    /// Delay after a timeout or a 4xx reply.
    pub timeout_retry_delay: Duration,
    /// Bounds the TCP connect and each reply during setup.
    pub connect_timeout: Duration,
}

impl Default for ConnectConfig {
    fn default() -> Self {
        Self {
            max_attempts: 2,
            retry_delay: Duration::from_secs(3),
            timeout_retry_delay: Duration::from_secs(5),
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
        }
    }
}

impl ConnectConfig {
    /// Delay to wait after a failed attempt, chosen by failure kind.
    pub fn delay_after(&self, error: &FtpError) -> Duration {
        if error.is_transient() {
            self.timeout_retry_delay
        } else {
            self.retry_delay
        }
    }
}
