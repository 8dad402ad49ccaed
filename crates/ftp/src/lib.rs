//! FTP building blocks shared by the connection layer.
//!
//! The protocol itself is spoken by `suppaftp`. This crate holds what sits
//! around it: the server [`FtpEndpoint`], the [`FtpError`] classification
//! the retry logic keys on, and a scripted server for tests.

pub mod endpoint;
pub mod error;
#[cfg(any(test, feature = "test-server"))]
pub mod test_server;

pub use endpoint::FtpEndpoint;
pub use error::FtpError;

use std::time::Duration;

/// Well-known FTP control port.
pub const DEFAULT_PORT: u16 = 21;

/// Default timeout for opening the control connection and logging in.
pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(10);
