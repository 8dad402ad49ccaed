//! Connection management for the remote FTP server.
//!
//! Owns the one [`Session`] the uploader stores files through, rebuilds it
//! after a failed transfer, and retries connect+login a bounded number of
//! times with a fixed delay.

pub mod error;
pub mod manager;
pub mod session;
pub mod types;

pub use error::ConnectError;
pub use manager::ConnectionManager;
pub use session::{BoxFuture, Connector, FtpConnector, FtpSession, Session};
pub use types::{ConnectConfig, ConnectionState};
