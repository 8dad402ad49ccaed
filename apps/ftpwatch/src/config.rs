//! Configuration file handling.
//!
//! Settings are read from `ftpwatch.toml` in the working directory:
//!
//! ```toml
//! [ftp]
//! host = "192.168.1.1"
//! port = 21
//! username = "username"
//! password = "password"
//! watched_path = 'X:\path\to\files'
//!
//! [retry]            # optional
//! upload_attempts = 7
//! ```

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::Context;
use ftpwatch_connection::ConnectConfig;
use ftpwatch_coordinator::Config;
use ftpwatch_ftp::{DEFAULT_PORT, FtpEndpoint};
use ftpwatch_transfer::RetryPolicy;
use serde::Deserialize;

/// Fixed configuration file name, looked up in the working directory.
pub const CONFIG_FILE: &str = "ftpwatch.toml";

/// Shown to the operator when the configuration file is missing.
pub const EXAMPLE_CONFIG: &str = r#"[ftp]
host = "192.168.1.1"
port = 21
username = "username"
password = "password"
watched_path = 'X:\path\to\files\Name'
"#;

/// Contents of `ftpwatch.toml`.
#[derive(Debug, Clone, Deserialize)]
pub struct FileConfig {
    pub ftp: FtpSection,
    #[serde(default)]
    pub retry: RetrySection,
}

/// The mandatory `[ftp]` section.
#[derive(Debug, Clone, Deserialize)]
pub struct FtpSection {
    #[serde(alias = "ip")]
    pub host: String,

    #[serde(default = "default_port")]
    pub port: u16,

    pub username: String,

    pub password: String,

    #[serde(alias = "monitored_folder_path")]
    pub watched_path: PathBuf,
}

/// Optional `[retry]` section. Every field has a default.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RetrySection {
    /// Store attempts per file.
    pub upload_attempts: u32,
    /// Seconds between store attempts.
    pub upload_delay_secs: u64,
    /// Connect+login attempts per reconnect.
    pub connect_attempts: u32,
    pub connect_timeout_secs: u64,
    /// Per-file store deadline. Unset means none.
    pub transfer_timeout_secs: Option<u64>,
}

fn default_port() -> u16 {
    DEFAULT_PORT
}

impl Default for RetrySection {
    fn default() -> Self {
        let upload = RetryPolicy::default();
        let connect = ConnectConfig::default();
        Self {
            upload_attempts: upload.max_attempts,
            upload_delay_secs: upload.delay.as_secs(),
            connect_attempts: connect.max_attempts,
            connect_timeout_secs: connect.connect_timeout.as_secs(),
            transfer_timeout_secs: None,
        }
    }
}

impl FileConfig {
    /// Reads and parses the configuration file.
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("cannot read {}", path.display()))?;
        Self::parse(&content).with_context(|| format!("invalid {}", path.display()))
    }

    pub fn parse(content: &str) -> anyhow::Result<Self> {
        Ok(toml::from_str(content)?)
    }

    /// Converts to the coordinator's configuration. Field checks happen
    /// when the coordinator starts.
    pub fn into_core(self) -> Config {
        let endpoint = FtpEndpoint {
            host: self.ftp.host.trim().to_string(),
            port: self.ftp.port,
            username: self.ftp.username,
            password: self.ftp.password,
        };
        let mut config = Config::new(endpoint, self.ftp.watched_path);
        config.retry = RetryPolicy {
            max_attempts: self.retry.upload_attempts,
            delay: Duration::from_secs(self.retry.upload_delay_secs),
        };
        config.connect.max_attempts = self.retry.connect_attempts;
        config.connect.connect_timeout = Duration::from_secs(self.retry.connect_timeout_secs);
        config.transfer_timeout = self.retry.transfer_timeout_secs.map(Duration::from_secs);
        config
    }
}
