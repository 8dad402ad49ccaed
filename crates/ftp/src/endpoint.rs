//! Remote server address and credentials.

use std::fmt;

/// Address and credentials of a remote FTP server.
#[derive(Clone, PartialEq, Eq)]
pub struct FtpEndpoint {
    pub host: String,
    pub port: u16,
    pub username: String,
    pub password: String,
}

impl FtpEndpoint {
    /// Returns `host:port`, bracketing IPv6 literals.
    pub fn address(&self) -> String {
        if self.is_ipv6() {
            format!("[{}]:{}", self.host, self.port)
        } else {
            format!("{}:{}", self.host, self.port)
        }
    }

    /// True when the host is an IPv6 literal. Such servers get `EPSV`.
    pub fn is_ipv6(&self) -> bool {
        self.host.contains(':')
    }
}

impl fmt::Debug for FtpEndpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FtpEndpoint")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn address_formats() {
        let mut endpoint = FtpEndpoint {
            host: "192.168.1.1".into(),
            port: 21,
            username: "u".into(),
            password: "p".into(),
        };
        assert_eq!(endpoint.address(), "192.168.1.1:21");
        assert!(!endpoint.is_ipv6());

        endpoint.host = "::1".into();
        assert_eq!(endpoint.address(), "[::1]:21");
        assert!(endpoint.is_ipv6());
    }

    #[test]
    fn debug_redacts_password() {
        let endpoint = FtpEndpoint {
            host: "ftp.example.com".into(),
            port: 21,
            username: "camera".into(),
            password: "hunter2".into(),
        };
        let debug = format!("{endpoint:?}");
        assert!(debug.contains("camera"));
        assert!(!debug.contains("hunter2"));
    }
}
