//! Session and connector traits.
//!
//! `ConnectionManager` only sees these traits; [`FtpConnector`] binds them
//! to a `suppaftp` stream. Tests substitute in-memory implementations.

use std::future::Future;
use std::pin::Pin;
use std::time::Duration;

use ftpwatch_ftp::{FtpEndpoint, FtpError};
use suppaftp::tokio::AsyncFtpStream;
use suppaftp::types::{FileType, Mode};
use tokio::io::AsyncRead;
use tracing::{debug, info, trace};

/// A boxed, sendable future.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// An authenticated connection to the remote server.
pub trait Session: Send {
    /// Stores the full contents of `data` under `remote_name`, overwriting
    /// any existing remote file. Returns the number of bytes sent.
    fn store<'a>(
        &'a mut self,
        remote_name: &'a str,
        data: &'a mut (dyn AsyncRead + Unpin + Send),
    ) -> BoxFuture<'a, Result<u64, FtpError>>;

    /// Checks that the server still answers on this session.
    fn is_alive(&mut self) -> BoxFuture<'_, bool>;

    /// Politely closes the session.
    fn quit(self: Box<Self>) -> BoxFuture<'static, ()>;
}

/// Opens new sessions.
pub trait Connector: Send + Sync {
    /// Performs one connect+authenticate attempt.
    fn connect(&self) -> BoxFuture<'_, Result<Box<dyn Session>, FtpError>>;

    /// Server address for log lines and errors.
    fn address(&self) -> String;
}

/// [`Connector`] for a real FTP server.
#[derive(Debug, Clone)]
pub struct FtpConnector {
    endpoint: FtpEndpoint,
    connect_timeout: Duration,
}

impl FtpConnector {
    pub fn new(endpoint: FtpEndpoint, connect_timeout: Duration) -> Self {
        Self {
            endpoint,
            connect_timeout,
        }
    }

    async fn open(&self) -> Result<AsyncFtpStream, FtpError> {
        let mut stream = AsyncFtpStream::connect(self.endpoint.address()).await?;
        if self.endpoint.is_ipv6() {
            stream.set_mode(Mode::ExtendedPassive);
        } else {
            // Servers behind NAT advertise their private address in PASV.
            stream.set_passive_nat_workaround(true);
        }
        stream
            .login(self.endpoint.username.as_str(), self.endpoint.password.as_str())
            .await?;
        info!(
            server = %self.endpoint.address(),
            user = %self.endpoint.username,
            "FTP login accepted"
        );
        stream.transfer_type(FileType::Binary).await?;
        Ok(stream)
    }
}

impl Connector for FtpConnector {
    fn connect(&self) -> BoxFuture<'_, Result<Box<dyn Session>, FtpError>> {
        Box::pin(async move {
            let stream = match tokio::time::timeout(self.connect_timeout, self.open()).await {
                Ok(r) => r?,
                Err(_) => return Err(FtpError::Timeout),
            };
            Ok(Box::new(FtpSession {
                stream,
                reply_timeout: self.connect_timeout,
            }) as Box<dyn Session>)
        })
    }

    fn address(&self) -> String {
        self.endpoint.address()
    }
}

/// [`Session`] backed by a `suppaftp` control connection in binary mode.
pub struct FtpSession {
    stream: AsyncFtpStream,
    /// Bounds `NOOP` and `QUIT`. Stores are bounded by the caller.
    reply_timeout: Duration,
}

impl Session for FtpSession {
    fn store<'a>(
        &'a mut self,
        remote_name: &'a str,
        data: &'a mut (dyn AsyncRead + Unpin + Send),
    ) -> BoxFuture<'a, Result<u64, FtpError>> {
        Box::pin(async move {
            if remote_name.is_empty() || remote_name.contains(['/', '\\']) {
                return Err(FtpError::Protocol(format!(
                    "remote name must be a plain file name: {remote_name:?}"
                )));
            }
            let mut reader = data;
            let bytes = self.stream.put_file(remote_name, &mut reader).await?;
            debug!(name = %remote_name, bytes, "FTP store complete");
            Ok(bytes)
        })
    }

    fn is_alive(&mut self) -> BoxFuture<'_, bool> {
        Box::pin(async move {
            match tokio::time::timeout(self.reply_timeout, self.stream.noop()).await {
                Ok(Ok(())) => true,
                Ok(Err(e)) => {
                    debug!(error = %e, "FTP session no longer answers");
                    false
                }
                Err(_) => {
                    debug!("FTP session timed out on NOOP");
                    false
                }
            }
        })
    }

    fn quit(self: Box<Self>) -> BoxFuture<'static, ()> {
        let Self {
            mut stream,
            reply_timeout,
        } = *self;
        Box::pin(async move {
            match tokio::time::timeout(reply_timeout, stream.quit()).await {
                Ok(Ok(())) => trace!("FTP quit"),
                Ok(Err(e)) => trace!(error = %e, "FTP quit failed"),
                Err(_) => trace!("FTP quit timed out"),
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ftpwatch_ftp::test_server::{FtpTestServer, TestServerOptions};

    const TIMEOUT: Duration = Duration::from_secs(5);

    async fn start(options: TestServerOptions) -> (FtpTestServer, Box<dyn Session>) {
        let server = FtpTestServer::start(options).await.unwrap();
        let connector = FtpConnector::new(server.endpoint(), TIMEOUT);
        let session = connector.connect().await.unwrap();
        (server, session)
    }

    #[tokio::test]
    async fn ftp_connector_stores_through_session() {
        let (server, mut session) = start(TestServerOptions::default()).await;

        let mut data = &b"frame-0001"[..];
        let bytes = session.store("frame.raw", &mut data).await.unwrap();
        session.quit().await;

        assert_eq!(bytes, 10);
        assert_eq!(
            server.stored_files(),
            vec![("frame.raw".to_string(), b"frame-0001".to_vec())]
        );
    }

    #[tokio::test]
    async fn binary_store_keeps_bytes_unchanged() {
        let (server, mut session) = start(TestServerOptions::default()).await;

        let payload = b"line one\nline two\n\x00\xff".to_vec();
        let mut data = &payload[..];
        let bytes = session.store("raw.bin", &mut data).await.unwrap();

        assert_eq!(bytes, payload.len() as u64);
        assert_eq!(server.stored_files()[0].1, payload);
    }

    #[tokio::test]
    async fn stores_empty_file() {
        let (server, mut session) = start(TestServerOptions::default()).await;

        let mut data = &b""[..];
        assert_eq!(session.store("empty.bin", &mut data).await.unwrap(), 0);
        assert_eq!(server.stored_files()[0].1, Vec::<u8>::new());
    }

    #[tokio::test]
    async fn several_stores_share_one_connection() {
        let (server, mut session) = start(TestServerOptions::default()).await;

        for name in ["a.bin", "b.bin", "a.bin"] {
            let mut data = name.as_bytes();
            session.store(name, &mut data).await.unwrap();
        }

        assert_eq!(server.store_attempts(), 3);
        assert_eq!(server.connections(), 1);
    }

    #[tokio::test]
    async fn rejected_store_is_transient_and_session_stays_usable() {
        let (server, mut session) = start(TestServerOptions {
            reject_stores: 1,
            ..TestServerOptions::default()
        })
        .await;

        let mut data = &b"payload"[..];
        let first = session.store("x.bin", &mut data).await;
        assert!(matches!(first, Err(FtpError::Transient { code: 451, .. })));

        let mut data = &b"payload"[..];
        assert_eq!(session.store("x.bin", &mut data).await.unwrap(), 7);
        assert_eq!(server.stored_files().len(), 1);
    }

    #[tokio::test]
    async fn store_rejects_path_separators() {
        let (server, mut session) = start(TestServerOptions::default()).await;

        let mut data = &b"x"[..];
        let result = session.store("dir/x.bin", &mut data).await;
        assert!(matches!(result, Err(FtpError::Protocol(_))));
        assert_eq!(server.store_attempts(), 0);
    }

    #[tokio::test]
    async fn ftp_connector_reports_rejected_login() {
        let server = FtpTestServer::start(TestServerOptions {
            reject_login: true,
            ..TestServerOptions::default()
        })
        .await
        .unwrap();
        let connector = FtpConnector::new(server.endpoint(), TIMEOUT);

        let result = connector.connect().await;
        assert!(matches!(result, Err(FtpError::Permanent { code: 530, .. })));
    }

    #[tokio::test]
    async fn connect_refused_is_io_error() {
        // Bind and drop to get a port with nothing listening.
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let port = listener.local_addr().unwrap().port();
        drop(listener);

        let connector = FtpConnector::new(
            FtpEndpoint {
                host: "127.0.0.1".into(),
                port,
                username: "u".into(),
                password: "p".into(),
            },
            TIMEOUT,
        );
        let result = connector.connect().await;
        assert!(matches!(result, Err(FtpError::Io(_))));
    }

    #[tokio::test]
    async fn live_session_answers_noop() {
        let (server, mut session) = start(TestServerOptions::default()).await;

        assert!(session.is_alive().await);
        assert_eq!(server.noops(), 1);
    }

    #[tokio::test]
    async fn dropped_session_is_not_alive() {
        let (server, mut session) = start(TestServerOptions::default()).await;

        server.drop_connections();

        assert!(!session.is_alive().await);
    }

    #[test]
    fn ftp_connector_address() {
        let connector = FtpConnector::new(
            FtpEndpoint {
                host: "10.0.0.5".into(),
                port: 2121,
                username: "u".into(),
                password: "p".into(),
            },
            Duration::from_secs(10),
        );
        assert_eq!(connector.address(), "10.0.0.5:2121");
    }
}
