//! Connection manager owning the single FTP session.
//!
//! The session is created lazily on the first [`acquire`], torn down by
//! [`invalidate`] after a failed transfer, and rebuilt on the next acquire.
//! An idle session is checked with `NOOP` before it is handed out, so one
//! the server dropped in the meantime is replaced without costing a store.
//! Connect+login is retried up to [`ConnectConfig::max_attempts`] times.
//! There is exactly one consumer, so no locking is involved.
//!
//! [`acquire`]: ConnectionManager::acquire
//! [`invalidate`]: ConnectionManager::invalidate

use tracing::{debug, info, warn};

use crate::error::ConnectError;
use crate::session::{Connector, Session};
use crate::types::{ConnectConfig, ConnectionState};

/// Owns at most one live [`Session`].
pub struct ConnectionManager {
    connector: Box<dyn Connector>,
    config: ConnectConfig,
    session: Option<Box<dyn Session>>,
    state: ConnectionState,
}

impl ConnectionManager {
    /// Creates a manager. No connection is made until [`acquire`](Self::acquire).
    pub fn new(connector: Box<dyn Connector>, config: ConnectConfig) -> Self {
        Self {
            connector,
            config,
            session: None,
            state: ConnectionState::Disconnected,
        }
    }

    /// Returns the current connection state.
    pub fn state(&self) -> &ConnectionState {
        &self.state
    }

    /// Returns the server address.
    pub fn address(&self) -> String {
        self.connector.address()
    }

    /// Returns a usable session, connecting first if there is none or the
    /// idle one no longer answers.
    pub async fn acquire(&mut self) -> Result<&mut dyn Session, ConnectError> {
        let mut live = self.session.take();
        if let Some(session) = live.as_mut() {
            if !session.is_alive().await {
                warn!(
                    server = %self.connector.address(),
                    "idle FTP session lost, reconnecting"
                );
                self.state = ConnectionState::Disconnected;
                live = None;
            }
        }
        let session = match live {
            Some(session) => session,
            None => self.connect_with_retry().await?,
        };
        Ok(&mut **self.session.insert(session))
    }

    /// Drops the current session so the next acquire rebuilds it.
    pub fn invalidate(&mut self) {
        if self.session.take().is_some() {
            debug!(server = %self.connector.address(), "session invalidated");
        }
        self.state = ConnectionState::Disconnected;
    }

    /// Closes the session with `QUIT`. Safe to call repeatedly.
    pub async fn close(&mut self) {
        if let Some(session) = self.session.take() {
            session.quit().await;
            info!(server = %self.connector.address(), "FTP session closed");
        }
        self.state = ConnectionState::Disconnected;
    }

    async fn connect_with_retry(&mut self) -> Result<Box<dyn Session>, ConnectError> {
        let address = self.connector.address();
        let max_attempts = self.config.max_attempts.max(1);
        let mut attempt: u32 = 0;

        loop {
            attempt += 1;
            self.state = ConnectionState::Connecting { attempt };
            debug!(server = %address, attempt, max_attempts, "connecting");

            match self.connector.connect().await {
                Ok(session) => {
                    self.state = ConnectionState::Connected;
                    info!(server = %address, attempt, "FTP connection established");
                    return Ok(session);
                }
                Err(e) => {
                    warn!(
                        server = %address,
                        attempt,
                        max_attempts,
                        error = %e,
                        "FTP connection attempt failed"
                    );
                    if attempt >= max_attempts {
                        self.state = ConnectionState::Disconnected;
                        return Err(ConnectError {
                            address,
                            attempts: attempt,
                            source: e,
                        });
                    }
                    tokio::time::sleep(self.config.delay_after(&e)).await;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::VecDeque;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
    use std::sync::{Arc, Mutex};
    use std::time::Duration;

    use ftpwatch_ftp::FtpError;
    use tokio::io::AsyncRead;
    use tokio::time::Instant;

    use crate::session::BoxFuture;

    /// Connector that fails according to a script, then succeeds.
    #[derive(Default)]
    struct MockConnector {
        failures: Mutex<VecDeque<FtpError>>,
        connects: Arc<AtomicUsize>,
        quits: Arc<AtomicUsize>,
        /// Sessions handed out stop answering `NOOP` once this is set.
        hung_up: Arc<AtomicBool>,
        noops: Arc<AtomicUsize>,
    }

    impl MockConnector {
        fn failing(failures: Vec<FtpError>) -> Self {
            Self {
                failures: Mutex::new(failures.into()),
                ..Self::default()
            }
        }
    }

    struct MockSession {
        quits: Arc<AtomicUsize>,
        hung_up: Arc<AtomicBool>,
        noops: Arc<AtomicUsize>,
    }

    impl Session for MockSession {
        fn store<'a>(
            &'a mut self,
            _remote_name: &'a str,
            _data: &'a mut (dyn AsyncRead + Unpin + Send),
        ) -> BoxFuture<'a, Result<u64, FtpError>> {
            Box::pin(async { Ok(0) })
        }

        fn is_alive(&mut self) -> BoxFuture<'_, bool> {
            self.noops.fetch_add(1, Ordering::SeqCst);
            let alive = !self.hung_up.load(Ordering::SeqCst);
            Box::pin(async move { alive })
        }

        fn quit(self: Box<Self>) -> BoxFuture<'static, ()> {
            self.quits.fetch_add(1, Ordering::SeqCst);
            Box::pin(async {})
        }
    }

    impl Connector for MockConnector {
        fn connect(&self) -> BoxFuture<'_, Result<Box<dyn Session>, FtpError>> {
            self.connects.fetch_add(1, Ordering::SeqCst);
            let next = self.failures.lock().unwrap().pop_front();
            // A fresh session answers again.
            self.hung_up.store(false, Ordering::SeqCst);
            let session = MockSession {
                quits: Arc::clone(&self.quits),
                hung_up: Arc::clone(&self.hung_up),
                noops: Arc::clone(&self.noops),
            };
            Box::pin(async move {
                match next {
                    Some(e) => Err(e),
                    None => Ok(Box::new(session) as Box<dyn Session>),
                }
            })
        }

        fn address(&self) -> String {
            "mock:21".into()
        }
    }

    fn manager(connector: MockConnector) -> (ConnectionManager, Arc<AtomicUsize>, Arc<AtomicUsize>) {
        let connects = Arc::clone(&connector.connects);
        let quits = Arc::clone(&connector.quits);
        let mgr = ConnectionManager::new(Box::new(connector), ConnectConfig::default());
        (mgr, connects, quits)
    }

    fn refused() -> FtpError {
        FtpError::Io(std::io::ErrorKind::ConnectionRefused.into())
    }

    #[tokio::test]
    async fn new_manager_is_disconnected() {
        let (mgr, connects, _) = manager(MockConnector::default());
        assert_eq!(mgr.state(), &ConnectionState::Disconnected);
        assert_eq!(mgr.address(), "mock:21");
        assert_eq!(connects.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn acquire_reuses_live_session() {
        let (mut mgr, connects, _) = manager(MockConnector::default());

        mgr.acquire().await.unwrap();
        mgr.acquire().await.unwrap();

        assert_eq!(connects.load(Ordering::SeqCst), 1);
        assert_eq!(mgr.state(), &ConnectionState::Connected);
    }

    #[tokio::test]
    async fn acquire_checks_idle_session_with_noop() {
        let connector = MockConnector::default();
        let noops = Arc::clone(&connector.noops);
        let (mut mgr, _, _) = manager(connector);

        mgr.acquire().await.unwrap();
        assert_eq!(noops.load(Ordering::SeqCst), 0);
        mgr.acquire().await.unwrap();
        assert_eq!(noops.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn acquire_replaces_session_that_stopped_answering() {
        let connector = MockConnector::default();
        let hung_up = Arc::clone(&connector.hung_up);
        let (mut mgr, connects, quits) = manager(connector);

        mgr.acquire().await.unwrap();
        hung_up.store(true, Ordering::SeqCst);

        let start = Instant::now();
        mgr.acquire().await.unwrap();

        assert_eq!(connects.load(Ordering::SeqCst), 2);
        assert_eq!(start.elapsed(), Duration::ZERO);
        assert_eq!(mgr.state(), &ConnectionState::Connected);
        // The dead session is dropped, not quit.
        assert_eq!(quits.load(Ordering::SeqCst), 0);

        // The replacement answers.
        mgr.acquire().await.unwrap();
        assert_eq!(connects.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn invalidate_forces_reconnect() {
        let (mut mgr, connects, quits) = manager(MockConnector::default());

        mgr.acquire().await.unwrap();
        mgr.invalidate();
        assert_eq!(mgr.state(), &ConnectionState::Disconnected);
        mgr.acquire().await.unwrap();

        assert_eq!(connects.load(Ordering::SeqCst), 2);
        // An invalidated session is dropped, not quit.
        assert_eq!(quits.load(Ordering::SeqCst), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn retries_after_generic_failure_with_short_delay() {
        let (mut mgr, connects, _) = manager(MockConnector::failing(vec![refused()]));

        let start = Instant::now();
        mgr.acquire().await.unwrap();

        assert_eq!(connects.load(Ordering::SeqCst), 2);
        assert_eq!(start.elapsed(), Duration::from_secs(3));
    }

    #[tokio::test(start_paused = true)]
    async fn retries_after_timeout_with_long_delay() {
        let (mut mgr, connects, _) = manager(MockConnector::failing(vec![FtpError::Timeout]));

        let start = Instant::now();
        mgr.acquire().await.unwrap();

        assert_eq!(connects.load(Ordering::SeqCst), 2);
        assert_eq!(start.elapsed(), Duration::from_secs(5));
    }

    #[tokio::test(start_paused = true)]
    async fn gives_up_after_max_attempts() {
        let (mut mgr, connects, _) =
            manager(MockConnector::failing(vec![refused(), FtpError::Timeout, refused()]));

        let start = Instant::now();
        let err = match mgr.acquire().await {
            Ok(_) => panic!("acquire should fail"),
            Err(e) => e,
        };

        assert_eq!(connects.load(Ordering::SeqCst), 2);
        assert_eq!(err.attempts, 2);
        assert_eq!(err.address, "mock:21");
        assert!(matches!(err.source, FtpError::Timeout));
        // One delay between the two attempts, none after the last.
        assert_eq!(start.elapsed(), Duration::from_secs(3));
        assert_eq!(mgr.state(), &ConnectionState::Disconnected);
    }

    #[tokio::test]
    async fn close_quits_session_once() {
        let (mut mgr, _, quits) = manager(MockConnector::default());

        mgr.acquire().await.unwrap();
        mgr.close().await;
        mgr.close().await;

        assert_eq!(quits.load(Ordering::SeqCst), 1);
        assert_eq!(mgr.state(), &ConnectionState::Disconnected);
    }

    #[tokio::test]
    async fn close_without_session_is_noop() {
        let (mut mgr, connects, quits) = manager(MockConnector::default());
        mgr.close().await;
        assert_eq!(connects.load(Ordering::SeqCst), 0);
        assert_eq!(quits.load(Ordering::SeqCst), 0);
    }
}
