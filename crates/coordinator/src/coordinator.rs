//! The coordinator state machine: init, watching, stopping.

use ftpwatch_connection::{ConnectionManager, Connector, FtpConnector};
use ftpwatch_transfer::{Outcome, TransferReport, Uploader};
use ftpwatch_watcher::{CreationEvent, DirectoryWatcher};
use tokio::sync::{mpsc, watch};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::config::Config;
use crate::error::CoordinatorError;

/// Where the coordinator is in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    /// Validating configuration and opening the first session.
    Init,
    /// Connected and draining creation events.
    Watching,
    /// Run finished, normally or not.
    Stopped,
}

/// Per-run totals.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct RunSummary {
    pub succeeded: usize,
    pub abandoned: usize,
}

impl RunSummary {
    pub fn total(&self) -> usize {
        self.succeeded + self.abandoned
    }

    fn record(&mut self, report: &TransferReport) {
        match report.outcome {
            Outcome::Succeeded => self.succeeded += 1,
            Outcome::Abandoned => self.abandoned += 1,
        }
    }
}

/// Source of creation events drained by the watch loop.
trait EventSource {
    async fn next_event(&mut self) -> Option<CreationEvent>;
}

impl EventSource for DirectoryWatcher {
    async fn next_event(&mut self) -> Option<CreationEvent> {
        DirectoryWatcher::next_event(self).await
    }
}

impl EventSource for mpsc::UnboundedReceiver<CreationEvent> {
    async fn next_event(&mut self) -> Option<CreationEvent> {
        self.recv().await
    }
}

/// Owns the connection manager and the uploader for one run.
pub struct TransferCoordinator {
    config: Config,
    conn: ConnectionManager,
    uploader: Uploader,
    cancel: CancellationToken,
    reports_tx: mpsc::UnboundedSender<TransferReport>,
    reports_rx: Option<mpsc::UnboundedReceiver<TransferReport>>,
    phase: watch::Sender<Phase>,
}

impl TransferCoordinator {
    /// Creates a coordinator talking to the FTP server in `config`.
    pub fn new(config: Config, cancel: CancellationToken) -> Self {
        let connector =
            FtpConnector::new(config.endpoint.clone(), config.connect.connect_timeout);
        Self::with_connector(config, Box::new(connector), cancel)
    }

    /// Creates a coordinator with a custom [`Connector`].
    pub fn with_connector(
        config: Config,
        connector: Box<dyn Connector>,
        cancel: CancellationToken,
    ) -> Self {
        let conn = ConnectionManager::new(connector, config.connect.clone());
        let uploader = Uploader::new(config.retry, cancel.clone())
            .with_transfer_timeout(config.transfer_timeout);
        let (reports_tx, reports_rx) = mpsc::unbounded_channel();
        Self {
            config,
            conn,
            uploader,
            cancel,
            reports_tx,
            reports_rx: Some(reports_rx),
            phase: watch::Sender::new(Phase::Init),
        }
    }

    /// Takes the receiver of per-file reports. Returns `None` after the
    /// first call. The stream ends when the run finishes.
    pub fn take_reports(&mut self) -> Option<mpsc::UnboundedReceiver<TransferReport>> {
        self.reports_rx.take()
    }

    /// Subscribes to lifecycle changes.
    pub fn phase(&self) -> watch::Receiver<Phase> {
        self.phase.subscribe()
    }

    /// Runs until the cancellation token fires.
    ///
    /// Fails only during startup: invalid configuration, unreachable
    /// server, or a watch that cannot be established.
    pub async fn run(mut self) -> Result<RunSummary, CoordinatorError> {
        let result = self.run_phases().await;
        self.phase.send_replace(Phase::Stopped);
        result
    }

    async fn run_phases(&mut self) -> Result<RunSummary, CoordinatorError> {
        // Init
        self.config.validate()?;
        info!(
            server = %self.conn.address(),
            user = %self.config.endpoint.username,
            "connecting to FTP server"
        );
        self.conn.acquire().await?;

        let mut watcher = match DirectoryWatcher::start(&self.config.watched_path, true) {
            Ok(watcher) => watcher,
            Err(e) => {
                self.conn.close().await;
                return Err(e.into());
            }
        };
        info!(
            path = %self.config.watched_path.display(),
            "watching for new files"
        );
        self.phase.send_replace(Phase::Watching);

        // Watching
        let summary = self.watch_loop(&mut watcher).await;

        // Stopping
        watcher.stop();
        self.conn.close().await;
        info!(
            succeeded = summary.succeeded,
            abandoned = summary.abandoned,
            "coordinator stopped"
        );
        Ok(summary)
    }

    /// Uploads each event's file to a terminal outcome before taking the
    /// next event. Returns on cancellation or when the source ends.
    async fn watch_loop<S: EventSource>(&mut self, events: &mut S) -> RunSummary {
        let mut summary = RunSummary::default();

        loop {
            let event = tokio::select! {
                biased;
                _ = self.cancel.cancelled() => {
                    info!("shutdown requested, no longer accepting files");
                    break;
                }
                event = events.next_event() => event,
            };
            let Some(event) = event else {
                warn!("event stream ended");
                break;
            };

            let task = self.uploader.task_for(event.path);
            info!(file = %task.source().display(), "new file detected");

            let report = self.uploader.upload(task, &mut self.conn).await;
            summary.record(&report);
            match report.outcome {
                Outcome::Succeeded => info!(
                    file = %report.remote_name,
                    bytes = report.bytes,
                    attempts = report.attempts,
                    "file uploaded"
                ),
                Outcome::Abandoned => warn!(
                    file = %report.source.display(),
                    attempts = report.attempts,
                    "file abandoned"
                ),
            }
            // Nobody listening is fine.
            let _ = self.reports_tx.send(report);
        }

        summary
    }
}
