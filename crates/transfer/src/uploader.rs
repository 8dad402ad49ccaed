//! Upload loop for a single file.
//!
//! Each attempt acquires the session, opens the local file and stores it
//! under the task's remote name. Any failure (local read, connect, store,
//! optional transfer timeout) invalidates the session and costs one attempt
//! followed by the policy's fixed delay, the last attempt included.
//! Cancellation is observed between attempts only: a store already in
//! flight is never interrupted.

use std::path::Path;
use std::time::Duration;

use ftpwatch_connection::ConnectionManager;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::TransferError;
use crate::retry::RetryPolicy;
use crate::types::{TransferReport, TransferTask};
use crate::validation::validate_remote_name;

/// Delivers files through a [`ConnectionManager`].
pub struct Uploader {
    policy: RetryPolicy,
    transfer_timeout: Option<Duration>,
    cancel: CancellationToken,
}

impl Uploader {
    pub fn new(policy: RetryPolicy, cancel: CancellationToken) -> Self {
        Self {
            policy,
            transfer_timeout: None,
            cancel,
        }
    }

    /// Bounds each store attempt. `None` (the default) imposes no deadline.
    pub fn with_transfer_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.transfer_timeout = timeout;
        self
    }

    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    /// Creates a pending task bound to this uploader's policy.
    pub fn task_for(&self, source: impl Into<std::path::PathBuf>) -> TransferTask {
        TransferTask::new(source.into(), self.policy)
    }

    /// Runs the task to a terminal outcome.
    pub async fn upload(
        &self,
        mut task: TransferTask,
        conn: &mut ConnectionManager,
    ) -> TransferReport {
        if let Err(e) = validate_remote_name(task.remote_name()) {
            warn!(file = %task.source().display(), error = %e, "cannot derive remote name");
            task.abandon();
            return task.into_report();
        }

        let max_attempts = task.retry().max_attempts();

        while task.retry().can_attempt() {
            let attempt = task.attempts() + 1;
            debug!(file = %task.remote_name(), attempt, max_attempts, "store attempt");

            match self.attempt(&task, conn).await {
                Ok(bytes) => {
                    info!(
                        file = %task.remote_name(),
                        bytes,
                        attempt,
                        "transfer succeeded"
                    );
                    task.succeed(bytes);
                    return task.into_report();
                }
                Err(e) => {
                    conn.invalidate();
                    let delay = task.retry_mut().record_failure();
                    warn!(
                        file = %task.remote_name(),
                        attempt,
                        max_attempts,
                        error = %e,
                        "transfer attempt failed"
                    );

                    if self.cancel.is_cancelled() {
                        info!(file = %task.remote_name(), "shutdown requested, not retrying");
                        break;
                    }
                    tokio::select! {
                        biased;
                        _ = self.cancel.cancelled() => {
                            info!(file = %task.remote_name(), "shutdown requested, not retrying");
                            break;
                        }
                        _ = tokio::time::sleep(delay) => {}
                    }
                }
            }
        }

        warn!(
            file = %task.remote_name(),
            attempts = task.attempts(),
            "transfer abandoned"
        );
        task.abandon();
        task.into_report()
    }

    async fn attempt(
        &self,
        task: &TransferTask,
        conn: &mut ConnectionManager,
    ) -> Result<u64, TransferError> {
        let session = conn.acquire().await?;
        let mut file = open_for_upload(task.source()).await?;

        let store = session.store(task.remote_name(), &mut file);
        let bytes = match self.transfer_timeout {
            Some(limit) => tokio::time::timeout(limit, store)
                .await
                .map_err(|_| TransferError::TimedOut(limit))??,
            None => store.await?,
        };
        Ok(bytes)
    }
}

/// Opens the local file for reading. On Windows no sharing is allowed, so a
/// file still held open by its writer fails here and is retried later.
async fn open_for_upload(path: &Path) -> std::io::Result<tokio::fs::File> {
    let mut options = tokio::fs::OpenOptions::new();
    options.read(true);
    #[cfg(windows)]
    options.share_mode(0);
    options.open(path).await
}
