use std::path::{Path, PathBuf};

use crate::retry::{RetryPolicy, RetryState};
use crate::validation::remote_name_for;

/// Lifecycle status of a [`TransferTask`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskStatus {
    Pending,
    Succeeded,
    Abandoned,
}

/// Terminal result of delivering one file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Succeeded,
    Abandoned,
}

/// One file awaiting delivery.
#[derive(Debug)]
pub struct TransferTask {
    source: PathBuf,
    /// Basename of `source`; empty when the path has none.
    remote_name: String,
    retry: RetryState,
    status: TaskStatus,
    bytes: u64,
}

impl TransferTask {
    /// Creates a pending task for a newly created file.
    pub fn new(source: PathBuf, policy: RetryPolicy) -> Self {
        let remote_name = remote_name_for(&source).unwrap_or_default();
        Self {
            source,
            remote_name,
            retry: RetryState::new(policy),
            status: TaskStatus::Pending,
            bytes: 0,
        }
    }

    pub fn source(&self) -> &Path {
        &self.source
    }

    pub fn remote_name(&self) -> &str {
        &self.remote_name
    }

    /// Failed attempts so far.
    pub fn attempts(&self) -> u32 {
        self.retry.attempt()
    }

    pub fn status(&self) -> TaskStatus {
        self.status
    }

    pub(crate) fn retry_mut(&mut self) -> &mut RetryState {
        &mut self.retry
    }

    pub(crate) fn retry(&self) -> &RetryState {
        &self.retry
    }

    pub(crate) fn succeed(&mut self, bytes: u64) {
        self.bytes = bytes;
        self.status = TaskStatus::Succeeded;
    }

    pub(crate) fn abandon(&mut self) {
        self.status = TaskStatus::Abandoned;
    }

    /// Consumes a finished task. A task still pending reports `Abandoned`.
    pub(crate) fn into_report(self) -> TransferReport {
        let (outcome, attempts) = match self.status {
            TaskStatus::Succeeded => (Outcome::Succeeded, self.retry.attempt() + 1),
            TaskStatus::Pending | TaskStatus::Abandoned => {
                (Outcome::Abandoned, self.retry.attempt())
            }
        };
        TransferReport {
            source: self.source,
            remote_name: self.remote_name,
            outcome,
            attempts,
            bytes: self.bytes,
        }
    }
}

/// Terminal record for one delivered or abandoned file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransferReport {
    pub source: PathBuf,
    pub remote_name: String,
    pub outcome: Outcome,
    /// Store attempts made, including the successful one.
    pub attempts: u32,
    /// Bytes sent by the successful attempt.
    pub bytes: u64,
}
