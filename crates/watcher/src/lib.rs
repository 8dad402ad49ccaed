//! Directory watcher for newly created files.
//!
//! Wraps the platform notification backend (via `notify`) and turns its
//! callbacks into an ordered stream of [`CreationEvent`]s consumed by a
//! single task. Files present before the watch starts are never reported,
//! and on Linux a new file is reported once its writer has closed it.

mod watcher;

pub use watcher::{CreatedFiles, CreationEvent, DirectoryWatcher, creation_paths};

use std::path::PathBuf;

/// Errors produced when starting a watch.
#[derive(Debug, thiserror::Error)]
pub enum WatchError {
    #[error("not a directory: {}", .0.display())]
    NotADirectory(PathBuf),

    #[error("watch backend error: {0}")]
    Notify(#[from] notify::Error),
}
