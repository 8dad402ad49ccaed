use std::collections::HashSet;
use std::path::{Path, PathBuf};

use notify::event::{AccessKind, AccessMode, CreateKind};
use notify::{Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::WatchError;

/// A regular file appeared under the watched root and its writer is done.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreationEvent {
    pub path: PathBuf,
}

/// Watches a directory tree and yields one [`CreationEvent`] per new file.
///
/// Events arrive in the order the backend reports them. The backend thread
/// never blocks on the consumer: the channel is unbounded.
pub struct DirectoryWatcher {
    root: PathBuf,
    watcher: Option<RecommendedWatcher>,
    events: mpsc::UnboundedReceiver<CreationEvent>,
}

impl DirectoryWatcher {
    /// Starts watching `root`. With `recursive`, subdirectories created
    /// later are covered too.
    pub fn start(root: impl Into<PathBuf>, recursive: bool) -> Result<Self, WatchError> {
        let root = root.into();
        if !root.is_dir() {
            return Err(WatchError::NotADirectory(root));
        }

        let (tx, events) = mpsc::unbounded_channel();
        let mut created = CreatedFiles::for_backend();
        let mut watcher = notify::recommended_watcher(move |res: notify::Result<Event>| {
            match res {
                Ok(event) => {
                    for path in created.on_event(event) {
                        debug!(path = %path.display(), "file created");
                        // Receiver gone means the watcher is being stopped.
                        let _ = tx.send(CreationEvent { path });
                    }
                }
                Err(e) => warn!(error = %e, "watch backend error"),
            }
        })?;

        let mode = if recursive {
            RecursiveMode::Recursive
        } else {
            RecursiveMode::NonRecursive
        };
        watcher.watch(&root, mode)?;
        info!(path = %root.display(), recursive, "watching directory");

        Ok(Self {
            root,
            watcher: Some(watcher),
            events,
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn is_running(&self) -> bool {
        self.watcher.is_some()
    }

    /// Waits for the next created file. Returns `None` once stopped.
    pub async fn next_event(&mut self) -> Option<CreationEvent> {
        if self.watcher.is_none() {
            return None;
        }
        self.events.recv().await
    }

    /// Stops the backend. Safe to call repeatedly.
    pub fn stop(&mut self) {
        if let Some(watcher) = self.watcher.take() {
            drop(watcher);
            self.events.close();
            info!(path = %self.root.display(), "stopped watching directory");
        }
    }
}

impl Drop for DirectoryWatcher {
    fn drop(&mut self) {
        self.stop();
    }
}

/// Turns backend events into created files that are ready to be read.
///
/// With inotify a created file is held back until its writer closes it
/// (`IN_CLOSE_WRITE`), so a file still being written is never reported.
/// A hard link to an existing file has no writer and is reported at once.
/// Other backends have no close notification and report on creation.
#[derive(Debug, Default)]
pub struct CreatedFiles {
    wait_for_close: bool,
    open: HashSet<PathBuf>,
}

impl CreatedFiles {
    pub fn new(wait_for_close: bool) -> Self {
        Self {
            wait_for_close,
            open: HashSet::new(),
        }
    }

    /// Waits for close-after-write where the platform backend reports it.
    pub fn for_backend() -> Self {
        Self::new(cfg!(any(target_os = "linux", target_os = "android")))
    }

    /// Created files still held open by their writer.
    pub fn pending(&self) -> usize {
        self.open.len()
    }

    /// Returns the paths that became ready with `event`.
    pub fn on_event(&mut self, event: Event) -> Vec<PathBuf> {
        match event.kind {
            EventKind::Access(AccessKind::Close(AccessMode::Write)) => event
                .paths
                .into_iter()
                .filter(|p| self.open.remove(p))
                .collect(),
            EventKind::Remove(_) => {
                for path in &event.paths {
                    self.open.remove(path);
                }
                Vec::new()
            }
            _ if !self.wait_for_close => creation_paths(event),
            _ => {
                let mut ready = Vec::new();
                for path in creation_paths(event) {
                    if is_extra_link(&path) {
                        ready.push(path);
                    } else {
                        self.open.insert(path);
                    }
                }
                ready
            }
        }
    }
}

#[cfg(unix)]
fn is_extra_link(path: &Path) -> bool {
    use std::os::unix::fs::MetadataExt;
    std::fs::symlink_metadata(path).is_ok_and(|m| m.nlink() > 1)
}

#[cfg(not(unix))]
fn is_extra_link(_path: &Path) -> bool {
    false
}

/// Extracts the paths of newly created regular files from a backend event.
///
/// Folder creations are skipped. Backends that cannot tell files from
/// folders report `CreateKind::Any`; those paths are checked on disk.
pub fn creation_paths(event: Event) -> Vec<PathBuf> {
    match event.kind {
        EventKind::Create(CreateKind::File) => event.paths,
        EventKind::Create(CreateKind::Any | CreateKind::Other) => {
            event.paths.into_iter().filter(|p| !p.is_dir()).collect()
        }
        _ => Vec::new(),
    }
}
