//! Filesystem notification plumbing.
//!
//! Owns the native watcher and translates its events into the abstract
//! [`ChangeEvent`] records the rest of the daemon consumes. The backend is
//! best-effort by design: a full buffer drops notifications, and the
//! periodic forced refresh is the correctness backstop.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use notify::event::{ModifyKind, RenameMode};
use notify::{EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use tokio::sync::mpsc;

use crate::classify::{ChangeEvent, FsOp};
use crate::config::SyncConfig;
use crate::error::Result;

/// Owns the watch subscriptions: the two fixed roots (source file and
/// container storage root) plus one watch per known container directory.
///
/// The watcher handle must stay alive for notifications to keep flowing;
/// [`shutdown`](Self::shutdown) (or dropping the manager) tears every
/// subscription down.
pub struct WatchManager {
    watcher: RecommendedWatcher,
    source_path: PathBuf,
    container_root: PathBuf,
    active: HashSet<PathBuf>,
}

impl WatchManager {
    /// Creates the watcher and subscribes the fixed roots.
    ///
    /// Mapped events are forwarded into `events` without blocking; when
    /// the buffer is full the notification is dropped.
    ///
    /// # Errors
    ///
    /// Returns [`SyncError::Watch`](crate::SyncError::Watch) if the
    /// backend cannot be initialized or either root cannot be watched.
    /// Both are startup-fatal: without them the daemon would be blind.
    pub fn new(config: &SyncConfig, events: mpsc::Sender<ChangeEvent>) -> Result<Self> {
        let mut watcher =
            notify::recommended_watcher(move |res: notify::Result<notify::Event>| match res {
                Ok(event) => forward(&event, &events),
                Err(e) => tracing::warn!(error = %e, "watch backend error"),
            })?;

        watcher.watch(&config.source_path, RecursiveMode::NonRecursive)?;
        watcher.watch(&config.container_root, RecursiveMode::NonRecursive)?;

        Ok(Self {
            watcher,
            source_path: config.source_path.clone(),
            container_root: config.container_root.clone(),
            active: HashSet::new(),
        })
    }

    /// Subscribes a container directory.
    ///
    /// Adding a directory that is already watched is a no-op, as is a
    /// directory that vanished between discovery and registration; the
    /// runtime deletes containers at its own pace.
    pub fn add_container_watch(&mut self, dir: &Path) {
        if self.active.contains(dir) {
            tracing::debug!(path = %dir.display(), "watch already active");
            return;
        }
        match self.watcher.watch(dir, RecursiveMode::NonRecursive) {
            Ok(()) => {
                tracing::debug!(path = %dir.display(), "container watch added");
                self.active.insert(dir.to_path_buf());
            }
            Err(e) => {
                tracing::debug!(
                    path = %dir.display(),
                    error = %e,
                    "could not watch container directory"
                );
            }
        }
    }

    /// Unsubscribes a container directory.
    ///
    /// Removing a directory with no active watch is a no-op; the backend
    /// may also have dropped the watch together with the directory, which
    /// is tolerated the same way.
    pub fn remove_container_watch(&mut self, dir: &Path) {
        if !self.active.remove(dir) {
            tracing::debug!(path = %dir.display(), "no active watch to remove");
            return;
        }
        match self.watcher.unwatch(dir) {
            Ok(()) => tracing::debug!(path = %dir.display(), "container watch removed"),
            Err(e) => {
                tracing::debug!(
                    path = %dir.display(),
                    error = %e,
                    "could not unwatch container directory"
                );
            }
        }
    }

    /// Returns `true` if `dir` currently has an active container watch.
    #[must_use]
    pub fn is_watched(&self, dir: &Path) -> bool {
        self.active.contains(dir)
    }

    /// Number of active container watches.
    #[must_use]
    pub fn active_watches(&self) -> usize {
        self.active.len()
    }

    /// Releases every subscription.
    ///
    /// Dropping the manager has the same effect; this exists so the
    /// shutdown sequence can order the teardown after the last pending
    /// write has finished.
    pub fn shutdown(&mut self) {
        for dir in self.active.drain() {
            if let Err(e) = self.watcher.unwatch(&dir) {
                tracing::debug!(path = %dir.display(), error = %e, "unwatch failed");
            }
        }
        if let Err(e) = self.watcher.unwatch(&self.source_path) {
            tracing::debug!(path = %self.source_path.display(), error = %e, "unwatch failed");
        }
        if let Err(e) = self.watcher.unwatch(&self.container_root) {
            tracing::debug!(path = %self.container_root.display(), error = %e, "unwatch failed");
        }
        tracing::debug!("watches released");
    }
}

/// Sends the mapped records for one backend event, dropping them when the
/// buffer is full.
fn forward(event: &notify::Event, events: &mpsc::Sender<ChangeEvent>) {
    let Some(op) = map_kind(event.kind) else {
        return;
    };
    for path in &event.paths {
        let change = ChangeEvent {
            path: path.clone(),
            op,
        };
        match events.try_send(change) {
            Ok(()) => {}
            Err(mpsc::error::TrySendError::Full(change)) => {
                tracing::warn!(
                    path = %change.path.display(),
                    op = change.op.label(),
                    "event buffer full, dropping notification"
                );
            }
            // Receiver gone: the daemon is draining.
            Err(mpsc::error::TrySendError::Closed(_)) => {}
        }
    }
}

/// Maps a backend event kind onto the abstract operation set.
///
/// Metadata-only modifications carry no content and are dropped here so
/// mtime/chmod noise never reaches the classifier. Renames count as the
/// disappearance of the old name and the appearance of the new one.
fn map_kind(kind: EventKind) -> Option<FsOp> {
    match kind {
        EventKind::Create(_) => Some(FsOp::Create),
        EventKind::Remove(_) => Some(FsOp::Remove),
        EventKind::Modify(ModifyKind::Metadata(_)) => None,
        EventKind::Modify(ModifyKind::Name(RenameMode::From)) => Some(FsOp::Remove),
        EventKind::Modify(ModifyKind::Name(RenameMode::To)) => Some(FsOp::Create),
        EventKind::Modify(ModifyKind::Name(_)) => None,
        EventKind::Modify(_) => Some(FsOp::Write),
        _ => None,
    }
}
