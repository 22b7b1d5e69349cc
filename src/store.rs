//! Authoritative source content cache.
//!
//! Every reconciliation reads its bytes from here, never from the source
//! file directly, so all concurrent rewrites agree on a single committed
//! value.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use parking_lot::RwLock;

use crate::error::{Result, SyncError};

/// The last committed copy of the source file.
///
/// Readers receive an [`Arc`] snapshot and can hold it for as long as a
/// rewrite takes; a concurrent [`compare_and_set`](Self::compare_and_set)
/// replaces the stored value without ever mutating bytes a reader might be
/// looking at.
#[derive(Debug)]
pub struct ContentStore {
    source_path: PathBuf,
    content: RwLock<Arc<[u8]>>,
}

impl ContentStore {
    /// Reads the source file and creates the store around its content.
    ///
    /// # Errors
    ///
    /// Returns [`SyncError::SourceRead`] if the source file cannot be read.
    /// This is the startup-fatal path: a daemon that never saw valid source
    /// content has nothing to reconcile against.
    pub fn load(source_path: impl Into<PathBuf>) -> Result<Self> {
        let source_path = source_path.into();
        let content = read_source(&source_path)?;
        tracing::debug!(
            path = %source_path.display(),
            bytes = content.len(),
            "source content loaded"
        );
        Ok(Self {
            source_path,
            content: RwLock::new(Arc::from(content)),
        })
    }

    /// Returns the source file path this store reads from.
    #[must_use]
    pub fn source_path(&self) -> &Path {
        &self.source_path
    }

    /// Returns a snapshot of the last committed content.
    #[must_use]
    pub fn get(&self) -> Arc<[u8]> {
        let guard = self.content.read();
        Arc::clone(&guard)
    }

    /// Re-reads the source file and commits the new bytes if they differ
    /// from the stored value, or unconditionally when `force` is set.
    ///
    /// Returns whether a value was committed. The compare and the swap
    /// happen under one write lock, so concurrent callers cannot overwrite
    /// a fresher value with a staler one mid-decision; among completed
    /// calls, the last writer wins.
    ///
    /// # Errors
    ///
    /// Returns [`SyncError::SourceRead`] if the read fails. The stored
    /// value is left untouched; a transient read failure must not wipe
    /// valid cached content.
    pub fn compare_and_set(&self, force: bool) -> Result<bool> {
        let new = read_source(&self.source_path)?;

        let mut current = self.content.write();
        if !force && new.as_slice() == &**current {
            tracing::debug!(path = %self.source_path.display(), "source content unchanged");
            return Ok(false);
        }
        *current = Arc::from(new);
        tracing::debug!(
            path = %self.source_path.display(),
            bytes = current.len(),
            "source content committed"
        );
        Ok(true)
    }
}

fn read_source(path: &Path) -> Result<Vec<u8>> {
    std::fs::read(path).map_err(|source| SyncError::SourceRead {
        path: path.to_path_buf(),
        source,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store_with(content: &[u8]) -> (tempfile::TempDir, ContentStore) {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("resolv.conf");
        std::fs::write(&path, content).unwrap();
        let store = ContentStore::load(&path).unwrap();
        (dir, store)
    }

    #[test]
    fn load_missing_source_fails() {
        let dir = tempfile::tempdir().unwrap();
        let err = ContentStore::load(dir.path().join("absent")).unwrap_err();
        assert!(err.is_not_found());
    }

    #[test]
    fn get_returns_loaded_content() {
        let (_dir, store) = store_with(b"nameserver 8.8.8.8\n");
        assert_eq!(&*store.get(), b"nameserver 8.8.8.8\n");
    }

    #[test]
    fn detects_changed_content() {
        let (_dir, store) = store_with(b"nameserver 8.8.8.8\n");
        std::fs::write(store.source_path(), b"nameserver 1.1.1.1\n").unwrap();

        assert!(store.compare_and_set(false).unwrap());
        assert_eq!(&*store.get(), b"nameserver 1.1.1.1\n");
    }

    #[test]
    fn unchanged_content_is_not_committed() {
        let (_dir, store) = store_with(b"nameserver 8.8.8.8\n");
        assert!(!store.compare_and_set(false).unwrap());
    }

    #[test]
    fn force_commits_identical_content() {
        let (_dir, store) = store_with(b"nameserver 8.8.8.8\n");
        assert!(store.compare_and_set(true).unwrap());
        assert_eq!(&*store.get(), b"nameserver 8.8.8.8\n");
    }

    #[test]
    fn failed_reread_preserves_cached_content() {
        let (_dir, store) = store_with(b"nameserver 8.8.8.8\n");
        std::fs::remove_file(store.source_path()).unwrap();

        assert!(store.compare_and_set(true).is_err());
        assert_eq!(&*store.get(), b"nameserver 8.8.8.8\n");
    }

    #[test]
    fn concurrent_readers_never_observe_torn_content() {
        let (_dir, store) = store_with(&[b'a'; 512]);
        let a: Arc<[u8]> = Arc::from(vec![b'a'; 512]);
        let b: Arc<[u8]> = Arc::from(vec![b'b'; 4096]);

        std::thread::scope(|s| {
            let writer = {
                let store = &store;
                let (a, b) = (&a, &b);
                move || {
                    for i in 0..200 {
                        let next = if i % 2 == 0 { b } else { a };
                        std::fs::write(store.source_path(), next).unwrap();
                        store.compare_and_set(false).unwrap();
                    }
                }
            };
            s.spawn(writer);

            for _ in 0..3 {
                let store = &store;
                let (a, b) = (&a, &b);
                s.spawn(move || {
                    for _ in 0..500 {
                        let seen = store.get();
                        assert!(
                            seen == *a || seen == *b,
                            "observed a value that is neither the old nor the new content"
                        );
                    }
                });
            }
        });
    }
}
