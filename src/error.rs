//! Error types.

use std::path::PathBuf;

use thiserror::Error;

/// Result alias for sync operations.
pub type Result<T> = std::result::Result<T, SyncError>;

/// Errors returned by sync operations.
///
/// Only a subset is fatal: a source read failure at startup and a watch
/// failure on the fixed roots abort the process. Everything else is logged
/// at the operation that produced it and retried on a later cycle.
#[derive(Debug, Error)]
pub enum SyncError {
    /// The authoritative source file could not be read.
    #[error("failed to read source file {}: {source}", path.display())]
    SourceRead {
        /// Path of the source file.
        path: PathBuf,
        /// The underlying I/O failure.
        source: std::io::Error,
    },

    /// The container storage root could not be enumerated.
    #[error("failed to scan container root {}: {source}", path.display())]
    Scan {
        /// Path of the container storage root.
        path: PathBuf,
        /// The underlying I/O failure.
        source: std::io::Error,
    },

    /// The filesystem notification backend failed.
    #[error("filesystem watch error: {0}")]
    Watch(#[from] notify::Error),
}

impl SyncError {
    /// Returns `true` if the underlying failure is a missing file or
    /// directory.
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        match self {
            Self::SourceRead { source, .. } | Self::Scan { source, .. } => {
                source.kind() == std::io::ErrorKind::NotFound
            }
            Self::Watch(e) => {
                matches!(e.kind, notify::ErrorKind::PathNotFound)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn source_read_not_found() {
        let err = SyncError::SourceRead {
            path: PathBuf::from("/nonexistent/resolv.conf"),
            source: std::io::Error::from(std::io::ErrorKind::NotFound),
        };
        assert!(err.is_not_found());
        assert!(err.to_string().contains("/nonexistent/resolv.conf"));
    }

    #[test]
    fn scan_permission_denied_is_not_not_found() {
        let err = SyncError::Scan {
            path: PathBuf::from("/var/lib/docker/containers"),
            source: std::io::Error::from(std::io::ErrorKind::PermissionDenied),
        };
        assert!(!err.is_not_found());
    }
}
