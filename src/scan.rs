//! Container directory and target enumeration.

use std::path::PathBuf;

use crate::classify::TargetPattern;
use crate::error::{Result, SyncError};

/// Lists the container directories that exist right now.
///
/// Produces a fresh snapshot per call. Entries that cannot be inspected
/// are skipped; directories may also vanish between this scan and any use
/// of its results, which callers must tolerate.
///
/// # Errors
///
/// Returns [`SyncError::Scan`] if the storage root itself cannot be
/// enumerated. Callers treat that as the whole refresh cycle failing.
pub fn list_container_dirs(pattern: &TargetPattern) -> Result<Vec<PathBuf>> {
    let root = pattern.container_root();
    let entries = std::fs::read_dir(root).map_err(|source| SyncError::Scan {
        path: root.to_path_buf(),
        source,
    })?;

    let mut dirs = Vec::new();
    for entry in entries {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) => {
                tracing::debug!(error = %e, "skipping unreadable directory entry");
                continue;
            }
        };
        if !entry.file_type().is_ok_and(|t| t.is_dir()) {
            continue;
        }
        let path = entry.path();
        if pattern.is_container_dir(&path) {
            dirs.push(path);
        }
    }
    Ok(dirs)
}

/// Lists the per-container resolver files that exist right now.
///
/// Same snapshot semantics as [`list_container_dirs`]; container
/// directories without a resolver file yet are simply not included.
///
/// # Errors
///
/// Returns [`SyncError::Scan`] if the storage root cannot be enumerated.
pub fn list_targets(pattern: &TargetPattern) -> Result<Vec<PathBuf>> {
    let targets = list_container_dirs(pattern)?
        .into_iter()
        .map(|dir| pattern.target_for_dir(&dir))
        .filter(|target| target.is_file())
        .collect();
    Ok(targets)
}
