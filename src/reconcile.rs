//! Idempotent target reconciliation.

use std::fs;
use std::io::ErrorKind;
use std::os::unix::fs::PermissionsExt;
use std::path::Path;

/// Mode bits applied to rewritten targets: owner read/write, group and
/// other read-only.
const TARGET_MODE: u32 = 0o644;

/// Makes the file at `path` match `content`, rewriting it only when it
/// differs.
///
/// A missing target is normal (the container runtime materializes these
/// files asynchronously) and is skipped without creating anything. Every
/// failure is logged and abandoned; each invocation is fire-and-forget and
/// the next qualifying notification or forced refresh retries naturally.
///
/// Returns `true` if the file was rewritten.
pub fn fix(path: &Path, content: &[u8]) -> bool {
    let existing = match fs::read(path) {
        Ok(bytes) => bytes,
        Err(e) if e.kind() == ErrorKind::NotFound => {
            tracing::debug!(path = %path.display(), "target does not exist, skipping");
            return false;
        }
        Err(e) => {
            tracing::warn!(path = %path.display(), error = %e, "failed to read target");
            return false;
        }
    };

    if existing == content {
        tracing::debug!(path = %path.display(), "target already has correct content");
        return false;
    }

    if let Err(e) = fs::write(path, content) {
        tracing::warn!(path = %path.display(), error = %e, "failed to write target");
        return false;
    }
    if let Err(e) = fs::set_permissions(path, fs::Permissions::from_mode(TARGET_MODE)) {
        tracing::warn!(path = %path.display(), error = %e, "failed to set target mode");
    }

    tracing::debug!(path = %path.display(), "target content updated");
    true
}
