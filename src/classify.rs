//! Filesystem event classification.
//!
//! Pure path-pattern and operation matching: no filesystem access, so a
//! given notification always classifies the same way regardless of how the
//! watch backend ordered or coalesced its delivery.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use regex::Regex;

use crate::config::SyncConfig;

/// What happened to a path, as reported by the notification source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FsOp {
    /// The path came into existence.
    Create,
    /// The path's content was written.
    Write,
    /// The path was deleted.
    Remove,
}

impl FsOp {
    pub(crate) const fn label(self) -> &'static str {
        match self {
            Self::Create => "create",
            Self::Write => "write",
            Self::Remove => "remove",
        }
    }
}

/// A single change notification.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ChangeEvent {
    /// The affected path.
    pub path: PathBuf,
    /// What happened to it.
    pub op: FsOp,
}

/// Outcome of classifying one [`ChangeEvent`].
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Classification {
    /// The authoritative source file was rewritten.
    SourceChanged,
    /// A container's resolver file was rewritten.
    TargetChanged(PathBuf),
    /// A container directory appeared under the storage root.
    ContainerDirAppeared(PathBuf),
    /// A container directory was deleted.
    ContainerDirRemoved(PathBuf),
    /// Not a path or operation this daemon cares about.
    Irrelevant,
}

/// Path grammar for container directories and the resolver files inside
/// them.
///
/// A container directory is an immediate child of the storage root whose
/// name is a plain alphanumeric identifier; its target is the fixed file
/// name directly inside it.
#[derive(Debug, Clone)]
pub struct TargetPattern {
    container_root: PathBuf,
    target_file_name: String,
    id_pattern: Regex,
}

impl TargetPattern {
    /// Builds the pattern from the configured paths.
    #[must_use]
    pub fn new(config: &SyncConfig) -> Self {
        Self {
            container_root: config.container_root.clone(),
            target_file_name: config.target_file_name.clone(),
            id_pattern: Regex::new("^[A-Za-z0-9]+$").expect("identifier pattern is valid"),
        }
    }

    /// Returns the container storage root.
    #[must_use]
    pub fn container_root(&self) -> &Path {
        &self.container_root
    }

    /// Returns `true` if `path` names a container directory.
    #[must_use]
    pub fn is_container_dir(&self, path: &Path) -> bool {
        path.parent() == Some(self.container_root.as_path())
            && path
                .file_name()
                .and_then(|name| name.to_str())
                .is_some_and(|name| self.id_pattern.is_match(name))
    }

    /// Returns `true` if `path` names the resolver file of a container
    /// directory.
    #[must_use]
    pub fn is_target_file(&self, path: &Path) -> bool {
        path.file_name().and_then(|name| name.to_str()) == Some(self.target_file_name.as_str())
            && path.parent().is_some_and(|dir| self.is_container_dir(dir))
    }

    /// Returns the target path implied by a container directory.
    #[must_use]
    pub fn target_for_dir(&self, dir: &Path) -> PathBuf {
        dir.join(&self.target_file_name)
    }
}

/// Maps raw change notifications onto the actions the daemon knows.
pub struct EventClassifier {
    source_path: PathBuf,
    pattern: TargetPattern,
}

impl EventClassifier {
    /// Builds a classifier for the configured source and container layout.
    #[must_use]
    pub fn new(config: &SyncConfig) -> Self {
        Self {
            source_path: config.source_path.clone(),
            pattern: TargetPattern::new(config),
        }
    }

    /// Returns the shared path grammar.
    #[must_use]
    pub const fn pattern(&self) -> &TargetPattern {
        &self.pattern
    }

    /// Classifies a single notification into exactly one action.
    #[must_use]
    pub fn classify(&self, event: &ChangeEvent) -> Classification {
        let classification = match event.op {
            FsOp::Write if event.path == self.source_path => Classification::SourceChanged,
            FsOp::Write if self.pattern.is_target_file(&event.path) => {
                Classification::TargetChanged(event.path.clone())
            }
            FsOp::Create if self.pattern.is_container_dir(&event.path) => {
                Classification::ContainerDirAppeared(event.path.clone())
            }
            FsOp::Remove if self.pattern.is_container_dir(&event.path) => {
                Classification::ContainerDirRemoved(event.path.clone())
            }
            _ => Classification::Irrelevant,
        };

        if classification != Classification::Irrelevant {
            tracing::debug!(
                path = %event.path.display(),
                op = event.op.label(),
                "qualifying notification"
            );
        }
        classification
    }
}

/// Drops irrelevant entries and exact duplicates from one loop batch,
/// preserving first-seen order.
///
/// Bursty writers produce runs of identical notifications inside a single
/// loop wakeup; one reconciliation per batch is enough. Order is kept so
/// that a directory's appearance and removal still apply in sequence.
#[must_use]
pub fn dedup_classifications(batch: Vec<Classification>) -> Vec<Classification> {
    let mut seen = HashSet::new();
    batch
        .into_iter()
        .filter(|c| *c != Classification::Irrelevant)
        .filter(|c| seen.insert(c.clone()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn classifier() -> EventClassifier {
        let config = SyncConfig::default()
            .with_source_path("/etc/resolv.conf")
            .with_container_root("/var/lib/docker/containers");
        EventClassifier::new(&config)
    }

    fn event(path: &str, op: FsOp) -> ChangeEvent {
        ChangeEvent {
            path: PathBuf::from(path),
            op,
        }
    }

    #[test]
    fn source_write_is_source_changed() {
        assert_eq!(
            classifier().classify(&event("/etc/resolv.conf", FsOp::Write)),
            Classification::SourceChanged
        );
    }

    #[test]
    fn source_create_is_irrelevant() {
        assert_eq!(
            classifier().classify(&event("/etc/resolv.conf", FsOp::Create)),
            Classification::Irrelevant
        );
    }

    #[test]
    fn target_write_is_target_changed() {
        let path = "/var/lib/docker/containers/0a1b2c3d/resolv.conf";
        assert_eq!(
            classifier().classify(&event(path, FsOp::Write)),
            Classification::TargetChanged(PathBuf::from(path))
        );
    }

    #[test]
    fn other_container_files_are_irrelevant() {
        assert_eq!(
            classifier().classify(&event(
                "/var/lib/docker/containers/0a1b2c3d/hostconfig.json",
                FsOp::Write
            )),
            Classification::Irrelevant
        );
    }

    #[test]
    fn nested_resolv_conf_is_irrelevant() {
        assert_eq!(
            classifier().classify(&event(
                "/var/lib/docker/containers/0a1b2c3d/mounts/resolv.conf",
                FsOp::Write
            )),
            Classification::Irrelevant
        );
    }

    #[test]
    fn container_dir_create_and_remove() {
        let dir = "/var/lib/docker/containers/0a1b2c3d";
        assert_eq!(
            classifier().classify(&event(dir, FsOp::Create)),
            Classification::ContainerDirAppeared(PathBuf::from(dir))
        );
        assert_eq!(
            classifier().classify(&event(dir, FsOp::Remove)),
            Classification::ContainerDirRemoved(PathBuf::from(dir))
        );
    }

    #[test]
    fn non_identifier_dir_is_irrelevant() {
        assert_eq!(
            classifier().classify(&event("/var/lib/docker/containers/tmp-build.1", FsOp::Create)),
            Classification::Irrelevant
        );
    }

    #[test]
    fn unrelated_path_is_irrelevant() {
        assert_eq!(
            classifier().classify(&event("/etc/hosts", FsOp::Write)),
            Classification::Irrelevant
        );
    }

    #[test]
    fn classification_is_deterministic() {
        let c = classifier();
        let ev = event("/var/lib/docker/containers/abc123/resolv.conf", FsOp::Write);
        assert_eq!(c.classify(&ev), c.classify(&ev));
    }

    #[test]
    fn target_for_dir_appends_file_name() {
        let c = classifier();
        assert_eq!(
            c.pattern()
                .target_for_dir(Path::new("/var/lib/docker/containers/abc123")),
            PathBuf::from("/var/lib/docker/containers/abc123/resolv.conf")
        );
    }

    #[test]
    fn dedup_drops_duplicates_and_irrelevant() {
        let target = PathBuf::from("/var/lib/docker/containers/abc123/resolv.conf");
        let dir = PathBuf::from("/var/lib/docker/containers/abc123");
        let batch = vec![
            Classification::TargetChanged(target.clone()),
            Classification::Irrelevant,
            Classification::TargetChanged(target.clone()),
            Classification::ContainerDirRemoved(dir.clone()),
            Classification::SourceChanged,
            Classification::SourceChanged,
        ];

        assert_eq!(
            dedup_classifications(batch),
            vec![
                Classification::TargetChanged(target),
                Classification::ContainerDirRemoved(dir),
                Classification::SourceChanged,
            ]
        );
    }

    #[test]
    fn dedup_keeps_appear_remove_ordering() {
        let dir = PathBuf::from("/var/lib/docker/containers/abc123");
        let batch = vec![
            Classification::ContainerDirAppeared(dir.clone()),
            Classification::ContainerDirRemoved(dir.clone()),
        ];

        assert_eq!(
            dedup_classifications(batch),
            vec![
                Classification::ContainerDirAppeared(dir.clone()),
                Classification::ContainerDirRemoved(dir),
            ]
        );
    }
}
