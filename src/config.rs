//! Daemon configuration.

use std::path::PathBuf;
use std::time::Duration;

/// Default authoritative resolver configuration file.
const DEFAULT_SOURCE_PATH: &str = "/etc/resolv.conf";

/// Default container storage root, one subdirectory per container.
const DEFAULT_CONTAINER_ROOT: &str = "/var/lib/docker/containers";

/// File name mirrored into every container directory.
const DEFAULT_TARGET_FILE_NAME: &str = "resolv.conf";

/// Bound on the in-flight notification buffer. Notifications arriving
/// while the buffer is full are dropped; the periodic forced refresh
/// repairs anything missed that way.
const DEFAULT_EVENT_CAPACITY: usize = 256;

/// Configuration for the sync daemon.
///
/// # Example
///
/// ```
/// use std::time::Duration;
/// use docker_resolv_sync::SyncConfig;
///
/// let config = SyncConfig::default().with_refresh_secs(60);
///
/// assert_eq!(config.refresh_interval, Some(Duration::from_secs(60)));
/// assert_eq!(config.target_file_name, "resolv.conf");
/// ```
#[derive(Debug, Clone)]
pub struct SyncConfig {
    /// The authoritative resolver configuration file. Read-only from the
    /// daemon's perspective.
    pub source_path: PathBuf,

    /// Directory whose immediate subdirectories are container state
    /// directories.
    pub container_root: PathBuf,

    /// Name of the per-container file that must mirror the source.
    pub target_file_name: String,

    /// Period of the forced reconciliation pass. `None` disables it.
    pub refresh_interval: Option<Duration>,

    /// Capacity of the filesystem notification buffer.
    pub event_capacity: usize,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            source_path: PathBuf::from(DEFAULT_SOURCE_PATH),
            container_root: PathBuf::from(DEFAULT_CONTAINER_ROOT),
            target_file_name: DEFAULT_TARGET_FILE_NAME.to_string(),
            refresh_interval: None,
            event_capacity: DEFAULT_EVENT_CAPACITY,
        }
    }
}

impl SyncConfig {
    /// Creates a config with production defaults.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Overrides the source file path (useful for testing).
    #[must_use]
    pub fn with_source_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.source_path = path.into();
        self
    }

    /// Overrides the container storage root (useful for testing).
    #[must_use]
    pub fn with_container_root(mut self, path: impl Into<PathBuf>) -> Self {
        self.container_root = path.into();
        self
    }

    /// Overrides the per-container target file name.
    #[must_use]
    pub fn with_target_file_name(mut self, name: impl Into<String>) -> Self {
        self.target_file_name = name.into();
        self
    }

    /// Overrides the forced refresh period. `None` disables the pass.
    #[must_use]
    pub const fn with_refresh_interval(mut self, interval: Option<Duration>) -> Self {
        self.refresh_interval = interval;
        self
    }

    /// Sets the forced refresh period from a whole number of seconds, the
    /// unit the command line speaks. Zero or negative disables the pass.
    #[must_use]
    pub fn with_refresh_secs(self, secs: i64) -> Self {
        let interval = u64::try_from(secs)
            .ok()
            .filter(|&s| s > 0)
            .map(Duration::from_secs);
        self.with_refresh_interval(interval)
    }

    /// Overrides the notification buffer capacity.
    #[must_use]
    pub const fn with_event_capacity(mut self, capacity: usize) -> Self {
        self.event_capacity = capacity;
        self
    }
}
