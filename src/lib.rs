//! # docker-resolv-sync
//!
//! Keep per-container `resolv.conf` files in sync with the host's
//! `/etc/resolv.conf`.
//!
//! Container runtimes copy the host resolver configuration into each
//! container's state directory and may rewrite it at any time afterwards,
//! silently undoing DNS changes made on the host (VPN resolvers,
//! split-horizon setups, captive portals). This crate runs as a long-lived
//! daemon that watches both sides and rewrites any container copy that
//! drifts from the source.
//!
//! ## Quick start
//!
//! ```rust,ignore
//! use docker_resolv_sync::{SyncConfig, SyncDaemon};
//!
//! let config = SyncConfig::default().with_refresh_secs(60);
//! let daemon = SyncDaemon::new(config)?;
//! daemon.run(async { let _ = tokio::signal::ctrl_c().await; }).await;
//! ```
//!
//! ## How it works
//!
//! - A [`ContentStore`] holds the last committed source bytes behind a
//!   read/write lock; it is the single source of truth for every rewrite.
//! - A [`watch::WatchManager`] subscribes the source file, the container
//!   storage root, and each known container directory to filesystem
//!   notifications.
//! - The [`SyncDaemon`] control loop classifies notifications
//!   ([`EventClassifier`]) and dispatches idempotent reconciliations
//!   ([`reconcile::fix`]) as concurrent tasks. An optional periodic pass
//!   re-reads the source and reconciles every target unconditionally,
//!   repairing files corrupted without a matching notification.
//!
//! ## Failure model
//!
//! Only startup failures are fatal: an unreadable source file or
//! unwatchable roots. Once running, every filesystem error is logged and
//! abandoned for that cycle; the next notification or forced refresh
//! retries naturally, so the daemon degrades to "stale until the next
//! successful pass" instead of exiting.

#![warn(clippy::all, clippy::pedantic, clippy::nursery)]
#![allow(clippy::module_name_repetitions)]

pub mod classify;
pub mod config;
pub mod daemon;
pub mod error;
pub mod reconcile;
pub mod scan;
pub mod store;
pub mod watch;

pub use classify::{ChangeEvent, Classification, EventClassifier, FsOp, TargetPattern};
pub use config::SyncConfig;
pub use daemon::{LoopState, SyncDaemon};
pub use error::{Result, SyncError};
pub use store::ContentStore;
