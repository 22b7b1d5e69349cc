//! The watch-and-reconcile control loop.
//!
//! One task multiplexes filesystem notifications, the optional periodic
//! forced refresh, and the shutdown request. Every reconciliation it
//! decides on is dispatched as an independent blocking task; the loop
//! never waits for a dispatch to finish, except while draining, where it
//! waits for all of them before releasing the watches.

use std::future::Future;
use std::path::PathBuf;

use tokio::sync::mpsc;
use tokio::task::JoinSet;
use tokio::time::{self, Interval, MissedTickBehavior};

use crate::classify::{self, ChangeEvent, Classification, EventClassifier};
use crate::config::SyncConfig;
use crate::error::Result;
use crate::reconcile;
use crate::scan;
use crate::store::ContentStore;
use crate::watch::WatchManager;

/// Lifecycle of the control loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopState {
    /// Processing notifications and timer ticks.
    Running,
    /// No longer accepting notifications; waiting for in-flight
    /// reconciliations.
    Draining,
    /// Terminal.
    Stopped,
}

/// Why the control loop woke up.
enum Wake {
    Shutdown,
    Event(ChangeEvent),
    ChannelClosed,
    Tick,
    FixReaped(std::result::Result<(), tokio::task::JoinError>),
}

/// The sync daemon: watches the source file and the container tree, and
/// keeps every container's resolver file equal to the source.
///
/// # Example
///
/// ```rust,ignore
/// use docker_resolv_sync::{SyncConfig, SyncDaemon};
///
/// let daemon = SyncDaemon::new(SyncConfig::default().with_refresh_secs(60))?;
/// daemon.run(async { let _ = tokio::signal::ctrl_c().await; }).await;
/// ```
pub struct SyncDaemon {
    config: SyncConfig,
    store: ContentStore,
    classifier: EventClassifier,
    watches: WatchManager,
    events: mpsc::Receiver<ChangeEvent>,
    fixes: JoinSet<()>,
    state: LoopState,
}

impl SyncDaemon {
    /// Establishes initial state: reads the source file and subscribes
    /// the notification roots.
    ///
    /// # Errors
    ///
    /// Returns an error if the source file cannot be read or the roots
    /// cannot be watched. Both mean the daemon could never do useful
    /// work, so no partial operation is attempted.
    pub fn new(config: SyncConfig) -> Result<Self> {
        let store = ContentStore::load(&config.source_path)?;
        let classifier = EventClassifier::new(&config);
        let (tx, rx) = mpsc::channel(config.event_capacity);
        let watches = WatchManager::new(&config, tx)?;

        Ok(Self {
            config,
            store,
            classifier,
            watches,
            events: rx,
            fixes: JoinSet::new(),
            state: LoopState::Running,
        })
    }

    /// Runs until `shutdown` completes, then drains in-flight
    /// reconciliations, releases the watches, and returns.
    pub async fn run(mut self, shutdown: impl Future<Output = ()>) {
        tokio::pin!(shutdown);

        self.watch_existing_containers();
        self.reconcile_all();

        let mut ticker = self.config.refresh_interval.map(|period| {
            // First tick one full period out; startup just reconciled.
            let mut ticker = time::interval_at(time::Instant::now() + period, period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            ticker
        });

        tracing::info!(
            source = %self.config.source_path.display(),
            root = %self.config.container_root.display(),
            refresh = ?self.config.refresh_interval,
            "watching for resolver changes"
        );

        while self.state == LoopState::Running {
            let wake = tokio::select! {
                biased;
                () = &mut shutdown => Wake::Shutdown,
                maybe = self.events.recv() => {
                    maybe.map_or(Wake::ChannelClosed, Wake::Event)
                }
                () = next_tick(ticker.as_mut()) => Wake::Tick,
                Some(res) = self.fixes.join_next(), if !self.fixes.is_empty() => {
                    Wake::FixReaped(res)
                }
            };

            match wake {
                Wake::Shutdown => {
                    tracing::info!("shutdown requested");
                    self.state = LoopState::Draining;
                }
                Wake::ChannelClosed => {
                    tracing::error!("notification channel closed unexpectedly");
                    self.state = LoopState::Draining;
                }
                Wake::Event(event) => {
                    let batch = self.drain_batch(event);
                    self.handle_batch(batch);
                }
                Wake::Tick => {
                    tracing::debug!("periodic forced refresh");
                    self.refresh_all(true);
                }
                Wake::FixReaped(Err(e)) => {
                    tracing::warn!(error = %e, "reconciliation task failed");
                }
                Wake::FixReaped(Ok(())) => {}
            }
        }

        self.drain().await;
    }

    /// Classifies the waking event plus everything else already queued,
    /// deduplicated into one batch.
    fn drain_batch(&mut self, first: ChangeEvent) -> Vec<Classification> {
        let mut batch = vec![self.classifier.classify(&first)];
        while let Ok(event) = self.events.try_recv() {
            batch.push(self.classifier.classify(&event));
        }
        classify::dedup_classifications(batch)
    }

    fn handle_batch(&mut self, batch: Vec<Classification>) {
        for action in batch {
            match action {
                Classification::SourceChanged => self.refresh_all(false),
                Classification::TargetChanged(path) => self.dispatch_fix(path),
                Classification::ContainerDirAppeared(dir) => {
                    self.watches.add_container_watch(&dir);
                    // The resolver file may be racing the directory into
                    // existence; reconcile it now rather than waiting for
                    // its own write notification.
                    let target = self.classifier.pattern().target_for_dir(&dir);
                    self.dispatch_fix(target);
                }
                Classification::ContainerDirRemoved(dir) => {
                    self.watches.remove_container_watch(&dir);
                }
                Classification::Irrelevant => {}
            }
        }
    }

    /// Re-reads the source and reconciles every enumerable target.
    ///
    /// Without `force`, byte-identical source content ends the pass
    /// early. With `force` every target is reconciled regardless, which
    /// repairs targets corrupted without a matching notification.
    fn refresh_all(&mut self, force: bool) {
        match self.store.compare_and_set(force) {
            Ok(true) => self.reconcile_all(),
            Ok(false) => {}
            Err(e) => tracing::error!(error = %e, "failed to refresh source content"),
        }
    }

    /// Scans for targets and dispatches one fix per target. A failed scan
    /// skips the whole cycle; the next one retries.
    fn reconcile_all(&mut self) {
        let targets = match scan::list_targets(self.classifier.pattern()) {
            Ok(targets) => targets,
            Err(e) => {
                tracing::error!(error = %e, "target scan failed, skipping refresh cycle");
                return;
            }
        };
        tracing::debug!(count = targets.len(), "reconciling targets");
        for target in targets {
            self.dispatch_fix(target);
        }
    }

    /// Fire-and-forget reconciliation, carrying the content snapshot taken
    /// at dispatch time.
    fn dispatch_fix(&mut self, path: PathBuf) {
        let content = self.store.get();
        self.fixes.spawn_blocking(move || {
            reconcile::fix(&path, &content);
        });
    }

    /// Startup pass: watch every container directory that already exists.
    /// Per-directory failures are tolerated; root-level create events and
    /// the forced refresh cover anything missed here.
    fn watch_existing_containers(&mut self) {
        let dirs = match scan::list_container_dirs(self.classifier.pattern()) {
            Ok(dirs) => dirs,
            Err(e) => {
                tracing::warn!(error = %e, "could not enumerate container directories");
                return;
            }
        };
        for dir in dirs {
            self.watches.add_container_watch(&dir);
        }
        tracing::debug!(count = self.watches.active_watches(), "container watches installed");
    }

    /// Draining: close the notification channel so the watch callback
    /// stops feeding work, let every outstanding fix finish, and only then
    /// release the watches. A write must never land after watch teardown,
    /// and exit must not race a pending disk write.
    async fn drain(&mut self) {
        self.state = LoopState::Draining;
        tracing::info!("draining in-flight reconciliations");
        self.events.close();
        while let Some(res) = self.fixes.join_next().await {
            if let Err(e) = res {
                tracing::warn!(error = %e, "reconciliation task failed");
            }
        }
        self.watches.shutdown();
        self.state = LoopState::Stopped;
        tracing::info!("stopped");
    }
}

/// Resolves on the next periodic tick; pends forever when the forced
/// refresh is disabled, leaving the timer inert.
async fn next_tick(ticker: Option<&mut Interval>) {
    match ticker {
        Some(ticker) => {
            ticker.tick().await;
        }
        None => std::future::pending().await,
    }
}
