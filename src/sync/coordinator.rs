//! Sync coordination façade.
//!
//! The coordinator is the single writer for every piece of shared sync
//! state: the predicate cache, the classification cache and the one active
//! watch session. External callers open a root to scan it, consume the
//! unified event stream for progress and live deltas, and reconfigure
//! ignore rules through here; no other component mutates caches or watch
//! lifecycle.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use parking_lot::Mutex;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use super::classify::FileClassifier;
use super::events::SyncEvent;
use super::filter::{IgnoreConfig, IgnorePredicate, IgnoreResolver, ResolvedPatterns};
use super::record::{ScanOutcome, ScanStatus};
use super::scanner::{self, ScanOptions};
use super::watcher::WatchSession;
use crate::config::Config;
use crate::Result;

/// Capacity of the unified event stream.
const EVENT_CHANNEL_CAPACITY: usize = 256;

/// Capacity of the scan progress channel feeding the forwarder.
const PROGRESS_CHANNEL_CAPACITY: usize = 64;

/// Cancels the scan currently tracked by the coordinator, if any.
///
/// Cloneable so a caller can cancel a scan while `open_root` is awaited.
#[derive(Clone)]
pub struct ScanCanceller {
    slot: Arc<Mutex<Option<CancellationToken>>>,
}

impl ScanCanceller {
    /// Best-effort cancellation of the in-flight scan.
    pub fn cancel(&self) {
        if let Some(token) = self.slot.lock().as_ref() {
            token.cancel();
        }
    }
}

/// Façade driving scans and watch sessions over one root at a time.
pub struct SyncCoordinator {
    config: Config,
    ignore: IgnoreConfig,
    resolver: IgnoreResolver,
    classifier: FileClassifier,
    events_tx: mpsc::Sender<SyncEvent>,
    watch: Option<WatchSession>,
    cancel_slot: Arc<Mutex<Option<CancellationToken>>>,
    active_root: Option<PathBuf>,
}

impl SyncCoordinator {
    /// Create a coordinator and the receiving end of its event stream.
    #[must_use]
    pub fn new(config: Config) -> (Self, mpsc::Receiver<SyncEvent>) {
        let (events_tx, events_rx) = mpsc::channel(EVENT_CHANNEL_CAPACITY);
        let classifier = FileClassifier::new(config.max_file_size);

        (
            Self {
                config,
                ignore: IgnoreConfig::default(),
                resolver: IgnoreResolver::new(),
                classifier,
                events_tx,
                watch: None,
                cancel_slot: Arc::new(Mutex::new(None)),
                active_root: None,
            },
            events_rx,
        )
    }

    /// Open a root: scan it and, on success, keep it live with a watch
    /// session seeded with the same predicate the scan used.
    ///
    /// Supersedes any previously open root: the prior watch session is fully
    /// stopped and any in-flight scan cancelled before the new root is
    /// processed. Differing ignore configuration triggers full cache
    /// invalidation first.
    ///
    /// # Errors
    ///
    /// Returns an error for invalid configuration, an invalid root or an
    /// unresolvable predicate. Watch setup failure is NOT an error: the
    /// listing is returned and a `WatchStopped` event reports the failure.
    pub async fn open_root(
        &mut self,
        root: &Path,
        ignore: IgnoreConfig,
    ) -> Result<ScanOutcome> {
        self.config.validate()?;
        if ignore != self.ignore {
            self.apply_ignore_config(ignore);
        }
        self.open_active(root.to_path_buf()).await
    }

    /// Handle for cancelling the current scan from another task.
    #[must_use]
    pub fn canceller(&self) -> ScanCanceller {
        ScanCanceller {
            slot: Arc::clone(&self.cancel_slot),
        }
    }

    /// Best-effort cancellation of the in-flight scan.
    pub fn cancel_scan(&self) {
        self.canceller().cancel();
    }

    /// Change the ignore configuration.
    ///
    /// A no-op when the configuration is unchanged. Otherwise both caches
    /// are cleared synchronously (a new predicate may reclassify previously
    /// excluded files and vice versa) and, when a root is open, it is
    /// re-opened under the new rules and the fresh listing returned.
    ///
    /// # Errors
    ///
    /// Same failure modes as [`SyncCoordinator::open_root`].
    pub async fn set_ignore_config(
        &mut self,
        ignore: IgnoreConfig,
    ) -> Result<Option<ScanOutcome>> {
        if ignore == self.ignore {
            return Ok(None);
        }

        self.apply_ignore_config(ignore);

        match self.active_root.clone() {
            Some(root) => Ok(Some(self.open_active(root).await?)),
            None => Ok(None),
        }
    }

    /// Close the active root: cancel any scan and stop the watch session.
    ///
    /// A no-op when nothing is open.
    pub async fn close_root(&mut self) {
        self.cancel_scan();
        if let Some(session) = self.watch.take() {
            session.stop().await;
        }
        self.active_root = None;
    }

    /// Resolve the pattern sets for display without mutating any cache.
    ///
    /// # Errors
    ///
    /// Returns an error for an invalid root or invalid patterns.
    pub fn ignore_patterns(
        &self,
        root: &Path,
        ignore: &IgnoreConfig,
    ) -> Result<ResolvedPatterns> {
        self.resolver.resolved_patterns(root, ignore)
    }

    /// The currently open root, if any.
    #[must_use]
    pub fn active_root(&self) -> Option<&Path> {
        self.active_root.as_deref()
    }

    /// Whether a watch session is currently active.
    #[must_use]
    pub fn is_watching(&self) -> bool {
        self.watch.is_some()
    }

    /// The active ignore configuration.
    #[must_use]
    pub fn ignore_config(&self) -> &IgnoreConfig {
        &self.ignore
    }

    /// Clear both caches synchronously, then adopt the new configuration.
    fn apply_ignore_config(&mut self, ignore: IgnoreConfig) {
        self.resolver.invalidate_all();
        self.classifier.clear();
        tracing::info!(?ignore.mode, custom = ignore.custom_patterns.len(), "Ignore configuration changed, caches cleared");
        self.ignore = ignore;
    }

    async fn open_active(&mut self, root: PathBuf) -> Result<ScanOutcome> {
        // Supersede: the previous session must be fully stopped before the
        // new root becomes active.
        self.cancel_scan();
        if let Some(previous) = self.watch.take() {
            previous.stop().await;
        }
        self.active_root = None;

        let predicate = self.resolver.resolve(&root, &self.ignore)?;
        let canonical = predicate.root().to_path_buf();

        let outcome = self.run_scan(&canonical, &predicate).await?;
        self.active_root = Some(canonical.clone());

        if outcome.status == ScanStatus::Cancelled {
            // The caller abandoned this root; leave it unwatched.
            return Ok(outcome);
        }

        match WatchSession::start(
            &canonical,
            predicate,
            self.classifier.clone(),
            self.events_tx.clone(),
            self.config.debounce,
        ) {
            Ok(session) => self.watch = Some(session),
            Err(e) => {
                tracing::error!(
                    root = %canonical.display(),
                    error = %e,
                    "Watch setup failed; listing delivered without live updates"
                );
                let _ = self
                    .events_tx
                    .send(SyncEvent::WatchStopped {
                        reason: e.to_string(),
                    })
                    .await;
            }
        }

        Ok(outcome)
    }

    async fn run_scan(
        &mut self,
        root: &Path,
        predicate: &Arc<IgnorePredicate>,
    ) -> Result<ScanOutcome> {
        let (progress_tx, mut progress_rx) = mpsc::channel(PROGRESS_CHANNEL_CAPACITY);
        let forward_tx = self.events_tx.clone();
        let forwarder = tokio::spawn(async move {
            while let Some(snapshot) = progress_rx.recv().await {
                // Progress is lossy by contract; never block the stream.
                let _ = forward_tx.try_send(SyncEvent::Progress(snapshot));
            }
        });

        let cancel = CancellationToken::new();
        *self.cancel_slot.lock() = Some(cancel.clone());

        let options = ScanOptions {
            threads: self.config.scan_threads,
            timeout: self.config.scan_timeout,
            cancel,
            progress: Some(progress_tx),
        };

        let result = scanner::scan(
            root,
            Arc::clone(predicate),
            self.classifier.clone(),
            options,
        )
        .await;

        *self.cancel_slot.lock() = None;
        // All progress senders are gone once the scan returns, so the
        // forwarder drains and exits.
        let _ = forwarder.await;

        result
    }
}
