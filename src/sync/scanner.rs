//! Concurrent directory scanner.
//!
//! Walks a root with a bounded pool of walker threads, applying the ignore
//! predicate before any per-file I/O and classifying every eligible entry
//! into a [`FileRecord`]. Supports cooperative cancellation and a wall-clock
//! timeout; either terminates the walk promptly and returns whatever was
//! accumulated.

use std::path::Path;
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use ignore::{WalkBuilder, WalkState};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use super::classify::FileClassifier;
use super::filter::IgnorePredicate;
use super::paths;
use super::record::{FileRecord, ScanCounters, ScanOutcome, ScanProgress, ScanStatus};
use crate::config::Config;
use crate::error::ScanError;
use crate::Result;

/// Files processed between progress snapshots.
const PROGRESS_EVERY: u64 = 32;

const STATUS_COMPLETE: u8 = 0;
const STATUS_CANCELLED: u8 = 1;
const STATUS_TIMED_OUT: u8 = 2;

/// Options for one scan invocation.
#[derive(Debug, Clone)]
pub struct ScanOptions {
    /// Walker thread bound.
    pub threads: usize,
    /// Wall-clock budget.
    pub timeout: Duration,
    /// Cooperative cancellation token, checked at every visit.
    pub cancel: CancellationToken,
    /// Throttled progress snapshots; dropped when the receiver lags.
    pub progress: Option<mpsc::Sender<ScanProgress>>,
}

impl ScanOptions {
    /// Build options from the engine configuration with a fresh token and no
    /// progress reporting.
    #[must_use]
    pub fn from_config(config: &Config) -> Self {
        Self {
            threads: config.scan_threads,
            timeout: config.scan_timeout,
            cancel: CancellationToken::new(),
            progress: None,
        }
    }
}

/// Scan a root directory on the blocking pool.
///
/// # Errors
///
/// Returns an error if the root is missing or not a directory; per-entry
/// failures are recorded on the individual records instead.
pub async fn scan(
    root: &Path,
    predicate: Arc<IgnorePredicate>,
    classifier: FileClassifier,
    options: ScanOptions,
) -> Result<ScanOutcome> {
    let root = root.to_path_buf();
    tokio::task::spawn_blocking(move || scan_blocking(&root, &predicate, &classifier, &options))
        .await
        .map_err(|e| crate::Error::internal(format!("scan task failed: {e}")))?
}

/// Synchronous scan implementation driving the parallel walker.
///
/// # Errors
///
/// Same contract as [`scan`].
pub fn scan_blocking(
    root: &Path,
    predicate: &Arc<IgnorePredicate>,
    classifier: &FileClassifier,
    options: &ScanOptions,
) -> Result<ScanOutcome> {
    if !root.exists() {
        return Err(ScanError::RootNotFound {
            path: root.display().to_string(),
        }
        .into());
    }
    if !root.is_dir() {
        return Err(ScanError::NotADirectory {
            path: root.display().to_string(),
        }
        .into());
    }

    tracing::info!(root = %root.display(), threads = options.threads, "Starting scan");
    let started = Instant::now();
    let deadline = started + options.timeout;

    let counters = Arc::new(ScanCounters::new());
    let status = Arc::new(AtomicU8::new(STATUS_COMPLETE));
    let (record_tx, record_rx) = crossbeam_channel::unbounded::<FileRecord>();

    let filter_root = root.to_path_buf();
    let filter_predicate = Arc::clone(predicate);

    let walker = WalkBuilder::new(root)
        .standard_filters(false)
        .follow_links(false)
        .threads(options.threads.max(1))
        .filter_entry(move |entry| {
            if entry.depth() == 0 {
                return true;
            }
            let Some(rel) = paths::relative_to(&filter_root, entry.path()) else {
                return false;
            };
            let is_dir = entry.file_type().is_some_and(|t| t.is_dir());
            // Exclusion happens here, before any stat or read of the entry.
            !filter_predicate.is_excluded(&rel, is_dir)
        })
        .build_parallel();

    walker.run(|| {
        let root = root.to_path_buf();
        let predicate = Arc::clone(predicate);
        let classifier = classifier.clone();
        let counters = Arc::clone(&counters);
        let status = Arc::clone(&status);
        let cancel = options.cancel.clone();
        let progress = options.progress.clone();
        let record_tx = record_tx.clone();

        Box::new(move |result| {
            if cancel.is_cancelled() {
                status.store(STATUS_CANCELLED, Ordering::Relaxed);
                return WalkState::Quit;
            }
            if Instant::now() >= deadline {
                status.store(STATUS_TIMED_OUT, Ordering::Relaxed);
                return WalkState::Quit;
            }

            let entry = match result {
                Ok(entry) => entry,
                Err(e) => {
                    counters.errors.fetch_add(1, Ordering::Relaxed);
                    tracing::warn!(error = %e, "Error walking directory");
                    return WalkState::Continue;
                }
            };

            let file_type = entry.file_type();
            if file_type.is_some_and(|t| t.is_dir()) {
                counters.directories.fetch_add(1, Ordering::Relaxed);
                return WalkState::Continue;
            }
            if !file_type.is_some_and(|t| t.is_file()) {
                return WalkState::Continue;
            }

            let Some(rel) = paths::relative_to(&root, entry.path()) else {
                return WalkState::Continue;
            };

            let classified = classifier.classify(entry.path());
            if classified.error.is_some() {
                counters.errors.fetch_add(1, Ordering::Relaxed);
            }
            let record = FileRecord::from_classified(
                entry.path(),
                rel.clone(),
                &classified,
                predicate.matches_default(&rel, false),
            );
            let _ = record_tx.send(record);

            let processed = counters.files.fetch_add(1, Ordering::Relaxed) + 1;
            if processed % PROGRESS_EVERY == 0 {
                if let Some(ref progress) = progress {
                    let _ = progress.try_send(counters.snapshot());
                }
            }

            WalkState::Continue
        })
    });
    drop(record_tx);

    let records: Vec<FileRecord> = record_rx.into_iter().collect();
    let progress = counters.snapshot();
    let status = match status.load(Ordering::Relaxed) {
        STATUS_CANCELLED => ScanStatus::Cancelled,
        STATUS_TIMED_OUT => ScanStatus::TimedOut,
        _ => ScanStatus::Complete,
    };

    tracing::info!(
        root = %root.display(),
        ?status,
        directories = progress.directories,
        files = progress.files,
        errors = counters.error_count(),
        elapsed_ms = started.elapsed().as_millis() as u64,
        "Scan finished"
    );

    Ok(ScanOutcome {
        status,
        records,
        progress,
        error_count: counters.error_count(),
    })
}
