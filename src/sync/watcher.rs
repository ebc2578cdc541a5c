//! Live filesystem watch session.
//!
//! One session owns one recursive OS watch. Raw notifications are normalized
//! on the notify callback thread, funneled through a single channel into the
//! session task, filtered through the same ignore predicate the scan used,
//! and emitted as [`FileChange`] values. Rapid change bursts are collapsed by
//! a per-path debounce timer table that is fully cleared on stop.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use notify::event::{ModifyKind, RenameMode};
use notify::{EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use parking_lot::Mutex;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use super::classify::FileClassifier;
use super::events::{FileChange, SyncEvent};
use super::filter::IgnorePredicate;
use super::paths;
use super::record::FileRecord;
use crate::error::WatchError;
use crate::Result;

/// Capacity of the raw notification channel feeding the session task.
const RAW_CHANNEL_CAPACITY: usize = 1024;

/// Raw notification normalized on the callback thread.
#[derive(Debug)]
enum RawEvent {
    Created(PathBuf),
    Changed(PathBuf),
    Removed(PathBuf),
    /// A rename whose direction the backend did not report; resolved by
    /// checking existence in the session task.
    NameChanged(PathBuf),
    Error(String),
}

/// State shared by the session task and its debounce timers.
struct SessionInner {
    root: PathBuf,
    predicate: Arc<IgnorePredicate>,
    classifier: FileClassifier,
    events_tx: mpsc::Sender<SyncEvent>,
    interval: Duration,
    debounce: Mutex<HashMap<PathBuf, JoinHandle<()>>>,
}

/// A live watch over one root.
///
/// At most one session may be active at a time; the coordinator enforces
/// this by fully stopping the previous session before starting the next.
pub struct WatchSession {
    root: PathBuf,
    inner: Arc<SessionInner>,
    task: JoinHandle<()>,
}

impl WatchSession {
    /// Establish the OS watch and start the session task.
    ///
    /// The predicate must be the same one the preceding scan used, so the
    /// live view never diverges from the listing it extends.
    ///
    /// # Errors
    ///
    /// Returns `WatchError::SetupFailed` if the OS watch cannot be
    /// established; no session resources are left behind in that case.
    pub fn start(
        root: &Path,
        predicate: Arc<IgnorePredicate>,
        classifier: FileClassifier,
        events_tx: mpsc::Sender<SyncEvent>,
        interval: Duration,
    ) -> Result<Self> {
        tracing::info!(root = %root.display(), "Watch session starting");

        let (raw_tx, raw_rx) = mpsc::channel(RAW_CHANNEL_CAPACITY);

        let mut watcher = notify::recommended_watcher(
            move |result: std::result::Result<notify::Event, notify::Error>| {
                for raw in normalize_notification(result) {
                    if raw_tx.blocking_send(raw).is_err() {
                        break;
                    }
                }
            },
        )
        .map_err(|e| WatchError::SetupFailed {
            path: root.display().to_string(),
            reason: e.to_string(),
        })?;

        watcher
            .watch(root, RecursiveMode::Recursive)
            .map_err(|e| WatchError::SetupFailed {
                path: root.display().to_string(),
                reason: e.to_string(),
            })?;

        let inner = Arc::new(SessionInner {
            root: root.to_path_buf(),
            predicate,
            classifier,
            events_tx,
            interval,
            debounce: Mutex::new(HashMap::new()),
        });

        let task = tokio::spawn(run_session(watcher, Arc::clone(&inner), raw_rx));

        tracing::info!(root = %root.display(), "Watch session active");

        Ok(Self {
            root: root.to_path_buf(),
            inner,
            task,
        })
    }

    /// The watched root.
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Stop the session: abort every pending debounce timer, end the session
    /// task and release the OS watch before returning.
    pub async fn stop(self) {
        tracing::info!(root = %self.root.display(), "Watch session stopping");

        let timers: Vec<JoinHandle<()>> = {
            let mut table = self.inner.debounce.lock();
            table.drain().map(|(_, handle)| handle).collect()
        };
        for timer in timers {
            timer.abort();
        }

        self.task.abort();
        let _ = self.task.await;

        tracing::info!(root = %self.root.display(), "Watch session idle");
    }
}

/// Map one notify callback result to normalized raw events.
fn normalize_notification(
    result: std::result::Result<notify::Event, notify::Error>,
) -> Vec<RawEvent> {
    let event = match result {
        Ok(event) => event,
        Err(e) => return vec![RawEvent::Error(e.to_string())],
    };

    match event.kind {
        EventKind::Create(_) => event.paths.into_iter().map(RawEvent::Created).collect(),
        EventKind::Remove(_) => event.paths.into_iter().map(RawEvent::Removed).collect(),
        EventKind::Modify(ModifyKind::Name(RenameMode::From)) => {
            event.paths.into_iter().map(RawEvent::Removed).collect()
        }
        EventKind::Modify(ModifyKind::Name(RenameMode::To)) => {
            event.paths.into_iter().map(RawEvent::Created).collect()
        }
        EventKind::Modify(ModifyKind::Name(RenameMode::Both)) => {
            let mut paths = event.paths.into_iter();
            let mut raw = Vec::new();
            if let Some(from) = paths.next() {
                raw.push(RawEvent::Removed(from));
            }
            if let Some(to) = paths.next() {
                raw.push(RawEvent::Created(to));
            }
            raw
        }
        EventKind::Modify(ModifyKind::Name(_)) => event
            .paths
            .into_iter()
            .map(RawEvent::NameChanged)
            .collect(),
        EventKind::Modify(_) | EventKind::Any => {
            event.paths.into_iter().map(RawEvent::Changed).collect()
        }
        EventKind::Access(_) | EventKind::Other => Vec::new(),
    }
}

async fn run_session(
    watcher: RecommendedWatcher,
    inner: Arc<SessionInner>,
    mut raw_rx: mpsc::Receiver<RawEvent>,
) {
    // Owned here so the OS watch is released exactly when the task ends.
    let _watcher = watcher;

    while let Some(raw) = raw_rx.recv().await {
        match raw {
            RawEvent::Created(path) => handle_created(&inner, path).await,
            RawEvent::Changed(path) => schedule_debounce(&inner, path),
            RawEvent::Removed(path) => handle_removed(&inner, path).await,
            RawEvent::NameChanged(path) => {
                if path.exists() {
                    handle_created(&inner, path).await;
                } else {
                    handle_removed(&inner, path).await;
                }
            }
            RawEvent::Error(reason) => {
                tracing::error!(root = %inner.root.display(), error = %reason, "Watch error");
                if !inner.root.exists() {
                    let timers: Vec<JoinHandle<()>> = {
                        let mut table = inner.debounce.lock();
                        table.drain().map(|(_, handle)| handle).collect()
                    };
                    for timer in timers {
                        timer.abort();
                    }
                    let _ = inner
                        .events_tx
                        .send(SyncEvent::WatchStopped {
                            reason: format!("watched root became inaccessible: {reason}"),
                        })
                        .await;
                    tracing::warn!(
                        root = %inner.root.display(),
                        "Watched root gone, stopping session"
                    );
                    break;
                }
            }
        }
    }
}

/// Relativize an event path, dropping anything unresolvable or excluded.
fn eligible_relative(inner: &SessionInner, path: &Path) -> Option<String> {
    let rel = paths::relative_to(&inner.root, path)?;
    if inner.predicate.is_excluded(&rel, false) {
        return None;
    }
    Some(rel)
}

async fn classify_record(inner: &SessionInner, path: PathBuf, rel: String) -> Option<FileRecord> {
    inner.classifier.invalidate(&path);
    let classifier = inner.classifier.clone();
    let classify_path = path.clone();
    let classified = tokio::task::spawn_blocking(move || classifier.classify(&classify_path))
        .await
        .ok()?;
    let excluded_by_default = inner.predicate.matches_default(&rel, false);
    Some(FileRecord::from_classified(
        &path,
        rel,
        &classified,
        excluded_by_default,
    ))
}

async fn handle_created(inner: &Arc<SessionInner>, path: PathBuf) {
    if path.is_dir() {
        return;
    }
    let Some(rel) = eligible_relative(inner, &path) else {
        return;
    };
    let Some(record) = classify_record(inner, path, rel).await else {
        return;
    };
    tracing::debug!(path = %record.relative_path, "File added");
    let _ = inner
        .events_tx
        .send(SyncEvent::Change(FileChange::Added(record)))
        .await;
}

async fn handle_removed(inner: &Arc<SessionInner>, path: PathBuf) {
    let Some(rel) = eligible_relative(inner, &path) else {
        return;
    };
    if let Some(timer) = inner.debounce.lock().remove(&path) {
        timer.abort();
    }
    inner.classifier.invalidate(&path);
    tracing::debug!(path = %rel, "File removed");
    let _ = inner
        .events_tx
        .send(SyncEvent::Change(FileChange::Removed {
            path,
            relative_path: rel,
        }))
        .await;
}

/// Reset the debounce timer for a changed path; only a quiet interval with
/// no further changes lets the update through.
fn schedule_debounce(inner: &Arc<SessionInner>, path: PathBuf) {
    if path.is_dir() {
        return;
    }
    if eligible_relative(inner, &path).is_none() {
        return;
    }

    let timer_inner = Arc::clone(inner);
    let timer_path = path.clone();
    let handle = tokio::spawn(async move {
        tokio::time::sleep(timer_inner.interval).await;
        timer_inner.debounce.lock().remove(&timer_path);
        emit_update(&timer_inner, timer_path).await;
    });

    if let Some(previous) = inner.debounce.lock().insert(path, handle) {
        previous.abort();
    }
}

async fn emit_update(inner: &Arc<SessionInner>, path: PathBuf) {
    let Some(rel) = eligible_relative(inner, &path) else {
        return;
    };

    // The file may have vanished during the quiet interval.
    if !path.exists() {
        inner.classifier.invalidate(&path);
        tracing::debug!(path = %rel, "File removed during debounce");
        let _ = inner
            .events_tx
            .send(SyncEvent::Change(FileChange::Removed {
                path,
                relative_path: rel,
            }))
            .await;
        return;
    }

    let previous_hash = inner
        .classifier
        .cached(&path)
        .and_then(|c| c.content_hash.clone());

    let Some(record) = classify_record(inner, path.clone(), rel).await else {
        return;
    };

    if previous_hash.is_some() {
        let fresh = inner
            .classifier
            .cached(&path)
            .and_then(|c| c.content_hash.clone());
        if fresh == previous_hash {
            tracing::debug!(path = %record.relative_path, "Content unchanged, skipping update");
            return;
        }
    }

    tracing::debug!(path = %record.relative_path, "File updated");
    let _ = inner
        .events_tx
        .send(SyncEvent::Change(FileChange::Updated(record)))
        .await;
}
