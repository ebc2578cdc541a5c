//! Directory synchronization engine.
//!
//! This module provides:
//! - Layered ignore-pattern resolution with per-root predicate caching
//! - Concurrent directory scanning with classification and progress
//! - A live watch session with per-path debouncing
//! - The [`SyncCoordinator`] façade tying scan and watch together

pub mod classify;
pub mod coordinator;
pub mod events;
pub mod filter;
pub mod paths;
pub mod record;
pub mod scanner;
pub mod watcher;

pub use classify::{Classified, FileClassifier};
pub use coordinator::{ScanCanceller, SyncCoordinator};
pub use events::{FileChange, SyncEvent};
pub use filter::{IgnoreConfig, IgnoreMode, IgnorePredicate, IgnoreResolver, ResolvedPatterns};
pub use record::{FileRecord, ScanOutcome, ScanProgress, ScanStatus};
pub use scanner::{scan, ScanOptions};
pub use watcher::WatchSession;
