//! File records and scan progress accounting.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};

use serde::Serialize;

use super::classify::Classified;

/// One file's eligibility, classification and (optionally) content.
///
/// Records are replaced wholesale when a file changes; they are never
/// partially mutated.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct FileRecord {
    /// Absolute path.
    pub path: PathBuf,
    /// Forward-slash path relative to the scanned root.
    pub relative_path: String,
    /// Size in bytes.
    pub size: u64,
    /// Whether the file was classified as binary.
    pub is_binary: bool,
    /// Whether the file was skipped (oversized or unreadable).
    pub is_skipped: bool,
    /// Per-file error, if stat/read failed or the file was skipped.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// Language tag derived from the extension.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file_type: Option<String>,
    /// Whether the path matches the built-in default exclusions.
    pub excluded_by_default: bool,
    /// File content; only for eligible text files within the size ceiling.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    /// Approximate token count for the content.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub token_estimate: Option<u64>,
}

impl FileRecord {
    /// Wrap a classification into the record handed to callers.
    #[must_use]
    pub fn from_classified(
        path: &Path,
        relative_path: String,
        classified: &Classified,
        excluded_by_default: bool,
    ) -> Self {
        Self {
            path: path.to_path_buf(),
            relative_path,
            size: classified.size,
            is_binary: classified.is_binary,
            is_skipped: classified.is_skipped,
            error: classified.error.clone(),
            file_type: classified.file_type.clone(),
            excluded_by_default,
            content: classified.content.clone(),
            token_estimate: classified.token_estimate,
        }
    }
}

/// Live counters for one scan invocation.
///
/// Scan-local: a fresh set is created per scan so progress reporting never
/// crosses invocations.
#[derive(Debug, Default)]
pub struct ScanCounters {
    pub directories: AtomicU64,
    pub files: AtomicU64,
    pub errors: AtomicU64,
}

impl ScanCounters {
    /// Create new counters.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Get a snapshot of current progress.
    #[must_use]
    pub fn snapshot(&self) -> ScanProgress {
        ScanProgress {
            directories: self.directories.load(Ordering::Relaxed),
            files: self.files.load(Ordering::Relaxed),
        }
    }

    /// Number of per-entry errors recorded so far.
    #[must_use]
    pub fn error_count(&self) -> u64 {
        self.errors.load(Ordering::Relaxed)
    }
}

/// Snapshot of scan progress counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ScanProgress {
    /// Directories visited.
    pub directories: u64,
    /// Files processed.
    pub files: u64,
}

/// How a scan terminated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum ScanStatus {
    /// The whole tree was walked.
    Complete,
    /// The caller cancelled the scan.
    Cancelled,
    /// The wall-clock budget expired.
    TimedOut,
}

/// Terminal result of one scan: status plus whatever was accumulated.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ScanOutcome {
    /// Terminal status.
    pub status: ScanStatus,
    /// Accumulated file records; complete only when `status` is `Complete`.
    pub records: Vec<FileRecord>,
    /// Final progress counters.
    pub progress: ScanProgress,
    /// Number of per-entry errors encountered.
    pub error_count: u64,
}
