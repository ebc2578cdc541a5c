//! Change and sync event types.
//!
//! Raw filesystem notifications are normalized into [`FileChange`] values and
//! funneled through one channel per watch session; consumers see them on the
//! coordinator's unified [`SyncEvent`] stream.

use std::path::{Path, PathBuf};

use serde::Serialize;

use super::record::{FileRecord, ScanProgress};

/// A normalized change to a single file under the watched root.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum FileChange {
    /// A file appeared and was classified.
    Added(FileRecord),
    /// A file's content changed; the record replaces the previous one.
    Updated(FileRecord),
    /// A file disappeared.
    #[serde(rename_all = "camelCase")]
    Removed {
        /// Absolute path.
        path: PathBuf,
        /// Forward-slash path relative to the watched root.
        relative_path: String,
    },
}

impl FileChange {
    /// Get the absolute path this change refers to.
    #[must_use]
    pub fn path(&self) -> &Path {
        match self {
            Self::Added(record) | Self::Updated(record) => &record.path,
            Self::Removed { path, .. } => path,
        }
    }

    /// Get the root-relative path this change refers to.
    #[must_use]
    pub fn relative_path(&self) -> &str {
        match self {
            Self::Added(record) | Self::Updated(record) => &record.relative_path,
            Self::Removed { relative_path, .. } => relative_path,
        }
    }
}

/// Events delivered on the coordinator's unified stream.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(tag = "event", rename_all = "camelCase")]
pub enum SyncEvent {
    /// Incremental scan progress.
    Progress(ScanProgress),
    /// A live change under the watched root.
    Change(FileChange),
    /// The watch session stopped on its own (fatal watch error).
    #[serde(rename_all = "camelCase")]
    WatchStopped {
        /// Human-readable reason.
        reason: String,
    },
}
