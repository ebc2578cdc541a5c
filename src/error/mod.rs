//! Error types and Result aliases for treesync.
//!
//! This module defines the error hierarchy used throughout the crate.
//! All public functions return `Result<T, Error>` or `Result<T>`.
//!
//! Per-file problems (an unreadable entry, an oversized file) are never
//! surfaced through these types; they are recorded on the affected
//! `FileRecord` so a partial listing is always preferred over no listing.

use thiserror::Error;

/// Result type alias using treesync's Error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for treesync operations.
#[derive(Error, Debug)]
pub enum Error {
    /// Configuration error (invalid root, invalid pattern, bad settings).
    #[error("configuration error: {0}")]
    Config(String),

    /// Directory scan error.
    #[error("scan error: {0}")]
    Scan(#[from] ScanError),

    /// File watching error.
    #[error("watch error: {0}")]
    Watch(#[from] WatchError),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Generic internal error.
    #[error("internal error: {0}")]
    Internal(String),
}

/// Structural scan errors.
///
/// These abort the whole scan; per-entry failures are recorded on the
/// individual `FileRecord` instead.
#[derive(Error, Debug)]
pub enum ScanError {
    /// The requested root does not exist.
    #[error("root '{path}' does not exist")]
    RootNotFound { path: String },

    /// The requested root is not a directory.
    #[error("root '{path}' is not a directory")]
    NotADirectory { path: String },

    /// The walker could not be driven at all.
    #[error("walk failed for '{path}': {reason}")]
    WalkFailed { path: String, reason: String },
}

/// File watcher errors.
#[derive(Error, Debug)]
pub enum WatchError {
    /// Failed to establish a filesystem watch.
    #[error("failed to watch '{path}': {reason}")]
    SetupFailed { path: String, reason: String },

    /// The watch became invalid mid-session.
    #[error("watch on '{path}' failed at runtime: {reason}")]
    Runtime { path: String, reason: String },
}

impl Error {
    /// Create a configuration error.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Create an internal error.
    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }
}
