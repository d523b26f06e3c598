//! Error types for the snaptrack library
//!
//! This module defines all error types that can occur while scanning,
//! persisting, comparing and rotating snapshots. Errors carry enough
//! context (file names, paths) to tell the operator what to fix.

use std::path::PathBuf;
use thiserror::Error;

/// Type alias for Results in the snaptrack library
pub type Result<T> = std::result::Result<T, SnaptrackError>;

/// Main error type for all snaptrack operations
#[derive(Debug, Error)]
pub enum SnaptrackError {
    /// I/O errors during file operations
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Errors during JSON serialization/deserialization
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Invalid configuration (bad or missing path, non-positive keep-count)
    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),

    /// Snapshot file name does not carry a parseable timestamp
    #[error("Cannot parse timestamp from snapshot name {file_name:?}: {reason}")]
    TimestampParse {
        /// Offending file name
        file_name: String,
        /// What was wrong with it
        reason: String,
    },

    /// Fewer snapshots exist than the operation needs
    #[error("Need at least {needed} snapshot(s), found {found}")]
    InsufficientSnapshots {
        /// Number of snapshots the operation reads
        needed: usize,
        /// Number of snapshots present
        found: usize,
    },

    /// A file could not be read while hashing
    #[error("Cannot access {path:?}: {source}")]
    FileAccess {
        /// Path of the unreadable file
        path: PathBuf,
        /// Underlying I/O error
        #[source]
        source: std::io::Error,
    },

    /// A snapshot selected for deletion could not be removed
    #[error("Failed to delete snapshot {path:?}: {source}")]
    RetentionFailed {
        /// Path of the snapshot file
        path: PathBuf,
        /// Underlying I/O error
        #[source]
        source: std::io::Error,
    },

    /// Directory walk error from the ignore crate
    #[error("Walk directory error: {0}")]
    Walk(String),

    /// Thread pool error
    #[error("Thread pool error: {0}")]
    ThreadPool(String),
}

impl From<ignore::Error> for SnaptrackError {
    fn from(err: ignore::Error) -> Self {
        SnaptrackError::Walk(err.to_string())
    }
}

impl From<rayon::ThreadPoolBuildError> for SnaptrackError {
    fn from(err: rayon::ThreadPoolBuildError) -> Self {
        SnaptrackError::ThreadPool(err.to_string())
    }
}

impl SnaptrackError {
    /// Create a configuration error with a custom message
    pub fn config(msg: impl Into<String>) -> Self {
        SnaptrackError::InvalidConfiguration(msg.into())
    }

    /// Create a timestamp parse error for a snapshot file name
    pub fn timestamp(file_name: impl Into<String>, reason: impl Into<String>) -> Self {
        SnaptrackError::TimestampParse {
            file_name: file_name.into(),
            reason: reason.into(),
        }
    }

    /// Check if this error is recoverable
    ///
    /// Recoverable errors are handled where they occur (the file is skipped)
    /// and never abort a run.
    pub fn is_recoverable(&self) -> bool {
        matches!(self, SnaptrackError::FileAccess { .. })
    }

    /// Check if this error only describes an empty result
    ///
    /// The CLI reports these and exits successfully.
    pub fn is_informational(&self) -> bool {
        matches!(self, SnaptrackError::InsufficientSnapshots { .. })
    }

    /// Get a user-friendly error message with suggestions
    pub fn user_message(&self) -> String {
        match self {
            SnaptrackError::InsufficientSnapshots { needed, found } => {
                format!(
                    "Need at least {} snapshot(s), found {}. Run 'snaptrack snapshot' to capture more.",
                    needed, found
                )
            }
            SnaptrackError::TimestampParse { file_name, .. } => {
                format!(
                    "Snapshot {:?} does not match '<prefix>_YYYY-MM-DDTHH-MM.json'. Rename or remove it.",
                    file_name
                )
            }
            SnaptrackError::RetentionFailed { path, .. } => {
                format!(
                    "Could not delete old snapshot {:?}. Check permissions on the snapshot directory.",
                    path
                )
            }
            _ => self.to_string(),
        }
    }
}
