//! Core data types used throughout the snaptrack library
//!
//! ## Overview
//!
//! The types in this module represent:
//! - **Snapshot content**: `FileRecord` - one `(path, hash)` pair as persisted on disk
//! - **Comparison results**: `Status`, `ClassifiedEntry`, `DiffResult`, `DiffStats`,
//!   `DuplicateGroup`
//! - **Configuration**: `TrackerConfig` - paths, prefix and retention settings
//! - **Progress**: `ProgressInfo` - scan progress passed to callbacks
//!
//! ## Examples
//!
//! ```rust
//! use snaptrack::types::{FileRecord, Status};
//!
//! let record = FileRecord::new("/data/a.txt", "d41d8cd98f00b204e9800998ecf8427e");
//! assert_eq!(record.path, "/data/a.txt");
//! assert_eq!(Status::Moved.label(), "moved");
//! ```

use crate::error::{Result, SnaptrackError};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

/// One file observed in a snapshot
///
/// The serialized field names are the on-disk contract shared with snapshot
/// files produced by earlier tooling and must not change.
///
/// Records order by path first, then hash.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct FileRecord {
    /// Full path of the file as seen during the scan
    #[serde(rename = "full path")]
    pub path: String,
    /// Hex digest of the whole file contents
    #[serde(rename = "hash of file")]
    pub hash: String,
}

impl FileRecord {
    /// Create a record from a path and a content hash
    pub fn new(path: impl Into<String>, hash: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            hash: hash.into(),
        }
    }
}

/// Classification of a record
///
/// `Duplicate` is never assigned by the classifier; it is the annotation
/// produced by the duplicate detector and travels on entries as the
/// `duplicate` flag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Status {
    /// Same path, same hash in both snapshots
    Unchanged,
    /// Content shared with at least one other path in the same snapshot
    Duplicate,
    /// Same path, different hash
    Changed,
    /// Same hash, different path
    Moved,
    /// Only present in the current snapshot
    Added,
    /// Only present in the previous snapshot
    Deleted,
}

impl Status {
    /// Statuses that partition a diff, in report order
    pub const BASE: [Status; 5] = [
        Status::Unchanged,
        Status::Changed,
        Status::Moved,
        Status::Added,
        Status::Deleted,
    ];

    /// Lowercase name used in reports
    pub fn label(self) -> &'static str {
        match self {
            Status::Unchanged => "unchanged",
            Status::Duplicate => "duplicate",
            Status::Changed => "changed",
            Status::Moved => "moved",
            Status::Added => "added",
            Status::Deleted => "deleted",
        }
    }

    /// Position in report order
    pub fn rank(self) -> u8 {
        match self {
            Status::Unchanged => 0,
            Status::Duplicate => 1,
            Status::Changed => 2,
            Status::Moved => 3,
            Status::Added => 4,
            Status::Deleted => 5,
        }
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// A record (or pair of records) with its classification
///
/// Which sides are populated depends on the status:
///
/// | status | current | previous |
/// |---|---|---|
/// | Unchanged, Changed, Moved | yes | yes |
/// | Added, Duplicate | yes | no |
/// | Deleted | no | yes |
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClassifiedEntry {
    /// Path in the current snapshot
    pub path_current: Option<String>,
    /// Path in the previous snapshot
    pub path_previous: Option<String>,
    /// Hash in the current snapshot
    pub hash_current: Option<String>,
    /// Hash in the previous snapshot
    pub hash_previous: Option<String>,
    /// Classification
    pub status: Status,
    /// Whether either record shares its content with another path of its
    /// own snapshot
    #[serde(default)]
    pub duplicate: bool,
}

impl ClassifiedEntry {
    fn paired(status: Status, previous: FileRecord, current: FileRecord) -> Self {
        Self {
            path_current: Some(current.path),
            path_previous: Some(previous.path),
            hash_current: Some(current.hash),
            hash_previous: Some(previous.hash),
            status,
            duplicate: false,
        }
    }

    /// Record identical in both snapshots
    pub fn unchanged(record: FileRecord) -> Self {
        Self::paired(Status::Unchanged, record.clone(), record)
    }

    /// Same path with new content
    pub fn changed(previous: FileRecord, current: FileRecord) -> Self {
        Self::paired(Status::Changed, previous, current)
    }

    /// Same content under a new path
    pub fn moved(previous: FileRecord, current: FileRecord) -> Self {
        Self::paired(Status::Moved, previous, current)
    }

    /// Record only present in the current snapshot
    pub fn added(current: FileRecord) -> Self {
        Self {
            path_current: Some(current.path),
            path_previous: None,
            hash_current: Some(current.hash),
            hash_previous: None,
            status: Status::Added,
            duplicate: false,
        }
    }

    /// Record only present in the previous snapshot
    pub fn deleted(previous: FileRecord) -> Self {
        Self {
            path_current: None,
            path_previous: Some(previous.path),
            hash_current: None,
            hash_previous: Some(previous.hash),
            status: Status::Deleted,
            duplicate: false,
        }
    }

    /// Duplicate annotation for a record of a single snapshot
    pub fn duplicate(record: FileRecord) -> Self {
        Self {
            path_current: Some(record.path),
            path_previous: None,
            hash_current: Some(record.hash),
            hash_previous: None,
            status: Status::Duplicate,
            duplicate: true,
        }
    }

    /// Path used for sorting and single-line reports
    ///
    /// The current path when there is one, otherwise the previous path.
    pub fn primary_path(&self) -> &str {
        self.path_current
            .as_deref()
            .or(self.path_previous.as_deref())
            .unwrap_or_default()
    }
}

/// Paths sharing one content hash within a snapshot
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DuplicateGroup {
    /// Shared content hash
    pub hash: String,
    /// Paths with that hash, sorted
    pub paths: Vec<String>,
}

/// Counts per classification
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiffStats {
    /// Records identical in both snapshots
    pub unchanged: usize,
    /// Paths whose content changed
    pub changed: usize,
    /// Contents found under a new path
    pub moved: usize,
    /// Records only in the current snapshot
    pub added: usize,
    /// Records only in the previous snapshot
    pub deleted: usize,
    /// Hashes shared by two or more current paths
    pub duplicate_groups: usize,
    /// Current paths belonging to a duplicate group
    pub duplicate_files: usize,
}

impl DiffStats {
    /// Check if anything other than unchanged records was found
    pub fn has_changes(&self) -> bool {
        self.changed > 0 || self.moved > 0 || self.added > 0 || self.deleted > 0
    }

    /// Count for one of the base statuses
    pub fn count(&self, status: Status) -> usize {
        match status {
            Status::Unchanged => self.unchanged,
            Status::Changed => self.changed,
            Status::Moved => self.moved,
            Status::Added => self.added,
            Status::Deleted => self.deleted,
            Status::Duplicate => self.duplicate_files,
        }
    }
}

/// Result of comparing two snapshots
///
/// `entries` covers every record of both snapshots exactly once and is
/// sorted by status, then by primary path.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiffResult {
    /// Classified records
    pub entries: Vec<ClassifiedEntry>,
    /// Duplicate groups of the current snapshot
    pub duplicates: Vec<DuplicateGroup>,
    /// Summary counts
    pub stats: DiffStats,
}

impl DiffResult {
    /// Entries with the given status
    pub fn with_status(&self, status: Status) -> impl Iterator<Item = &ClassifiedEntry> {
        self.entries.iter().filter(move |e| e.status == status)
    }

    /// Check if the two snapshots hold exactly the same records
    pub fn is_identical(&self) -> bool {
        !self.stats.has_changes()
    }
}

/// Progress callback for long-running operations
pub type ProgressCallback = Arc<dyn Fn(ProgressInfo) + Send + Sync>;

/// Information passed to progress callbacks
#[derive(Debug, Clone)]
pub struct ProgressInfo {
    /// Operation being performed
    pub operation: String,
    /// Current item being processed
    pub current_item: Option<String>,
    /// Items processed so far
    pub processed: usize,
    /// Total items to process (if known)
    pub total: Option<usize>,
}

impl ProgressInfo {
    /// Get progress as a percentage (0-100)
    pub fn percentage(&self) -> Option<f32> {
        match self.total {
            Some(total) if total > 0 => Some((self.processed as f32 / total as f32) * 100.0),
            _ => None,
        }
    }
}

/// Configuration for a change tracker
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrackerConfig {
    /// Directory tree to snapshot
    pub search_path: Option<PathBuf>,
    /// Directory holding snapshot files
    pub write_path: PathBuf,
    /// File name prefix of snapshot files
    pub output_prefix: String,
    /// Snapshots kept by rotation
    pub number_to_keep: usize,
    /// Hashing threads
    pub parallel_workers: usize,
    /// Ignore patterns (gitignore style)
    pub ignore_patterns: Vec<String>,
    /// Whether to follow symbolic links while scanning
    pub follow_symlinks: bool,
}

impl Default for TrackerConfig {
    fn default() -> Self {
        Self {
            search_path: None,
            write_path: PathBuf::from("."),
            output_prefix: "snapshot".to_string(),
            number_to_keep: 3,
            parallel_workers: num_cpus::get(),
            ignore_patterns: Vec::new(),
            follow_symlinks: false,
        }
    }
}

impl TrackerConfig {
    /// Check the configuration before any work starts
    ///
    /// The search path is only required when `needs_search_path` is set
    /// (operations that scan).
    ///
    /// # Errors
    ///
    /// - [`SnaptrackError::InvalidConfiguration`] naming the first problem found
    pub fn validate(&self, needs_search_path: bool) -> Result<()> {
        match &self.search_path {
            Some(path) if !path.is_dir() => {
                return Err(SnaptrackError::config(format!(
                    "search path is not a directory: {}",
                    path.display()
                )));
            }
            None if needs_search_path => {
                return Err(SnaptrackError::config("search path is required"));
            }
            _ => {}
        }
        if !self.write_path.is_dir() {
            return Err(SnaptrackError::config(format!(
                "write path is not a directory: {}",
                self.write_path.display()
            )));
        }
        if self.number_to_keep < 1 {
            return Err(SnaptrackError::config("number_to_keep must be at least 1"));
        }
        if self.output_prefix.is_empty() || self.output_prefix.contains(['/', '\\']) {
            return Err(SnaptrackError::config(format!(
                "output prefix must be a non-empty file name fragment, got {:?}",
                self.output_prefix
            )));
        }
        if self.parallel_workers == 0 {
            return Err(SnaptrackError::config("parallel_workers must be at least 1"));
        }
        Ok(())
    }
}
