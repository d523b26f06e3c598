//! # snaptrack - content-addressed directory snapshots
//!
//! Records the full `(path, content hash)` listing of a directory tree at a
//! point in time and explains what happened between two such listings.
//!
//! ## Overview
//!
//! Each run of the tracker:
//! - Walks a directory tree in parallel and hashes every file (MD5)
//! - Writes the listing as `<prefix>_YYYY-MM-DDTHH-MM.json`
//! - Reports files sharing identical content (duplicates)
//! - Compares the new listing with the previous one
//! - Optionally deletes old snapshots beyond a keep-count
//!
//! ## Classification
//!
//! Every record of both snapshots lands in exactly one category, decided in
//! this order:
//!
//! 1. **Unchanged**: same path and same hash on both sides
//! 2. **Changed**: same path, different hash
//! 3. **Moved**: same hash, different path
//! 4. **Added** / **Deleted**: whatever is left on the current / previous side
//!
//! A record consumed by one stage never takes part in a later one, so a file
//! that was both edited and renamed in place is reported as changed only.
//! When several files share content, moves are paired in path order and the
//! surplus is reported as added or deleted. Duplicate content is an
//! additional flag and never removes a record from classification.
//!
//! ## Quick Start
//!
//! ```rust
//! use snaptrack::{classify, FileRecord, Status};
//!
//! let previous = vec![FileRecord::new("a.txt", "h1")];
//! let current = vec![FileRecord::new("b.txt", "h1")];
//!
//! let diff = classify(&previous, &current);
//! assert_eq!(diff.entries.len(), 1);
//! assert_eq!(diff.entries[0].status, Status::Moved);
//! ```
//!
//! Persisting and comparing real directories goes through [`ChangeTracker`]:
//!
//! ```rust,no_run
//! use snaptrack::ChangeTrackerBuilder;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let tracker = ChangeTrackerBuilder::new()
//!     .search_path("./data")
//!     .write_path("./snapshots")
//!     .ignore_patterns(vec!["*.tmp".to_string()])
//!     .build()?;
//!
//! let outcome = tracker.track()?;
//! println!("Wrote {}", outcome.snapshot.name);
//! # Ok(())
//! # }
//! ```
//!
//! ## Error Handling
//!
//! All operations return `Result<T, SnaptrackError>`. Unreadable files are
//! skipped during scans; too few snapshots to compare is reported through
//! [`SnaptrackError::InsufficientSnapshots`], which callers may treat as an
//! empty result.
//!
//! ## Module Organization
//!
//! - [`classifier`]: snapshot comparison
//! - [`duplicates`]: duplicate content detection
//! - [`snapshot`]: snapshot file names and contents
//! - [`store`]: directory of snapshots
//! - [`retention`]: rotation of old snapshots
//! - [`scanner`]: parallel directory walker and hasher
//! - [`report`]: text and JSON rendering
//! - [`tracker`]: the pipeline facade
//! - [`types`]: shared data types
//! - [`error`]: error types

// Public API modules
pub mod classifier;
pub mod duplicates;
pub mod error;
pub mod report;
pub mod retention;
pub mod scanner;
pub mod snapshot;
pub mod store;
pub mod tracker;
pub mod types;

// Internal modules
mod collections;
pub mod utils;

// Re-export main types for convenience
pub use classifier::classify;
pub use duplicates::{annotate_duplicates, find_duplicates};
pub use error::{Result, SnaptrackError};
pub use report::Report;
pub use retention::{RetentionManager, RetentionPlan, RetentionReport};
pub use scanner::FileScanner;
pub use snapshot::{Snapshot, SnapshotName};
pub use store::SnapshotStore;
pub use tracker::{ChangeTracker, ChangeTrackerBuilder, RunOutcome, TrackOutcome};
pub use types::*;
