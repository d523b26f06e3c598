//! Change tracker facade
//!
//! `ChangeTracker` wires the scanner, the snapshot store, the classifier and
//! the retention manager into the operations the CLI exposes:
//!
//! - [`ChangeTracker::track`]: scan, write a snapshot, compare it with the
//!   previous one
//! - [`ChangeTracker::diff_latest`]: compare the two most recent snapshots
//! - [`ChangeTracker::duplicates_latest`]: duplicate listing of the newest snapshot
//! - [`ChangeTracker::rotate`]: keep the newest `number_to_keep` snapshots
//! - [`ChangeTracker::run`]: track, then rotate
//!
//! ## Example
//!
//! ```rust,no_run
//! use snaptrack::ChangeTrackerBuilder;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let tracker = ChangeTrackerBuilder::new()
//!     .search_path("/srv/data")
//!     .write_path("/var/lib/snaptrack")
//!     .number_to_keep(7)
//!     .build()?;
//!
//! let outcome = tracker.run()?;
//! if let Some(diff) = &outcome.tracked.diff {
//!     println!("{} files changed", diff.stats.changed);
//! }
//! # Ok(())
//! # }
//! ```

use crate::classifier::classify;
use crate::duplicates::find_duplicates;
use crate::error::{Result, SnaptrackError};
use crate::retention::{RetentionManager, RetentionReport};
use crate::scanner::FileScanner;
use crate::snapshot::{Snapshot, SnapshotName};
use crate::store::SnapshotStore;
use crate::types::{
    DiffResult, DuplicateGroup, FileRecord, ProgressCallback, ProgressInfo, TrackerConfig,
};
use chrono::{Local, NaiveDateTime};
use std::path::PathBuf;
use tracing::{info, instrument, warn};

/// Result of capturing a snapshot
#[derive(Debug, Clone)]
pub struct TrackOutcome {
    /// The snapshot just written
    pub snapshot: Snapshot,
    /// Duplicate groups inside the new snapshot
    pub duplicates: Vec<DuplicateGroup>,
    /// Snapshot the new one was compared against
    pub previous: Option<SnapshotName>,
    /// Comparison with the previous snapshot, absent on the first run
    pub diff: Option<DiffResult>,
}

/// Result of the full snapshot, compare and rotate pipeline
#[derive(Debug, Clone)]
pub struct RunOutcome {
    /// Snapshot and comparison
    pub tracked: TrackOutcome,
    /// Rotation performed afterwards
    pub retention: RetentionReport,
}

/// Tracks changes of one directory tree through persisted snapshots
pub struct ChangeTracker {
    config: TrackerConfig,
    store: SnapshotStore,
    progress: Option<ProgressCallback>,
}

impl std::fmt::Debug for ChangeTracker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChangeTracker")
            .field("config", &self.config)
            .field("store", &self.store)
            .field("progress", &self.progress.is_some())
            .finish()
    }
}

impl ChangeTracker {
    /// Create a tracker from a configuration
    ///
    /// # Errors
    ///
    /// - [`SnaptrackError::InvalidConfiguration`] if the configuration is invalid
    pub fn new(config: TrackerConfig) -> Result<Self> {
        config.validate(false)?;
        let store = SnapshotStore::open(&config.write_path, &config.output_prefix)?;
        Ok(Self {
            config,
            store,
            progress: None,
        })
    }

    /// Active configuration
    pub fn config(&self) -> &TrackerConfig {
        &self.config
    }

    /// Underlying snapshot store
    pub fn store(&self) -> &SnapshotStore {
        &self.store
    }

    /// Scan the search path and return its records without persisting them
    pub fn scan(&self) -> Result<Vec<FileRecord>> {
        self.config.validate(true)?;
        let search_path = self
            .config
            .search_path
            .clone()
            .ok_or_else(|| SnaptrackError::config("search path is required"))?;

        let scanner = FileScanner::new(search_path)
            .with_ignore_patterns(self.config.ignore_patterns.clone())
            .with_follow_symlinks(self.config.follow_symlinks)
            .with_parallel_workers(self.config.parallel_workers)
            .excluding_snapshots(&self.config.write_path, &self.config.output_prefix);

        match &self.progress {
            Some(callback) => {
                let callback = callback.clone();
                scanner.scan(Some(move |info: ProgressInfo| callback(info)))
            }
            None => scanner.scan::<fn(ProgressInfo)>(None),
        }
    }

    /// Capture a snapshot now and compare it with the previous one
    pub fn track(&self) -> Result<TrackOutcome> {
        self.track_at(Local::now().naive_local())
    }

    /// Capture a snapshot stamped `timestamp` and compare it with the previous one
    ///
    /// The previous snapshot is the newest one ordered before this capture,
    /// ignoring a same-minute snapshot that the new one replaces. Snapshots
    /// stamped later than `timestamp` (clock set back) are never used as the
    /// baseline.
    #[instrument(skip(self))]
    pub fn track_at(&self, timestamp: NaiveDateTime) -> Result<TrackOutcome> {
        let new_name = SnapshotName::new(self.config.output_prefix.clone(), timestamp);
        let (older, newer): (Vec<SnapshotName>, Vec<SnapshotName>) = self
            .store
            .list()?
            .into_iter()
            .filter(|name| name.file_name() != new_name.file_name())
            .partition(|name| *name < new_name);
        if let Some(newest) = newer.last() {
            warn!(
                "{} newer snapshot(s) than {} exist, latest {}",
                newer.len(),
                new_name,
                newest
            );
        }
        let previous = older.into_iter().next_back();
        let previous_snapshot = previous
            .as_ref()
            .map(|name| self.store.load(name))
            .transpose()?;

        let records = self.scan()?;
        let snapshot = self.store.write(records, timestamp)?;
        let duplicates = find_duplicates(&snapshot.records);

        let diff = previous_snapshot.map(|prev| classify(&prev.records, &snapshot.records));
        match &diff {
            Some(diff) => info!(
                "Compared {} with {}: {} changed, {} moved, {} added, {} deleted",
                snapshot.name,
                previous
                    .as_ref()
                    .map(|n| n.file_name())
                    .unwrap_or_default(),
                diff.stats.changed,
                diff.stats.moved,
                diff.stats.added,
                diff.stats.deleted
            ),
            None => info!("First snapshot {}, nothing to compare", snapshot.name),
        }

        Ok(TrackOutcome {
            snapshot,
            duplicates,
            previous,
            diff,
        })
    }

    /// Compare the two most recent snapshots
    ///
    /// # Errors
    ///
    /// - [`SnaptrackError::InsufficientSnapshots`] if fewer than two exist
    /// - [`SnaptrackError::TimestampParse`] if a snapshot name is malformed
    #[instrument(skip(self))]
    pub fn diff_latest(&self) -> Result<DiffResult> {
        let (previous, current) = self.store.latest_pair()?;
        let previous = self.store.load(&previous)?;
        let current = self.store.load(&current)?;
        Ok(classify(&previous.records, &current.records))
    }

    /// Duplicate groups of the newest snapshot
    ///
    /// # Errors
    ///
    /// - [`SnaptrackError::InsufficientSnapshots`] if no snapshot exists
    pub fn duplicates_latest(&self) -> Result<Vec<DuplicateGroup>> {
        let latest = self
            .store
            .latest()?
            .ok_or(SnaptrackError::InsufficientSnapshots {
                needed: 1,
                found: 0,
            })?;
        Ok(find_duplicates(&self.store.load(&latest)?.records))
    }

    /// Delete all but the newest `number_to_keep` snapshots
    pub fn rotate(&self, dry_run: bool) -> Result<RetentionReport> {
        RetentionManager::new(&self.store, self.config.number_to_keep).rotate(dry_run)
    }

    /// Capture, compare, then rotate
    pub fn run(&self) -> Result<RunOutcome> {
        self.run_at(Local::now().naive_local())
    }

    /// [`ChangeTracker::run`] with an explicit capture time
    pub fn run_at(&self, timestamp: NaiveDateTime) -> Result<RunOutcome> {
        let tracked = self.track_at(timestamp)?;
        let retention = self.rotate(false)?;
        Ok(RunOutcome { tracked, retention })
    }
}

/// Builder for [`ChangeTracker`]
///
/// Starts from [`TrackerConfig::default`]; `build` validates the result.
#[derive(Default)]
pub struct ChangeTrackerBuilder {
    config: TrackerConfig,
    progress: Option<ProgressCallback>,
}

impl ChangeTrackerBuilder {
    /// Create a builder with default settings
    pub fn new() -> Self {
        Self::default()
    }

    /// Start from an existing configuration
    pub fn from_config(config: TrackerConfig) -> Self {
        Self {
            config,
            progress: None,
        }
    }

    /// Directory tree to snapshot
    pub fn search_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.search_path = Some(path.into());
        self
    }

    /// Directory holding snapshot files
    pub fn write_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.write_path = path.into();
        self
    }

    /// File name prefix of snapshot files
    pub fn output_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.config.output_prefix = prefix.into();
        self
    }

    /// Snapshots kept by rotation
    pub fn number_to_keep(mut self, count: usize) -> Self {
        self.config.number_to_keep = count;
        self
    }

    /// Hashing threads
    pub fn parallel_workers(mut self, count: usize) -> Self {
        self.config.parallel_workers = count;
        self
    }

    /// Gitignore-style patterns to leave out of scans
    pub fn ignore_patterns(mut self, patterns: Vec<String>) -> Self {
        self.config.ignore_patterns = patterns;
        self
    }

    /// Follow symbolic links while scanning
    pub fn follow_symlinks(mut self, follow: bool) -> Self {
        self.config.follow_symlinks = follow;
        self
    }

    /// Called for every hashed file during scans
    pub fn progress_callback(mut self, callback: ProgressCallback) -> Self {
        self.progress = Some(callback);
        self
    }

    /// Validate and build the tracker
    pub fn build(self) -> Result<ChangeTracker> {
        let mut tracker = ChangeTracker::new(self.config)?;
        tracker.progress = self.progress;
        Ok(tracker)
    }
}
