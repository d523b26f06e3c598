//! Snapshot directory
//!
//! `SnapshotStore` owns one directory and one name prefix. It lists the
//! snapshots found there in capture order, loads them, and writes new ones.
//! Files that do not start with `<prefix>_` or do not end in `.json` are
//! left alone; files that do but carry no valid timestamp make listing fail.

use crate::error::{Result, SnaptrackError};
use crate::snapshot::{Snapshot, SnapshotName};
use crate::types::FileRecord;
use chrono::NaiveDateTime;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Directory of persisted snapshots sharing a prefix
#[derive(Debug, Clone)]
pub struct SnapshotStore {
    root: PathBuf,
    prefix: String,
}

impl SnapshotStore {
    /// Open a store over an existing directory
    ///
    /// # Errors
    ///
    /// - [`SnaptrackError::InvalidConfiguration`] if `root` is not a directory
    ///   or the prefix is empty or contains a path separator
    pub fn open(root: impl Into<PathBuf>, prefix: impl Into<String>) -> Result<Self> {
        let root = root.into();
        let prefix = prefix.into();

        if !root.is_dir() {
            return Err(SnaptrackError::config(format!(
                "snapshot directory does not exist: {}",
                root.display()
            )));
        }
        if prefix.is_empty() || prefix.contains(['/', '\\']) {
            return Err(SnaptrackError::config(format!(
                "output prefix must be a non-empty file name fragment, got {:?}",
                prefix
            )));
        }

        Ok(Self { root, prefix })
    }

    /// Directory the store lives in
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Prefix of snapshot file names
    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    /// Full path of a snapshot file
    pub fn path_of(&self, name: &SnapshotName) -> PathBuf {
        self.root.join(name.file_name())
    }

    /// List snapshots, oldest first
    ///
    /// # Errors
    ///
    /// - [`SnaptrackError::TimestampParse`] for the first candidate file whose
    ///   name cannot be parsed
    pub fn list(&self) -> Result<Vec<SnapshotName>> {
        let mut names = Vec::new();
        for entry in fs::read_dir(&self.root)? {
            let entry = entry?;
            if !entry.file_type()?.is_file() {
                continue;
            }
            let file_name = entry.file_name().to_string_lossy().into_owned();
            if SnapshotName::is_candidate(&self.prefix, &file_name) {
                names.push(SnapshotName::parse(&self.prefix, &file_name)?);
            }
        }
        names.sort();
        debug!("Found {} snapshots in {}", names.len(), self.root.display());
        Ok(names)
    }

    /// Most recent snapshot, if any
    pub fn latest(&self) -> Result<Option<SnapshotName>> {
        Ok(self.list()?.pop())
    }

    /// The two most recent snapshots as `(previous, current)`
    ///
    /// # Errors
    ///
    /// - [`SnaptrackError::InsufficientSnapshots`] if fewer than two exist
    pub fn latest_pair(&self) -> Result<(SnapshotName, SnapshotName)> {
        let mut names = self.list()?;
        let found = names.len();
        match (names.pop(), names.pop()) {
            (Some(current), Some(previous)) => Ok((previous, current)),
            _ => Err(SnaptrackError::InsufficientSnapshots { needed: 2, found }),
        }
    }

    /// Load a listed snapshot
    pub fn load(&self, name: &SnapshotName) -> Result<Snapshot> {
        Snapshot::load(&self.path_of(name), &self.prefix)
    }

    /// Persist records as the snapshot captured at `timestamp`
    ///
    /// A snapshot already written in the same minute is replaced.
    pub fn write(&self, records: Vec<FileRecord>, timestamp: NaiveDateTime) -> Result<Snapshot> {
        let name = SnapshotName::new(self.prefix.clone(), timestamp);
        let path = self.path_of(&name);
        if path.exists() {
            warn!("Replacing snapshot from the same minute: {}", path.display());
        }

        let snapshot = Snapshot::new(name, records);
        snapshot.save(&self.root)?;
        info!(
            "Wrote {} records to {}",
            snapshot.records.len(),
            path.display()
        );
        Ok(snapshot)
    }
}
