//! Snapshots and their persisted names
//!
//! A snapshot is the full list of `(path, hash)` records of a directory tree
//! at one point in time. On disk it is a JSON array of records named
//! `<prefix>_<YYYY>-<MM>-<DD>T<HH>-<MM>.json`; the name is the only place
//! the capture time is kept.
//!
//! ```rust
//! use snaptrack::snapshot::SnapshotName;
//!
//! let name = SnapshotName::parse("snapshot", "snapshot_2019-11-01T09-30.json").unwrap();
//! assert_eq!(name.timestamp().format("%H:%M").to_string(), "09:30");
//! assert!(SnapshotName::parse("snapshot", "snapshot_2019-11-01.json").is_err());
//! ```

use crate::error::{Result, SnaptrackError};
use crate::types::FileRecord;
use crate::utils;
use chrono::{NaiveDate, NaiveDateTime, Timelike};
use std::cmp::Ordering;
use std::fmt;
use std::fs;
use std::path::Path;
use tracing::{debug, warn};

const EXTENSION: &str = ".json";
const STAMP_FORMAT: &str = "%Y-%m-%dT%H-%M";
const STAMP_LEN: usize = 16;

/// File name of a persisted snapshot
///
/// Names order by capture minute; names from the same minute order by file
/// name, the lexicographically greater one being newer.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SnapshotName {
    prefix: String,
    timestamp: NaiveDateTime,
    file_name: String,
}

impl SnapshotName {
    /// Name for a snapshot captured at `timestamp` (truncated to the minute)
    pub fn new(prefix: impl Into<String>, timestamp: NaiveDateTime) -> Self {
        let prefix = prefix.into();
        let timestamp = timestamp
            .with_second(0)
            .and_then(|t| t.with_nanosecond(0))
            .unwrap_or(timestamp);
        let file_name = format!("{}_{}{}", prefix, timestamp.format(STAMP_FORMAT), EXTENSION);
        Self {
            prefix,
            timestamp,
            file_name,
        }
    }

    /// Parse a snapshot file name
    ///
    /// Only the exact `<prefix>_YYYY-MM-DDTHH-MM.json` shape with a valid
    /// calendar date and time is accepted.
    ///
    /// # Errors
    ///
    /// - [`SnaptrackError::TimestampParse`] naming the file on any mismatch
    pub fn parse(prefix: &str, file_name: &str) -> Result<Self> {
        let stamp = file_name
            .strip_prefix(prefix)
            .and_then(|rest| rest.strip_prefix('_'))
            .ok_or_else(|| {
                SnaptrackError::timestamp(file_name, format!("expected prefix '{}_'", prefix))
            })?
            .strip_suffix(EXTENSION)
            .ok_or_else(|| SnaptrackError::timestamp(file_name, "expected '.json' extension"))?;

        let timestamp = parse_stamp(stamp)
            .ok_or_else(|| SnaptrackError::timestamp(file_name, "expected YYYY-MM-DDTHH-MM"))?;

        Ok(Self {
            prefix: prefix.to_string(),
            timestamp,
            file_name: file_name.to_string(),
        })
    }

    /// Check whether `file_name` claims to be a snapshot with this prefix
    ///
    /// Claimed names that fail [`SnapshotName::parse`] are errors, not
    /// unrelated files.
    pub fn is_candidate(prefix: &str, file_name: &str) -> bool {
        file_name.ends_with(EXTENSION)
            && file_name
                .strip_prefix(prefix)
                .is_some_and(|rest| rest.starts_with('_'))
    }

    /// Capture time, minute resolution
    pub fn timestamp(&self) -> NaiveDateTime {
        self.timestamp
    }

    /// File name on disk
    pub fn file_name(&self) -> &str {
        &self.file_name
    }

    /// Prefix the name was built or parsed with
    pub fn prefix(&self) -> &str {
        &self.prefix
    }
}

impl Ord for SnapshotName {
    fn cmp(&self, other: &Self) -> Ordering {
        self.timestamp
            .cmp(&other.timestamp)
            .then_with(|| self.file_name.cmp(&other.file_name))
    }
}

impl PartialOrd for SnapshotName {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl fmt::Display for SnapshotName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.file_name)
    }
}

/// Parse `YYYY-MM-DDTHH-MM`, rejecting anything that is not exactly that
fn parse_stamp(stamp: &str) -> Option<NaiveDateTime> {
    let bytes = stamp.as_bytes();
    if bytes.len() != STAMP_LEN {
        return None;
    }
    let shape_ok = bytes.iter().enumerate().all(|(i, b)| match i {
        4 | 7 | 13 => *b == b'-',
        10 => *b == b'T',
        _ => b.is_ascii_digit(),
    });
    if !shape_ok {
        return None;
    }

    let field = |range: std::ops::Range<usize>| stamp[range].parse::<u32>().ok();
    let year = i32::try_from(field(0..4)?).ok()?;
    NaiveDate::from_ymd_opt(year, field(5..7)?, field(8..10)?)?
        .and_hms_opt(field(11..13)?, field(14..16)?, 0)
}

/// A loaded snapshot
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Snapshot {
    /// Name the snapshot is stored under
    pub name: SnapshotName,
    /// Records, sorted by path
    pub records: Vec<FileRecord>,
}

impl Snapshot {
    /// Create a snapshot, sorting its records by path
    pub fn new(name: SnapshotName, mut records: Vec<FileRecord>) -> Self {
        records.sort();
        Self { name, records }
    }

    /// Read a snapshot file
    ///
    /// # Errors
    ///
    /// - [`SnaptrackError::TimestampParse`] if the file name is not a snapshot name
    /// - [`SnaptrackError::Io`] / [`SnaptrackError::Json`] if the file cannot be read
    pub fn load(path: &Path, prefix: &str) -> Result<Self> {
        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        let name = SnapshotName::parse(prefix, &file_name)?;

        let records: Vec<FileRecord> = serde_json::from_slice(&fs::read(path)?)?;
        let malformed = records
            .iter()
            .filter(|r| !utils::is_content_hash(&r.hash))
            .count();
        if malformed > 0 {
            warn!(
                "{} records in {} do not carry a 32-character hex hash",
                malformed, file_name
            );
        }
        debug!("Loaded {} records from {}", records.len(), file_name);

        Ok(Self::new(name, records))
    }

    /// Write the snapshot into `dir` under its name, atomically
    pub fn save(&self, dir: &Path) -> Result<()> {
        let content = serde_json::to_vec(&self.records)?;
        utils::atomic_write(&dir.join(self.name.file_name()), &content)
    }
}
