//! Snapshot comparison
//!
//! Classifies every record of two snapshots as unchanged, changed, moved,
//! added or deleted. Classification runs in stages; each stage consumes the
//! records it classifies and hands the remaining pools to the next one, so
//! no record is ever reported twice.
//!
//! 1. **Unchanged**: identical `(path, hash)` in both snapshots.
//! 2. **Changed**: same path, different hash.
//! 3. **Moved**: same hash, different path.
//! 4. **Added / Deleted**: whatever is left on the current / previous side.
//!
//! A file whose content changed and that also appears to have moved is
//! reported as changed only: once its path matched in stage 2 its hash no
//! longer takes part in stage 3.
//!
//! When several remaining records share a join key (duplicate content in
//! stage 3), both sides are sorted by path and paired in order; anything
//! left unpaired falls through to added/deleted.
//!
//! ```rust
//! use snaptrack::classifier::classify;
//! use snaptrack::types::{FileRecord, Status};
//!
//! let previous = vec![FileRecord::new("a.txt", "h1")];
//! let current = vec![FileRecord::new("b.txt", "h1")];
//!
//! let diff = classify(&previous, &current);
//! let moved: Vec<_> = diff.with_status(Status::Moved).collect();
//! assert_eq!(moved.len(), 1);
//! assert_eq!(moved[0].path_previous.as_deref(), Some("a.txt"));
//! assert_eq!(moved[0].path_current.as_deref(), Some("b.txt"));
//! ```

use crate::collections::{group_sorted, HashSet};
use crate::duplicates::{duplicate_hashes, find_duplicates};
use crate::types::{ClassifiedEntry, DiffResult, DiffStats, FileRecord, Status};
use tracing::{debug, instrument};

/// Records not yet classified
#[derive(Debug, Default)]
struct Pools {
    previous: Vec<FileRecord>,
    current: Vec<FileRecord>,
}

impl Pools {
    fn is_empty(&self) -> bool {
        self.previous.is_empty() && self.current.is_empty()
    }
}

/// Key of a relational join between the two pools
#[derive(Debug, Clone, Copy)]
enum JoinKey {
    Path,
    Hash,
}

impl JoinKey {
    fn of(self, record: &FileRecord) -> &str {
        match self {
            JoinKey::Path => &record.path,
            JoinKey::Hash => &record.hash,
        }
    }
}

/// Compare two snapshots
///
/// `previous` and `current` may be in any order; the result is sorted and
/// identical for any permutation of the inputs. Exact duplicate records in
/// one input are counted once.
#[instrument(skip_all, fields(previous = previous.len(), current = current.len()))]
pub fn classify(previous: &[FileRecord], current: &[FileRecord]) -> DiffResult {
    let pools = Pools {
        previous: normalized(previous),
        current: normalized(current),
    };

    let (mut entries, pools) = split_unchanged(pools);
    debug!("{} unchanged records", entries.len());

    let (changed, pools) = join_remaining(pools, JoinKey::Path);
    debug!("{} changed records", changed.len());
    entries.extend(
        changed
            .into_iter()
            .map(|(previous, current)| ClassifiedEntry::changed(previous, current)),
    );

    let (moved, pools) = join_remaining(pools, JoinKey::Hash);
    debug!("{} moved records", moved.len());
    entries.extend(
        moved
            .into_iter()
            .map(|(previous, current)| ClassifiedEntry::moved(previous, current)),
    );

    if !pools.is_empty() {
        debug!(
            "{} added and {} deleted records",
            pools.current.len(),
            pools.previous.len()
        );
    }
    entries.extend(pools.current.into_iter().map(ClassifiedEntry::added));
    entries.extend(pools.previous.into_iter().map(ClassifiedEntry::deleted));

    tag_duplicates(&mut entries, previous, current);
    entries.sort_by(|a, b| {
        a.status
            .rank()
            .cmp(&b.status.rank())
            .then_with(|| a.primary_path().cmp(b.primary_path()))
            .then_with(|| a.path_previous.cmp(&b.path_previous))
    });

    let duplicates = find_duplicates(current);
    let mut stats = DiffStats {
        duplicate_groups: duplicates.len(),
        duplicate_files: duplicates.iter().map(|g| g.paths.len()).sum(),
        ..DiffStats::default()
    };
    for entry in &entries {
        match entry.status {
            Status::Unchanged => stats.unchanged += 1,
            Status::Changed => stats.changed += 1,
            Status::Moved => stats.moved += 1,
            Status::Added => stats.added += 1,
            Status::Deleted => stats.deleted += 1,
            Status::Duplicate => {}
        }
    }

    DiffResult {
        entries,
        duplicates,
        stats,
    }
}

/// Sorted copy with exact repeats removed
fn normalized(records: &[FileRecord]) -> Vec<FileRecord> {
    let mut records = records.to_vec();
    records.sort();
    records.dedup();
    records
}

/// Stage 1: remove records present with the same path and hash on both sides
fn split_unchanged(pools: Pools) -> (Vec<ClassifiedEntry>, Pools) {
    let in_previous: HashSet<&FileRecord> = pools.previous.iter().collect();
    let in_current: HashSet<&FileRecord> = pools.current.iter().collect();

    let unchanged: Vec<ClassifiedEntry> = pools
        .current
        .iter()
        .filter(|r| in_previous.contains(r))
        .cloned()
        .map(ClassifiedEntry::unchanged)
        .collect();

    let remaining = Pools {
        previous: pools
            .previous
            .iter()
            .filter(|r| !in_current.contains(r))
            .cloned()
            .collect(),
        current: pools
            .current
            .iter()
            .filter(|r| !in_previous.contains(r))
            .cloned()
            .collect(),
    };
    (unchanged, remaining)
}

/// Stages 2 and 3: pair remaining records that agree on `key`
///
/// Returns `(previous, current)` pairs plus the unpaired records. Groups are
/// visited in key order and paired in path order, which makes the result
/// independent of input order.
fn join_remaining(pools: Pools, key: JoinKey) -> (Vec<(FileRecord, FileRecord)>, Pools) {
    let mut previous_groups: Vec<(String, Vec<FileRecord>)> =
        group_sorted(pools.previous.into_iter().map(|r| (key.of(&r).to_string(), r)))
            .into_iter()
            .collect();
    previous_groups.sort_by(|a, b| a.0.cmp(&b.0));
    let mut current_groups =
        group_sorted(pools.current.into_iter().map(|r| (key.of(&r).to_string(), r)));

    let mut pairs = Vec::new();
    let mut remaining = Pools::default();

    for (join_value, previous) in previous_groups {
        let Some(current) = current_groups.remove(&join_value) else {
            remaining.previous.extend(previous);
            continue;
        };

        let matched = previous.len().min(current.len());
        let mut previous = previous.into_iter();
        let mut current = current.into_iter();
        pairs.extend(previous.by_ref().zip(current.by_ref()).take(matched));
        remaining.previous.extend(previous);
        remaining.current.extend(current);
    }
    remaining
        .current
        .extend(current_groups.into_values().flatten());

    remaining.previous.sort();
    remaining.current.sort();
    (pairs, remaining)
}

/// Flag entries whose record shares content with another path of its snapshot
///
/// Either side counts: the current record against the current snapshot, the
/// previous record against the previous snapshot.
fn tag_duplicates(entries: &mut [ClassifiedEntry], previous: &[FileRecord], current: &[FileRecord]) {
    let previous_dupes = duplicate_hashes(&normalized(previous));
    let current_dupes = duplicate_hashes(&normalized(current));

    for entry in entries.iter_mut() {
        let in_current = entry
            .hash_current
            .as_ref()
            .is_some_and(|h| current_dupes.contains(h));
        let in_previous = entry
            .hash_previous
            .as_ref()
            .is_some_and(|h| previous_dupes.contains(h));
        entry.duplicate = in_current || in_previous;
    }
}
