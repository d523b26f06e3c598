//! Duplicate content detection within a single snapshot
//!
//! Two records are duplicates when they carry the same content hash under
//! different paths. Detection is informational: duplicate records still take
//! part in cross-snapshot classification with their own path and hash.
//!
//! ```rust
//! use snaptrack::duplicates::find_duplicates;
//! use snaptrack::types::FileRecord;
//!
//! let records = vec![
//!     FileRecord::new("a.txt", "h1"),
//!     FileRecord::new("b.txt", "h1"),
//!     FileRecord::new("c.txt", "h2"),
//! ];
//! let groups = find_duplicates(&records);
//! assert_eq!(groups.len(), 1);
//! assert_eq!(groups[0].paths, vec!["a.txt", "b.txt"]);
//! ```

use crate::collections::{group_sorted, HashSet};
use crate::types::{ClassifiedEntry, DuplicateGroup, FileRecord};
use tracing::debug;

/// Find every hash shared by two or more records
///
/// Groups are sorted by hash and each group's paths are sorted, so the
/// output does not depend on record order. An empty input yields no groups.
pub fn find_duplicates(records: &[FileRecord]) -> Vec<DuplicateGroup> {
    let by_hash = group_sorted(records.iter().map(|r| (r.hash.as_str(), r.path.as_str())));

    let mut groups: Vec<DuplicateGroup> = by_hash
        .into_iter()
        .filter(|(_, paths)| paths.len() > 1)
        .map(|(hash, paths)| DuplicateGroup {
            hash: hash.to_string(),
            paths: paths.into_iter().map(str::to_string).collect(),
        })
        .collect();
    groups.sort_by(|a, b| a.hash.cmp(&b.hash));

    debug!(
        "Found {} duplicate groups among {} records",
        groups.len(),
        records.len()
    );
    groups
}

/// Annotate every duplicate record with `Status::Duplicate`
///
/// Returns one entry per record that belongs to a duplicate group, ordered
/// by hash then path.
pub fn annotate_duplicates(records: &[FileRecord]) -> Vec<ClassifiedEntry> {
    find_duplicates(records)
        .into_iter()
        .flat_map(|group| {
            let hash = group.hash;
            group
                .paths
                .into_iter()
                .map(move |path| ClassifiedEntry::duplicate(FileRecord::new(path, hash.clone())))
        })
        .collect()
}

/// Set of hashes that occur more than once in `records`
pub(crate) fn duplicate_hashes(records: &[FileRecord]) -> HashSet<String> {
    let mut seen: HashSet<&str> = HashSet::default();
    let mut repeated: HashSet<String> = HashSet::default();
    for record in records {
        if !seen.insert(record.hash.as_str()) {
            repeated.insert(record.hash.clone());
        }
    }
    repeated
}
