//! Property-based testing for the classifier
//!
//! Uses proptest to check the classification invariants over randomly
//! generated snapshot pairs. Paths and hashes are drawn from small alphabets
//! so that collisions (moves, edits, duplicates) are common.

use ::snaptrack::*;
use proptest::prelude::*;
use std::collections::{BTreeMap, BTreeSet};

/// A snapshot: unique paths, hashes drawn from a small pool
fn snapshot_strategy() -> impl Strategy<Value = Vec<FileRecord>> {
    prop::collection::btree_map("[a-e]{1,2}\\.txt", "h[0-4]", 0..16).prop_map(|m| {
        m.into_iter()
            .map(|(path, hash)| FileRecord::new(path, hash))
            .collect()
    })
}

fn previous_side(diff: &DiffResult) -> Vec<FileRecord> {
    let mut side: Vec<FileRecord> = diff
        .entries
        .iter()
        .filter_map(|e| {
            Some(FileRecord::new(
                e.path_previous.clone()?,
                e.hash_previous.clone()?,
            ))
        })
        .collect();
    side.sort();
    side
}

fn current_side(diff: &DiffResult) -> Vec<FileRecord> {
    let mut side: Vec<FileRecord> = diff
        .entries
        .iter()
        .filter_map(|e| {
            Some(FileRecord::new(
                e.path_current.clone()?,
                e.hash_current.clone()?,
            ))
        })
        .collect();
    side.sort();
    side
}

fn sorted(records: &[FileRecord]) -> Vec<FileRecord> {
    let mut records = records.to_vec();
    records.sort();
    records
}

fn with_status(diff: &DiffResult, status: Status) -> BTreeSet<(Option<String>, Option<String>)> {
    diff.with_status(status)
        .map(|e| (e.path_previous.clone(), e.path_current.clone()))
        .collect()
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(200))]

    /// Every record of either snapshot appears in exactly one entry
    #[test]
    fn prop_partition(previous in snapshot_strategy(), current in snapshot_strategy()) {
        let diff = classify(&previous, &current);

        prop_assert_eq!(previous_side(&diff), sorted(&previous));
        prop_assert_eq!(current_side(&diff), sorted(&current));

        let s = diff.stats;
        prop_assert_eq!(s.unchanged + s.changed + s.moved + s.added + s.deleted, diff.entries.len());
        prop_assert!(diff.entries.iter().all(|e| e.status != Status::Duplicate));
    }

    /// Entries pair records the way their status says
    #[test]
    fn prop_status_meaning(previous in snapshot_strategy(), current in snapshot_strategy()) {
        let diff = classify(&previous, &current);
        for entry in &diff.entries {
            match entry.status {
                Status::Unchanged => {
                    prop_assert_eq!(&entry.path_previous, &entry.path_current);
                    prop_assert_eq!(&entry.hash_previous, &entry.hash_current);
                }
                Status::Changed => {
                    prop_assert_eq!(&entry.path_previous, &entry.path_current);
                    prop_assert_ne!(&entry.hash_previous, &entry.hash_current);
                }
                Status::Moved => {
                    prop_assert_ne!(&entry.path_previous, &entry.path_current);
                    prop_assert_eq!(&entry.hash_previous, &entry.hash_current);
                }
                Status::Added => prop_assert!(entry.path_previous.is_none() && entry.path_current.is_some()),
                Status::Deleted => prop_assert!(entry.path_current.is_none() && entry.path_previous.is_some()),
                Status::Duplicate => prop_assert!(false, "duplicate is a flag, not a base status"),
            }
        }
    }

    /// A path present on both sides is never reported as added or deleted
    #[test]
    fn prop_changed_wins(previous in snapshot_strategy(), current in snapshot_strategy()) {
        let diff = classify(&previous, &current);
        let previous_paths: BTreeSet<&str> = previous.iter().map(|r| r.path.as_str()).collect();
        let current_paths: BTreeSet<&str> = current.iter().map(|r| r.path.as_str()).collect();

        for entry in &diff.entries {
            let path = entry.primary_path();
            let on_both = previous_paths.contains(path) && current_paths.contains(path);
            if on_both {
                prop_assert!(
                    matches!(entry.status, Status::Unchanged | Status::Changed),
                    "{} present on both sides but {}", path, entry.status
                );
            }
        }
    }

    /// A snapshot compared with itself is entirely unchanged
    #[test]
    fn prop_idempotence(snapshot in snapshot_strategy()) {
        let diff = classify(&snapshot, &snapshot);
        prop_assert_eq!(diff.stats.unchanged, snapshot.len());
        prop_assert!(diff.is_identical());
    }

    /// Swapping sides swaps Added and Deleted and reverses moves
    #[test]
    fn prop_symmetry(previous in snapshot_strategy(), current in snapshot_strategy()) {
        let forward = classify(&previous, &current);
        let backward = classify(&current, &previous);

        let flip = |set: BTreeSet<(Option<String>, Option<String>)>| -> BTreeSet<_> {
            set.into_iter().map(|(a, b)| (b, a)).collect()
        };

        prop_assert_eq!(with_status(&forward, Status::Added), flip(with_status(&backward, Status::Deleted)));
        prop_assert_eq!(with_status(&forward, Status::Deleted), flip(with_status(&backward, Status::Added)));
        prop_assert_eq!(with_status(&forward, Status::Changed), with_status(&backward, Status::Changed));
        prop_assert_eq!(with_status(&forward, Status::Moved), flip(with_status(&backward, Status::Moved)));
        prop_assert_eq!(with_status(&forward, Status::Unchanged), with_status(&backward, Status::Unchanged));
    }

    /// Input order never changes the result
    #[test]
    fn prop_determinism(
        (previous, current, previous_shuffled, current_shuffled) in
            (snapshot_strategy(), snapshot_strategy()).prop_flat_map(|(p, c)| {
                (Just(p.clone()), Just(c.clone()), Just(p).prop_shuffle(), Just(c).prop_shuffle())
            })
    ) {
        let expected = classify(&previous, &current);
        let actual = classify(&previous_shuffled, &current_shuffled);
        prop_assert_eq!(
            serde_json::to_string(&expected).unwrap(),
            serde_json::to_string(&actual).unwrap()
        );
    }

    /// The duplicate flag agrees with the duplicate detector of each side
    #[test]
    fn prop_duplicate_flag(previous in snapshot_strategy(), current in snapshot_strategy()) {
        let diff = classify(&previous, &current);

        let repeated = |records: &[FileRecord]| -> BTreeSet<String> {
            let mut counts: BTreeMap<&str, usize> = BTreeMap::new();
            for r in records {
                *counts.entry(r.hash.as_str()).or_default() += 1;
            }
            counts.into_iter().filter(|(_, n)| *n > 1).map(|(h, _)| h.to_string()).collect()
        };
        let previous_dups = repeated(&previous);
        let current_dups = repeated(&current);

        for entry in &diff.entries {
            let expected = entry.hash_current.as_ref().is_some_and(|h| current_dups.contains(h))
                || entry.hash_previous.as_ref().is_some_and(|h| previous_dups.contains(h));
            prop_assert_eq!(entry.duplicate, expected);
        }

        let detected: BTreeSet<String> = find_duplicates(&current).into_iter().map(|g| g.hash).collect();
        prop_assert_eq!(detected, current_dups);
    }
}
