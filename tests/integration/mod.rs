//! Integration tests for snaptrack
//!
//! Drives the whole pipeline against real directories: scanning, writing
//! snapshots, comparing them and rotating old ones.

use ::snaptrack::*;
use chrono::{Duration, NaiveDate, NaiveDateTime};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;
use tracing::info;

/// Test harness owning a data tree, a snapshot directory and a clock
pub struct TrackerTestHarness {
    pub data_dir: TempDir,
    pub snapshot_dir: TempDir,
    pub tracker: ChangeTracker,
    clock: NaiveDateTime,
}

impl TrackerTestHarness {
    /// Create a new test harness keeping `number_to_keep` snapshots
    pub fn new(number_to_keep: usize) -> Self {
        let data_dir = TempDir::new().unwrap();
        let snapshot_dir = TempDir::new().unwrap();
        let tracker = ChangeTrackerBuilder::new()
            .search_path(data_dir.path())
            .write_path(snapshot_dir.path())
            .number_to_keep(number_to_keep)
            .parallel_workers(4)
            .build()
            .unwrap();

        Self {
            data_dir,
            snapshot_dir,
            tracker,
            clock: NaiveDate::from_ymd_opt(2022, 6, 1)
                .unwrap()
                .and_hms_opt(8, 0, 0)
                .unwrap(),
        }
    }

    pub fn path(&self, relative: &str) -> PathBuf {
        self.data_dir.path().join(relative)
    }

    pub fn full(&self, relative: &str) -> String {
        self.path(relative).to_string_lossy().into_owned()
    }

    pub fn write(&self, relative: &str, content: &[u8]) {
        let path = self.path(relative);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).unwrap();
        }
        fs::write(path, content).unwrap();
    }

    pub fn rename(&self, from: &str, to: &str) {
        let target = self.path(to);
        if let Some(parent) = target.parent() {
            fs::create_dir_all(parent).unwrap();
        }
        fs::rename(self.path(from), target).unwrap();
    }

    pub fn remove(&self, relative: &str) {
        fs::remove_file(self.path(relative)).unwrap();
    }

    /// Capture a snapshot one minute after the previous one
    pub fn track(&mut self) -> TrackOutcome {
        self.clock += Duration::minutes(1);
        self.tracker.track_at(self.clock).unwrap()
    }

    /// Capture and rotate one minute after the previous capture
    pub fn run(&mut self) -> RunOutcome {
        self.clock += Duration::minutes(1);
        self.tracker.run_at(self.clock).unwrap()
    }

    pub fn snapshot_files(&self) -> Vec<String> {
        let mut names: Vec<String> = fs::read_dir(self.snapshot_dir.path())
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        names.sort();
        names
    }
}

fn paths(diff: &DiffResult, status: Status) -> Vec<String> {
    diff.with_status(status)
        .map(|e| e.primary_path().to_string())
        .collect()
}

#[test]
fn test_full_lifecycle() {
    let mut h = TrackerTestHarness::new(10);
    h.write("docs/readme.md", b"hello");
    h.write("docs/notes.md", b"notes");
    h.write("src/main.rs", b"fn main() {}");
    h.write("old/report.pdf", b"%PDF");

    let first = h.track();
    assert!(first.diff.is_none());
    assert_eq!(first.snapshot.records.len(), 4);

    h.write("src/main.rs", b"fn main() { println!(); }");
    h.rename("docs/notes.md", "archive/notes.md");
    h.remove("old/report.pdf");
    h.write("src/lib.rs", b"pub mod x;");

    let second = h.track();
    let diff = second.diff.unwrap();

    assert_eq!(paths(&diff, Status::Unchanged), vec![h.full("docs/readme.md")]);
    assert_eq!(paths(&diff, Status::Changed), vec![h.full("src/main.rs")]);
    assert_eq!(paths(&diff, Status::Added), vec![h.full("src/lib.rs")]);
    assert_eq!(paths(&diff, Status::Deleted), vec![h.full("old/report.pdf")]);

    let moved: Vec<_> = diff.with_status(Status::Moved).collect();
    assert_eq!(moved.len(), 1);
    assert_eq!(moved[0].path_previous.as_deref(), Some(h.full("docs/notes.md").as_str()));
    assert_eq!(moved[0].path_current.as_deref(), Some(h.full("archive/notes.md").as_str()));

    let changed = diff.with_status(Status::Changed).next().unwrap();
    assert_eq!(
        changed.hash_previous.as_deref(),
        Some(utils::hash_data(b"fn main() {}").as_str())
    );

    // The persisted pair compares the same way.
    assert_eq!(h.tracker.diff_latest().unwrap(), diff);
    info!("Lifecycle report:\n{}", Report::from_diff(&diff));
}

#[test]
fn test_edit_and_rename_reports_add_and_delete() {
    let mut h = TrackerTestHarness::new(10);
    h.write("a.txt", b"v1");
    h.track();

    h.remove("a.txt");
    h.write("b.txt", b"v2");
    let diff = h.track().diff.unwrap();

    assert_eq!(diff.stats.added, 1);
    assert_eq!(diff.stats.deleted, 1);
    assert_eq!(diff.stats.moved, 0);
}

#[test]
fn test_duplicates_are_flagged_and_still_classified() {
    let mut h = TrackerTestHarness::new(10);
    h.write("one.txt", b"same");
    h.track();

    h.write("two.txt", b"same");
    h.write("three.txt", b"same");
    let outcome = h.track();

    assert_eq!(outcome.duplicates.len(), 1);
    assert_eq!(outcome.duplicates[0].paths.len(), 3);

    let diff = outcome.diff.unwrap();
    assert_eq!(diff.stats.unchanged, 1);
    assert_eq!(diff.stats.added, 2);
    assert!(diff.entries.iter().all(|e| e.duplicate));
    assert_eq!(diff.stats.duplicate_files, 3);
}

#[test]
fn test_ambiguous_moves_pair_in_path_order() {
    let mut h = TrackerTestHarness::new(10);
    h.write("a1", b"same");
    h.write("a2", b"same");
    h.write("a3", b"same");
    h.track();

    h.rename("a1", "b1");
    h.rename("a2", "b2");
    h.remove("a3");
    let diff = h.track().diff.unwrap();

    let pairs: Vec<(String, String)> = diff
        .with_status(Status::Moved)
        .map(|e| {
            (
                e.path_previous.clone().unwrap(),
                e.path_current.clone().unwrap(),
            )
        })
        .collect();
    assert_eq!(
        pairs,
        vec![(h.full("a1"), h.full("b1")), (h.full("a2"), h.full("b2"))]
    );
    assert_eq!(paths(&diff, Status::Deleted), vec![h.full("a3")]);
}

#[test]
fn test_run_keeps_newest_snapshots() {
    let mut h = TrackerTestHarness::new(3);
    h.write("a.txt", b"a");

    for i in 0..6 {
        h.write("counter.txt", format!("{}", i).as_bytes());
        let outcome = h.run();
        assert!(outcome.retention.kept.len() <= 3);
    }

    assert_eq!(
        h.snapshot_files(),
        vec![
            "snapshot_2022-06-01T08-04.json",
            "snapshot_2022-06-01T08-05.json",
            "snapshot_2022-06-01T08-06.json",
        ]
    );

    let diff = h.tracker.diff_latest().unwrap();
    assert_eq!(diff.stats.changed, 1);
    assert_eq!(diff.stats.unchanged, 1);
}

#[test]
fn test_rotation_leaves_unrelated_files() {
    let mut h = TrackerTestHarness::new(1);
    h.write("a.txt", b"a");
    fs::write(h.snapshot_dir.path().join("README"), "keep me").unwrap();
    fs::write(h.snapshot_dir.path().join("other_2020-01-01T00-00.json"), "[]").unwrap();

    h.run();
    h.run();

    assert_eq!(
        h.snapshot_files(),
        vec![
            "README",
            "other_2020-01-01T00-00.json",
            "snapshot_2022-06-01T08-02.json",
        ]
    );
}

#[test]
fn test_malformed_snapshot_name_aborts() {
    let mut h = TrackerTestHarness::new(3);
    h.write("a.txt", b"a");
    h.track();
    h.track();
    fs::write(
        h.snapshot_dir.path().join("snapshot_2022-06-01T8-05.json"),
        "[]",
    )
    .unwrap();

    match h.tracker.diff_latest() {
        Err(SnaptrackError::TimestampParse { file_name, .. }) => {
            assert_eq!(file_name, "snapshot_2022-06-01T8-05.json")
        }
        other => panic!("expected timestamp error, got {:?}", other),
    }
    assert!(h.tracker.rotate(false).is_err());
}

#[test]
fn test_insufficient_snapshots_is_informational() {
    let mut h = TrackerTestHarness::new(3);
    let err = h.tracker.diff_latest().unwrap_err();
    assert!(err.is_informational());
    assert!(matches!(
        err,
        SnaptrackError::InsufficientSnapshots { needed: 2, found: 0 }
    ));

    h.track();
    assert!(matches!(
        h.tracker.diff_latest(),
        Err(SnaptrackError::InsufficientSnapshots { needed: 2, found: 1 })
    ));
}

#[test]
fn test_reads_snapshots_written_by_earlier_tooling() -> anyhow::Result<()> {
    let snaps = TempDir::new()?;
    fs::write(
        snaps.path().join("scan_2019-11-01T09-05.json"),
        r#"[{"full path":"\/data\/a.txt","hash of file":"0cc175b9c0f1b6a831c399e269772661"},
            {"full path":"\/data\/b.txt","hash of file":"92eb5ffee6ae2fec3ad71c777531578f"}]"#,
    )?;
    fs::write(
        snaps.path().join("scan_2019-11-02T09-05.json"),
        r#"[{"full path":"\/data\/c.txt","hash of file":"0cc175b9c0f1b6a831c399e269772661"},
            {"full path":"\/data\/b.txt","hash of file":"4a8a08f09d37b73795649038408b5f33"}]"#,
    )?;

    let tracker = ChangeTrackerBuilder::new()
        .write_path(snaps.path())
        .output_prefix("scan")
        .build()?;
    let diff = tracker.diff_latest()?;

    assert_eq!(paths(&diff, Status::Changed), vec!["/data/b.txt"]);
    assert_eq!(paths(&diff, Status::Moved), vec!["/data/c.txt"]);
    Ok(())
}

#[test]
fn test_ignore_patterns() {
    let data = TempDir::new().unwrap();
    let snaps = TempDir::new().unwrap();
    for (name, content) in [
        ("keep.txt", "k"),
        ("skip.tmp", "s"),
        ("cache/blob", "b"),
        ("nested/keep.md", "m"),
    ] {
        let path = data.path().join(name);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, content).unwrap();
    }

    let tracker = ChangeTrackerBuilder::new()
        .search_path(data.path())
        .write_path(snaps.path())
        .ignore_patterns(vec!["*.tmp".to_string(), "cache/".to_string()])
        .build()
        .unwrap();

    let records = tracker.scan().unwrap();
    let names: Vec<String> = records
        .iter()
        .map(|r| {
            Path::new(&r.path)
                .strip_prefix(data.path())
                .unwrap()
                .to_string_lossy()
                .replace('\\', "/")
        })
        .collect();
    assert_eq!(names, vec!["keep.txt", "nested/keep.md"]);
}

#[test]
fn test_invalid_ignore_pattern_is_config_error() {
    let data = TempDir::new().unwrap();
    let tracker = ChangeTrackerBuilder::new()
        .search_path(data.path())
        .write_path(data.path())
        .ignore_patterns(vec!["a/**/[".to_string()])
        .build()
        .unwrap();
    assert!(matches!(
        tracker.scan(),
        Err(SnaptrackError::InvalidConfiguration(_))
    ));
}

#[test]
fn test_random_mutations_preserve_partition() {
    let mut rng = StdRng::seed_from_u64(42);
    let mut h = TrackerTestHarness::new(50);
    let mut live: Vec<String> = Vec::new();

    for i in 0..40 {
        let name = format!("dir_{}/file_{}.bin", i % 5, i);
        h.write(&name, &[rng.random_range(0..8u8); 16]);
        live.push(name);
    }
    let mut previous = h.track().snapshot;

    for round in 0..5 {
        for op in 0..10 {
            let idx = rng.random_range(0..live.len());
            match rng.random_range(0..4) {
                0 => h.write(&live[idx], &[rng.random_range(0..8u8); 16]),
                1 if live.len() > 1 => {
                    let name = live.swap_remove(idx);
                    h.remove(&name);
                }
                2 => {
                    let to = format!("moved_{}_{}/{}.bin", round, op, idx);
                    h.rename(&live[idx], &to);
                    live[idx] = to;
                }
                _ => {
                    let name = format!("new_{}_{}.bin", round, op);
                    h.write(&name, &[rng.random_range(0..8u8); 16]);
                    live.push(name);
                }
            }
        }

        let outcome = h.track();
        let diff = outcome.diff.unwrap();
        let s = diff.stats;
        assert_eq!(
            s.unchanged + s.changed + s.moved + s.deleted,
            previous.records.len()
        );
        assert_eq!(
            s.unchanged + s.changed + s.moved + s.added,
            outcome.snapshot.records.len()
        );
        assert_eq!(outcome.snapshot.records.len(), live.len());
        previous = outcome.snapshot;
    }
}
