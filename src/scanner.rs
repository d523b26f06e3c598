//! Directory scanning and content hashing
//!
//! `FileScanner` walks a directory tree and produces one [`FileRecord`] per
//! regular file: the full path as reached from the configured root, and the
//! MD5 digest of the whole file.
//!
//! ## Features
//!
//! - **Parallel walk**: the `ignore` crate's parallel walker collects paths
//! - **Bounded hashing pool**: files are hashed on a dedicated rayon pool
//!   with a fixed number of workers, one task per file
//! - **Ignore patterns**: gitignore-style excludes (`*.tmp`, `cache/`) with
//!   `!` re-includes
//! - **Self-exclusion**: snapshot files written under the scanned tree are
//!   never recorded
//! - **Fault tolerance**: unreadable files are logged and skipped
//!
//! ## Example
//!
//! ```rust,no_run
//! use snaptrack::scanner::FileScanner;
//! use std::path::PathBuf;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let scanner = FileScanner::new(PathBuf::from("/home/user/data"))
//!     .with_ignore_patterns(vec!["*.swp".to_string()])
//!     .with_parallel_workers(4);
//!
//! let records = scanner.scan::<fn(snaptrack::ProgressInfo)>(None)?;
//! println!("Hashed {} files", records.len());
//! # Ok(())
//! # }
//! ```
//!
//! Version-control ignore files are not honored: an integrity scan should
//! see everything on disk that the operator did not explicitly exclude.

use crate::error::{Result, SnaptrackError};
use crate::snapshot::SnapshotName;
use crate::types::{FileRecord, ProgressInfo};
use crate::utils;
use ignore::gitignore::{Gitignore, GitignoreBuilder};
use ignore::{WalkBuilder, WalkState};
use parking_lot::Mutex;
use rayon::prelude::*;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, trace, warn};

/// Snapshot files to leave out of a scan
#[derive(Debug, Clone)]
struct Exclusion {
    dir: PathBuf,
    prefix: String,
}

impl Exclusion {
    fn matches(&self, path: &Path) -> bool {
        path.parent() == Some(self.dir.as_path())
            && path
                .file_name()
                .map(|n| SnapshotName::is_candidate(&self.prefix, &n.to_string_lossy()))
                .unwrap_or(false)
    }
}

/// Scanner producing `(path, hash)` records for a directory tree
#[derive(Debug)]
pub struct FileScanner {
    /// Root directory to scan
    root_path: PathBuf,
    /// Ignore patterns (gitignore syntax)
    ignore_patterns: Vec<String>,
    /// Whether to follow symbolic links during traversal
    follow_symlinks: bool,
    /// Number of hashing threads
    parallel_workers: usize,
    /// Snapshot files that live under the root
    exclusion: Option<Exclusion>,
}

impl FileScanner {
    /// Create a scanner with default settings
    ///
    /// No ignore patterns, symlinks not followed, one hashing worker per CPU.
    pub fn new(root_path: PathBuf) -> Self {
        Self {
            root_path,
            ignore_patterns: Vec::new(),
            follow_symlinks: false,
            parallel_workers: num_cpus::get(),
            exclusion: None,
        }
    }

    /// Set ignore patterns
    ///
    /// Patterns follow gitignore rules relative to the root. A later pattern
    /// with a leading `!` re-includes paths an earlier one excluded, unless a
    /// parent directory of the path is itself excluded.
    pub fn with_ignore_patterns(mut self, patterns: Vec<String>) -> Self {
        self.ignore_patterns = patterns;
        self
    }

    /// Set symbolic link following behavior
    pub fn with_follow_symlinks(mut self, follow: bool) -> Self {
        self.follow_symlinks = follow;
        self
    }

    /// Set number of hashing workers (minimum 1)
    pub fn with_parallel_workers(mut self, workers: usize) -> Self {
        self.parallel_workers = workers.max(1);
        self
    }

    /// Leave snapshot files `<dir>/<prefix>_*.json` out of the scan
    ///
    /// Only has an effect when `dir` lies inside the scanned tree.
    pub fn excluding_snapshots(mut self, dir: &Path, prefix: &str) -> Self {
        let root = self.root_path.canonicalize().ok();
        let dir_canonical = dir.canonicalize().ok();

        self.exclusion = match (root, dir_canonical) {
            (Some(root), Some(dir)) => dir.strip_prefix(&root).ok().map(|relative| Exclusion {
                dir: if relative.as_os_str().is_empty() {
                    self.root_path.clone()
                } else {
                    self.root_path.join(relative)
                },
                prefix: prefix.to_string(),
            }),
            _ => None,
        };
        self
    }

    /// Root being scanned
    pub fn root_path(&self) -> &Path {
        &self.root_path
    }

    /// Walk the tree and hash every regular file
    ///
    /// Records are returned sorted by path. Files that cannot be read are
    /// skipped with a warning.
    ///
    /// # Errors
    ///
    /// - [`SnaptrackError::InvalidConfiguration`] if the root is not a directory
    ///   or an ignore pattern is malformed
    /// - [`SnaptrackError::ThreadPool`] if the hashing pool cannot be started
    pub fn scan<F>(&self, progress_callback: Option<F>) -> Result<Vec<FileRecord>>
    where
        F: Fn(ProgressInfo) + Send + Sync,
    {
        if !self.root_path.is_dir() {
            return Err(SnaptrackError::config(format!(
                "search path is not a directory: {}",
                self.root_path.display()
            )));
        }

        let start = Instant::now();
        let paths = self.collect_paths()?;
        debug!("Collected {} files in {:?}", paths.len(), start.elapsed());

        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(self.parallel_workers)
            .build()?;

        let total = paths.len();
        let processed = AtomicUsize::new(0);
        let mut records: Vec<FileRecord> = pool.install(|| {
            paths
                .par_iter()
                .filter_map(|path| {
                    let record = hash_record(path);
                    let done = processed.fetch_add(1, Ordering::Relaxed) + 1;
                    if let Some(ref callback) = progress_callback {
                        callback(ProgressInfo {
                            operation: "Hashing files".to_string(),
                            current_item: Some(path.to_string_lossy().into_owned()),
                            processed: done,
                            total: Some(total),
                        });
                    }
                    match record {
                        Ok(record) => Some(Ok(record)),
                        Err(e) if e.is_recoverable() => {
                            warn!("Skipping file: {}", e);
                            None
                        }
                        Err(e) => Some(Err(e)),
                    }
                })
                .collect::<Result<Vec<_>>>()
        })?;

        records.sort();
        debug!(
            "Hashed {} of {} files in {:?}",
            records.len(),
            total,
            start.elapsed()
        );
        Ok(records)
    }

    /// Collect every regular file path under the root
    fn collect_paths(&self) -> Result<Vec<PathBuf>> {
        let mut walker_builder = WalkBuilder::new(&self.root_path);
        walker_builder
            .standard_filters(false)
            .follow_links(self.follow_symlinks)
            .threads(self.parallel_workers);

        let excludes = self.build_excludes()?;
        if !excludes.is_empty() {
            walker_builder.filter_entry(move |entry| {
                let is_dir = entry.file_type().map(|ft| ft.is_dir()).unwrap_or(false);
                !excludes.matched(entry.path(), is_dir).is_ignore()
            });
        }

        let paths = Arc::new(Mutex::new(Vec::<PathBuf>::new()));
        walker_builder.build_parallel().run(|| {
            let paths = Arc::clone(&paths);
            let exclusion = self.exclusion.clone();

            Box::new(move |entry_result| {
                match entry_result {
                    Ok(entry) => {
                        let is_file = entry.file_type().map(|ft| ft.is_file()).unwrap_or(false);
                        let excluded = exclusion
                            .as_ref()
                            .map(|x| x.matches(entry.path()))
                            .unwrap_or(false);
                        if is_file && !excluded {
                            paths.lock().push(entry.into_path());
                        }
                    }
                    Err(e) => {
                        warn!("Walk error: {}", e);
                    }
                }
                WalkState::Continue
            })
        });

        let mut paths = std::mem::take(&mut *paths.lock());
        paths.sort();
        Ok(paths)
    }

    /// Compile the ignore patterns into one gitignore matcher rooted at the root
    fn build_excludes(&self) -> Result<Gitignore> {
        let mut builder = GitignoreBuilder::new(&self.root_path);
        for pattern in &self.ignore_patterns {
            builder.add_line(None, pattern).map_err(|e| {
                SnaptrackError::config(format!("invalid ignore pattern '{}': {}", pattern, e))
            })?;
        }
        Ok(builder.build()?)
    }
}

/// Hash one file into a record
fn hash_record(path: &Path) -> Result<FileRecord> {
    let hash = utils::hash_file_content(path).map_err(|e| match e {
        SnaptrackError::Io(source) => SnaptrackError::FileAccess {
            path: path.to_path_buf(),
            source,
        },
        other => other,
    })?;
    trace!("{} {}", path.display(), hash);
    Ok(FileRecord::new(path.to_string_lossy().into_owned(), hash))
}
