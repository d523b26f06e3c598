//! Snapshot rotation
//!
//! Keeps the `N` most recent snapshots of a store and deletes the rest.
//! Planning is pure (names in, names out) so it can be previewed with a dry
//! run; applying the plan removes files. A file that is already gone counts
//! as removed. Any other deletion failure stops the rotation.

use crate::error::{Result, SnaptrackError};
use crate::snapshot::SnapshotName;
use crate::store::SnapshotStore;
use serde::Serialize;
use std::fs;
use std::io::ErrorKind;
use tracing::{debug, info};

/// Which snapshots to keep and which to delete
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetentionPlan {
    /// Snapshots kept, newest first
    pub keep: Vec<SnapshotName>,
    /// Snapshots to delete, newest first
    pub delete: Vec<SnapshotName>,
}

impl RetentionPlan {
    /// Split `names` into the `number_to_keep` newest and the rest
    ///
    /// # Errors
    ///
    /// - [`SnaptrackError::InvalidConfiguration`] if `number_to_keep` is 0
    pub fn new(mut names: Vec<SnapshotName>, number_to_keep: usize) -> Result<Self> {
        if number_to_keep < 1 {
            return Err(SnaptrackError::config("number_to_keep must be at least 1"));
        }

        names.sort_by(|a, b| b.cmp(a));
        let delete = if names.len() > number_to_keep {
            names.split_off(number_to_keep)
        } else {
            Vec::new()
        };

        Ok(Self {
            keep: names,
            delete,
        })
    }

    /// Check if nothing needs deleting
    pub fn is_noop(&self) -> bool {
        self.delete.is_empty()
    }
}

/// Outcome of applying a retention plan
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RetentionReport {
    /// File names kept
    pub kept: Vec<String>,
    /// File names removed by this run
    pub deleted: Vec<String>,
    /// File names that were already gone
    pub already_missing: Vec<String>,
    /// Whether files were left untouched on purpose
    pub dry_run: bool,
}

/// Applies retention to one snapshot store
#[derive(Debug, Clone)]
pub struct RetentionManager<'a> {
    store: &'a SnapshotStore,
    number_to_keep: usize,
}

impl<'a> RetentionManager<'a> {
    /// Create a manager keeping `number_to_keep` snapshots
    pub fn new(store: &'a SnapshotStore, number_to_keep: usize) -> Self {
        Self {
            store,
            number_to_keep,
        }
    }

    /// Compute the plan for the store's current contents
    pub fn plan(&self) -> Result<RetentionPlan> {
        RetentionPlan::new(self.store.list()?, self.number_to_keep)
    }

    /// Plan and delete; with `dry_run` only report what would go
    pub fn rotate(&self, dry_run: bool) -> Result<RetentionReport> {
        let plan = self.plan()?;
        if dry_run {
            return Ok(RetentionReport {
                kept: file_names(&plan.keep),
                deleted: file_names(&plan.delete),
                already_missing: Vec::new(),
                dry_run: true,
            });
        }
        self.apply(&plan)
    }

    /// Delete every snapshot the plan marks for deletion
    ///
    /// # Errors
    ///
    /// - [`SnaptrackError::RetentionFailed`] on the first file that cannot be
    ///   removed for a reason other than already being gone
    pub fn apply(&self, plan: &RetentionPlan) -> Result<RetentionReport> {
        let mut report = RetentionReport {
            kept: file_names(&plan.keep),
            ..RetentionReport::default()
        };

        for name in &plan.delete {
            let path = self.store.path_of(name);
            match fs::remove_file(&path) {
                Ok(()) => {
                    debug!("Deleted snapshot {}", path.display());
                    report.deleted.push(name.file_name().to_string());
                }
                Err(e) if e.kind() == ErrorKind::NotFound => {
                    debug!("Snapshot already gone: {}", path.display());
                    report.already_missing.push(name.file_name().to_string());
                }
                Err(source) => return Err(SnaptrackError::RetentionFailed { path, source }),
            }
        }

        if !plan.is_noop() {
            info!(
                "Rotated snapshots: kept {}, deleted {}",
                report.kept.len(),
                report.deleted.len() + report.already_missing.len()
            );
        }
        Ok(report)
    }
}

fn file_names(names: &[SnapshotName]) -> Vec<String> {
    names.iter().map(|n| n.file_name().to_string()).collect()
}
