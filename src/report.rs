//! Human-readable and JSON rendering of comparison results
//!
//! The text form groups entries by category, one path (or `old --> new`
//! pair for moves) per line, and ends with a one-line summary. Empty
//! categories are left out. The JSON form is the serialized result.

use crate::error::Result;
use crate::types::{DiffResult, DuplicateGroup, Status};
use serde::Serialize;
use std::fmt;

/// One titled block of a report
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Section {
    /// Heading without decoration, e.g. `moved files`
    pub title: String,
    /// Body lines
    pub lines: Vec<String>,
}

impl Section {
    fn new(title: &str, lines: Vec<String>) -> Option<Self> {
        (!lines.is_empty()).then(|| Self {
            title: title.to_string(),
            lines,
        })
    }

    /// Heading as printed, e.g. `== moved files ==`
    pub fn heading(&self) -> String {
        format!("== {} ==", self.title)
    }
}

/// Rendered report
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Report {
    /// Non-empty sections in print order
    pub sections: Vec<Section>,
    /// Closing summary line
    pub summary: String,
}

impl Report {
    /// Report for a comparison of two snapshots
    pub fn from_diff(diff: &DiffResult) -> Self {
        let mut sections = Vec::new();
        sections.extend(duplicate_section(&diff.duplicates));

        let lines = |status: Status, render: fn(&str, &str, &str, &str) -> String| {
            diff.with_status(status)
                .map(|e| {
                    render(
                        e.path_previous.as_deref().unwrap_or_default(),
                        e.path_current.as_deref().unwrap_or_default(),
                        e.hash_previous.as_deref().unwrap_or_default(),
                        e.hash_current.as_deref().unwrap_or_default(),
                    )
                })
                .collect::<Vec<_>>()
        };

        sections.extend(Section::new(
            "changed files",
            lines(Status::Changed, |_, path, old, new| {
                format!("{} ({} -> {})", path, old, new)
            }),
        ));
        sections.extend(Section::new(
            "moved files",
            lines(Status::Moved, |old, new, _, _| format!("{} --> {}", old, new)),
        ));
        sections.extend(Section::new(
            "new files",
            lines(Status::Added, |_, path, _, _| path.to_string()),
        ));
        sections.extend(Section::new(
            "deleted files",
            lines(Status::Deleted, |path, _, _, _| path.to_string()),
        ));

        let stats = &diff.stats;
        let summary = format!(
            "{} unchanged, {} changed, {} moved, {} added, {} deleted, {} duplicate group(s)",
            stats.unchanged,
            stats.changed,
            stats.moved,
            stats.added,
            stats.deleted,
            stats.duplicate_groups
        );

        Self { sections, summary }
    }

    /// Report for the duplicates of a single snapshot
    pub fn from_duplicates(groups: &[DuplicateGroup]) -> Self {
        let files: usize = groups.iter().map(|g| g.paths.len()).sum();
        Self {
            sections: duplicate_section(groups).into_iter().collect(),
            summary: format!("{} duplicate group(s), {} file(s)", groups.len(), files),
        }
    }

    /// Plain text rendering
    pub fn to_text(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for Report {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for section in &self.sections {
            writeln!(f, "{}", section.heading())?;
            for line in &section.lines {
                writeln!(f, "{}", line)?;
            }
        }
        write!(f, "{}", self.summary)
    }
}

fn duplicate_section(groups: &[DuplicateGroup]) -> Option<Section> {
    let lines = groups
        .iter()
        .flat_map(|group| {
            std::iter::once(group.hash.clone()).chain(group.paths.iter().map(|p| format!("  {}", p)))
        })
        .collect();
    Section::new("duplicate files", lines)
}

/// Pretty JSON of a comparison: `{ "stats", "duplicates", "entries" }`
pub fn diff_to_json(diff: &DiffResult) -> Result<String> {
    #[derive(Serialize)]
    struct Output<'a> {
        stats: &'a crate::types::DiffStats,
        duplicates: &'a [DuplicateGroup],
        entries: &'a [crate::types::ClassifiedEntry],
    }

    Ok(serde_json::to_string_pretty(&Output {
        stats: &diff.stats,
        duplicates: &diff.duplicates,
        entries: &diff.entries,
    })?)
}

/// Pretty JSON of duplicate groups
pub fn duplicates_to_json(groups: &[DuplicateGroup]) -> Result<String> {
    Ok(serde_json::to_string_pretty(groups)?)
}
