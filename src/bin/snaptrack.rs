//! # snaptrack CLI
//!
//! Command-line front end for the snaptrack library.
//!
//! ## Usage
//! ```bash
//! # Snapshot a directory and compare with the previous snapshot
//! snaptrack snapshot --search_path /srv/data --write_path /var/lib/snaptrack
//!
//! # Compare the two most recent snapshots
//! snaptrack diff --write_path /var/lib/snaptrack
//!
//! # List duplicate files of the newest snapshot
//! snaptrack dupes --write_path /var/lib/snaptrack
//!
//! # Keep only the three newest snapshots
//! snaptrack rotate --write_path /var/lib/snaptrack --number_to_keep 3
//!
//! # All of the above in one go
//! snaptrack run --search_path /srv/data --write_path /var/lib/snaptrack --number_to_keep 3
//! ```

use clap::{Args, Parser, Subcommand, ValueEnum};
use colored::*;
use humantime::format_duration;
use indicatif::{ProgressBar, ProgressStyle};
use serde_json::json;
use snaptrack::report::{self, Report};
use snaptrack::{
    ChangeTracker, ChangeTrackerBuilder, ProgressInfo, RetentionReport, Result, TrackOutcome,
};
use std::io::IsTerminal;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing_subscriber::EnvFilter;

/// snaptrack - directory snapshots with change, move and duplicate detection
#[derive(Parser)]
#[command(name = "snaptrack")]
#[command(version)]
#[command(about = "Snapshot directory trees and report changed, moved, new, deleted and duplicate files")]
#[command(long_about = None)]
struct Cli {
    /// Enable debug logging
    #[arg(long, global = true)]
    debug: bool,

    /// Output format
    #[arg(long, value_enum, default_value = "text", global = true)]
    format: OutputFormat,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Scan a directory, write a snapshot and compare it with the previous one
    #[command(alias = "snap")]
    Snapshot {
        #[command(flatten)]
        scan: ScanArgs,

        #[command(flatten)]
        store: StoreArgs,
    },

    /// Compare the two most recent snapshots
    Diff {
        #[command(flatten)]
        store: StoreArgs,
    },

    /// List duplicate files of the most recent snapshot
    Dupes {
        #[command(flatten)]
        store: StoreArgs,
    },

    /// Delete all but the newest snapshots
    Rotate {
        /// Number of snapshots to keep
        #[arg(long = "number_to_keep")]
        number_to_keep: usize,

        /// Only show what would be deleted
        #[arg(long)]
        dry_run: bool,

        #[command(flatten)]
        store: StoreArgs,
    },

    /// Snapshot, compare, then rotate
    Run {
        #[command(flatten)]
        scan: ScanArgs,

        /// Number of snapshots to keep
        #[arg(long = "number_to_keep")]
        number_to_keep: usize,

        #[command(flatten)]
        store: StoreArgs,
    },
}

#[derive(Args)]
struct ScanArgs {
    /// Directory tree to snapshot
    #[arg(long = "search_path")]
    search_path: PathBuf,

    /// Ignore patterns (gitignore syntax)
    #[arg(short, long)]
    ignore: Vec<String>,

    /// Hashing threads (defaults to the number of CPUs)
    #[arg(long)]
    workers: Option<usize>,

    /// Follow symbolic links
    #[arg(long)]
    follow_symlinks: bool,
}

#[derive(Args)]
struct StoreArgs {
    /// Directory holding snapshot files
    #[arg(long = "write_path", default_value = ".")]
    write_path: PathBuf,

    /// File name prefix of snapshot files
    #[arg(long = "output_prefix", default_value = "snapshot")]
    output_prefix: String,
}

#[derive(Copy, Clone, PartialEq, Eq, ValueEnum)]
enum OutputFormat {
    Text,
    Json,
}

fn main() {
    let cli = Cli::parse();

    let filter = if cli.debug {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    // Disable colors if needed
    if std::env::var("NO_COLOR").is_ok() {
        colored::control::set_override(false);
    }

    match run(cli) {
        Ok(()) => {}
        Err(e) if e.is_informational() => {
            println!("{}", e.user_message().yellow());
        }
        Err(e) => {
            eprintln!("{}: {}", "Error".red().bold(), e);
            std::process::exit(1);
        }
    }
}

/// Main command runner
fn run(cli: Cli) -> Result<()> {
    let format = cli.format;
    match cli.command {
        Commands::Snapshot { scan, store } => cmd_snapshot(scan, store, format),
        Commands::Diff { store } => cmd_diff(store, format),
        Commands::Dupes { store } => cmd_dupes(store, format),
        Commands::Rotate {
            number_to_keep,
            dry_run,
            store,
        } => cmd_rotate(store, number_to_keep, dry_run, format),
        Commands::Run {
            scan,
            number_to_keep,
            store,
        } => cmd_run(scan, store, number_to_keep, format),
    }
}

/// Scan, write and compare
fn cmd_snapshot(scan: ScanArgs, store: StoreArgs, format: OutputFormat) -> Result<()> {
    let (tracker, spinner) = scanning_tracker(scan, store, None)?;

    let start = Instant::now();
    let outcome = tracker.track();
    finish(spinner);
    let outcome = outcome?;

    match format {
        OutputFormat::Text => print_track(&outcome, start.elapsed()),
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(&track_json(&outcome))?)
        }
    }
    Ok(())
}

/// Compare the two newest snapshots
fn cmd_diff(store: StoreArgs, format: OutputFormat) -> Result<()> {
    let diff = store_tracker(store, None)?.diff_latest()?;
    match format {
        OutputFormat::Text => print_report(&Report::from_diff(&diff)),
        OutputFormat::Json => println!("{}", report::diff_to_json(&diff)?),
    }
    Ok(())
}

/// Duplicates of the newest snapshot
fn cmd_dupes(store: StoreArgs, format: OutputFormat) -> Result<()> {
    let groups = store_tracker(store, None)?.duplicates_latest()?;
    match format {
        OutputFormat::Text => print_report(&Report::from_duplicates(&groups)),
        OutputFormat::Json => println!("{}", report::duplicates_to_json(&groups)?),
    }
    Ok(())
}

/// Rotate old snapshots
fn cmd_rotate(
    store: StoreArgs,
    number_to_keep: usize,
    dry_run: bool,
    format: OutputFormat,
) -> Result<()> {
    let retention = store_tracker(store, Some(number_to_keep))?.rotate(dry_run)?;
    match format {
        OutputFormat::Text => print_retention(&retention),
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&retention)?),
    }
    Ok(())
}

/// Snapshot, compare and rotate
fn cmd_run(
    scan: ScanArgs,
    store: StoreArgs,
    number_to_keep: usize,
    format: OutputFormat,
) -> Result<()> {
    let (tracker, spinner) = scanning_tracker(scan, store, Some(number_to_keep))?;

    let start = Instant::now();
    let outcome = tracker.run();
    finish(spinner);
    let outcome = outcome?;

    match format {
        OutputFormat::Text => {
            print_track(&outcome.tracked, start.elapsed());
            print_retention(&outcome.retention);
        }
        OutputFormat::Json => {
            let value = json!({
                "snapshot": track_json(&outcome.tracked),
                "retention": outcome.retention,
            });
            println!("{}", serde_json::to_string_pretty(&value)?);
        }
    }
    Ok(())
}

/// Tracker that only reads and rotates snapshots
fn store_tracker(store: StoreArgs, number_to_keep: Option<usize>) -> Result<ChangeTracker> {
    let mut builder = ChangeTrackerBuilder::new()
        .write_path(store.write_path)
        .output_prefix(store.output_prefix);
    if let Some(count) = number_to_keep {
        builder = builder.number_to_keep(count);
    }
    builder.build()
}

/// Tracker that scans, with a spinner when attached to a terminal
fn scanning_tracker(
    scan: ScanArgs,
    store: StoreArgs,
    number_to_keep: Option<usize>,
) -> Result<(ChangeTracker, Option<ProgressBar>)> {
    let mut builder = ChangeTrackerBuilder::new()
        .search_path(scan.search_path)
        .write_path(store.write_path)
        .output_prefix(store.output_prefix)
        .ignore_patterns(scan.ignore)
        .follow_symlinks(scan.follow_symlinks);
    if let Some(workers) = scan.workers {
        builder = builder.parallel_workers(workers);
    }
    if let Some(count) = number_to_keep {
        builder = builder.number_to_keep(count);
    }

    let spinner = std::io::stderr().is_terminal().then(|| {
        let pb = ProgressBar::new_spinner();
        pb.set_style(
            ProgressStyle::default_spinner()
                .template("{spinner:.green} {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_spinner()),
        );
        pb.enable_steady_tick(Duration::from_millis(100));
        pb.set_message("Scanning files...");
        pb
    });

    if let Some(pb) = &spinner {
        let pb = pb.clone();
        builder = builder.progress_callback(Arc::new(move |info: ProgressInfo| {
            if let (Some(total), Some(percent)) = (info.total, info.percentage()) {
                pb.set_message(format!(
                    "{} {}/{} ({:.0}%)",
                    info.operation, info.processed, total, percent
                ));
            }
        }));
    }

    // Scanning operations need a search path; check it before any work.
    match builder
        .build()
        .and_then(|tracker| tracker.config().validate(true).map(|()| tracker))
    {
        Ok(tracker) => Ok((tracker, spinner)),
        Err(e) => {
            finish(spinner);
            Err(e)
        }
    }
}

fn finish(spinner: Option<ProgressBar>) {
    if let Some(pb) = spinner {
        pb.finish_and_clear();
    }
}

fn print_track(outcome: &TrackOutcome, elapsed: Duration) {
    println!(
        "{} Wrote {} ({} files) in {}",
        "✓".green().bold(),
        outcome.snapshot.name.to_string().yellow().bold(),
        outcome.snapshot.records.len().to_string().cyan(),
        format_duration(Duration::from_millis(elapsed.as_millis() as u64))
    );

    match (&outcome.previous, &outcome.diff) {
        (Some(previous), Some(diff)) => {
            println!("  Compared with {}", previous.to_string().cyan());
            print_report(&Report::from_diff(diff));
        }
        _ => {
            println!("  First snapshot, nothing to compare");
            if !outcome.duplicates.is_empty() {
                print_report(&Report::from_duplicates(&outcome.duplicates));
            }
        }
    }
}

fn track_json(outcome: &TrackOutcome) -> serde_json::Value {
    json!({
        "snapshot": outcome.snapshot.name.file_name(),
        "files": outcome.snapshot.records.len(),
        "previous": outcome.previous.as_ref().map(|n| n.file_name()),
        "duplicates": outcome.duplicates,
        "diff": outcome.diff,
    })
}

fn print_report(report: &Report) {
    for section in &report.sections {
        println!("{}", section.heading().blue().bold());
        for line in &section.lines {
            println!("{}", line);
        }
    }
    println!("{}", report.summary.bold());
}

fn print_retention(retention: &RetentionReport) {
    let verb = if retention.dry_run {
        "Would delete"
    } else {
        "Deleted"
    };
    for name in &retention.deleted {
        println!("  {} {}", verb.red(), name);
    }
    for name in &retention.already_missing {
        println!("  {} {}", "Already gone".yellow(), name);
    }
    println!(
        "Kept {} snapshot(s), {} {}",
        retention.kept.len().to_string().green(),
        verb.to_lowercase(),
        (retention.deleted.len() + retention.already_missing.len()).to_string().red()
    );
}
