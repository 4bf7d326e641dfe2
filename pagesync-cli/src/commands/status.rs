//! `pagesync status`: tracked files, their state, and the last run.

use std::collections::BTreeSet;
use std::path::Path;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use clap::Args;
use colored::Colorize;
use serde::Serialize;
use tabled::{settings::Style, Table, Tabled};

use pagesync_core::{BatchResult, Config, Discovery, ItemKey};
use pagesync_sync::{fingerprint_file, latest_report, load_report, FingerprintStore};

use super::settings::{self, GlobalArgs};

/// Arguments for `pagesync status`.
#[derive(Args, Debug)]
pub struct StatusArgs {
    /// Emit machine-readable JSON.
    #[arg(long)]
    pub json: bool,
}

impl StatusArgs {
    pub fn run(self, global: &GlobalArgs) -> Result<()> {
        let config = settings::load_config(global)?;
        let report = build_report(&config)?;
        if self.json {
            println!(
                "{}",
                serde_json::to_string_pretty(&report).context("failed to serialize status JSON")?
            );
            return Ok(());
        }
        print_table(&report);
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
enum FileState {
    Current,
    Changed,
    Missing,
    New,
}

impl FileState {
    fn label(self) -> &'static str {
        match self {
            FileState::Current => "CURRENT",
            FileState::Changed => "CHANGED",
            FileState::Missing => "MISSING",
            FileState::New => "NEW",
        }
    }

    fn indicator(self) -> String {
        match self {
            FileState::Current => "■".green().bold().to_string(),
            FileState::Changed => "■".yellow().bold().to_string(),
            FileState::Missing => "■".red().bold().to_string(),
            FileState::New => "■".bright_black().bold().to_string(),
        }
    }
}

#[derive(Debug, Serialize)]
struct FileStatus {
    file: String,
    state: FileState,
}

#[derive(Debug, Serialize)]
struct LastRun {
    report: String,
    finished_at: DateTime<Utc>,
    total: usize,
    succeeded: usize,
    failed: usize,
    skipped: usize,
    interrupted: bool,
}

#[derive(Debug, Serialize)]
struct StatusReport {
    fingerprints: String,
    synced_at: Option<DateTime<Utc>>,
    last_sync_age: String,
    files: Vec<FileStatus>,
    last_run: Option<LastRun>,
}

#[derive(Tabled)]
struct StatusTableRow {
    #[tabled(rename = "file")]
    file: String,
    #[tabled(rename = "state")]
    state: String,
}

fn build_report(config: &Config) -> Result<StatusReport> {
    let store = FingerprintStore::load(&config.state.fingerprints);

    let mut files = Vec::new();
    let mut tracked = BTreeSet::new();
    for (key, hash) in store.entries() {
        tracked.insert(key.to_string());
        files.push(FileStatus {
            file: key.to_string(),
            state: tracked_state(Path::new(key), hash),
        });
    }

    let discovery = Discovery::new(config.content.dirs.clone(), &config.content.pattern, true)
        .context("invalid content pattern")?;
    let discovered = discovery
        .files()
        .context("failed to scan content directories")?;
    for path in discovered {
        let key = ItemKey::from_path(&path);
        if !tracked.contains(key.as_str()) {
            files.push(FileStatus {
                file: key.to_string(),
                state: FileState::New,
            });
        }
    }
    files.sort_by(|a, b| a.file.cmp(&b.file));

    let last_sync_age = match store.synced_at() {
        Some(at) if !store.is_empty() => format_age(at, Utc::now()),
        _ => "never".to_string(),
    };

    Ok(StatusReport {
        fingerprints: store.path().display().to_string(),
        synced_at: store.synced_at(),
        last_sync_age,
        files,
        last_run: last_run(&config.state.report_dir),
    })
}

fn tracked_state(path: &Path, hash: &str) -> FileState {
    if !path.is_file() {
        return FileState::Missing;
    }
    match fingerprint_file(path) {
        Ok(current) if current == hash => FileState::Current,
        _ => FileState::Changed,
    }
}

fn last_run(report_dir: &Path) -> Option<LastRun> {
    let path = latest_report(report_dir)?;
    let result: BatchResult = load_report(&path).ok()?;
    Some(LastRun {
        report: path.display().to_string(),
        finished_at: result.finished_at,
        total: result.stats.total,
        succeeded: result.stats.succeeded,
        failed: result.stats.failed,
        skipped: result.stats.skipped,
        interrupted: result.interrupted,
    })
}

fn format_age(at: DateTime<Utc>, now: DateTime<Utc>) -> String {
    let seconds = now.signed_duration_since(at).num_seconds().max(0) as u64;
    if seconds < 60 {
        return format!("{seconds}s ago");
    }
    if seconds < 60 * 60 {
        return format!("{}m ago", seconds / 60);
    }
    if seconds < 60 * 60 * 24 {
        return format!("{}h ago", seconds / (60 * 60));
    }
    format!("{}d ago", seconds / (60 * 60 * 24))
}

fn count(report: &StatusReport, state: FileState) -> usize {
    report.files.iter().filter(|f| f.state == state).count()
}

fn print_table(report: &StatusReport) {
    println!(
        "pagesync v{} | {} tracked | {} changed | {} new | last sync {}",
        env!("CARGO_PKG_VERSION"),
        report.files.len() - count(report, FileState::New),
        count(report, FileState::Changed),
        count(report, FileState::New),
        report.last_sync_age,
    );

    let separator = "■".repeat(60).bright_black().to_string();
    if report.files.is_empty() {
        println!("No tracked or discovered content files.");
    } else {
        println!("{separator}");
        println!(
            "Indicators: {} CURRENT  {} CHANGED  {} MISSING  {} NEW",
            FileState::Current.indicator(),
            FileState::Changed.indicator(),
            FileState::Missing.indicator(),
            FileState::New.indicator(),
        );
        println!("{separator}");
        let rows: Vec<StatusTableRow> = report
            .files
            .iter()
            .map(|f| StatusTableRow {
                file: f.file.clone(),
                state: format!("{} {}", f.state.indicator(), f.state.label()),
            })
            .collect();
        let mut table = Table::new(rows);
        table.with(Style::rounded());
        println!("{table}");
    }

    match &report.last_run {
        Some(run) => {
            println!("{separator}");
            println!(
                "Last run: {} | Total: {} | Succeeded: {} | Failed: {} | Skipped: {}{}",
                run.finished_at.format("%Y-%m-%d %H:%M:%S UTC"),
                run.total,
                run.succeeded,
                run.failed,
                run.skipped,
                if run.interrupted { " (interrupted)" } else { "" },
            );
            println!("Report: {}", run.report);
        }
        None => println!("No batch reports yet."),
    }

    if count(report, FileState::Changed) + count(report, FileState::New) > 0 {
        println!("Run 'pagesync sync' to publish pending changes.");
    }
}
