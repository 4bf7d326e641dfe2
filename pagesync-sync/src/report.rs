//! Report sink: one pretty JSON file per batch, plus an optional JSONL
//! publish log with one line per attempted upsert.

use std::io::Write as _;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};

use pagesync_core::{Action, BatchResult, ItemKey, PageId};

use crate::error::{io_err, SyncError};

/// `<dir>/batch_publish_report_YYYYMMDD_HHMMSS.json`, pure, no I/O.
pub fn report_path(dir: &Path, at: DateTime<Local>) -> PathBuf {
    dir.join(format!(
        "batch_publish_report_{}.json",
        at.format("%Y%m%d_%H%M%S")
    ))
}

/// Write `result` under `dir` (created if absent) and return the file path.
///
/// Same atomic `.tmp` + rename as the fingerprint store.
pub fn save_report(dir: &Path, result: &BatchResult) -> Result<PathBuf, SyncError> {
    std::fs::create_dir_all(dir).map_err(|e| io_err(dir, e))?;
    let path = report_path(dir, result.finished_at.with_timezone(&Local));
    let json = serde_json::to_string_pretty(result)?;
    let tmp = path.with_extension("json.tmp");
    std::fs::write(&tmp, json).map_err(|e| io_err(&tmp, e))?;
    std::fs::rename(&tmp, &path).map_err(|e| io_err(&path, e))?;
    tracing::info!("report saved to {}", path.display());
    Ok(path)
}

/// Read a report back, e.g. for `status`.
pub fn load_report(path: &Path) -> Result<BatchResult, SyncError> {
    let contents = std::fs::read_to_string(path).map_err(|e| io_err(path, e))?;
    Ok(serde_json::from_str(&contents)?)
}

/// Most recent report in `dir`, by file name.
pub fn latest_report(dir: &Path) -> Option<PathBuf> {
    let entries = std::fs::read_dir(dir).ok()?;
    entries
        .filter_map(|e| e.ok())
        .map(|e| e.path())
        .filter(|p| {
            p.file_name()
                .map(|n| {
                    let n = n.to_string_lossy();
                    n.starts_with("batch_publish_report_") && n.ends_with(".json")
                })
                .unwrap_or(false)
        })
        .max()
}

/// One line of the publish log.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PublishLogEntry {
    pub timestamp: DateTime<Local>,
    pub item_key: ItemKey,
    pub title: String,
    pub slug: String,
    pub action: Action,
    pub remote_id: Option<PageId>,
    pub errors: Vec<String>,
}

/// Append `entry` as one JSON line, creating the file if needed.
pub fn append_publish_log(path: &Path, entry: &PublishLogEntry) -> Result<(), SyncError> {
    if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
        std::fs::create_dir_all(dir).map_err(|e| io_err(dir, e))?;
    }
    let line = serde_json::to_string(entry)?;
    let mut file = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .map_err(|e| io_err(path, e))?;
    writeln!(file, "{line}").map_err(|e| io_err(path, e))?;
    Ok(())
}
