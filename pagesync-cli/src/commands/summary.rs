//! Human-readable batch summaries shared by `publish`, `sync`, and `push`.

use std::path::Path;

use anyhow::{bail, Result};
use colored::Colorize;

use pagesync_core::{Action, BatchResult, ItemOutcome};

pub fn print_summary(result: &BatchResult, report: Option<&Path>) {
    let separator = "=".repeat(60).bright_black().to_string();
    println!("{separator}");
    println!("{}", "PAGESYNC BATCH REPORT".bold());
    println!("{separator}");
    println!(
        "Total: {} | Succeeded: {} | Failed: {} | Skipped: {}",
        result.stats.total,
        result.stats.succeeded.to_string().green(),
        result.stats.failed.to_string().red(),
        result.stats.skipped.to_string().yellow(),
    );
    if result.interrupted {
        println!(
            "{}",
            format!(
                "Interrupted: {} item(s) not processed",
                result.stats.total - result.results.len()
            )
            .yellow()
        );
    }

    for outcome in &result.results {
        println!("{}", outcome_line(outcome));
        for err in &outcome.errors {
            println!("      {}", err.bright_black());
        }
    }

    if let Some(path) = report {
        println!("Report: {}", path.display());
    }
}

fn outcome_line(outcome: &ItemOutcome) -> String {
    let name = Path::new(outcome.item_key.as_str())
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| outcome.item_key.to_string());
    let symbol = match outcome.action {
        Action::Created => "✓".green().to_string(),
        Action::Updated => "✎".cyan().to_string(),
        Action::Skipped => "·".bright_black().to_string(),
        Action::Failed => "✗".red().to_string(),
    };

    let mut line = format!("  {symbol}  {:<8} {name}", outcome.action.to_string());
    if let Some(id) = outcome.remote_id {
        line.push_str(&format!("  (page {id}"));
        if outcome.uploaded_asset_count > 0 {
            line.push_str(&format!(", {} assets", outcome.uploaded_asset_count));
        }
        line.push(')');
    }
    if let Some(reason) = &outcome.reason {
        line.push_str(&format!("  [{reason}]"));
    }
    line
}

/// Turn item failures into a non-zero exit.
pub fn ensure_no_failures(result: &BatchResult) -> Result<()> {
    if result.has_failures() {
        bail!("{} item(s) failed to publish", result.stats.failed);
    }
    Ok(())
}
