//! `pagesync publish`: one-shot batch publish of a directory.

use std::path::PathBuf;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use clap::Args;

use pagesync_core::Discovery;
use pagesync_sync::{save_report, ChangeDetection};

use super::settings::{self, GlobalArgs};
use super::summary::{ensure_no_failures, print_summary};
use super::validate::print_validation;

/// Arguments for `pagesync publish`.
#[derive(Args, Debug)]
pub struct PublishArgs {
    /// Content directory (default: the configured content dirs).
    #[arg(long)]
    pub directory: Option<PathBuf>,

    /// File name pattern to match.
    #[arg(long)]
    pub pattern: Option<String>,

    /// Seconds to wait between published items.
    #[arg(long)]
    pub delay: Option<f64>,

    /// Validate files without publishing.
    #[arg(long)]
    pub dry_run: bool,

    /// Overwrite existing pages instead of appending to them.
    #[arg(long)]
    pub replace: bool,
}

impl PublishArgs {
    pub fn run(self, global: &GlobalArgs) -> Result<()> {
        let mut config = settings::load_config(global)?;
        if let Some(secs) = self.delay {
            if !secs.is_finite() || secs < 0.0 {
                bail!("--delay must be a non-negative number of seconds");
            }
            config.publish.delay_ms = Duration::from_secs_f64(secs).as_millis() as u64;
        }

        let roots = match &self.directory {
            Some(dir) => vec![dir.clone()],
            None => config.content.dirs.clone(),
        };
        let pattern = self.pattern.as_deref().unwrap_or(&config.content.pattern);
        let discovery = Discovery::new(roots, pattern, false).context("invalid --pattern")?;
        for missing in discovery.missing_roots() {
            eprintln!("warning: content directory not found: {}", missing.display());
        }
        let files = discovery.files().context("failed to scan content directories")?;

        if self.dry_run {
            println!("Dry run: found {} file(s) to validate", files.len());
            print_validation(&files);
            return Ok(());
        }

        if files.is_empty() {
            bail!("no content files matching '{pattern}' found");
        }

        let client = settings::connect(&config)?;
        let options = settings::batch_options(&config, ChangeDetection::Bypassed, self.replace);
        let mut orchestrator = settings::orchestrator(client, &config, options);

        let result = orchestrator.run_batch(&files);
        let report = save_report(&config.state.report_dir, &result)
            .context("failed to write batch report")?;
        print_summary(&result, Some(&report));
        ensure_no_failures(&result)
    }
}
