//! `pagesync push`: publish one file right now.

use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use clap::Args;

use pagesync_core::{BatchResult, Config};
use pagesync_store::ContentStore;
use pagesync_sync::{save_report, ChangeDetection};

use super::settings::{self, GlobalArgs};
use super::summary::{ensure_no_failures, print_summary};

/// Arguments for `pagesync push`.
#[derive(Args, Debug)]
pub struct PushArgs {
    /// Content file to publish.
    pub file: PathBuf,

    /// Overwrite the existing page instead of appending to it.
    #[arg(long)]
    pub replace: bool,
}

impl PushArgs {
    pub fn run(self, global: &GlobalArgs) -> Result<()> {
        if !self.file.is_file() {
            bail!("no such content file: {}", self.file.display());
        }
        let config = settings::load_config(global)?;
        let client = settings::connect(&config)?;
        let (result, report) = push_file(client, &config, &self.file, self.replace)?;
        print_summary(&result, Some(&report));
        ensure_no_failures(&result)
    }
}

/// Publish `file` and write the run's report. Returns the result and the
/// report path.
fn push_file<S: ContentStore>(
    store: S,
    config: &Config,
    file: &Path,
    replace: bool,
) -> Result<(BatchResult, PathBuf)> {
    let options = settings::batch_options(config, ChangeDetection::Bypassed, replace);
    let mut orchestrator = settings::orchestrator(store, config, options);
    let result = orchestrator.run_batch(&[file.to_path_buf()]);
    let report =
        save_report(&config.state.report_dir, &result).context("failed to write batch report")?;
    Ok((result, report))
}
