//! `pagesync sync`: publish changed content once, or keep watching.

use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Args;

use pagesync_core::Discovery;
use pagesync_daemon::WatchOptions;
use pagesync_sync::{save_report, ChangeDetection, StopFlag};

use super::settings::{self, GlobalArgs};
use super::summary::{ensure_no_failures, print_summary};

/// Arguments for `pagesync sync`.
#[derive(Args, Debug)]
pub struct SyncArgs {
    /// Directories to scan recursively (default: the configured content dirs).
    #[arg(long, num_args = 1..)]
    pub content_dirs: Vec<PathBuf>,

    /// Repeat the sync on a timer until interrupted.
    #[arg(long)]
    pub watch: bool,

    /// Seconds between watch cycles.
    #[arg(long, requires = "watch")]
    pub interval: Option<u64>,
}

impl SyncArgs {
    pub fn run(self, global: &GlobalArgs) -> Result<()> {
        let mut config = settings::load_config(global)?;
        if let Some(secs) = self.interval {
            config.watch.interval_secs = secs;
            config.validate().context("invalid --interval")?;
        }
        let roots = if self.content_dirs.is_empty() {
            config.content.dirs.clone()
        } else {
            self.content_dirs.clone()
        };
        let discovery =
            Discovery::new(roots, &config.content.pattern, true).context("invalid pattern")?;

        let client = settings::connect(&config)?;
        let options = settings::batch_options(&config, ChangeDetection::Enabled, false);
        let mut orchestrator = settings::orchestrator(client, &config, options);

        if self.watch {
            println!(
                "Watching {} dir(s) every {}s (ctrl-c to stop)",
                discovery.roots().len(),
                config.watch.interval_secs
            );
            let summary = pagesync_daemon::start_blocking(
                orchestrator,
                discovery,
                WatchOptions {
                    interval: Duration::from_secs(config.watch.interval_secs),
                    report_dir: Some(config.state.report_dir.clone()),
                },
            )
            .context("watch mode failed")?;
            println!("Stopped after {} cycle(s)", summary.cycles);
            if summary.flush_failures > 0 {
                eprintln!(
                    "warning: fingerprints could not be saved in {} cycle(s)",
                    summary.flush_failures
                );
            }
            if let Some(last) = &summary.last_result {
                print_summary(last, None);
            }
            return Ok(());
        }

        let cycle = orchestrator
            .run_cycle(&discovery, &StopFlag::new())
            .context("sync failed")?;
        let report = save_report(&config.state.report_dir, &cycle.result)
            .context("failed to write batch report")?;
        print_summary(&cycle.result, Some(&report));
        // Pages are already published; only the next run's skip list is lost.
        cycle.flush.with_context(|| {
            format!(
                "failed to save fingerprints to {}",
                config.state.fingerprints.display()
            )
        })?;
        ensure_no_failures(&cycle.result)
    }
}
