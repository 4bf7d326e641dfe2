//! `pagesync validate`: load and check content files without a store.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;
use colored::Colorize;

use pagesync_core::{validate_files, Discovery};

use super::settings::{self, GlobalArgs};

/// Arguments for `pagesync validate`.
#[derive(Args, Debug)]
pub struct ValidateArgs {
    /// Check only this directory (one level); default is every configured
    /// content dir, recursively.
    #[arg(long)]
    pub directory: Option<PathBuf>,

    /// File name pattern to match.
    #[arg(long)]
    pub pattern: Option<String>,
}

impl ValidateArgs {
    pub fn run(self, global: &GlobalArgs) -> Result<()> {
        let config = settings::load_config(global)?;
        let (roots, recursive) = match &self.directory {
            Some(dir) => (vec![dir.clone()], false),
            None => (config.content.dirs.clone(), true),
        };
        let pattern = self.pattern.as_deref().unwrap_or(&config.content.pattern);
        let discovery = Discovery::new(roots, pattern, recursive).context("invalid --pattern")?;
        let files = discovery.files().context("failed to scan content directories")?;

        println!("Validating {} file(s)", files.len());
        print_validation(&files);
        Ok(())
    }
}

/// Print one line per file. Invalid files never change the exit code.
pub fn print_validation(files: &[PathBuf]) {
    let mut valid = 0usize;
    for (path, checked) in validate_files(files) {
        match checked {
            Ok(item) => {
                valid += 1;
                println!(
                    "  {}  {}  ({} assets)",
                    "✓".green(),
                    path.display(),
                    item.assets.len()
                );
            }
            Err(err) => println!("  {}  {}  {}", "✗".red(), path.display(), err),
        }
    }
    println!("{valid} of {} file(s) valid", files.len());
}
