//! `pagesync check`: connectivity and credentials.

use anyhow::Result;
use clap::Args;

use super::settings::{self, GlobalArgs};

/// Arguments for `pagesync check`.
#[derive(Args, Debug)]
pub struct CheckArgs {}

impl CheckArgs {
    pub fn run(self, global: &GlobalArgs) -> Result<()> {
        let config = settings::load_config(global)?;
        let client = settings::connect(&config)?;
        println!("  API: {}", client.api_base());
        Ok(())
    }
}
