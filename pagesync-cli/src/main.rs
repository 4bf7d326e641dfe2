//! pagesync: publish JSON content items to a WordPress-compatible site.
//!
//! # Usage
//!
//! ```text
//! pagesync publish [--directory D] [--pattern P] [--delay SECS] [--dry-run] [--replace]
//! pagesync sync [--content-dirs D...] [--watch] [--interval SECS]
//! pagesync push <file> [--replace]
//! pagesync validate [--directory D] [--pattern P]
//! pagesync status [--json]
//! pagesync check
//! ```
//!
//! Global options: `--config`, `--url`, `--username`, `--password`.

mod commands;

use anyhow::Result;
use clap::{Parser, Subcommand};

use commands::{
    check::CheckArgs, publish::PublishArgs, push::PushArgs, settings::GlobalArgs,
    status::StatusArgs, sync::SyncArgs, validate::ValidateArgs,
};

// ---------------------------------------------------------------------------
// CLI entry point
// ---------------------------------------------------------------------------

#[derive(Parser, Debug)]
#[command(
    name = "pagesync",
    version,
    about = "Synchronize local content items into a remote page store",
    long_about = None,
)]
struct Cli {
    #[command(flatten)]
    global: GlobalArgs,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Publish every content file in a directory (no change detection).
    Publish(PublishArgs),

    /// Publish only changed content, once or on a timer.
    Sync(SyncArgs),

    /// Publish a single content file.
    Push(PushArgs),

    /// Check content files without contacting the store.
    Validate(ValidateArgs),

    /// Show tracked files and the last run.
    Status(StatusArgs),

    /// Test the connection and credentials.
    Check(CheckArgs),
}

// ---------------------------------------------------------------------------
// Main
// ---------------------------------------------------------------------------

fn main() -> Result<()> {
    let cli = Cli::parse();
    pagesync_daemon::init_tracing();
    match cli.command {
        Commands::Publish(args) => args.run(&cli.global),
        Commands::Sync(args) => args.run(&cli.global),
        Commands::Push(args) => args.run(&cli.global),
        Commands::Validate(args) => args.run(&cli.global),
        Commands::Status(args) => args.run(&cli.global),
        Commands::Check(args) => args.run(&cli.global),
    }
}
