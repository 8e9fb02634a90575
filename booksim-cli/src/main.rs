//! booksim: pull booking-simulation entities from the external system of
//! record into the local store.
//!
//! # Usage
//!
//! ```text
//! booksim sync [--source <dir>] [--operation-id <id>] [--only <entity>,...] [--json]
//! booksim config [--init]
//! booksim backups <file> [--json]
//! ```
//!
//! `--log-json` switches log output (stderr) to JSON lines.

mod commands;

use anyhow::Result;
use clap::{Parser, Subcommand};

use commands::{backups::BackupsArgs, config::ConfigArgs, sync::SyncArgs};

// ---------------------------------------------------------------------------
// CLI entry point
// ---------------------------------------------------------------------------

#[derive(Parser, Debug)]
#[command(
    name = "booksim",
    version,
    about = "Synchronize booking-simulation entities from the external system of record",
    long_about = None,
)]
struct Cli {
    /// Emit logs as JSON lines on stderr.
    #[arg(long, global = true)]
    log_json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Run one parallel sync batch across the enabled entity types.
    Sync(SyncArgs),

    /// Show the effective configuration, or write it out.
    Config(ConfigArgs),

    /// List retained backups of a store file.
    Backups(BackupsArgs),
}

// ---------------------------------------------------------------------------
// Main
// ---------------------------------------------------------------------------

fn main() -> Result<()> {
    let cli = Cli::parse();
    booksim_orchestrator::init_tracing(cli.log_json);
    match cli.command {
        Commands::Sync(args) => args.run(),
        Commands::Config(args) => args.run(),
        Commands::Backups(args) => args.run(),
    }
}
