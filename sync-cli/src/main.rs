//! # offline-sync
//!
//! CLI tool for exercising the offline differential-sync engine.
//!
//! ## Commands
//!
//! - `diff`: Print the patches between two JSON snapshots
//! - `patch`: Apply a patch list to a JSON snapshot
//! - `plan`: Dry-run a queued action list against a recorded remote snapshot
//!
//! ## Example
//!
//! ```bash
//! # What changed between two versions of a post payload?
//! offline-sync diff before.json after.json
//!
//! # Replay those patches onto another snapshot
//! offline-sync patch before.json patches.json
//!
//! # What would syncing this queue do against that remote?
//! offline-sync -v plan queue.json --remote remote.json --config engine.toml
//! ```

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

mod commands;

use commands::{diff, patch, plan};

/// CLI tool for exercising the offline differential-sync engine.
#[derive(Parser, Debug)]
#[command(name = "offline-sync")]
#[command(version, about, long_about = None)]
struct Cli {
    /// Increase log verbosity (-v info, -vv debug); logs go to stderr
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Print the patches that turn one JSON snapshot into another
    Diff {
        /// Old snapshot (JSON file)
        old: PathBuf,

        /// New snapshot (JSON file)
        new: PathBuf,
    },

    /// Apply a patch list to a JSON snapshot
    Patch {
        /// Snapshot to patch (JSON file)
        data: PathBuf,

        /// Patch list (JSON array file)
        patches: PathBuf,
    },

    /// Dry-run a queue of offline actions against a mock remote
    Plan {
        /// Queued actions (JSON array file)
        queue: PathBuf,

        /// Remote snapshot: last-modified table and failing topics/posts
        #[arg(long)]
        remote: Option<PathBuf>,

        /// Engine configuration (TOML file)
        #[arg(long)]
        config: Option<PathBuf>,

        /// Remote checkpoint to pass to the engine
        #[arg(long)]
        checkpoint: Option<String>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    setup_logging(cli.verbose);

    match cli.command {
        Commands::Diff { old, new } => {
            diff::run(&old, &new).await?;
        }
        Commands::Patch { data, patches } => {
            patch::run(&data, &patches).await?;
        }
        Commands::Plan {
            queue,
            remote,
            config,
            checkpoint,
        } => {
            plan::run(
                &queue,
                remote.as_deref(),
                config.as_deref(),
                checkpoint.as_deref(),
            )
            .await?;
        }
    }

    Ok(())
}

fn setup_logging(verbosity: u8) {
    let filter = match verbosity {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };

    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(filter)),
        )
        .init();
}
