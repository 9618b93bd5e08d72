//! `lidar-mark-terminal` — run from inside an archive/converter batch
//! container to report one item's terminal status back to the catalog.
//! Replaces a hand-interpolated `sqlite3` shell invocation with the same
//! parameterized `Catalog` API the daemon and scanner use.

use clap::{Parser, Subcommand};
use lidar_catalog::Catalog;
use lidar_core::{Clock, ProcessingStatus, SystemClock};
use std::path::PathBuf;
use std::process::ExitCode;

#[derive(Debug, Parser)]
#[command(name = "lidar-mark-terminal")]
struct Cli {
    #[arg(long)]
    db_path: PathBuf,

    #[command(subcommand)]
    target: Target,
}

#[derive(Debug, Subcommand)]
enum Target {
    Folder {
        folder_key: String,
        #[command(subcommand)]
        outcome: Outcome,
    },
    Mission {
        mission_key: String,
        #[command(subcommand)]
        outcome: Outcome,
    },
}

#[derive(Debug, Subcommand)]
enum Outcome {
    Complete {
        #[arg(long, default_value_t = 0)]
        elapsed_s: i64,
    },
    Failed {
        #[arg(long, default_value_t = 0)]
        elapsed_s: i64,
        #[arg(long)]
        error: String,
    },
}

impl Outcome {
    fn into_parts(self) -> (ProcessingStatus, i64, Option<String>) {
        match self {
            Outcome::Complete { elapsed_s } => (ProcessingStatus::Complete, elapsed_s, None),
            Outcome::Failed { elapsed_s, error } => (ProcessingStatus::Failed, elapsed_s, Some(error)),
        }
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    if let Err(err) = run(cli) {
        eprintln!("lidar-mark-terminal: {err}");
        return ExitCode::FAILURE;
    }
    ExitCode::SUCCESS
}

fn run(cli: Cli) -> anyhow::Result<()> {
    let catalog = Catalog::open(&cli.db_path)?;
    let now = SystemClock.epoch_s();

    match cli.target {
        Target::Folder { folder_key, outcome } => {
            let (status, elapsed_s, error) = outcome.into_parts();
            catalog.mark_folder_terminal(&folder_key, status, elapsed_s, error.as_deref(), now)?;
        }
        Target::Mission { mission_key, outcome } => {
            let (status, elapsed_s, error) = outcome.into_parts();
            catalog.mark_mission_terminal(&mission_key, status, elapsed_s, error.as_deref(), now)?;
        }
    }
    Ok(())
}
