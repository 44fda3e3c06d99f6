//! Storyscope command-line launcher
//!
//! Submits media files for analysis as batches, tracks their progress, and
//! lets an operator retry or cancel them. State lives under
//! `$STORYSCOPE_HOME` (default `~/.storyscope`).

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::process::ExitCode;
use storyscope_logging::{init_logging, logs_dir, storyscope_home, LogConfig};

mod cli;
mod config;
mod host;

use cli::session::Session;

/// Shutdown timeout in seconds
const SHUTDOWN_TIMEOUT_SECS: u64 = 10;

#[derive(Parser, Debug)]
#[command(name = "storyscope", about = "Batch media analysis orchestrator")]
struct Cli {
    /// Enable verbose logging (info/debug to stderr)
    #[arg(short = 'v', long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Upload media files as one batch and analyze them
    Submit {
        /// Audio or image files to analyze
        #[arg(required = true)]
        files: Vec<PathBuf>,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Show progress of a batch and each of its files
    Status {
        /// Batch ID
        batch_id: String,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// List all batches
    List {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Reset failed files of a batch and process them again
    Retry {
        /// Batch ID
        batch_id: String,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Cancel a batch; files not yet finished are marked cancelled
    Cancel {
        /// Batch ID
        batch_id: String,
    },
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let home = match storyscope_home() {
        Ok(home) => home,
        Err(err) => {
            eprintln!("{:?}", err);
            return ExitCode::from(1);
        }
    };

    if let Err(err) = init_logging(LogConfig {
        app_name: "storyscope",
        log_dir: logs_dir(&home),
        verbose: cli.verbose,
    }) {
        eprintln!("Warning: failed to initialize logging: {:#}", err);
    }

    match run_command(home, cli.command) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("{:?}", err);
            ExitCode::from(1)
        }
    }
}

fn run_command(home: PathBuf, command: Commands) -> anyhow::Result<()> {
    let session = Session::load(home)?;

    match command {
        Commands::Submit { files, json } => {
            cli::submit::run(&session, cli::submit::SubmitArgs { files, json })
        }
        Commands::Status { batch_id, json } => {
            cli::status::run(&session, cli::status::StatusArgs { batch_id, json })
        }
        Commands::List { json } => cli::list::run(&session, cli::list::ListArgs { json }),
        Commands::Retry { batch_id, json } => {
            cli::retry::run(&session, cli::retry::RetryArgs { batch_id, json })
        }
        Commands::Cancel { batch_id } => {
            cli::cancel::run(&session, cli::cancel::CancelArgs { batch_id })
        }
    }
}
