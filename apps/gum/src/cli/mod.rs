//! # GUM CLI Module
//!
//! ## Available Commands
//!
//! - `run` - Step a genome, optionally resuming from a run-state file
//! - `validate` - Check a genome document without running it
//! - `inspect` - Show metrics and the state histogram of a run-state file
//! - `hash` - Compute the BLAKE3 fingerprint of a run-state graph

mod commands;

use clap::{CommandFactory, Parser, Subcommand};
use gum_core::GumError;
use std::path::PathBuf;

pub use commands::*;

// =============================================================================
// CLI STRUCTURE
// =============================================================================

/// GUM - Graph Unfolding Machine
///
/// Grows, retags and rewires a graph by applying a rule genome step by step.
#[derive(Parser, Debug)]
#[command(name = "gum")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Log every step
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Suppress banner output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Output in JSON format (for programmatic access)
    #[arg(long, global = true)]
    pub json_mode: bool,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// Available CLI commands.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run a genome for a number of steps
    Run {
        /// Genome document (.json or .toml)
        #[arg(short, long)]
        genome: PathBuf,

        /// Step budget, overriding the genome's max_steps (-1 for unlimited)
        #[arg(short, long, allow_negative_numbers = true)]
        steps: Option<i64>,

        /// Run-state file: loaded when present, written back after the run
        #[arg(short = 'S', long)]
        state: Option<PathBuf>,

        /// Vertex cap, overriding the genome's max_vertices (0 for unlimited)
        #[arg(short, long)]
        max_vertices: Option<usize>,
    },

    /// Validate a genome document
    Validate {
        /// Genome document (.json or .toml)
        #[arg(short, long)]
        genome: PathBuf,
    },

    /// Show metrics of a run-state file
    Inspect {
        /// Run-state file
        #[arg(short = 'S', long)]
        state: PathBuf,
    },

    /// Compute BLAKE3 fingerprint of a run-state graph
    Hash {
        /// Run-state file
        #[arg(short = 'S', long)]
        state: PathBuf,
    },
}

// =============================================================================
// COMMAND EXECUTION
// =============================================================================

/// Execute the CLI with parsed arguments.
pub fn execute(cli: Cli) -> Result<(), GumError> {
    let output = Output {
        json: cli.json_mode,
        verbose: cli.verbose,
    };

    match cli.command {
        Some(Commands::Run {
            genome,
            steps,
            state,
            max_vertices,
        }) => {
            let options = RunOptions {
                steps,
                state,
                max_vertices,
            };
            cmd_run(&genome, &options, output).map(|_| ())
        }
        Some(Commands::Validate { genome }) => cmd_validate(&genome, output),
        Some(Commands::Inspect { state }) => cmd_inspect(&state, output),
        Some(Commands::Hash { state }) => cmd_hash(&state, output),
        None => Cli::command()
            .print_help()
            .map_err(|e| GumError::IoError(e.to_string())),
    }
}
