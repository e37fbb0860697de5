//! Command-line interface definition for Reprolab
//!
//! This module defines the CLI structure using clap's derive API,
//! providing commands for daily summaries, job status and elapsed-time
//! formatting.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Reprolab - reproduction management client
///
/// Fetch or generate a client's daily summary and follow embryo-analysis
/// jobs until they finish.
#[derive(Parser, Debug, Clone)]
#[command(name = "reprolab")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Path to configuration file
    #[arg(short, long, default_value = "config/config.yaml")]
    pub config: String,

    /// Enable verbose logging
    #[arg(short, long)]
    pub verbose: bool,

    /// Command to execute
    #[command(subcommand)]
    pub command: Commands,
}

/// Available commands for Reprolab
#[derive(Subcommand, Debug, Clone)]
pub enum Commands {
    /// Show today's summary for a client, generating it on a cache miss
    Summary {
        /// Client identifier
        #[arg(long)]
        client: String,

        /// Human-readable client name (defaults to the identifier)
        #[arg(long)]
        name: Option<String>,

        /// JSON file with the context bundle (receptoras, proximos_servicos, ...)
        #[arg(long)]
        context: Option<PathBuf>,

        /// Print the result as JSON
        #[arg(long)]
        json: bool,
    },

    /// Inspect embryo-analysis jobs
    Job {
        /// Job subcommand
        #[command(subcommand)]
        command: JobCommand,
    },

    /// Format a number of seconds as M:SS
    Elapsed {
        /// Seconds to format
        seconds: u64,
    },
}

/// Job subcommands
#[derive(Subcommand, Debug, Clone)]
pub enum JobCommand {
    /// Poll a job until it completes or fails
    Watch {
        /// Queue entry identifier
        id: String,
    },

    /// Fetch a job's current status once
    Status {
        /// Queue entry identifier
        id: String,

        /// Print the record as JSON
        #[arg(long)]
        json: bool,
    },
}

impl Cli {
    /// Parse command line arguments
    pub fn parse_args() -> Self {
        Self::parse()
    }
}

impl Default for Cli {
    fn default() -> Self {
        Self {
            config: "config/config.yaml".to_string(),
            verbose: false,
            command: Commands::Elapsed { seconds: 0 },
        }
    }
}
