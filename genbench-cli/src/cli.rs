//! CLI argument parsing definitions

use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Path to configuration file
    #[arg(long, value_name = "PATH", global = true)]
    pub config: Option<PathBuf>,

    /// Set the log level (trace, debug, info, warn, error)
    #[arg(long, value_name = "LEVEL", global = true)]
    pub log_level: Option<String>,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run the benchmark over the endpoint catalog
    Run {
        /// Iterations per endpoint
        #[arg(long, value_name = "N")]
        runs: Option<u32>,

        /// Search budget handed to the tool, in seconds
        #[arg(long, value_name = "SECONDS")]
        budget: Option<u64>,

        /// Results directory
        #[arg(long, value_name = "DIR")]
        output: Option<PathBuf>,

        /// Only benchmark this endpoint
        #[arg(long, value_name = "ID")]
        endpoint: Option<u32>,

        /// Keep runs that already have a complete record
        #[arg(long)]
        skip_existing: bool,

        /// Endpoint catalog (CSV)
        #[arg(long, value_name = "PATH")]
        catalog: Option<PathBuf>,
    },

    /// Run a single (endpoint, iteration) pair
    RunOne {
        /// Endpoint id
        #[arg(long, value_name = "ID")]
        endpoint: u32,

        /// Iteration number
        #[arg(long, value_name = "N")]
        run: u32,

        /// Search budget handed to the tool, in seconds
        #[arg(long, value_name = "SECONDS")]
        budget: Option<u64>,

        /// Results directory
        #[arg(long, value_name = "DIR")]
        output: Option<PathBuf>,
    },

    /// Regenerate reports from an existing results tree
    Report {
        /// Results directory
        #[arg(long, value_name = "DIR")]
        results: Option<PathBuf>,

        /// Merge manual-evaluation.md checklists into benchmark-results.csv
        #[arg(long)]
        merge_manual: bool,
    },

    /// Aggregate per-endpoint metrics from an existing results tree
    Collect {
        /// Results directory
        #[arg(long, value_name = "DIR")]
        results: Option<PathBuf>,
    },

    /// Configuration management commands
    Config {
        #[command(subcommand)]
        config_cmd: ConfigCommands,
    },
}

#[derive(Subcommand)]
pub enum ConfigCommands {
    /// Validate a configuration file
    Validate {
        /// Path to the configuration file
        #[arg(long, value_name = "PATH")]
        config_file: PathBuf,
    },

    /// Generate a sample configuration file
    Generate {
        /// Output file path
        #[arg(long, value_name = "PATH")]
        output: PathBuf,

        /// Overwrite existing file
        #[arg(long)]
        force: bool,
    },

    /// Show current configuration in use
    Show {
        /// Output format: yaml, json
        #[arg(long, value_name = "FORMAT", default_value = "yaml")]
        format: String,
    },
}
