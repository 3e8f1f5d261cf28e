//! CLI arguments module
//!
//! Defines command-line argument parsing using clap.

use clap::Parser;
use std::path::PathBuf;

/// CLI arguments for the routing table simulator
#[derive(Debug, Parser)]
#[command(name = "kademlia-routing")]
#[command(about = "Fill a Kademlia routing table with random peers and report its shape", long_about = None)]
pub struct CliArgs {
    /// JSON routing configuration file
    #[arg(short, long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Number of random contacts to insert
    #[arg(short = 'n', long, default_value_t = 1000)]
    pub contacts: usize,

    /// Contacts per bucket (overrides the config file)
    #[arg(short = 'k', long)]
    pub bucket_size: Option<usize>,

    /// Maximum split depth (overrides the config file)
    #[arg(short = 'd', long)]
    pub max_depth: Option<usize>,

    /// Liveness probe timeout in milliseconds (overrides the config file)
    #[arg(long)]
    pub ping_timeout_ms: Option<u64>,

    /// Probability that a probed contact answers
    #[arg(long, default_value_t = 0.5)]
    pub alive_ratio: f64,

    /// Simulated round-trip time of a probe in milliseconds
    #[arg(long, default_value_t = 5)]
    pub ping_latency_ms: u64,

    /// Number of concurrent inserting tasks
    #[arg(long, default_value_t = 16)]
    pub concurrency: usize,

    /// Seed for identifier generation
    #[arg(long)]
    pub seed: Option<u64>,

    /// Print the report as JSON
    #[arg(long)]
    pub json: bool,

    /// Verbose output
    #[arg(short, long)]
    pub verbose: bool,

    /// Quiet mode (no output except errors and the report)
    #[arg(short, long)]
    pub quiet: bool,
}

impl CliArgs {
    /// Parse CLI arguments from command line
    pub fn parse_args() -> Self {
        Self::parse()
    }

    /// Check if verbose mode is enabled
    pub fn is_verbose(&self) -> bool {
        self.verbose
    }

    /// Check if quiet mode is enabled
    pub fn is_quiet(&self) -> bool {
        self.quiet
    }

    /// Get the log level based on verbosity settings
    pub fn log_level(&self) -> tracing::Level {
        if self.verbose {
            tracing::Level::DEBUG
        } else if self.quiet {
            tracing::Level::ERROR
        } else {
            tracing::Level::INFO
        }
    }
}
