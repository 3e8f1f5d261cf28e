//! CLI configuration module
//!
//! Combines the optional JSON routing config with command-line overrides.

use crate::cli::args::CliArgs;
use crate::dht::config::RoutingConfig;
use anyhow::{Context, Result};
use std::time::Duration;

/// Configuration for a simulation run
#[derive(Debug, Clone)]
pub struct SimulationConfig {
    /// Routing table configuration
    pub routing: RoutingConfig,
    /// Number of random contacts to insert
    pub contacts: usize,
    /// Probability that a probed contact answers
    pub alive_ratio: f64,
    /// Simulated probe round-trip time
    pub ping_latency: Duration,
    /// Number of concurrent inserting tasks
    pub concurrency: usize,
    /// Seed for identifier generation
    pub seed: Option<u64>,
    /// Print the report as JSON
    pub json: bool,
    /// Quiet mode
    pub quiet: bool,
}

impl SimulationConfig {
    /// Create configuration from CLI arguments
    pub fn from_args(args: &CliArgs) -> Result<Self> {
        let mut routing = match &args.config {
            Some(path) => RoutingConfig::from_file(path)
                .with_context(|| format!("Failed to load config from {}", path.display()))?,
            None => RoutingConfig::default(),
        };

        if let Some(bucket_size) = args.bucket_size {
            routing.bucket_size = bucket_size;
        }
        if let Some(max_depth) = args.max_depth {
            routing.max_split_depth = max_depth;
        }
        if let Some(ping_timeout_ms) = args.ping_timeout_ms {
            routing.ping_timeout_ms = ping_timeout_ms;
        }

        Ok(Self {
            routing,
            contacts: args.contacts,
            alive_ratio: args.alive_ratio,
            ping_latency: Duration::from_millis(args.ping_latency_ms),
            concurrency: args.concurrency,
            seed: args.seed,
            json: args.json,
            quiet: args.is_quiet(),
        })
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        self.routing.validate()?;

        if !(0.0..=1.0).contains(&self.alive_ratio) {
            return Err(anyhow::anyhow!("alive_ratio must be between 0 and 1"));
        }

        if self.concurrency == 0 {
            return Err(anyhow::anyhow!("concurrency must be at least 1"));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    #[test]
    fn test_config_from_args() {
        let args = CliArgs::parse_from([
            "kademlia-routing",
            "-k",
            "8",
            "-d",
            "3",
            "--ping-timeout-ms",
            "250",
            "--ping-latency-ms",
            "2",
        ]);
        let config = SimulationConfig::from_args(&args).unwrap();

        assert_eq!(config.routing.bucket_size, 8);
        assert_eq!(config.routing.max_split_depth, 3);
        assert_eq!(config.routing.ping_timeout_ms, 250);
        assert_eq!(config.ping_latency, Duration::from_millis(2));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_validate_alive_ratio() {
        let args = CliArgs::parse_from(["kademlia-routing", "--alive-ratio", "1.5"]);
        let config = SimulationConfig::from_args(&args).unwrap();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_config_validate_routing() {
        let args = CliArgs::parse_from(["kademlia-routing", "-k", "0"]);
        let config = SimulationConfig::from_args(&args).unwrap();
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("bucket_size"));
    }

    #[test]
    fn test_config_quiet_flag() {
        let args = CliArgs::parse_from(["kademlia-routing", "-q", "--json"]);
        let config = SimulationConfig::from_args(&args).unwrap();
        assert!(config.quiet);
        assert!(config.json);
    }

    #[test]
    fn test_config_missing_file() {
        let args = CliArgs::parse_from(["kademlia-routing", "--config", "/nonexistent/routing.json"]);
        assert!(SimulationConfig::from_args(&args).is_err());
    }
}
