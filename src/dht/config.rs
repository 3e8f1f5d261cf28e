//! Routing table configuration
//!
//! Bucket capacity, split depth cap and liveness timing. The identifier width
//! is fixed at compile time by [`ID_BITS`].

use crate::dht::node::ID_BITS;
use crate::error::RoutingError;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Default number of contacts per bucket (Kademlia `k`)
pub const DEFAULT_BUCKET_SIZE: usize = 20;

/// Default maximum split depth
pub const DEFAULT_MAX_SPLIT_DEPTH: usize = 5;

/// Default liveness probe timeout in milliseconds
pub const DEFAULT_PING_TIMEOUT_MS: u64 = 5_000;

/// Default age after which a bucket or contact counts as stale (15 minutes)
pub const DEFAULT_STALE_AFTER_SECS: u64 = 900;

/// Configuration for a routing table
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RoutingConfig {
    /// Maximum contacts per leaf bucket
    pub bucket_size: usize,
    /// Maximum depth a bucket may be split to
    pub max_split_depth: usize,
    /// Liveness probe timeout in milliseconds
    pub ping_timeout_ms: u64,
    /// Staleness threshold in seconds
    pub stale_after_secs: u64,
}

impl Default for RoutingConfig {
    fn default() -> Self {
        Self {
            bucket_size: DEFAULT_BUCKET_SIZE,
            max_split_depth: DEFAULT_MAX_SPLIT_DEPTH,
            ping_timeout_ms: DEFAULT_PING_TIMEOUT_MS,
            stale_after_secs: DEFAULT_STALE_AFTER_SECS,
        }
    }
}

impl RoutingConfig {
    /// Create a configuration with the given capacity and depth cap
    pub fn new(bucket_size: usize, max_split_depth: usize) -> Self {
        Self {
            bucket_size,
            max_split_depth,
            ..Self::default()
        }
    }

    /// Load configuration from a JSON file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, RoutingError> {
        let path = path.as_ref();
        let data = std::fs::read_to_string(path).map_err(|e| {
            RoutingError::io_error_full("Failed to read config file", path.display().to_string(), e.to_string())
        })?;
        let config: Self = serde_json::from_str(&data)
            .map_err(|e| RoutingError::from(e).with_context(path.display().to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<(), RoutingError> {
        if self.bucket_size == 0 {
            return Err(RoutingError::config_error_with_field(
                "bucket_size must be at least 1",
                "bucket_size",
            ));
        }

        // An internal bucket at depth `d` routes on bit `d`.
        if self.max_split_depth > ID_BITS {
            return Err(RoutingError::config_error_with_field(
                format!("max_split_depth must not exceed {}", ID_BITS),
                "max_split_depth",
            ));
        }

        if self.ping_timeout_ms == 0 {
            return Err(RoutingError::config_error_with_field(
                "ping_timeout_ms must be greater than 0",
                "ping_timeout_ms",
            ));
        }

        Ok(())
    }

    /// Liveness probe timeout
    pub fn ping_timeout(&self) -> Duration {
        Duration::from_millis(self.ping_timeout_ms)
    }

    /// Staleness threshold
    pub fn stale_after(&self) -> Duration {
        Duration::from_secs(self.stale_after_secs)
    }
}
