//! DHT routing module
//!
//! Implements the Kademlia routing table: identifiers, buckets, the bucket
//! trie, insertion policy and the shared async wrapper.

pub mod node;
pub mod bucket;
pub mod tree;
pub mod config;
pub mod routing;
pub mod liveness;
pub mod router;

// Re-exports for convenience
pub use node::{Contact, Distance, NodeId, ID_BITS, ID_LENGTH};
pub use bucket::{Bucket, BucketId};
pub use tree::{BucketTree, Leaves};
pub use config::RoutingConfig;
pub use routing::{
    DropReason, EvictionChallenge, InsertOutcome, InsertStep, RoutingTable, RoutingTableStats,
};
pub use liveness::{FnLiveness, LivenessCheck, StaticLiveness, TimeoutLiveness};
pub use router::Router;
