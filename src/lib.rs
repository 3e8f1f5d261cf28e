//! kademlia-routing
//!
//! A depth-bounded Kademlia routing table with bucket splitting and
//! liveness-driven eviction.

pub mod dht;
pub mod cli;
pub mod error;

pub use error::RoutingError;

pub use dht::{
    Bucket, BucketId, BucketTree, Contact, Distance, DropReason, EvictionChallenge, FnLiveness,
    InsertOutcome, InsertStep, LivenessCheck, NodeId, Router, RoutingConfig, RoutingTable,
    RoutingTableStats, StaticLiveness, TimeoutLiveness, ID_BITS, ID_LENGTH,
};
pub use cli::{run_simulation, CliArgs, ReportDisplay, SimulationConfig, SimulationReport};
