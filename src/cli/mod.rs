//! CLI module
//!
//! Command-line simulator for the routing table.

pub mod args;
pub mod config;
pub mod report;
pub mod simulation;

pub use args::CliArgs;
pub use config::SimulationConfig;
pub use report::{BucketSummary, ReportDisplay, SimulationReport};
pub use simulation::{run_simulation, RandomLiveness};
