//! Report display module
//!
//! Collects insertion outcomes and prints the final table shape.

use crate::dht::routing::{DropReason, InsertOutcome, RoutingTable, RoutingTableStats};
use anyhow::Result;
use serde::Serialize;
use std::io::{self, Write};
use std::time::Duration;

/// One leaf bucket in the report
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BucketSummary {
    /// Prefix bits, most significant first
    pub prefix: String,
    /// Bucket depth
    pub depth: usize,
    /// Stored contacts
    pub contacts: usize,
}

/// Outcome counts and final table shape of a simulation run
#[derive(Debug, Clone, Default, Serialize)]
pub struct SimulationReport {
    /// Insertions attempted
    pub attempted: usize,
    /// New contacts stored
    pub stored: usize,
    /// Known contacts refreshed
    pub refreshed: usize,
    /// Unresponsive contacts evicted for a newcomer
    pub replaced: usize,
    /// Newcomers dropped because the incumbent answered
    pub dropped_incumbent_alive: usize,
    /// Newcomers dropped while a challenge was pending
    pub dropped_challenge_pending: usize,
    /// Newcomers dropped because the bucket refilled during a challenge
    pub dropped_bucket_full: usize,
    /// Wall-clock duration in milliseconds
    pub elapsed_ms: u64,
    /// Final table statistics
    pub table: RoutingTableStats,
    /// Final leaf buckets in prefix order
    pub buckets: Vec<BucketSummary>,
}

impl SimulationReport {
    /// Create an empty report
    pub fn new() -> Self {
        Self::default()
    }

    /// Count one insertion outcome
    pub fn record(&mut self, outcome: &InsertOutcome) {
        self.attempted += 1;
        match outcome {
            InsertOutcome::Stored => self.stored += 1,
            InsertOutcome::Refreshed => self.refreshed += 1,
            InsertOutcome::Replaced { .. } => self.replaced += 1,
            InsertOutcome::Dropped { reason } => match reason {
                DropReason::IncumbentAlive => self.dropped_incumbent_alive += 1,
                DropReason::ChallengePending => self.dropped_challenge_pending += 1,
                DropReason::BucketFull => self.dropped_bucket_full += 1,
            },
        }
    }

    /// Add the counts of another report
    pub fn merge(&mut self, other: &SimulationReport) {
        self.attempted += other.attempted;
        self.stored += other.stored;
        self.refreshed += other.refreshed;
        self.replaced += other.replaced;
        self.dropped_incumbent_alive += other.dropped_incumbent_alive;
        self.dropped_challenge_pending += other.dropped_challenge_pending;
        self.dropped_bucket_full += other.dropped_bucket_full;
    }

    /// Total dropped newcomers
    pub fn dropped(&self) -> usize {
        self.dropped_incumbent_alive + self.dropped_challenge_pending + self.dropped_bucket_full
    }

    /// Fill in the table shape from `table`
    pub fn capture_table(&mut self, table: &RoutingTable) {
        self.table = table.stats();
        self.buckets = table
            .leaves()
            .map(|(_, bucket)| BucketSummary {
                prefix: (0..bucket.depth())
                    .map(|i| if bucket.prefix().bit(i) { '1' } else { '0' })
                    .collect(),
                depth: bucket.depth(),
                contacts: bucket.len(),
            })
            .collect();
    }

    /// Format duration to human readable string
    pub fn format_duration(duration: Duration) -> String {
        let total_ms = duration.as_millis();
        if total_ms >= 1000 {
            format!("{:.2}s", duration.as_secs_f64())
        } else {
            format!("{}ms", total_ms)
        }
    }

    /// Human readable report
    pub fn render(&self) -> String {
        let mut out = String::new();
        out.push_str(&format!(
            "Inserted {} contacts in {}\n",
            self.attempted,
            Self::format_duration(Duration::from_millis(self.elapsed_ms))
        ));
        out.push_str(&format!(
            "  stored: {}  refreshed: {}  replaced: {}  dropped: {}\n",
            self.stored,
            self.refreshed,
            self.replaced,
            self.dropped()
        ));
        if self.dropped() > 0 {
            out.push_str(&format!(
                "  dropped (incumbent alive): {}  (challenge pending): {}  (bucket full): {}\n",
                self.dropped_incumbent_alive, self.dropped_challenge_pending, self.dropped_bucket_full
            ));
        }
        out.push_str(&format!(
            "Table: {} contacts in {} leaves, max depth {}, {} full, {} stale\n",
            self.table.total_contacts,
            self.table.leaf_buckets,
            self.table.max_depth,
            self.table.full_buckets,
            self.table.stale_contacts
        ));
        for bucket in &self.buckets {
            let prefix = if bucket.prefix.is_empty() { "(root)" } else { bucket.prefix.as_str() };
            out.push_str(&format!("  {:<12} depth {:>2}  {:>3} contacts\n", prefix, bucket.depth, bucket.contacts));
        }
        out
    }

    /// Report as pretty-printed JSON
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

/// Writes status lines and the final report to stdout
pub struct ReportDisplay {
    quiet: bool,
    json: bool,
}

impl ReportDisplay {
    /// Create a new display
    pub fn new(quiet: bool, json: bool) -> Self {
        Self { quiet, json }
    }

    /// Print a status line unless quiet or printing JSON
    pub fn print_status(&self, message: &str) -> io::Result<()> {
        if self.quiet || self.json {
            return Ok(());
        }
        let mut stdout = io::stdout();
        writeln!(stdout, "{}", message)?;
        stdout.flush()
    }

    /// Print the final report
    pub fn print_report(&self, report: &SimulationReport) -> Result<()> {
        let mut stdout = io::stdout();
        if self.json {
            writeln!(stdout, "{}", report.to_json()?)?;
        } else {
            write!(stdout, "{}", report.render())?;
        }
        stdout.flush()?;
        Ok(())
    }
}
