//! Simulation driver
//!
//! Inserts random contacts into a shared [`Router`] from several tasks at once
//! and collects the outcomes into a [`SimulationReport`].

use crate::cli::config::SimulationConfig;
use crate::cli::report::SimulationReport;
use crate::dht::liveness::LivenessCheck;
use crate::dht::node::{Contact, NodeId};
use crate::dht::router::Router;
use crate::dht::routing::RoutingTable;
use anyhow::{Context, Result};
use async_trait::async_trait;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::net::{Ipv4Addr, SocketAddr, SocketAddrV4};
use std::time::{Duration, Instant};
use tracing::{debug, info};

/// Simulated peer that answers with probability `alive_ratio` after `latency`
#[derive(Debug, Clone, Copy)]
pub struct RandomLiveness {
    alive_ratio: f64,
    latency: Duration,
}

impl RandomLiveness {
    /// Create a new simulated checker
    pub fn new(alive_ratio: f64, latency: Duration) -> Self {
        Self {
            alive_ratio: alive_ratio.clamp(0.0, 1.0),
            latency,
        }
    }
}

#[async_trait]
impl LivenessCheck for RandomLiveness {
    async fn is_alive(&self, _contact: &Contact) -> bool {
        let alive = rand::thread_rng().gen_bool(self.alive_ratio);
        if !self.latency.is_zero() {
            tokio::time::sleep(self.latency).await;
        }
        alive
    }
}

/// Generate `count` contacts with random IDs and addresses
pub fn random_contacts<R: Rng>(count: usize, rng: &mut R) -> Vec<Contact> {
    (0..count)
        .map(|_| {
            let id = NodeId::random_with(rng);
            let ip = Ipv4Addr::from(rng.gen::<u32>());
            let port = rng.gen_range(1024..=u16::MAX);
            Contact::new(id, SocketAddr::V4(SocketAddrV4::new(ip, port)))
        })
        .collect()
}

/// Run a simulation described by `config`
pub async fn run_simulation(config: &SimulationConfig) -> Result<SimulationReport> {
    config.validate().context("Invalid simulation configuration")?;

    let mut rng = match config.seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    };
    let contacts = random_contacts(config.contacts, &mut rng);

    let table = RoutingTable::with_config(config.routing.clone())?;
    let router = Router::new(table, RandomLiveness::new(config.alive_ratio, config.ping_latency));

    info!(
        "Inserting {} contacts with {} tasks (k={}, max depth {})",
        contacts.len(),
        config.concurrency,
        config.routing.bucket_size,
        config.routing.max_split_depth
    );

    let started = Instant::now();
    let mut report = insert_all(&router, contacts, config.concurrency).await?;
    report.elapsed_ms = started.elapsed().as_millis() as u64;

    let shared = router.table();
    let table = shared.lock().await;
    let stale = table.stale_buckets(config.routing.stale_after());
    if !stale.is_empty() {
        debug!("{} buckets due for refresh", stale.len());
    }
    report.capture_table(&table);

    info!(
        "Simulation finished: {} stored, {} dropped, {} replaced",
        report.stored,
        report.dropped(),
        report.replaced
    );
    Ok(report)
}

/// Insert `contacts` through `router` from `workers` concurrent tasks
pub async fn insert_all<L>(router: &Router<L>, contacts: Vec<Contact>, workers: usize) -> Result<SimulationReport>
where
    L: LivenessCheck + 'static,
{
    let workers = workers.max(1);
    let mut queues: Vec<Vec<Contact>> = vec![Vec::new(); workers];
    for (i, contact) in contacts.into_iter().enumerate() {
        queues[i % workers].push(contact);
    }

    let mut handles = Vec::with_capacity(workers);
    for (worker, queue) in queues.into_iter().enumerate() {
        let router = router.clone();
        handles.push(tokio::spawn(async move {
            let mut report = SimulationReport::new();
            for contact in queue {
                let outcome = router.insert(contact).await;
                report.record(&outcome);
            }
            debug!("Worker {} finished {} insertions", worker, report.attempted);
            report
        }));
    }

    let mut total = SimulationReport::new();
    for handle in handles {
        let report = handle.await.context("Insertion task failed")?;
        total.merge(&report);
    }
    Ok(total)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dht::config::RoutingConfig;
    use crate::dht::liveness::StaticLiveness;

    fn sim_config(contacts: usize, alive_ratio: f64) -> SimulationConfig {
        SimulationConfig {
            routing: RoutingConfig::new(4, 3),
            contacts,
            alive_ratio,
            ping_latency: Duration::ZERO,
            concurrency: 4,
            seed: Some(42),
            json: false,
            quiet: true,
        }
    }

    #[test]
    fn test_random_contacts_seeded() {
        let a = random_contacts(10, &mut StdRng::seed_from_u64(1));
        let b = random_contacts(10, &mut StdRng::seed_from_u64(1));
        assert_eq!(a.len(), 10);
        let ids_a: Vec<_> = a.iter().map(|c| c.id).collect();
        let ids_b: Vec<_> = b.iter().map(|c| c.id).collect();
        assert_eq!(ids_a, ids_b);
    }

    #[tokio::test]
    async fn test_random_liveness_extremes() {
        let contact = Contact::new(NodeId::random(), "127.0.0.1:6881".parse().unwrap());
        assert!(RandomLiveness::new(1.0, Duration::ZERO).is_alive(&contact).await);
        assert!(!RandomLiveness::new(0.0, Duration::ZERO).is_alive(&contact).await);
    }

    #[tokio::test]
    async fn test_run_simulation_respects_bounds() {
        let config = sim_config(200, 0.5);
        let report = run_simulation(&config).await.unwrap();

        assert_eq!(report.attempted, 200);
        assert_eq!(
            report.stored + report.refreshed + report.replaced + report.dropped(),
            200
        );
        assert!(report.table.max_depth <= 3);
        assert!(report.table.leaf_buckets <= 8);
        assert!(report.table.total_contacts <= 8 * 4);
        assert!(report.buckets.iter().all(|b| b.contacts <= 4));
        assert_eq!(report.table.pending_challenges, 0);
    }

    #[tokio::test]
    async fn test_all_alive_fills_and_keeps_incumbents() {
        let config = sim_config(300, 1.0);
        let report = run_simulation(&config).await.unwrap();

        assert_eq!(report.replaced, 0);
        assert_eq!(report.table.total_contacts, report.stored);
    }

    #[tokio::test]
    async fn test_invalid_config_rejected() {
        let mut config = sim_config(10, 0.5);
        config.concurrency = 0;
        assert!(run_simulation(&config).await.is_err());
    }

    #[tokio::test]
    async fn test_insert_all_counts_every_contact() {
        let router = Router::new(RoutingTable::new(RoutingConfig::default()), StaticLiveness(true));
        let contacts = random_contacts(50, &mut StdRng::seed_from_u64(9));
        let report = insert_all(&router, contacts, 3).await.unwrap();
        assert_eq!(report.attempted, 50);
        assert_eq!(router.len().await, report.stored);
    }
}
