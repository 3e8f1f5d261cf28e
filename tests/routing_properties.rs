//! Randomized checks of routing table invariants over long insertion sequences.

use kademlia_routing::{Contact, InsertOutcome, NodeId, RoutingConfig, RoutingTable, ID_BITS};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::cell::Cell;
use std::collections::HashSet;

const SEEDS: [u64; 6] = [1, 7, 42, 1337, 2024, 99_999];

fn contact(id: NodeId) -> Contact {
    Contact::new(id, "127.0.0.1:6881".parse().unwrap())
}

fn id_pool(rng: &mut StdRng, size: usize) -> Vec<NodeId> {
    (0..size).map(|_| NodeId::random_with(rng)).collect()
}

fn assert_structure(table: &RoutingTable) {
    let config = table.config();
    let mut seen = HashSet::new();
    for (_, bucket) in table.leaves() {
        assert!(bucket.len() <= config.bucket_size, "bucket over capacity");
        assert!(bucket.depth() <= config.max_split_depth, "leaf deeper than max_split_depth");
        for c in bucket.contacts() {
            assert!(bucket.covers(&c.id), "contact outside bucket prefix");
            assert!(seen.insert(c.id), "contact stored twice");
        }
        for pair in bucket.contacts().windows(2) {
            assert!(pair[0].last_seen <= pair[1].last_seen, "bucket not ordered oldest first");
        }
    }
    assert_eq!(seen.len(), table.len());
}

#[test]
fn test_random_insertions_keep_invariants() {
    for seed in SEEDS {
        let mut rng = StdRng::seed_from_u64(seed);
        let bucket_size = rng.gen_range(1..=4);
        let max_depth = rng.gen_range(0..=5);
        let mut table = RoutingTable::new(RoutingConfig::new(bucket_size, max_depth));
        let pool = id_pool(&mut rng, 80);

        for _ in 0..600 {
            let id = pool[rng.gen_range(0..pool.len())];
            let was_present = table.contains(&id);
            let len_before = table.len();
            let alive = rng.gen_bool(0.5);
            let probed = Cell::new(false);

            let outcome = table.insert(contact(id), |_| {
                probed.set(true);
                alive
            });

            match &outcome {
                InsertOutcome::Stored => {
                    assert!(!was_present);
                    assert_eq!(table.len(), len_before + 1);
                }
                InsertOutcome::Refreshed => {
                    assert!(was_present);
                    assert_eq!(table.len(), len_before);
                    assert_eq!(table.find_bucket(&id).newest().map(|c| c.id), Some(id));
                }
                InsertOutcome::Replaced { evicted } => {
                    assert!(probed.get() && !alive);
                    assert!(!table.contains(&evicted.id));
                    assert_eq!(table.len(), len_before);
                }
                InsertOutcome::Dropped { .. } => {
                    assert!(probed.get() && alive);
                    assert!(!table.contains(&id));
                    assert_eq!(table.len(), len_before);
                }
            }

            if outcome.is_stored() {
                assert!(table.contains(&id));
                assert!(table.find_bucket(&id).contains(&id));
            }
            if probed.get() {
                // Probes only happen once splitting is exhausted.
                assert_eq!(table.find_bucket(&id).depth(), max_depth);
                assert!(!was_present);
            }
            assert_eq!(table.stats().pending_challenges, 0);
        }

        assert_structure(&table);
    }
}

#[test]
fn test_leaves_partition_identifier_space() {
    for seed in SEEDS {
        let mut rng = StdRng::seed_from_u64(seed);
        let mut table = RoutingTable::new(RoutingConfig::new(2, 6));
        for id in id_pool(&mut rng, 200) {
            table.insert(contact(id), |_| true);
        }

        let leaves: Vec<_> = table.leaves().map(|(_, b)| b.clone()).collect();
        for _ in 0..200 {
            let probe = NodeId::random_with(&mut rng);
            let covering = leaves.iter().filter(|b| b.covers(&probe)).count();
            assert_eq!(covering, 1, "every identifier has exactly one leaf");
            assert!(table.find_bucket(&probe).covers(&probe));
        }

        // Prefix order: each leaf's prefix sorts after the previous one.
        for pair in leaves.windows(2) {
            assert!(pair[0].prefix() < pair[1].prefix());
        }
        assert!(table.depth() <= 6);
        assert!(table.depth() < ID_BITS);
        assert_structure(&table);
    }
}

#[test]
fn test_everything_fits_before_max_depth() {
    // 2^depth leaves of k contacts each hold any identifiers that spread evenly.
    let mut table = RoutingTable::new(RoutingConfig::new(1, 3));
    for prefix in 0u8..8 {
        let mut id = [0u8; 20];
        id[0] = prefix << 5;
        let outcome = table.insert(contact(NodeId::new(id)), |_| panic!("no probe expected"));
        assert_eq!(outcome, InsertOutcome::Stored);
    }
    assert_eq!(table.len(), 8);
    assert_eq!(table.leaves().count(), 8);
    assert!(table.leaves().all(|(_, b)| b.depth() == 3 && b.len() == 1));
}

#[test]
fn test_dead_contacts_drain_out() {
    let mut rng = StdRng::seed_from_u64(5);
    let mut table = RoutingTable::new(RoutingConfig::new(3, 0));
    let first: Vec<NodeId> = id_pool(&mut rng, 3);
    for id in &first {
        table.insert(contact(*id), |_| true);
    }

    // Every challenge against a dead incumbent replaces it, oldest first.
    for id in id_pool(&mut rng, 3) {
        let outcome = table.insert(contact(id), |_| false);
        assert!(matches!(outcome, InsertOutcome::Replaced { .. }));
    }
    assert!(first.iter().all(|id| !table.contains(id)));
    assert_eq!(table.len(), 3);
}

#[test]
fn test_find_closest_matches_brute_force() {
    let mut rng = StdRng::seed_from_u64(11);
    let mut table = RoutingTable::new(RoutingConfig::new(4, 5));
    for id in id_pool(&mut rng, 100) {
        table.insert(contact(id), |_| true);
    }

    for _ in 0..20 {
        let target = NodeId::random_with(&mut rng);
        let mut expected: Vec<NodeId> = table.contacts().map(|c| c.id).collect();
        expected.sort_by_key(|id| id.distance(&target));
        expected.truncate(8);

        let found: Vec<NodeId> = table.find_closest(&target, 8).into_iter().map(|c| c.id).collect();
        assert_eq!(found, expected);
    }
}
