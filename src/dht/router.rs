//! Shared async routing table
//!
//! Wraps a [`RoutingTable`] in a single lock for use from many tasks. Liveness
//! probes run with the lock released, so a slow peer only holds up the one
//! insertion waiting on it. While a probe is in flight its bucket is marked
//! pending and competing newcomers for that bucket are dropped.

use crate::dht::bucket::{Bucket, BucketId};
use crate::dht::liveness::{LivenessCheck, TimeoutLiveness};
use crate::dht::node::{Contact, NodeId};
use crate::dht::routing::{InsertOutcome, InsertStep, RoutingTable, RoutingTableStats};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tracing::debug;

/// Routing table shared between tasks
pub struct Router<L> {
    table: Arc<Mutex<RoutingTable>>,
    liveness: Arc<TimeoutLiveness<L>>,
}

impl<L> Clone for Router<L> {
    fn clone(&self) -> Self {
        Self {
            table: self.table.clone(),
            liveness: self.liveness.clone(),
        }
    }
}

impl<L: LivenessCheck> Router<L> {
    /// Wrap `table`, probing with `liveness` bounded by the table's ping timeout
    pub fn new(table: RoutingTable, liveness: L) -> Self {
        let timeout = table.config().ping_timeout();
        Self {
            table: Arc::new(Mutex::new(table)),
            liveness: Arc::new(TimeoutLiveness::new(liveness, timeout)),
        }
    }

    /// Handle to the underlying table for callers needing several operations under one lock
    pub fn table(&self) -> Arc<Mutex<RoutingTable>> {
        self.table.clone()
    }

    /// Record that `contact` was just observed.
    ///
    /// If this future is dropped while a probe is in flight, the bucket's
    /// challenge is abandoned and a later insertion replaces it once the
    /// challenge ages past twice the ping timeout.
    pub async fn insert(&self, contact: Contact) -> InsertOutcome {
        let step = self.table.lock().await.begin_insert(contact);
        match step {
            InsertStep::Done(outcome) => outcome,
            InsertStep::Challenge(challenge) => {
                let alive = self.liveness.is_alive(challenge.oldest()).await;
                debug!("Challenge of {} resolved: alive={}", challenge.oldest().id, alive);
                self.table.lock().await.complete_eviction(challenge, alive)
            }
        }
    }

    /// Snapshot of the leaf bucket responsible for `id`
    pub async fn find_bucket(&self, id: &NodeId) -> Bucket {
        self.table.lock().await.find_bucket(id).clone()
    }

    /// Contacts of the leaf bucket responsible for `id`
    pub async fn closest_contacts(&self, id: &NodeId) -> Vec<Contact> {
        self.table.lock().await.closest_contacts(id)
    }

    /// Up to `count` contacts ordered by XOR distance to `target`
    pub async fn find_closest(&self, target: &NodeId, count: usize) -> Vec<Contact> {
        self.table.lock().await.find_closest(target, count)
    }

    /// Find a contact by ID
    pub async fn get(&self, id: &NodeId) -> Option<Contact> {
        self.table.lock().await.get(id).cloned()
    }

    /// Remove a contact
    pub async fn remove(&self, id: &NodeId) -> Option<Contact> {
        self.table.lock().await.remove(id)
    }

    /// Number of stored contacts
    pub async fn len(&self) -> usize {
        self.table.lock().await.len()
    }

    /// Whether the table holds no contacts
    pub async fn is_empty(&self) -> bool {
        self.table.lock().await.is_empty()
    }

    /// Leaves whose contacts have not changed for longer than `max_age`
    pub async fn stale_buckets(&self, max_age: Duration) -> Vec<BucketId> {
        self.table.lock().await.stale_buckets(max_age)
    }

    /// Get routing table statistics
    pub async fn stats(&self) -> RoutingTableStats {
        self.table.lock().await.stats()
    }
}
