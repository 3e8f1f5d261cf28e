//! DHT routing table module
//!
//! A depth-bounded binary trie of k-buckets. Full buckets split until the
//! configured maximum depth; beyond that, a full bucket challenges its oldest
//! contact with a liveness probe and keeps whichever peer proves alive.

use crate::dht::bucket::{Bucket, BucketId};
use crate::dht::config::RoutingConfig;
use crate::dht::node::{Contact, NodeId};
use crate::dht::tree::BucketTree;
use crate::error::RoutingError;
use rand::Rng;
use serde::Serialize;
use std::time::Duration;
use tracing::{debug, info, trace, warn};

/// Why a contact was not stored
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum DropReason {
    /// The bucket's oldest contact answered the liveness probe
    IncumbentAlive,
    /// Another eviction challenge on the same bucket is in flight
    ChallengePending,
    /// The bucket filled up again while the challenge was in flight
    BucketFull,
}

/// Result of an insertion
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InsertOutcome {
    /// The contact was new and appended to a bucket
    Stored,
    /// The contact was already known and moved to the most recently seen end
    Refreshed,
    /// An unresponsive contact was evicted to make room
    Replaced { evicted: Contact },
    /// The contact was not stored
    Dropped { reason: DropReason },
}

impl InsertOutcome {
    /// Whether the contact is in the table after the insertion
    pub fn is_stored(&self) -> bool {
        !matches!(self, InsertOutcome::Dropped { .. })
    }
}

/// A pending decision between a full bucket's oldest contact and a newcomer.
///
/// Produced by [`RoutingTable::begin_insert`]; the caller probes
/// [`oldest`](Self::oldest) and hands the result to
/// [`RoutingTable::complete_eviction`]. The bucket stays marked pending until
/// then.
#[derive(Debug, Clone)]
#[must_use = "an eviction challenge must be completed or the bucket stays pending"]
pub struct EvictionChallenge {
    bucket: BucketId,
    token: u64,
    oldest: Contact,
    candidate: Contact,
}

impl EvictionChallenge {
    /// Bucket under challenge
    pub fn bucket(&self) -> BucketId {
        self.bucket
    }

    /// Contact to probe
    pub fn oldest(&self) -> &Contact {
        &self.oldest
    }

    /// Contact waiting for a slot
    pub fn candidate(&self) -> &Contact {
        &self.candidate
    }
}

/// First phase of an insertion
#[derive(Debug, Clone)]
pub enum InsertStep {
    /// The insertion finished without needing a liveness probe
    Done(InsertOutcome),
    /// The target bucket is full at maximum depth
    Challenge(EvictionChallenge),
}

/// Routing table statistics
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RoutingTableStats {
    /// Contacts across all leaves
    pub total_contacts: usize,
    /// Number of leaf buckets
    pub leaf_buckets: usize,
    /// Deepest leaf
    pub max_depth: usize,
    /// Leaves holding `bucket_size` contacts
    pub full_buckets: usize,
    /// Leaves with an eviction challenge in flight
    pub pending_challenges: usize,
    /// Contacts not seen within `stale_after_secs`
    pub stale_contacts: usize,
}

/// Kademlia routing table
#[derive(Debug, Clone)]
pub struct RoutingTable {
    config: RoutingConfig,
    tree: BucketTree,
    next_challenge: u64,
}

impl RoutingTable {
    /// Create a routing table from an already validated configuration
    pub fn new(config: RoutingConfig) -> Self {
        info!(
            "Creating routing table (bucket_size={}, max_split_depth={})",
            config.bucket_size, config.max_split_depth
        );
        Self {
            config,
            tree: BucketTree::new(),
            next_challenge: 0,
        }
    }

    /// Validate `config` and create a routing table
    pub fn with_config(config: RoutingConfig) -> Result<Self, RoutingError> {
        config.validate()?;
        Ok(Self::new(config))
    }

    /// Table configuration
    pub fn config(&self) -> &RoutingConfig {
        &self.config
    }

    /// Underlying bucket trie
    pub fn tree(&self) -> &BucketTree {
        &self.tree
    }

    /// Get a bucket by handle
    pub fn bucket(&self, id: BucketId) -> Option<&Bucket> {
        self.tree.get(id)
    }

    /// Handle of the leaf responsible for `id`
    pub fn find_bucket_id(&self, id: &NodeId) -> BucketId {
        self.tree.locate(id)
    }

    /// Leaf bucket responsible for `id`
    pub fn find_bucket(&self, id: &NodeId) -> &Bucket {
        &self.tree[self.tree.locate(id)]
    }

    /// Contacts of the leaf responsible for `id`, oldest first.
    ///
    /// Only that single bucket is consulted; see [`find_closest`](Self::find_closest)
    /// for a distance-ordered view across the whole table.
    pub fn closest_contacts(&self, id: &NodeId) -> Vec<Contact> {
        self.find_bucket(id).contacts().to_vec()
    }

    /// Up to `count` contacts ordered by XOR distance to `target`
    pub fn find_closest(&self, target: &NodeId, count: usize) -> Vec<Contact> {
        let mut all: Vec<Contact> = self.contacts().cloned().collect();
        all.sort_by_key(|c| c.distance_to(target));
        all.truncate(count);
        all
    }

    /// Record that `contact` was just observed.
    ///
    /// `is_alive` is only called when the target bucket is full at maximum
    /// depth; it receives the bucket's oldest contact.
    pub fn insert<F>(&mut self, contact: Contact, is_alive: F) -> InsertOutcome
    where
        F: FnOnce(&Contact) -> bool,
    {
        match self.begin_insert(contact) {
            InsertStep::Done(outcome) => outcome,
            InsertStep::Challenge(challenge) => {
                let alive = is_alive(challenge.oldest());
                self.complete_eviction(challenge, alive)
            }
        }
    }

    /// Insert as far as possible without a liveness probe.
    ///
    /// Splits full buckets below the maximum depth. When the target bucket is
    /// full at maximum depth, marks it pending and returns a challenge.
    pub fn begin_insert(&mut self, contact: Contact) -> InsertStep {
        let capacity = self.config.bucket_size;
        let max_depth = self.config.max_split_depth;
        let mut bucket_id = self.tree.locate(&contact.id);

        // Each pass descends one level, so this runs at most `max_depth` times.
        while self.tree[bucket_id].depth() < max_depth
            && self.tree[bucket_id].is_full(capacity)
            && !self.tree[bucket_id].contains(&contact.id)
        {
            let depth = self.tree[bucket_id].depth();
            let (left, right) = self.tree.split(bucket_id);
            bucket_id = if contact.id.bit(depth) { right } else { left };
        }

        let challenge_timeout = self.challenge_timeout();
        let token = self.next_challenge;
        let bucket = self.tree.get_mut(bucket_id);

        if let Some(pos) = bucket.position(&contact.id) {
            trace!("Refreshed contact {}", contact.id);
            bucket.refresh(pos, contact);
            return InsertStep::Done(InsertOutcome::Refreshed);
        }

        if bucket.len() < capacity {
            trace!("Stored contact {} at depth {}", contact.id, bucket.depth());
            bucket.push(contact);
            return InsertStep::Done(InsertOutcome::Stored);
        }

        if bucket.has_live_challenge(challenge_timeout) {
            debug!("Dropping contact {}: challenge pending on bucket {}", contact.id, bucket_id.index());
            return InsertStep::Done(InsertOutcome::Dropped {
                reason: DropReason::ChallengePending,
            });
        }
        if bucket.is_pending() {
            warn!("Abandoning stale eviction challenge on bucket {}", bucket_id.index());
        }

        let oldest = match bucket.oldest() {
            Some(oldest) => oldest.clone(),
            None => {
                bucket.push(contact);
                return InsertStep::Done(InsertOutcome::Stored);
            }
        };

        debug!(
            "Bucket {} full at depth {}, challenging {} for {}",
            bucket_id.index(),
            bucket.depth(),
            oldest.id,
            contact.id
        );
        bucket.start_challenge(token);
        self.next_challenge += 1;
        InsertStep::Challenge(EvictionChallenge {
            bucket: bucket_id,
            token,
            oldest,
            candidate: contact,
        })
    }

    /// Apply the liveness result of a challenge from [`begin_insert`](Self::begin_insert).
    ///
    /// The bucket is re-checked first, since other operations may have run
    /// while the probe was in flight. Only the challenge currently marked on
    /// the bucket may evict, and only while its contact is still the oldest;
    /// a contact refreshed mid-probe counts as alive.
    pub fn complete_eviction(&mut self, challenge: EvictionChallenge, alive: bool) -> InsertOutcome {
        let EvictionChallenge {
            bucket: bucket_id,
            token,
            oldest,
            candidate,
        } = challenge;
        let capacity = self.config.bucket_size;
        let bucket = self.tree.get_mut(bucket_id);
        let current = bucket.finish_challenge(token);

        if let Some(pos) = bucket.position(&candidate.id) {
            bucket.refresh(pos, candidate);
            return InsertOutcome::Refreshed;
        }

        if bucket.len() < capacity {
            bucket.push(candidate);
            return InsertOutcome::Stored;
        }

        if !current {
            debug!("Challenge on bucket {} was superseded, dropping {}", bucket_id.index(), candidate.id);
            return InsertOutcome::Dropped {
                reason: DropReason::ChallengePending,
            };
        }

        match (bucket.position(&oldest.id), alive) {
            (Some(0), true) => {
                debug!("Contact {} is alive, dropping {}", oldest.id, candidate.id);
                bucket.promote(0);
                InsertOutcome::Dropped {
                    reason: DropReason::IncumbentAlive,
                }
            }
            (Some(0), false) => {
                let evicted = bucket.remove_at(0);
                debug!("Evicted unresponsive contact {} for {}", evicted.id, candidate.id);
                bucket.push(candidate);
                InsertOutcome::Replaced { evicted }
            }
            (Some(_), _) => {
                debug!("Contact {} was seen during its challenge, dropping {}", oldest.id, candidate.id);
                InsertOutcome::Dropped {
                    reason: DropReason::IncumbentAlive,
                }
            }
            (None, _) => InsertOutcome::Dropped {
                reason: DropReason::BucketFull,
            },
        }
    }

    /// Find a contact by ID
    pub fn get(&self, id: &NodeId) -> Option<&Contact> {
        self.find_bucket(id).find_contact(id)
    }

    /// Whether a contact with `id` is stored
    pub fn contains(&self, id: &NodeId) -> bool {
        self.get(id).is_some()
    }

    /// Remove a contact from the routing table
    pub fn remove(&mut self, id: &NodeId) -> Option<Contact> {
        let bucket_id = self.tree.locate(id);
        let removed = self.tree.get_mut(bucket_id).remove(id);
        if removed.is_some() {
            debug!("Removed contact {}", id);
        }
        removed
    }

    /// Get the number of contacts in the routing table
    pub fn len(&self) -> usize {
        self.tree.leaves().map(|(_, b)| b.len()).sum()
    }

    /// Whether the table holds no contacts
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// All stored contacts, leaf by leaf in prefix order
    pub fn contacts(&self) -> impl Iterator<Item = &Contact> {
        self.tree.leaves().flat_map(|(_, b)| b.contacts().iter())
    }

    /// Leaf buckets in prefix order
    pub fn leaves(&self) -> impl Iterator<Item = (BucketId, &Bucket)> {
        self.tree.leaves()
    }

    /// Maximum leaf depth
    pub fn depth(&self) -> usize {
        self.tree.max_depth()
    }

    /// Leaves whose contacts have not changed for longer than `max_age`
    pub fn stale_buckets(&self, max_age: Duration) -> Vec<BucketId> {
        self.tree
            .leaves()
            .filter(|(_, b)| b.last_changed().elapsed() > max_age)
            .map(|(id, _)| id)
            .collect()
    }

    /// Random identifier inside the prefix range of `bucket`, used as a refresh lookup target
    pub fn refresh_target<R: Rng>(&self, bucket: BucketId, rng: &mut R) -> Option<NodeId> {
        self.tree
            .get(bucket)
            .map(|b| b.prefix().random_in_prefix(b.depth(), rng))
    }

    /// Get routing table statistics
    pub fn stats(&self) -> RoutingTableStats {
        let mut stats = RoutingTableStats::default();
        for (_, bucket) in self.tree.leaves() {
            stats.total_contacts += bucket.len();
            stats.leaf_buckets += 1;
            stats.max_depth = stats.max_depth.max(bucket.depth());
            if bucket.is_full(self.config.bucket_size) {
                stats.full_buckets += 1;
            }
            if bucket.is_pending() {
                stats.pending_challenges += 1;
            }
            stats.stale_contacts += bucket
                .contacts()
                .iter()
                .filter(|c| !c.is_good(self.config.stale_after()))
                .count();
        }
        stats
    }

    // A challenge older than this is treated as abandoned.
    fn challenge_timeout(&self) -> Duration {
        self.config.ping_timeout() * 2
    }
}
