//! Binary trie of buckets
//!
//! Buckets live in an arena indexed by [`BucketId`]. Child links are owning
//! indices and the parent link is a plain back-index, so the tree has no
//! reference cycles. Buckets are only ever split, never merged.

use crate::dht::bucket::{Bucket, BucketId};
use crate::dht::node::{NodeId, ID_BITS, ID_LENGTH};
use std::ops::Index;
use tracing::{debug, trace};

/// Arena-backed bucket trie
#[derive(Debug, Clone)]
pub struct BucketTree {
    buckets: Vec<Bucket>,
}

impl BucketTree {
    /// Create a tree holding a single empty root leaf
    pub fn new() -> Self {
        Self {
            buckets: vec![Bucket::new(0, NodeId::new([0u8; ID_LENGTH]), None)],
        }
    }

    /// Handle of the root bucket
    pub fn root(&self) -> BucketId {
        BucketId::ROOT
    }

    /// Get a bucket by handle
    pub fn get(&self, id: BucketId) -> Option<&Bucket> {
        self.buckets.get(id.0)
    }

    pub(crate) fn get_mut(&mut self, id: BucketId) -> &mut Bucket {
        &mut self.buckets[id.0]
    }

    /// Total number of buckets, leaves and internal
    pub fn len(&self) -> usize {
        self.buckets.len()
    }

    /// Whether the arena holds no buckets
    pub fn is_empty(&self) -> bool {
        self.buckets.is_empty()
    }

    /// Descend from the root to the leaf responsible for `target`.
    ///
    /// At each internal bucket the bit of `target` at the bucket's depth picks
    /// the child: 0 goes left, 1 goes right.
    pub fn locate(&self, target: &NodeId) -> BucketId {
        let mut current = self.root();
        while let Some((left, right)) = self[current].children() {
            current = if target.bit(self[current].depth()) { right } else { left };
        }
        trace!("Located bucket {} at depth {} for {}", current.0, self[current].depth(), target);
        current
    }

    /// Split a leaf into two children by the bit at its depth.
    ///
    /// Contacts keep their relative order within each child.
    ///
    /// # Panics
    /// Panics if `id` is not a leaf or its depth already equals `ID_BITS`.
    pub fn split(&mut self, id: BucketId) -> (BucketId, BucketId) {
        let (depth, prefix) = {
            let bucket = &self[id];
            assert!(bucket.is_leaf(), "cannot split internal bucket {}", id.0);
            assert!(bucket.depth() < ID_BITS, "cannot split bucket past identifier length");
            (bucket.depth(), *bucket.prefix())
        };

        let left = BucketId(self.buckets.len());
        let right = BucketId(self.buckets.len() + 1);
        let mut left_bucket = Bucket::new(depth + 1, prefix.with_bit(depth, false), Some(id));
        let mut right_bucket = Bucket::new(depth + 1, prefix.with_bit(depth, true), Some(id));

        for contact in self.get_mut(id).make_internal(left, right) {
            if contact.id.bit(depth) {
                right_bucket.push(contact);
            } else {
                left_bucket.push(contact);
            }
        }

        debug!(
            "Split bucket {} at depth {}: {} left, {} right",
            id.0,
            depth,
            left_bucket.len(),
            right_bucket.len()
        );

        self.buckets.push(left_bucket);
        self.buckets.push(right_bucket);
        (left, right)
    }

    /// Leaf buckets in prefix order, left to right
    pub fn leaves(&self) -> Leaves<'_> {
        Leaves {
            tree: self,
            stack: vec![self.root()],
        }
    }

    /// Maximum depth over all leaves
    pub fn max_depth(&self) -> usize {
        self.leaves().map(|(_, b)| b.depth()).max().unwrap_or(0)
    }
}

impl Default for BucketTree {
    fn default() -> Self {
        Self::new()
    }
}

impl Index<BucketId> for BucketTree {
    type Output = Bucket;

    fn index(&self, id: BucketId) -> &Bucket {
        &self.buckets[id.0]
    }
}

/// Iterator over leaf buckets in prefix order
pub struct Leaves<'a> {
    tree: &'a BucketTree,
    stack: Vec<BucketId>,
}

impl<'a> Iterator for Leaves<'a> {
    type Item = (BucketId, &'a Bucket);

    fn next(&mut self) -> Option<Self::Item> {
        while let Some(id) = self.stack.pop() {
            let bucket = &self.tree[id];
            match bucket.children() {
                Some((left, right)) => {
                    self.stack.push(right);
                    self.stack.push(left);
                }
                None => return Some((id, bucket)),
            }
        }
        None
    }
}
