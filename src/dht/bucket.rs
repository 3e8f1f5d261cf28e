//! Buckets of the routing trie
//!
//! A bucket covers one identifier prefix. Leaves hold contacts ordered from
//! least to most recently seen; internal buckets hold two children and no
//! contacts.

use crate::dht::node::{Contact, NodeId};
use std::time::{Duration, Instant};

/// Handle of a bucket inside a [`BucketTree`](crate::dht::tree::BucketTree) arena
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BucketId(pub(crate) usize);

impl BucketId {
    /// The root bucket of every tree
    pub const ROOT: BucketId = BucketId(0);

    /// Arena index of this bucket
    pub fn index(&self) -> usize {
        self.0
    }
}

/// A bucket in the routing trie
#[derive(Debug, Clone)]
pub struct Bucket {
    /// Number of leading identifier bits fixed for this bucket
    depth: usize,
    /// Identifier carrying this bucket's prefix, remaining bits zero
    prefix: NodeId,
    /// Contacts, oldest first
    contacts: Vec<Contact>,
    /// Bucket this one was split from
    parent: Option<BucketId>,
    /// Left (bit 0) and right (bit 1) children once split
    children: Option<(BucketId, BucketId)>,
    /// When the contact list last changed
    last_changed: Instant,
    /// Token and start time of the in-flight eviction challenge, if any
    pending: Option<(u64, Instant)>,
}

impl Bucket {
    pub(crate) fn new(depth: usize, prefix: NodeId, parent: Option<BucketId>) -> Self {
        Self {
            depth,
            prefix,
            contacts: Vec::new(),
            parent,
            children: None,
            last_changed: Instant::now(),
            pending: None,
        }
    }

    /// Depth of this bucket (0 at the root)
    pub fn depth(&self) -> usize {
        self.depth
    }

    /// Identifier whose first `depth` bits are this bucket's prefix
    pub fn prefix(&self) -> &NodeId {
        &self.prefix
    }

    /// Contacts, ordered from least to most recently seen
    pub fn contacts(&self) -> &[Contact] {
        &self.contacts
    }

    /// Parent bucket, `None` for the root
    pub fn parent(&self) -> Option<BucketId> {
        self.parent
    }

    /// Children as `(left, right)`, `None` for a leaf
    pub fn children(&self) -> Option<(BucketId, BucketId)> {
        self.children
    }

    /// Whether this bucket holds contacts rather than children
    pub fn is_leaf(&self) -> bool {
        self.children.is_none()
    }

    /// Number of contacts in the bucket
    pub fn len(&self) -> usize {
        self.contacts.len()
    }

    /// Whether the bucket holds no contacts
    pub fn is_empty(&self) -> bool {
        self.contacts.is_empty()
    }

    /// Whether the bucket holds at least `capacity` contacts
    pub fn is_full(&self, capacity: usize) -> bool {
        self.contacts.len() >= capacity
    }

    /// When the contact list last changed
    pub fn last_changed(&self) -> Instant {
        self.last_changed
    }

    /// Whether an eviction challenge is in flight
    pub fn is_pending(&self) -> bool {
        self.pending.is_some()
    }

    /// Token of the in-flight eviction challenge
    pub fn challenge_token(&self) -> Option<u64> {
        self.pending.map(|(token, _)| token)
    }

    /// Whether an eviction challenge started less than `max_age` ago
    pub fn has_live_challenge(&self, max_age: Duration) -> bool {
        self.pending
            .map_or(false, |(_, since)| since.elapsed() < max_age)
    }

    /// Whether `id` falls inside this bucket's prefix range
    pub fn covers(&self, id: &NodeId) -> bool {
        id.shares_prefix(&self.prefix, self.depth)
    }

    /// Least recently seen contact
    pub fn oldest(&self) -> Option<&Contact> {
        self.contacts.first()
    }

    /// Most recently seen contact
    pub fn newest(&self) -> Option<&Contact> {
        self.contacts.last()
    }

    /// Position of the contact with `id`
    pub fn position(&self, id: &NodeId) -> Option<usize> {
        self.contacts.iter().position(|c| c.id == *id)
    }

    /// Whether the bucket holds a contact with `id`
    pub fn contains(&self, id: &NodeId) -> bool {
        self.position(id).is_some()
    }

    /// Find a contact by ID
    pub fn find_contact(&self, id: &NodeId) -> Option<&Contact> {
        self.contacts.iter().find(|c| c.id == *id)
    }

    /// Append a contact at the most recently seen end
    pub(crate) fn push(&mut self, contact: Contact) {
        self.contacts.push(contact);
        self.last_changed = Instant::now();
    }

    /// Replace the contact at `pos` with `contact` and move it to the newest end
    pub(crate) fn refresh(&mut self, pos: usize, mut contact: Contact) {
        self.contacts.remove(pos);
        contact.touch();
        self.push(contact);
    }

    /// Move the contact at `pos` to the newest end, keeping its record
    pub(crate) fn promote(&mut self, pos: usize) {
        let mut contact = self.contacts.remove(pos);
        contact.touch();
        self.push(contact);
    }

    /// Remove the contact at `pos`
    pub(crate) fn remove_at(&mut self, pos: usize) -> Contact {
        self.last_changed = Instant::now();
        self.contacts.remove(pos)
    }

    /// Remove a contact by ID
    pub(crate) fn remove(&mut self, id: &NodeId) -> Option<Contact> {
        self.position(id).map(|pos| self.remove_at(pos))
    }

    /// Mark an eviction challenge as in flight, replacing any earlier one
    pub(crate) fn start_challenge(&mut self, token: u64) {
        self.pending = Some((token, Instant::now()));
    }

    /// Clear the challenge marker if `token` is the one in flight
    pub(crate) fn finish_challenge(&mut self, token: u64) -> bool {
        if self.challenge_token() == Some(token) {
            self.pending = None;
            true
        } else {
            false
        }
    }

    /// Turn this leaf into an internal bucket, handing back its contacts
    pub(crate) fn make_internal(&mut self, left: BucketId, right: BucketId) -> Vec<Contact> {
        self.children = Some((left, right));
        self.pending = None;
        self.last_changed = Instant::now();
        std::mem::take(&mut self.contacts)
    }
}
