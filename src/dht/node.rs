//! Node identifiers and contacts
//!
//! Fixed-width identifiers with MSB-first bit indexing and XOR distance, and
//! the contact record the routing table stores for every known peer.

use crate::error::RoutingError;
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::net::SocketAddr;
use std::time::{Duration, Instant};

/// Identifier length in bytes
pub const ID_LENGTH: usize = 20;

/// Identifier length in bits
pub const ID_BITS: usize = ID_LENGTH * 8;

/// Node identifier (160 bits)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct NodeId(pub [u8; ID_LENGTH]);

impl NodeId {
    /// Create a new NodeId from bytes
    pub fn new(id: [u8; ID_LENGTH]) -> Self {
        Self(id)
    }

    /// Generate a random NodeId
    pub fn random() -> Self {
        Self::random_with(&mut rand::thread_rng())
    }

    /// Generate a random NodeId from the given generator
    pub fn random_with<R: Rng>(rng: &mut R) -> Self {
        let mut id = [0u8; ID_LENGTH];
        rng.fill(&mut id[..]);
        Self(id)
    }

    /// Build a NodeId from a byte slice of exactly `ID_LENGTH` bytes
    pub fn from_slice(bytes: &[u8]) -> Result<Self, RoutingError> {
        let id: [u8; ID_LENGTH] = bytes.try_into().map_err(|_| {
            RoutingError::validation_error_with_field(
                format!("expected {} bytes, got {}", ID_LENGTH, bytes.len()),
                "node_id",
            )
        })?;
        Ok(Self(id))
    }

    /// Get the NodeId as bytes
    pub fn as_bytes(&self) -> &[u8; ID_LENGTH] {
        &self.0
    }

    /// Get the NodeId as a hex string
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    /// Parse a NodeId from a hex string
    pub fn from_hex(hex_str: &str) -> Result<Self, RoutingError> {
        let bytes = hex::decode(hex_str)?;
        Self::from_slice(&bytes)
    }

    /// Bit at `index`, counting from the most significant bit of byte 0.
    ///
    /// # Panics
    /// Panics if `index >= ID_BITS`.
    pub fn bit(&self, index: usize) -> bool {
        assert!(
            index < ID_BITS,
            "bit index {} out of range for {}-bit identifier",
            index,
            ID_BITS
        );
        (self.0[index / 8] >> (7 - (index % 8))) & 1 == 1
    }

    /// Return a copy with the bit at `index` set to `value`
    pub fn with_bit(mut self, index: usize, value: bool) -> Self {
        assert!(index < ID_BITS, "bit index {} out of range", index);
        let mask = 1u8 << (7 - (index % 8));
        if value {
            self.0[index / 8] |= mask;
        } else {
            self.0[index / 8] &= !mask;
        }
        self
    }

    /// XOR distance to another identifier
    pub fn distance(&self, other: &NodeId) -> Distance {
        let mut distance = [0u8; ID_LENGTH];
        for (d, (a, b)) in distance.iter_mut().zip(self.0.iter().zip(other.0.iter())) {
            *d = a ^ b;
        }
        Distance(distance)
    }

    /// Whether the first `len` bits of `self` and `other` agree
    pub fn shares_prefix(&self, other: &NodeId, len: usize) -> bool {
        (0..len).all(|i| self.bit(i) == other.bit(i))
    }

    /// Random identifier whose first `len` bits equal those of `self`
    pub fn random_in_prefix<R: Rng>(&self, len: usize, rng: &mut R) -> Self {
        let mut id = Self::random_with(rng);
        for i in 0..len {
            id = id.with_bit(i, self.bit(i));
        }
        id
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_hex())
    }
}

/// XOR distance between two identifiers.
///
/// Byte-wise ordering of the big-endian array is the unsigned integer ordering.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Distance(pub [u8; ID_LENGTH]);

/// A known peer
#[derive(Debug, Clone)]
pub struct Contact {
    /// Node identifier
    pub id: NodeId,
    /// Transport address, opaque to the routing table
    pub addr: SocketAddr,
    /// When the peer was last observed
    pub last_seen: Instant,
}

impl Contact {
    /// Create a new contact
    pub fn new(id: NodeId, addr: SocketAddr) -> Self {
        Self {
            id,
            addr,
            last_seen: Instant::now(),
        }
    }

    /// XOR distance to an identifier
    pub fn distance_to(&self, other: &NodeId) -> Distance {
        self.id.distance(other)
    }

    /// Whether the contact was seen within `max_age`
    pub fn is_good(&self, max_age: Duration) -> bool {
        self.last_seen.elapsed() < max_age
    }

    /// Update last seen timestamp
    pub fn touch(&mut self) {
        self.last_seen = Instant::now();
    }
}

impl PartialEq for Contact {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for Contact {}

impl std::hash::Hash for Contact {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_node_id_random() {
        let id1 = NodeId::random();
        let id2 = NodeId::random();
        assert_ne!(id1, id2);
    }

    #[test]
    fn test_node_id_hex_roundtrip() {
        let id = NodeId::new([0xABu8; ID_LENGTH]);
        let hex_str = id.to_hex();
        assert_eq!(hex_str.len(), 40);
        assert_eq!(NodeId::from_hex(&hex_str).unwrap(), id);
    }

    #[test]
    fn test_node_id_from_hex_wrong_length() {
        let err = NodeId::from_hex("abcd").unwrap_err();
        assert!(matches!(err, RoutingError::ValidationError { .. }));
        assert!(err.to_string().contains("expected 20 bytes, got 2"));
    }

    #[test]
    fn test_node_id_from_hex_invalid_digits() {
        assert!(NodeId::from_hex(&"zz".repeat(20)).is_err());
    }

    #[test]
    fn test_node_id_from_slice() {
        assert!(NodeId::from_slice(&[1u8; 20]).is_ok());
        assert!(NodeId::from_slice(&[1u8; 19]).is_err());
        assert!(NodeId::from_slice(&[1u8; 21]).is_err());
    }

    #[test]
    fn test_bit_msb_first() {
        let mut bytes = [0u8; ID_LENGTH];
        bytes[0] = 0b1010_0000;
        bytes[19] = 0b0000_0001;
        let id = NodeId::new(bytes);
        assert!(id.bit(0));
        assert!(!id.bit(1));
        assert!(id.bit(2));
        assert!(!id.bit(3));
        assert!(id.bit(159));
        assert!(!id.bit(158));
    }

    #[test]
    #[should_panic(expected = "out of range")]
    fn test_bit_out_of_range_panics() {
        NodeId::new([0u8; ID_LENGTH]).bit(ID_BITS);
    }

    #[test]
    fn test_with_bit() {
        let id = NodeId::new([0u8; ID_LENGTH]).with_bit(9, true);
        assert_eq!(id.0[1], 0b0100_0000);
        assert!(!id.with_bit(9, false).bit(9));
    }

    #[test]
    fn test_distance_ordering() {
        let target = NodeId::new([0xFFu8; ID_LENGTH]);
        let near = NodeId::new([0xF0u8; ID_LENGTH]);
        let far = NodeId::new([0x0Fu8; ID_LENGTH]);
        assert!(near.distance(&target) < far.distance(&target));
        assert_eq!(target.distance(&target), Distance([0u8; ID_LENGTH]));
        assert_eq!(near.distance(&far), Distance([0xFFu8; ID_LENGTH]));
    }

    #[test]
    fn test_random_in_prefix() {
        let mut rng = rand::thread_rng();
        let base = NodeId::new([0b1011_0000u8; ID_LENGTH]);
        for _ in 0..32 {
            let id = base.random_in_prefix(5, &mut rng);
            assert!(id.shares_prefix(&base, 5));
        }
    }

    #[test]
    fn test_contact_equality_by_id() {
        let id = NodeId::new([7u8; ID_LENGTH]);
        let a = Contact::new(id, "127.0.0.1:6881".parse().unwrap());
        let b = Contact::new(id, "10.0.0.1:4000".parse().unwrap());
        assert_eq!(a, b);
    }

    #[test]
    fn test_contact_touch() {
        let mut contact = Contact::new(NodeId::random(), "127.0.0.1:6881".parse().unwrap());
        let first_seen = contact.last_seen;
        std::thread::sleep(Duration::from_millis(10));
        contact.touch();
        assert!(contact.last_seen > first_seen);
        assert!(contact.last_seen.elapsed() < Duration::from_millis(20));
        assert!(contact.is_good(Duration::from_secs(900)));
        assert!(!contact.is_good(Duration::ZERO));
    }
}
