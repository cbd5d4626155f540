//! # Core Domain Entities
//!
//! ## Clusters
//!
//! - **Chain**: `Block`, `BlockState`
//! - **Networking**: `Peer`, `NodeId`, `PeerRole`
//! - **Deployed code**: `ICodeStatus`, `Version`

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt;

// =============================================================================
// CLUSTER A: THE CHAIN
// =============================================================================

/// A 32-byte SHA-256 hash.
pub type Hash = [u8; 32];

/// The all-zero hash used as predecessor of the genesis block.
pub const ZERO_HASH: Hash = [0u8; 32];

/// An ordered unit of ledger history.
///
/// Blocks form a hash chain: `prev_hash` must equal the `hash` of the
/// committed block at `height - 1`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Block {
    /// Sequence height (genesis = 0).
    pub height: u64,
    /// SHA-256 over height, predecessor hash, creator, timestamp and payload.
    pub hash: Hash,
    /// Hash of the predecessor block.
    pub prev_hash: Hash,
    /// Node that produced the block.
    pub creator: NodeId,
    /// Unix milliseconds at production time.
    pub timestamp: u64,
    /// Opaque transaction payload.
    pub payload: Vec<u8>,
}

impl Block {
    /// Build a block on top of `prev_hash`, sealing it with its content hash.
    pub fn new(
        height: u64,
        prev_hash: Hash,
        creator: NodeId,
        timestamp: u64,
        payload: Vec<u8>,
    ) -> Self {
        let hash = Self::compute_hash(height, &prev_hash, &creator, timestamp, &payload);
        Self {
            height,
            hash,
            prev_hash,
            creator,
            timestamp,
            payload,
        }
    }

    /// Build the genesis block.
    pub fn genesis(creator: NodeId, timestamp: u64) -> Self {
        Self::new(0, ZERO_HASH, creator, timestamp, Vec::new())
    }

    /// Content hash of a block.
    #[must_use]
    pub fn compute_hash(
        height: u64,
        prev_hash: &Hash,
        creator: &NodeId,
        timestamp: u64,
        payload: &[u8],
    ) -> Hash {
        let mut hasher = Sha256::new();
        hasher.update(height.to_be_bytes());
        hasher.update(prev_hash);
        hasher.update((creator.0.len() as u64).to_be_bytes());
        hasher.update(creator.0.as_bytes());
        hasher.update(timestamp.to_be_bytes());
        hasher.update((payload.len() as u64).to_be_bytes());
        hasher.update(payload);
        hasher.finalize().into()
    }

    /// Whether the stored hash matches the block contents.
    #[must_use]
    pub fn is_sealed(&self) -> bool {
        self.hash
            == Self::compute_hash(
                self.height,
                &self.prev_hash,
                &self.creator,
                self.timestamp,
                &self.payload,
            )
    }

    /// Short hex prefix of the hash for log lines.
    #[must_use]
    pub fn short_hash(&self) -> String {
        hex::encode(&self.hash[..4])
    }
}

/// Lifecycle of a block while it is being synchronized.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BlockState {
    /// Received, not yet validated.
    Queued,
    /// Structurally and chain-link checked, not yet durably committed.
    Validated,
    /// Part of the canonical chain.
    Committed,
    /// Failed validation.
    Rejected,
}

// =============================================================================
// CLUSTER B: NETWORKING
// =============================================================================

/// Unique identifier for a node in the network.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default)]
pub struct NodeId(pub String);

impl NodeId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for NodeId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

/// Role of a node in the permissioned network.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum PeerRole {
    /// Orders and produces blocks.
    Leader,
    /// Replicates the leader's chain.
    #[default]
    Member,
}

/// A known member of the network.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Peer {
    /// The peer's node ID.
    pub node_id: NodeId,
    /// Network address (IP:Port).
    pub address: String,
    /// Role in the network.
    pub role: PeerRole,
}

impl Peer {
    pub fn new(node_id: impl Into<String>, address: impl Into<String>) -> Self {
        Self {
            node_id: NodeId::new(node_id),
            address: address.into(),
            role: PeerRole::Member,
        }
    }

    #[must_use]
    pub fn with_role(mut self, role: PeerRole) -> Self {
        self.role = role;
        self
    }
}

// =============================================================================
// CLUSTER C: DEPLOYED CODE (ICODE)
// =============================================================================

/// Deployment status of an ICode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum ICodeStatus {
    #[default]
    Undeployed,
    Deployed,
    DeployFailed,
}

/// Semantic version of deployed code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default)]
pub struct Version {
    pub major: u32,
    pub minor: u32,
    pub patch: u32,
}

impl Version {
    pub const fn new(major: u32, minor: u32, patch: u32) -> Self {
        Self {
            major,
            minor,
            patch,
        }
    }
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}", self.major, self.minor, self.patch)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn node() -> NodeId {
        NodeId::new("leader")
    }

    #[test]
    fn test_block_hash_is_sealed() {
        let block = Block::new(1, ZERO_HASH, node(), 1_000, b"tx".to_vec());
        assert!(block.is_sealed());
    }

    #[test]
    fn test_tampered_payload_breaks_seal() {
        let mut block = Block::new(1, ZERO_HASH, node(), 1_000, b"tx".to_vec());
        block.payload = b"other".to_vec();
        assert!(!block.is_sealed());
    }

    #[test]
    fn test_hash_covers_creator() {
        let genuine = Block::new(1, ZERO_HASH, node(), 1_000, b"tx".to_vec());
        let forged = Block::new(1, ZERO_HASH, NodeId::new("mallory"), 1_000, b"tx".to_vec());
        assert_ne!(genuine.hash, forged.hash);

        let mut relabelled = genuine.clone();
        relabelled.creator = NodeId::new("mallory");
        assert!(!relabelled.is_sealed());
    }

    #[test]
    fn test_hash_depends_on_predecessor() {
        let a = Block::new(1, ZERO_HASH, node(), 1_000, vec![]);
        let b = Block::new(1, [1u8; 32], node(), 1_000, vec![]);
        assert_ne!(a.hash, b.hash);
    }

    #[test]
    fn test_genesis() {
        let genesis = Block::genesis(node(), 0);
        assert_eq!(genesis.height, 0);
        assert_eq!(genesis.prev_hash, ZERO_HASH);
        assert!(genesis.is_sealed());
    }

    #[test]
    fn test_version_display() {
        assert_eq!(Version::new(1, 2, 3).to_string(), "1.2.3");
        assert_eq!(Version::default().to_string(), "0.0.0");
    }

    #[test]
    fn test_block_bincode_round_trip() {
        let block = Block::new(7, [9u8; 32], node(), 42, vec![1, 2, 3]);
        let bytes = bincode::serialize(&block).unwrap();
        let decoded: Block = bincode::deserialize(&bytes).unwrap();
        assert_eq!(decoded, block);
    }
}
