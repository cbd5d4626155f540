//! # Outbound Ports
//!
//! Dependencies of the sync state machine.

use async_trait::async_trait;
use shared_types::{Block, BlockValidationError, Peer};

use crate::domain::SyncError;

/// Access to other nodes' chains.
///
/// Transport details belong to the adapter; the state machine bounds every
/// call with its own timeout.
#[async_trait]
pub trait PeerNetwork: Send + Sync {
    /// Height of the peer's chain tip.
    async fn chain_height(&self, peer: &Peer) -> Result<u64, SyncError>;

    /// Up to `max` consecutive blocks starting at `from_height`.
    async fn fetch_blocks(&self, peer: &Peer, from_height: u64, max: usize)
        -> Result<Vec<Block>, SyncError>;
}

/// Consensus checks beyond hash linkage (signatures, quorum, ...).
///
/// Called synchronously for each block at the `Queued` → `Validated`
/// transition, after the structural and chain-link checks passed.
pub trait BlockValidator: Send + Sync {
    fn validate(&self, block: &Block, parent: &Block) -> Result<(), BlockValidationError>;
}

/// The committed chain.
pub trait BlockRepository: Send + Sync {
    /// The committed block with the greatest height.
    fn tip(&self) -> Result<Block, SyncError>;

    fn block_at(&self, height: u64) -> Result<Option<Block>, SyncError>;

    /// Store `block` and advance the tip to it in one atomic write.
    fn commit(&self, block: &Block) -> Result<(), SyncError>;
}
