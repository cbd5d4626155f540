//! # In-Memory Peer Network
//!
//! Serves peer chains from memory, for tests and single-host development.
//! Each peer can be made slow, unreachable or flaky.

use async_trait::async_trait;
use parking_lot::RwLock;
use shared_types::{Block, NodeId, Peer};
use std::collections::HashMap;
use std::time::Duration;

use crate::domain::SyncError;
use crate::ports::outbound::PeerNetwork;

#[derive(Debug, Default)]
struct PeerChain {
    /// Sorted by height.
    blocks: Vec<Block>,
    offline: bool,
    latency: Duration,
    failures_remaining: u32,
    calls: u64,
}

#[derive(Debug, Default)]
pub struct InMemoryPeerNetwork {
    chains: RwLock<HashMap<NodeId, PeerChain>>,
}

impl InMemoryPeerNetwork {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace a peer's chain.
    pub fn set_chain(&self, peer: &str, mut blocks: Vec<Block>) {
        blocks.sort_by_key(|b| b.height);
        self.chains.write().entry(NodeId::new(peer)).or_default().blocks = blocks;
    }

    pub fn set_offline(&self, peer: &str, offline: bool) {
        self.chains.write().entry(NodeId::new(peer)).or_default().offline = offline;
    }

    pub fn set_latency(&self, peer: &str, latency: Duration) {
        self.chains.write().entry(NodeId::new(peer)).or_default().latency = latency;
    }

    /// Make the next `count` calls to `peer` fail.
    pub fn fail_next(&self, peer: &str, count: u32) {
        self.chains
            .write()
            .entry(NodeId::new(peer))
            .or_default()
            .failures_remaining = count;
    }

    /// Calls received by `peer` so far.
    pub fn calls(&self, peer: &str) -> u64 {
        self.chains
            .read()
            .get(&NodeId::new(peer))
            .map_or(0, |c| c.calls)
    }

    /// Account for one call and return the latency to simulate.
    fn admit_call(&self, peer: &Peer) -> Result<Duration, SyncError> {
        let mut chains = self.chains.write();
        let chain = chains.get_mut(&peer.node_id).ok_or_else(|| SyncError::Network {
            peer: peer.node_id.clone(),
            message: format!("unknown peer at {}", peer.address),
        })?;
        chain.calls += 1;

        if chain.offline {
            return Err(SyncError::Network {
                peer: peer.node_id.clone(),
                message: "unreachable".into(),
            });
        }
        if chain.failures_remaining > 0 {
            chain.failures_remaining -= 1;
            return Err(SyncError::Network {
                peer: peer.node_id.clone(),
                message: "connection reset".into(),
            });
        }
        Ok(chain.latency)
    }
}

#[async_trait]
impl PeerNetwork for InMemoryPeerNetwork {
    async fn chain_height(&self, peer: &Peer) -> Result<u64, SyncError> {
        let latency = self.admit_call(peer)?;
        if !latency.is_zero() {
            tokio::time::sleep(latency).await;
        }

        self.chains
            .read()
            .get(&peer.node_id)
            .and_then(|c| c.blocks.last())
            .map(|b| b.height)
            .ok_or_else(|| SyncError::Network {
                peer: peer.node_id.clone(),
                message: "empty chain".into(),
            })
    }

    async fn fetch_blocks(
        &self,
        peer: &Peer,
        from_height: u64,
        max: usize,
    ) -> Result<Vec<Block>, SyncError> {
        let latency = self.admit_call(peer)?;
        if !latency.is_zero() {
            tokio::time::sleep(latency).await;
        }

        let chains = self.chains.read();
        let Some(chain) = chains.get(&peer.node_id) else {
            return Ok(Vec::new());
        };
        let start = chain.blocks.partition_point(|b| b.height < from_height);
        Ok(chain.blocks[start..].iter().take(max).cloned().collect())
    }
}
