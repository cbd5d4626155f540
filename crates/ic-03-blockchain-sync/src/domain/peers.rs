//! # Peer Set
//!
//! Peers known from membership events. Exclusions mark peers that failed
//! during the current sync attempt; they stay members but are skipped as
//! sources until the exclusions are cleared.

use std::collections::{BTreeMap, BTreeSet};

use shared_types::{NodeId, Peer};

#[derive(Debug, Default)]
pub struct PeerSet {
    peers: BTreeMap<NodeId, Peer>,
    excluded: BTreeSet<NodeId>,
}

impl PeerSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or update a peer. Returns `true` if the peer was not known.
    pub fn upsert(&mut self, peer: Peer) -> bool {
        self.peers.insert(peer.node_id.clone(), peer).is_none()
    }

    /// Returns `true` if the peer was known.
    pub fn remove(&mut self, node_id: &NodeId) -> bool {
        self.excluded.remove(node_id);
        self.peers.remove(node_id).is_some()
    }

    pub fn contains(&self, node_id: &NodeId) -> bool {
        self.peers.contains_key(node_id)
    }

    pub fn get(&self, node_id: &NodeId) -> Option<&Peer> {
        self.peers.get(node_id)
    }

    /// Skip this peer as a source for the rest of the attempt.
    pub fn exclude(&mut self, node_id: &NodeId) {
        if self.peers.contains_key(node_id) {
            self.excluded.insert(node_id.clone());
        }
    }

    pub fn is_excluded(&self, node_id: &NodeId) -> bool {
        self.excluded.contains(node_id)
    }

    pub fn clear_exclusions(&mut self) {
        self.excluded.clear();
    }

    /// Members not excluded, in node id order.
    pub fn candidates(&self) -> Vec<Peer> {
        self.peers
            .values()
            .filter(|p| !self.excluded.contains(&p.node_id))
            .cloned()
            .collect()
    }

    pub fn len(&self) -> usize {
        self.peers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.peers.is_empty()
    }
}
