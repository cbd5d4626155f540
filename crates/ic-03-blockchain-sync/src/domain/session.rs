//! # Sync Session
//!
//! Transient state of the machine. Rebuilt from the committed tip and peer
//! announcements after a restart.

use serde::{Deserialize, Serialize};
use shared_types::{NodeId, SyncState};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncSession {
    pub state: SyncState,
    /// Height of the committed tip.
    pub local_height: u64,
    /// Highest height announced by the chosen source.
    pub target_height: u64,
    /// Peer new fetches go to.
    pub source: Option<NodeId>,
}

impl SyncSession {
    pub fn new(local_height: u64) -> Self {
        Self {
            state: SyncState::Idle,
            local_height,
            target_height: local_height,
            source: None,
        }
    }

    pub fn is_caught_up(&self) -> bool {
        self.local_height >= self.target_height
    }
}

/// Snapshot published to readers after every step of the control loop.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncStatus {
    pub state: SyncState,
    pub local_height: u64,
    pub target_height: u64,
    pub source: Option<NodeId>,
    pub peers: usize,
    pub pooled_blocks: usize,
    pub rejected_blocks: usize,
}
