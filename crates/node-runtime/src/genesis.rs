//! # Genesis
//!
//! The genesis block every node of a network must agree on, and the set of
//! nodes allowed to produce blocks on top of it.

use ic_03_blockchain_sync::{AcceptAllValidator, AllowedCreatorsValidator, BlockValidator};
use serde::{Deserialize, Serialize};
use shared_types::{Block, NodeId};
use std::sync::Arc;

/// Genesis block configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GenesisConfig {
    /// Creator recorded in the genesis block.
    pub creator: NodeId,
    /// Genesis timestamp (unix millis). Fixed so all nodes derive one hash.
    pub timestamp: u64,
    /// Nodes allowed to produce blocks. Empty accepts any creator.
    pub producers: Vec<NodeId>,
}

impl Default for GenesisConfig {
    fn default() -> Self {
        Self {
            creator: NodeId::new("genesis"),
            timestamp: 0,
            producers: Vec::new(),
        }
    }
}

impl GenesisConfig {
    pub fn block(&self) -> Block {
        Block::genesis(self.creator.clone(), self.timestamp)
    }

    /// External validator enforcing the producer set.
    pub fn validator(&self) -> Arc<dyn BlockValidator> {
        if self.producers.is_empty() {
            Arc::new(AcceptAllValidator)
        } else {
            Arc::new(AllowedCreatorsValidator::new(self.producers.iter().cloned()))
        }
    }
}
