//! # Block Validators

use shared_types::{Block, BlockValidationError, NodeId};
use std::collections::HashSet;

use crate::ports::outbound::BlockValidator;

/// Accepts every block that passed the chain-link checks.
#[derive(Debug, Default, Clone, Copy)]
pub struct AcceptAllValidator;

impl BlockValidator for AcceptAllValidator {
    fn validate(&self, _block: &Block, _parent: &Block) -> Result<(), BlockValidationError> {
        Ok(())
    }
}

/// Accepts only blocks produced by a fixed set of nodes, e.g. the leaders of
/// a permissioned network.
#[derive(Debug, Clone)]
pub struct AllowedCreatorsValidator {
    creators: HashSet<NodeId>,
}

impl AllowedCreatorsValidator {
    pub fn new(creators: impl IntoIterator<Item = NodeId>) -> Self {
        Self {
            creators: creators.into_iter().collect(),
        }
    }
}

impl BlockValidator for AllowedCreatorsValidator {
    fn validate(&self, block: &Block, _parent: &Block) -> Result<(), BlockValidationError> {
        if self.creators.contains(&block.creator) {
            Ok(())
        } else {
            Err(BlockValidationError::Consensus {
                height: block.height,
                reason: format!("creator {} is not an allowed producer", block.creator),
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_allowed_creators() {
        let validator = AllowedCreatorsValidator::new([NodeId::new("leader")]);
        let genesis = Block::genesis(NodeId::new("leader"), 0);
        let good = Block::new(1, genesis.hash, NodeId::new("leader"), 1, vec![]);
        let bad = Block::new(1, genesis.hash, NodeId::new("mallory"), 1, vec![]);

        assert!(validator.validate(&good, &genesis).is_ok());
        assert!(matches!(
            validator.validate(&bad, &genesis),
            Err(BlockValidationError::Consensus { height: 1, .. })
        ));
        assert!(AcceptAllValidator.validate(&bad, &genesis).is_ok());
    }
}
