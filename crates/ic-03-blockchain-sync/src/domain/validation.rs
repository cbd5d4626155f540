//! # Block Validation
//!
//! Checks applied to the next block against the committed tip, before any
//! external validator runs.

use shared_types::{Block, BlockValidationError};

/// Hash seal and payload bound.
pub fn validate_structure(block: &Block, max_payload_bytes: usize) -> Result<(), BlockValidationError> {
    if !block.is_sealed() {
        return Err(BlockValidationError::HashMismatch {
            height: block.height,
        });
    }
    if block.payload.len() > max_payload_bytes {
        return Err(BlockValidationError::PayloadTooLarge {
            height: block.height,
            size: block.payload.len(),
            max: max_payload_bytes,
        });
    }
    Ok(())
}

/// Height, predecessor hash and timestamp against the committed `tip`.
pub fn validate_link(block: &Block, tip: &Block) -> Result<(), BlockValidationError> {
    let expected = tip.height + 1;
    if block.height != expected {
        return Err(BlockValidationError::UnexpectedHeight {
            expected,
            actual: block.height,
        });
    }
    if block.prev_hash != tip.hash {
        return Err(BlockValidationError::BrokenLink {
            height: block.height,
            expected: hex::encode(tip.hash),
            actual: hex::encode(block.prev_hash),
        });
    }
    if block.timestamp < tip.timestamp {
        return Err(BlockValidationError::TimestampRegression {
            height: block.height,
            timestamp: block.timestamp,
            parent_timestamp: tip.timestamp,
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared_types::NodeId;

    fn genesis() -> Block {
        Block::genesis(NodeId::new("leader"), 1_000)
    }

    fn child(parent: &Block, timestamp: u64) -> Block {
        Block::new(parent.height + 1, parent.hash, NodeId::new("leader"), timestamp, vec![1, 2])
    }

    #[test]
    fn test_valid_child() {
        let g = genesis();
        let b = child(&g, 1_001);
        assert!(validate_structure(&b, 16).is_ok());
        assert!(validate_link(&b, &g).is_ok());
    }

    #[test]
    fn test_tampered_payload() {
        let mut b = child(&genesis(), 1_001);
        b.payload.push(9);
        assert_eq!(
            validate_structure(&b, 16),
            Err(BlockValidationError::HashMismatch { height: 1 })
        );
    }

    #[test]
    fn test_payload_bound() {
        let b = child(&genesis(), 1_001);
        assert!(matches!(
            validate_structure(&b, 1),
            Err(BlockValidationError::PayloadTooLarge { size: 2, max: 1, .. })
        ));
    }

    #[test]
    fn test_broken_link() {
        let g = genesis();
        let other = Block::genesis(NodeId::new("other"), 5);
        let b = child(&other, 1_001);
        assert!(matches!(
            validate_link(&b, &g),
            Err(BlockValidationError::BrokenLink { height: 1, .. })
        ));
    }

    #[test]
    fn test_wrong_height() {
        let g = genesis();
        let b1 = child(&g, 1_001);
        let b2 = child(&b1, 1_002);
        assert_eq!(
            validate_link(&b2, &g),
            Err(BlockValidationError::UnexpectedHeight {
                expected: 1,
                actual: 2
            })
        );
    }

    #[test]
    fn test_timestamp_regression() {
        let g = genesis();
        let b = child(&g, 999);
        assert!(matches!(
            validate_link(&b, &g),
            Err(BlockValidationError::TimestampRegression { .. })
        ));
    }
}
