//! # Error Types
//!
//! Error types shared across subsystems.

use thiserror::Error;

/// Reasons a block fails validation.
///
/// Validation failures are fatal for the block: it moves to `Rejected`.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BlockValidationError {
    /// Predecessor hash does not match the committed block at `height - 1`.
    #[error("Broken chain link at height {height}: expected parent {expected}, got {actual}")]
    BrokenLink {
        height: u64,
        expected: String,
        actual: String,
    },

    /// Block height is not the next height after the committed tip.
    #[error("Unexpected height: expected {expected}, got {actual}")]
    UnexpectedHeight { expected: u64, actual: u64 },

    /// Stored hash does not match the block contents.
    #[error("Hash mismatch at height {height}")]
    HashMismatch { height: u64 },

    /// Payload exceeds the configured maximum.
    #[error("Payload too large at height {height}: {size} bytes, max {max}")]
    PayloadTooLarge { height: u64, size: usize, max: usize },

    /// Timestamp runs backwards relative to the parent.
    #[error("Timestamp at height {height} precedes parent ({timestamp} < {parent_timestamp})")]
    TimestampRegression {
        height: u64,
        timestamp: u64,
        parent_timestamp: u64,
    },

    /// External consensus validator refused the block.
    #[error("Consensus check failed at height {height}: {reason}")]
    Consensus { height: u64, reason: String },
}

impl BlockValidationError {
    /// Height of the offending block.
    #[must_use]
    pub fn height(&self) -> u64 {
        match self {
            Self::BrokenLink { height, .. }
            | Self::HashMismatch { height }
            | Self::PayloadTooLarge { height, .. }
            | Self::TimestampRegression { height, .. }
            | Self::Consensus { height, .. } => *height,
            Self::UnexpectedHeight { actual, .. } => *actual,
        }
    }
}
