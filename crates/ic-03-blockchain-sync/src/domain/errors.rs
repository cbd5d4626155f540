//! # Domain Errors

use shared_types::{BlockValidationError, NodeId};
use thiserror::Error;

/// Sync error types.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SyncError {
    /// A block failed validation.
    #[error("Block validation failed: {0}")]
    Validation(#[from] BlockValidationError),

    /// A peer call failed.
    #[error("Network error from {peer}: {message}")]
    Network { peer: NodeId, message: String },

    /// A peer call exceeded the fetch timeout.
    #[error("Peer {peer} timed out after {after_ms} ms")]
    Timeout { peer: NodeId, after_ms: u64 },

    /// No usable peer is known.
    #[error("No peers available")]
    NoPeers,

    /// The committed chain could not be read or written.
    #[error("Chain storage failure: {0}")]
    Storage(String),

    /// The manager could not subscribe to the bus.
    #[error("Event bus subscription failed: {0}")]
    Subscription(#[from] shared_bus::SubscriptionError),

    /// The sync manager task is no longer running.
    #[error("Sync manager stopped")]
    Stopped,
}

impl From<ic_01_view_store::KVStoreError> for SyncError {
    fn from(err: ic_01_view_store::KVStoreError) -> Self {
        Self::Storage(err.to_string())
    }
}
