//! Sync configuration.

use serde::{Deserialize, Serialize};
use shared_types::NodeId;
use std::time::Duration;
use thiserror::Error;

use crate::domain::RetryPolicy;

/// Configuration of the block sync state machine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SyncConfig {
    /// This node's identity. Membership events about it are ignored.
    pub node_id: NodeId,
    /// Deadline of one peer call in milliseconds.
    pub fetch_timeout_ms: u64,
    /// Attempts per peer call before the peer is skipped.
    pub max_fetch_attempts: u32,
    /// First backoff delay in milliseconds; doubles on every retry.
    pub backoff_base_ms: u64,
    /// Upper bound of one backoff delay in milliseconds.
    pub backoff_cap_ms: u64,
    /// Blocks requested per fetch.
    pub batch_size: usize,
    /// Largest accepted block payload.
    pub max_payload_bytes: usize,
    /// Blocks held while waiting for their predecessor.
    pub max_pool_blocks: usize,
    /// Rejected blocks remembered above the committed height.
    pub max_rejected_blocks: usize,
    /// Period of the idle re-discovery tick in milliseconds.
    pub tick_interval_ms: u64,
    /// Capacity of the control command queue.
    pub command_capacity: usize,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            node_id: NodeId::new("node-0"),
            fetch_timeout_ms: 5_000,
            max_fetch_attempts: 3,
            backoff_base_ms: 200,
            backoff_cap_ms: 5_000,
            batch_size: 64,
            max_payload_bytes: 1024 * 1024,
            max_pool_blocks: 4096,
            max_rejected_blocks: 4096,
            tick_interval_ms: 10_000,
            command_capacity: 16,
        }
    }
}

impl SyncConfig {
    /// Short timeouts for tests.
    pub fn for_testing() -> Self {
        Self {
            node_id: NodeId::new("test-node"),
            fetch_timeout_ms: 200,
            max_fetch_attempts: 2,
            backoff_base_ms: 10,
            backoff_cap_ms: 50,
            batch_size: 8,
            max_payload_bytes: 64 * 1024,
            max_pool_blocks: 256,
            max_rejected_blocks: 64,
            tick_interval_ms: 100,
            command_capacity: 4,
        }
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            timeout: Duration::from_millis(self.fetch_timeout_ms),
            attempts: self.max_fetch_attempts,
            backoff_base: Duration::from_millis(self.backoff_base_ms),
            backoff_cap: Duration::from_millis(self.backoff_cap_ms),
        }
    }

    pub fn tick_interval(&self) -> Duration {
        Duration::from_millis(self.tick_interval_ms)
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<(), SyncConfigError> {
        if self.node_id.as_str().is_empty() {
            return Err(SyncConfigError::EmptyNodeId);
        }
        if self.fetch_timeout_ms == 0 {
            return Err(SyncConfigError::ZeroTimeout);
        }
        if self.max_fetch_attempts == 0 {
            return Err(SyncConfigError::ZeroAttempts);
        }
        if self.batch_size == 0 || self.batch_size > self.max_pool_blocks {
            return Err(SyncConfigError::BatchSize {
                batch: self.batch_size,
                pool: self.max_pool_blocks,
            });
        }
        if self.max_rejected_blocks == 0 {
            return Err(SyncConfigError::ZeroRejectionLog);
        }
        if self.tick_interval_ms == 0 {
            return Err(SyncConfigError::ZeroTick);
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SyncConfigError {
    #[error("node_id cannot be empty")]
    EmptyNodeId,
    #[error("fetch_timeout_ms cannot be 0")]
    ZeroTimeout,
    #[error("max_fetch_attempts cannot be 0")]
    ZeroAttempts,
    #[error("batch_size must be in 1..={pool}, got {batch}")]
    BatchSize { batch: usize, pool: usize },
    #[error("max_rejected_blocks cannot be 0")]
    ZeroRejectionLog,
    #[error("tick_interval_ms cannot be 0")]
    ZeroTick,
}
