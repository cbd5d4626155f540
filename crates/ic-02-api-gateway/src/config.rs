//! Projection configuration.

use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;

/// Configuration of the ICode projection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProjectionConfig {
    /// Status changes held for ICodes not yet created.
    pub max_parked_status_changes: usize,
    /// How long a parked status change waits for its create, in seconds.
    pub parked_status_ttl_secs: u64,
    /// How long processed event ids are remembered, in seconds.
    pub dedup_retention_secs: u64,
}

impl Default for ProjectionConfig {
    fn default() -> Self {
        Self {
            max_parked_status_changes: 10_000,
            parked_status_ttl_secs: 3_600,
            dedup_retention_secs: 600,
        }
    }
}

impl ProjectionConfig {
    /// Small bounds for tests.
    pub fn for_testing() -> Self {
        Self {
            max_parked_status_changes: 16,
            parked_status_ttl_secs: 60,
            dedup_retention_secs: 60,
        }
    }

    pub fn parked_status_ttl(&self) -> Duration {
        Duration::from_secs(self.parked_status_ttl_secs)
    }

    pub fn dedup_retention(&self) -> Duration {
        Duration::from_secs(self.dedup_retention_secs)
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<(), ProjectionConfigError> {
        if self.max_parked_status_changes == 0 {
            return Err(ProjectionConfigError::ZeroParkedCapacity);
        }
        if self.parked_status_ttl_secs == 0 {
            return Err(ProjectionConfigError::ZeroParkedTtl);
        }
        if self.dedup_retention_secs == 0 {
            return Err(ProjectionConfigError::ZeroRetention);
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProjectionConfigError {
    #[error("max_parked_status_changes cannot be 0")]
    ZeroParkedCapacity,
    #[error("parked_status_ttl_secs cannot be 0")]
    ZeroParkedTtl,
    #[error("dedup_retention_secs cannot be 0")]
    ZeroRetention,
}
