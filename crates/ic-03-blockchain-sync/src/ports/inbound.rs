//! # Inbound Ports

use async_trait::async_trait;

use crate::domain::{SyncError, SyncStatus};

/// Control surface of a running sync manager.
#[async_trait]
pub trait SyncControl: Send + Sync {
    /// Latest status snapshot.
    fn status(&self) -> SyncStatus;

    /// Clear rejection memory and peer exclusions, then rediscover.
    ///
    /// # Errors
    ///
    /// `SyncError::Stopped` if the manager is no longer running.
    async fn resync(&self) -> Result<(), SyncError>;
}
