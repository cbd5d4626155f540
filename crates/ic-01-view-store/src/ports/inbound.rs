//! # Inbound Ports (Driving Ports / API)
//!
//! The view API exposed to event handlers and query surfaces.

use crate::domain::errors::ViewStoreError;
use crate::domain::projection::Projection;

/// Persistence of one projection type.
pub trait ViewStore<P: Projection>: Send + Sync {
    /// Insert or overwrite the record under its primary key.
    ///
    /// # Errors
    ///
    /// - `DuplicateKey` if the record's secondary key belongs to another record
    /// - `Storage` / `Serialization` on backend failure
    fn save(&self, record: &P) -> Result<(), ViewStoreError>;

    /// Every record of the namespace in primary-key order.
    fn find_all(&self) -> Result<Vec<P>, ViewStoreError>;

    /// # Errors
    ///
    /// `NotFound` if no record has this primary key.
    fn find_by_id(&self, id: &str) -> Result<P, ViewStoreError>;

    /// # Errors
    ///
    /// `NotFound` if no record owns this secondary key.
    fn find_by_secondary_key(&self, key: &str) -> Result<P, ViewStoreError>;

    /// Delete the record and its index entry. Absent ids are a no-op.
    ///
    /// # Returns
    ///
    /// Whether a record was removed.
    fn remove(&self, id: &str) -> Result<bool, ViewStoreError>;
}
