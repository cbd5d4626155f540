//! # Projection
//!
//! A record type stored by a `ViewRepository`.

use serde::de::DeserializeOwned;
use serde::Serialize;

/// A materialized view record.
///
/// The primary key addresses the record; the optional secondary key is unique
/// across the namespace and maintained as an index.
pub trait Projection: Serialize + DeserializeOwned + Clone + Send + Sync + 'static {
    /// Namespace of this record type in the shared store. Must not contain `:`.
    const NAMESPACE: &'static str;

    fn primary_key(&self) -> &str;

    fn secondary_key(&self) -> Option<&str> {
        None
    }
}
