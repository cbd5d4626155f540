//! # Shared Types Crate
//!
//! This crate contains the ledger entities and the domain event model
//! exchanged over the shared bus.
//!
//! ## Design Principles
//!
//! - **Single Source of Truth**: All cross-subsystem types are defined here.
//! - **Immutable Facts**: A `DomainEvent` is never mutated after construction;
//!   its `id` is the deduplication key for consumers.
//! - **No Behavior in Events**: Payloads are flat data records.

pub mod entities;
pub mod errors;
pub mod events;

pub use entities::*;
pub use errors::*;
pub use events::*;

/// Current milliseconds since the unix epoch.
///
/// Returns 0 if the system clock is set before the epoch.
#[must_use]
pub fn now_millis() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}
