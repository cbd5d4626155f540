//! # Domain Layer
//!
//! Pure sync state, owned by the control loop.
//!
//! - `errors.rs` - `SyncError`
//! - `peers.rs` - Active peer set with per-attempt exclusions
//! - `pool.rs` - Per-height queue of received blocks
//! - `rejections.rs` - Memory of rejected (height, hash, source) triples
//! - `retry.rs` - Timeout and exponential backoff for peer calls
//! - `session.rs` - State tag, heights and the published status snapshot
//! - `validation.rs` - Structural and chain-link checks

pub mod errors;
pub mod peers;
pub mod pool;
pub mod rejections;
pub mod retry;
pub mod session;
pub mod validation;

pub use errors::SyncError;
pub use peers::PeerSet;
pub use pool::{Admission, BlockPool, PooledBlock};
pub use rejections::RejectionLog;
pub use retry::RetryPolicy;
pub use session::{SyncSession, SyncStatus};
