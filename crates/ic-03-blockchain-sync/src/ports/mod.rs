//! # Ports Layer
//!
//! - `inbound.rs` - Control surface of a running sync manager
//! - `outbound.rs` - Peer network, external validator, committed chain

pub mod inbound;
pub mod outbound;

pub use inbound::SyncControl;
pub use outbound::{BlockRepository, BlockValidator, PeerNetwork};
