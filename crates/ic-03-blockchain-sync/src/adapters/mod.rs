//! # Adapters Layer
//!
//! - `block_store.rs` - Committed chain over the key-value port
//! - `network.rs` - In-process peer network
//! - `validators.rs` - `BlockValidator` implementations

pub mod block_store;
pub mod network;
pub mod validators;

pub use block_store::KvBlockRepository;
pub use network::InMemoryPeerNetwork;
pub use validators::{AcceptAllValidator, AllowedCreatorsValidator};
