//! # Materialized View Store (ic-01)
//!
//! Durable read models built from domain events.
//!
//! ## Architecture
//!
//! ```text
//! Event handler ──save/remove──→ ViewRepository<P> ──atomic batch──→ KeyValueStore
//!                                       ↑                              │
//! Query API ─────find_*─────────────────┘                   memory / file / rocksdb
//! ```
//!
//! ## Key Layout
//!
//! | Key | Value |
//! |-----|-------|
//! | `<ns>:rec:<id>` | bincode-encoded record |
//! | `<ns>:idx:<secondary>` | owning record id |
//!
//! A record and its index entry are always written in the same batch, so a
//! completed `save` is immediately visible through both lookups.
//!
//! ## Crate Structure (Hexagonal Architecture)
//!
//! - `domain/` - Projection trait, key layout, errors
//! - `ports/` - Inbound view API, outbound key-value SPI
//! - `adapters/` - Key-value store implementations
//! - `service/` - The generic repository

#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

pub mod adapters;
pub mod domain;
pub mod ports;
pub mod service;

pub use adapters::storage::{FileBackedKVStore, InMemoryKVStore};
#[cfg(feature = "rocksdb")]
pub use adapters::storage::{RocksDbConfig, RocksDbStore};
pub use domain::errors::{KVStoreError, ViewStoreError};
pub use domain::projection::Projection;
pub use ports::inbound::ViewStore;
pub use ports::outbound::{BatchOperation, KeyValueStore, ScanResult};
pub use service::ViewRepository;
