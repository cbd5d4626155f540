//! # Blockchain Sync (ic-03)
//!
//! Drives the node from "behind" to "caught up" with its peers and commits
//! blocks strictly in height order.
//!
//! ## Architecture
//!
//! ```text
//! node.*  ──────┐                        ┌──→ PeerNetwork (heights, block batches)
//!               ├──→ SyncManager loop ───┼──→ BlockValidator (external checks)
//! block.queued ─┘    (owns SyncMachine)  └──→ BlockRepository (atomic commit)
//!                          │
//!                          ├──→ block.validated / block.rejected
//!                          ├──→ blockchain.sync_state
//!                          └──→ watch<SyncStatus>
//! ```
//!
//! ## Module Structure
//!
//! ```text
//! ic-03-blockchain-sync/
//! ├── domain/          # Peers, pool, rejections, retry, session, validation
//! ├── ports/           # SyncControl (inbound); network, validator, chain (outbound)
//! ├── adapters/        # KV block repository, in-memory network, validators
//! ├── application/     # SyncMachine and the SyncManager control loop
//! └── config.rs        # SyncConfig
//! ```

#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

pub mod adapters;
pub mod application;
pub mod config;
pub mod domain;
pub mod ports;

pub use adapters::{
    AcceptAllValidator, AllowedCreatorsValidator, InMemoryPeerNetwork, KvBlockRepository,
};
pub use application::{SyncHandle, SyncMachine, SyncManager};
pub use config::{SyncConfig, SyncConfigError};
pub use domain::{SyncError, SyncStatus};
pub use ports::{BlockRepository, BlockValidator, PeerNetwork, SyncControl};
