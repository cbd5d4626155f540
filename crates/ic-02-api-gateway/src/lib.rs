//! # ICode API Gateway (ic-02)
//!
//! Read model of deployed-code (ICode) metadata.
//!
//! ## Architecture
//!
//! ```text
//! icode.created ────────┐
//! icode.status_changed ─┼──→ ICodeEventHandler ──→ MetaRepository ←── ICodeQueryApi
//! icode.deleted ────────┘      (subscribes          (view store)       (pass-through
//!                               "icode.*")                               reads)
//! ```
//!
//! The handler is the only writer. Every operation it performs is
//! idempotent, so at-least-once delivery from the bus never corrupts the
//! view.
//!
//! ## Module Structure
//!
//! ```text
//! ic-02-api-gateway/
//! ├── domain/          # ICodeMeta record
//! ├── ports/           # Query API (inbound) + meta repository (outbound)
//! ├── adapters/        # MetaRepository over the view store
//! ├── application/     # Event handler and query API
//! └── config.rs        # ProjectionConfig
//! ```

#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

pub mod adapters;
pub mod application;
pub mod config;
pub mod domain;
pub mod ports;

pub use adapters::meta_store::ViewMetaRepository;
pub use application::{ICodeEventHandler, ICodeQueryApi};
pub use config::ProjectionConfig;
pub use domain::meta::ICodeMeta;
pub use ports::inbound::ICodeQuery;
pub use ports::outbound::MetaRepository;
