//! # Ports Layer
//!
//! - `inbound.rs` - Query API exposed to callers
//! - `outbound.rs` - Metadata persistence required by the handler

pub mod inbound;
pub mod outbound;
