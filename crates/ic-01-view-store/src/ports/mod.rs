//! # Ports Layer
//!
//! - `inbound.rs` - Driving port (view API used by handlers and queries)
//! - `outbound.rs` - Driven port (key-value storage)

pub mod inbound;
pub mod outbound;
