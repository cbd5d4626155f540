//! # Application Layer
//!
//! - `machine.rs` - The sync state machine
//! - `manager.rs` - Control loop task and its handle

pub mod machine;
pub mod manager;

pub use machine::SyncMachine;
pub use manager::{SyncHandle, SyncManager};
