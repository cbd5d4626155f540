//! # Integration Scenarios
//!
//! Every scenario drives a real `NodeRuntime` through its event bus only.

pub mod block_sync;
pub mod durability;
pub mod icode_projection;
