//! # Adapters Layer
//!
//! - `storage/` - `KeyValueStore` implementations
//! - `lock.rs` - Exclusive process lock for file-backed data

pub mod lock;
pub mod storage;
