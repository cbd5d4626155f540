//! # Domain Layer
//!
//! - `errors.rs` - Store and repository errors
//! - `keys.rs` - Namespaced key layout
//! - `projection.rs` - The record contract

pub mod errors;
pub mod keys;
pub mod projection;
