//! # Domain Layer

pub mod meta;
pub mod parked;
