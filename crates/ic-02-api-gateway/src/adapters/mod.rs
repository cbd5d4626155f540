//! # Adapters Layer

pub mod meta_store;
