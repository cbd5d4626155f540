//! # Service Layer
//!
//! - `repository.rs` - `ViewRepository`, the generic projection store
//! - `stripes.rs` - Striped writer locks

mod repository;
mod stripes;

pub use repository::ViewRepository;
pub use stripes::KeyStripes;
