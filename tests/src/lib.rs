//! # ICode Node Test Suite
//!
//! ## Structure
//!
//! ```text
//! tests/
//! ├── benches/          # Bus fan-out and view store throughput
//! └── src/
//!     ├── fixtures.rs   # Chains, events and polling helpers
//!     └── integration/  # Cross-crate scenarios on a running NodeRuntime
//! ```
//!
//! ## Running Tests
//!
//! ```bash
//! cargo test -p ic-tests
//! cargo test -p ic-tests integration::block_sync
//! cargo bench -p ic-tests
//! ```

pub mod fixtures;
pub mod integration;
