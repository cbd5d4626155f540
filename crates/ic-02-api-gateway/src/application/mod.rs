//! # Application Layer
//!
//! - `handler.rs` - Projects `icode.*` events into the meta repository
//! - `query.rs` - Pass-through query API

mod handler;
mod query;

pub use handler::ICodeEventHandler;
pub use query::ICodeQueryApi;
