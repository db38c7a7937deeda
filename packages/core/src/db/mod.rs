//! Database Layer
//!
//! Graph store adapters for the tech tree:
//!
//! - [`GraphStore`] - the async trait every service talks to
//! - [`SurrealStore`] - embedded SurrealDB (RocksDB) backend
//! - [`MemoryStore`] - in-process backend for tests
//!
//! Backends arbitrate node uniqueness and edge uniqueness themselves; callers
//! never hold locks across store calls.

mod error;
mod graph_store;
mod memory_store;
mod surreal_store;

pub use error::StoreError;
pub use graph_store::{GraphStore, UpsertResult};
pub use memory_store::MemoryStore;
pub use surreal_store::{SurrealStore, DEFAULT_DATABASE, DEFAULT_NAMESPACE};
