//! Tech Tree Core Graph Layer
//!
//! This crate provides the graph model, store abstraction, consistency rules and
//! document-store migration engine for the technology-readiness tech tree.
//!
//! # Architecture
//!
//! - **Graph-native storage**: Nodes are records, dependencies and hierarchy are
//!   relation tables in an embedded SurrealDB store
//! - **Injected store**: Every component receives an `Arc<dyn GraphStore>`; tests
//!   substitute the in-memory [`db::MemoryStore`]
//! - **Gated mutations**: All writes pass through [`services::ConsistentGraph`]
//! - **Idempotent migration**: Re-running a batch never changes a converged graph
//!
//! # Modules
//!
//! - [`models`] - Entity model (nodes, edges, groups, read views)
//! - [`db`] - Graph store adapter trait and backends
//! - [`services`] - Consistency rules, CRUD surface, migration engine
//! - [`config`] - Runtime configuration

pub mod config;
pub mod db;
pub mod models;
pub mod services;

// Re-export commonly used types
pub use config::GraphConfig;
pub use db::{GraphStore, MemoryStore, StoreError, SurrealStore};
pub use models::*;
pub use services::*;
