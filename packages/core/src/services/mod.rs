//! Business Services
//!
//! This module contains the tech tree's business logic:
//!
//! - `ConsistentGraph` - consistency rules and retry around every store call
//! - `GraphService` - node and edge CRUD plus whole-graph reads
//! - `MigrationEngine` - bulk import from a document store export
//!
//! Services depend on the store only through `Arc<dyn GraphStore>`.

pub mod consistency;
pub mod error;
pub mod graph_service;
pub mod migration;
pub mod retry;

pub use consistency::{ConnectOutcome, ConsistentGraph};
pub use error::{EndpointSide, GraphError};
pub use graph_service::GraphService;
pub use migration::{
    DocumentSource, EdgeOutcome, JsonExportSource, MigrationEngine, MigrationOptions,
    MigrationReport, NodeOutcome, StaticSource,
};
pub use retry::{RetryPolicy, WriteOutcome};
