//! Migration from a document store export into the graph
//!
//! - [`DocumentSource`] - where records come from
//! - [`mapping`] - raw document to `TechNode` / `EdgeKey`
//! - [`MigrationEngine`] - two-phase, additive-only, resumable migration
//! - [`MigrationReport`] - per-record outcomes

pub mod engine;
pub mod mapping;
pub mod report;
pub mod source;

pub use engine::{MigrationEngine, MigrationOptions};
pub use mapping::{map_edges, map_node};
pub use report::{
    EdgeOutcome, EdgeRecordResult, MigrationCounts, MigrationReport, NodeOutcome,
    NodeRecordResult,
};
pub use source::{DocumentSource, JsonExportSource, RawRecord, StaticSource};
