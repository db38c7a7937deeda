//! Data Models
//!
//! Entity definitions for the tech tree graph:
//!
//! - [`TechNode`] - Milestones, enabling technologies and reactor concepts
//! - [`RelationType`] / [`EdgeKey`] - Dependency and hierarchy edges
//! - [`TechTreeView`] - Whole-graph read model consumed by the frontend

pub mod edge;
pub mod node;
pub mod view;

pub use edge::{
    legacy_edge_id, parse_legacy_edge_id, Direction, EdgeId, EdgeKey, RelationType,
    LEGACY_EDGE_SEPARATOR,
};
pub use node::{Group, NodeType, NodeUpdate, TechNode, ValidationError};
pub use view::{EdgeView, NodeData, NodeView, TechTreeView};
