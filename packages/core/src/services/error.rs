//! Service Layer Error Types
//!
//! Client-facing failures raised by [`ConsistentGraph`](super::ConsistentGraph)
//! and [`GraphService`](super::GraphService).

use crate::db::StoreError;
use crate::models::{RelationType, ValidationError};
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Which end of an edge a failure refers to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EndpointSide {
    Source,
    Target,
}

impl fmt::Display for EndpointSide {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EndpointSide::Source => write!(f, "source"),
            EndpointSide::Target => write!(f, "target"),
        }
    }
}

/// Graph operation errors
#[derive(Error, Debug, Clone, PartialEq)]
pub enum GraphError {
    /// Node or edge not found by ID
    #[error("Not found: {id}")]
    NotFound { id: String },

    /// Uniqueness or single-parent constraint violated
    #[error("Conflict: {0}")]
    Conflict(String),

    /// Edge endpoint doesn't exist
    #[error("Missing {side} node: {node_id}")]
    MissingEndpoint {
        side: EndpointSide,
        node_id: String,
    },

    /// Malformed edge or node reference
    #[error("Invalid reference: {0}")]
    InvalidReference(String),

    /// Store stayed unavailable after retries
    #[error("Graph store unavailable: {0}")]
    StoreUnavailable(String),

    #[error("Graph store rejected operation: {0}")]
    StoreRejected(String),

    #[error("Node {node_id} cannot have a {relation} edge to itself")]
    SelfLoop {
        node_id: String,
        relation: RelationType,
    },

    /// New parent is already a descendant of the child
    #[error("Hierarchy cycle: {child_id} is an ancestor of {parent_id}")]
    HierarchyCycle { parent_id: String, child_id: String },

    #[error("Node validation failed: {0}")]
    Validation(#[from] ValidationError),

    /// Migration source could not be read or parsed
    #[error("Source error: {0}")]
    Source(String),
}

impl GraphError {
    pub fn not_found(id: impl Into<String>) -> Self {
        Self::NotFound { id: id.into() }
    }

    pub fn conflict(msg: impl Into<String>) -> Self {
        Self::Conflict(msg.into())
    }

    pub fn missing_endpoint(side: EndpointSide, node_id: impl Into<String>) -> Self {
        Self::MissingEndpoint {
            side,
            node_id: node_id.into(),
        }
    }

    pub fn invalid_reference(msg: impl Into<String>) -> Self {
        Self::InvalidReference(msg.into())
    }

    pub fn self_loop(node_id: impl Into<String>, relation: RelationType) -> Self {
        Self::SelfLoop {
            node_id: node_id.into(),
            relation,
        }
    }

    pub fn hierarchy_cycle(parent_id: impl Into<String>, child_id: impl Into<String>) -> Self {
        Self::HierarchyCycle {
            parent_id: parent_id.into(),
            child_id: child_id.into(),
        }
    }

    pub fn source(msg: impl Into<String>) -> Self {
        Self::Source(msg.into())
    }

    /// Whether the failure came from a store outage
    pub fn is_transient(&self) -> bool {
        matches!(self, GraphError::StoreUnavailable(_))
    }
}

impl From<StoreError> for GraphError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound { id } => GraphError::NotFound { id },
            StoreError::Conflict { id } => {
                GraphError::Conflict(format!("record already exists: {}", id))
            }
            StoreError::Unavailable(msg) => GraphError::StoreUnavailable(msg),
            other => GraphError::StoreRejected(other.to_string()),
        }
    }
}
