//! Per-record migration outcomes

use crate::models::RelationType;
use crate::services::error::EndpointSide;
use serde::{Deserialize, Serialize};

/// What happened to one node record
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum NodeOutcome {
    Created,
    /// Dry run: the node would be created
    WouldCreate,
    /// A node with this id is already stored; it is left untouched
    SkippedExists,
    SkippedMissingField { field: String },
    SkippedInvalid { reason: String },
    Failed { reason: String },
}

/// What happened to one edge (a record with `targets` yields several)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum EdgeOutcome {
    Connected,
    /// Dry run: the edge would be created
    WouldConnect,
    SkippedAlreadyConnected,
    SkippedMissingEndpoint { side: EndpointSide, node_id: String },
    SkippedMissingField { field: String },
    SkippedSelfLoop,
    SkippedInvalid { reason: String },
    Failed { reason: String },
}

impl NodeOutcome {
    pub fn is_failure(&self) -> bool {
        matches!(self, NodeOutcome::Failed { .. })
    }

    pub fn is_skip(&self) -> bool {
        matches!(
            self,
            NodeOutcome::SkippedExists
                | NodeOutcome::SkippedMissingField { .. }
                | NodeOutcome::SkippedInvalid { .. }
        )
    }
}

impl EdgeOutcome {
    pub fn is_failure(&self) -> bool {
        matches!(self, EdgeOutcome::Failed { .. })
    }

    pub fn is_skip(&self) -> bool {
        matches!(
            self,
            EdgeOutcome::SkippedAlreadyConnected
                | EdgeOutcome::SkippedMissingEndpoint { .. }
                | EdgeOutcome::SkippedMissingField { .. }
                | EdgeOutcome::SkippedSelfLoop
                | EdgeOutcome::SkippedInvalid { .. }
        )
    }
}

/// Result of migrating a single node record
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeRecordResult {
    /// Position of the record in the source
    pub index: usize,
    pub node_id: Option<String>,
    pub outcome: NodeOutcome,
}

/// Result of migrating a single edge
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EdgeRecordResult {
    /// Position of the originating record in the source
    pub index: usize,
    pub source: Option<String>,
    pub target: Option<String>,
    pub relation: Option<RelationType>,
    pub outcome: EdgeOutcome,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MigrationCounts {
    pub nodes_total: usize,
    pub nodes_created: usize,
    pub nodes_skipped: usize,
    pub nodes_failed: usize,
    pub edges_total: usize,
    pub edges_connected: usize,
    pub edges_skipped: usize,
    pub edges_failed: usize,
}

/// Result of a migration run
///
/// Outcomes are listed in source order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MigrationReport {
    pub dry_run: bool,
    pub counts: MigrationCounts,
    pub nodes: Vec<NodeRecordResult>,
    pub edges: Vec<EdgeRecordResult>,
    pub duration_ms: u128,
}

impl MigrationReport {
    pub fn new(
        dry_run: bool,
        nodes: Vec<NodeRecordResult>,
        edges: Vec<EdgeRecordResult>,
        duration_ms: u128,
    ) -> Self {
        let mut counts = MigrationCounts {
            nodes_total: nodes.len(),
            edges_total: edges.len(),
            ..MigrationCounts::default()
        };

        for result in &nodes {
            match &result.outcome {
                NodeOutcome::Created | NodeOutcome::WouldCreate => counts.nodes_created += 1,
                NodeOutcome::Failed { .. } => counts.nodes_failed += 1,
                _ => counts.nodes_skipped += 1,
            }
        }
        for result in &edges {
            match &result.outcome {
                EdgeOutcome::Connected | EdgeOutcome::WouldConnect => counts.edges_connected += 1,
                EdgeOutcome::Failed { .. } => counts.edges_failed += 1,
                _ => counts.edges_skipped += 1,
            }
        }

        Self {
            dry_run,
            counts,
            nodes,
            edges,
            duration_ms,
        }
    }

    /// No record failed (skips are expected and don't count)
    pub fn is_clean(&self) -> bool {
        self.counts.nodes_failed == 0 && self.counts.edges_failed == 0
    }

    /// Nothing was (or would be) written
    pub fn is_noop(&self) -> bool {
        self.counts.nodes_created == 0 && self.counts.edges_connected == 0
    }
}
