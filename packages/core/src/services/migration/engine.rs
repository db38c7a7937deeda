//! Two-phase migration from a document source into the graph
//!
//! Phase 1 creates nodes, Phase 2 connects edges; Phase 2 starts only once every
//! node record has an outcome. Within a phase up to `concurrency` records are in
//! flight, and outcomes are reported in source order.
//!
//! `PARENT_OF` edges run in their own lane, one at a time, alongside the other
//! edges. Each hierarchy write then sees every earlier one, so the parent and
//! cycle checks hold across records as they do across calls.
//!
//! The node policy is additive-only: a node that already exists is reported as
//! `SkippedExists` and never overwritten, so re-running a migration is safe and
//! a second run over the same source writes nothing.
//!
//! A failure in one record never aborts the run. Only an unreadable source does.

use crate::config::MigrationConfig;
use crate::models::{EdgeKey, RelationType, TechNode, ValidationError};
use crate::services::consistency::{ConnectOutcome, ConsistentGraph};
use crate::services::error::{EndpointSide, GraphError};
use crate::services::migration::mapping::{map_edges, map_node};
use crate::services::migration::report::{
    EdgeOutcome, EdgeRecordResult, MigrationReport, NodeOutcome, NodeRecordResult,
};
use crate::services::migration::source::{DocumentSource, RawRecord};
use futures::stream::{self, StreamExt};
use serde_json::Value;
use std::collections::HashSet;
use std::time::Instant;
use tokio::sync::Mutex;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MigrationOptions {
    /// Records in flight per phase
    pub concurrency: usize,

    /// Map and check records without writing
    pub dry_run: bool,
}

impl Default for MigrationOptions {
    fn default() -> Self {
        Self::from(&MigrationConfig::default())
    }
}

impl From<&MigrationConfig> for MigrationOptions {
    fn from(config: &MigrationConfig) -> Self {
        Self {
            concurrency: config.concurrency,
            dry_run: false,
        }
    }
}

/// Edge work item after mapping
enum PendingEdge {
    Mapped(EdgeKey),
    Unmapped {
        source: Option<String>,
        target: Option<String>,
        error: ValidationError,
    },
}

impl PendingEdge {
    fn is_hierarchy(&self) -> bool {
        matches!(self, PendingEdge::Mapped(edge) if edge.relation == RelationType::ParentOf)
    }
}

/// What a dry run has already planned to write
#[derive(Default)]
struct Plan {
    nodes: Mutex<HashSet<String>>,
    edges: Mutex<HashSet<EdgeKey>>,
}

pub struct MigrationEngine {
    graph: ConsistentGraph,
    options: MigrationOptions,
}

impl MigrationEngine {
    pub fn new(graph: ConsistentGraph, options: MigrationOptions) -> Self {
        Self { graph, options }
    }

    pub fn options(&self) -> &MigrationOptions {
        &self.options
    }

    /// Migrate everything `source` provides
    ///
    /// # Errors
    ///
    /// - `Source` if the source can't be read; nothing has been written then
    pub async fn run(&self, source: &dyn DocumentSource) -> Result<MigrationReport, GraphError> {
        let start = Instant::now();
        let concurrency = self.options.concurrency.max(1);

        tracing::info!(
            "Starting migration from {} (concurrency: {}, dry run: {})",
            source.describe(),
            concurrency,
            self.options.dry_run
        );

        let node_records = source.fetch_nodes().await?;
        let edge_records = source.fetch_edges().await?;
        let plan = Plan::default();
        let plan = &plan;

        // Phase 1: nodes
        let nodes: Vec<NodeRecordResult> = stream::iter(node_records.iter().enumerate())
            .map(|(index, record)| self.migrate_node(index, record, plan))
            .buffered(concurrency)
            .collect()
            .await;

        tracing::info!(
            "Node phase complete: {} records, {} created, {} skipped, {} failed",
            nodes.len(),
            count_nodes(&nodes, |o| matches!(o, NodeOutcome::Created | NodeOutcome::WouldCreate)),
            count_nodes(&nodes, NodeOutcome::is_skip),
            count_nodes(&nodes, NodeOutcome::is_failure),
        );

        // Phase 2: edges
        let (hierarchy, others): (Vec<_>, Vec<_>) = edge_records
            .iter()
            .enumerate()
            .flat_map(|(index, record)| {
                expand_edge_record(record)
                    .into_iter()
                    .map(move |pending| (index, pending))
            })
            .enumerate()
            .partition(|(_, (_, pending))| pending.is_hierarchy());

        let hierarchy_lane = stream::iter(hierarchy)
            .map(|(position, (index, pending))| async move {
                (position, self.migrate_edge(index, pending, plan).await)
            })
            .buffered(1)
            .collect::<Vec<_>>();
        let other_lane = stream::iter(others)
            .map(|(position, (index, pending))| async move {
                (position, self.migrate_edge(index, pending, plan).await)
            })
            .buffered(concurrency)
            .collect::<Vec<_>>();

        let (mut edges, other_edges) = futures::join!(hierarchy_lane, other_lane);
        edges.extend(other_edges);
        edges.sort_by_key(|(position, _)| *position);
        let edges: Vec<EdgeRecordResult> = edges.into_iter().map(|(_, result)| result).collect();

        tracing::info!(
            "Edge phase complete: {} edges, {} connected, {} skipped, {} failed",
            edges.len(),
            count_edges(&edges, |o| matches!(o, EdgeOutcome::Connected | EdgeOutcome::WouldConnect)),
            count_edges(&edges, EdgeOutcome::is_skip),
            count_edges(&edges, EdgeOutcome::is_failure),
        );

        let report = MigrationReport::new(
            self.options.dry_run,
            nodes,
            edges,
            start.elapsed().as_millis(),
        );

        if !report.is_clean() {
            tracing::warn!(
                "Migration finished with {} node and {} edge failure(s)",
                report.counts.nodes_failed,
                report.counts.edges_failed
            );
        }

        Ok(report)
    }

    async fn migrate_node(&self, index: usize, record: &RawRecord, plan: &Plan) -> NodeRecordResult {
        let node = match map_node(record) {
            Ok(node) => node,
            Err(error) => {
                tracing::warn!("Skipping node record {}: {}", index, error);
                return NodeRecordResult {
                    index,
                    node_id: record.get("id").and_then(Value::as_str).map(String::from),
                    outcome: node_validation_outcome(error),
                };
            }
        };

        let node_id = node.node_id.clone();
        let outcome = self.place_node(node, plan).await;

        match &outcome {
            NodeOutcome::Failed { reason } => {
                tracing::warn!("Failed to migrate node '{}': {}", node_id, reason)
            }
            NodeOutcome::SkippedExists => {
                tracing::debug!("Node '{}' already exists, skipping creation", node_id)
            }
            other => tracing::debug!("Node '{}': {:?}", node_id, other),
        }

        NodeRecordResult {
            index,
            node_id: Some(node_id),
            outcome,
        }
    }

    async fn place_node(&self, node: TechNode, plan: &Plan) -> NodeOutcome {
        match self.graph.get_node(&node.node_id).await {
            Ok(Some(_)) => return NodeOutcome::SkippedExists,
            Ok(None) => {}
            Err(e) => {
                return NodeOutcome::Failed {
                    reason: e.to_string(),
                }
            }
        }

        if self.options.dry_run {
            return if plan.nodes.lock().await.insert(node.node_id.clone()) {
                NodeOutcome::WouldCreate
            } else {
                NodeOutcome::SkippedExists
            };
        }

        match self.graph.create_node(node).await {
            Ok(_) => NodeOutcome::Created,
            // Same id created concurrently (duplicate record in the source)
            Err(GraphError::Conflict(_)) => NodeOutcome::SkippedExists,
            Err(GraphError::Validation(error)) => node_validation_outcome(error),
            Err(e) => NodeOutcome::Failed {
                reason: e.to_string(),
            },
        }
    }

    async fn migrate_edge(&self, index: usize, pending: PendingEdge, plan: &Plan) -> EdgeRecordResult {
        let edge = match pending {
            PendingEdge::Mapped(edge) => edge,
            PendingEdge::Unmapped {
                source,
                target,
                error,
            } => {
                tracing::warn!("Skipping edge record {}: {}", index, error);
                return EdgeRecordResult {
                    index,
                    source,
                    target,
                    relation: None,
                    outcome: edge_validation_outcome(error),
                };
            }
        };

        let outcome = if self.options.dry_run {
            self.plan_edge(&edge, plan).await
        } else {
            self.place_edge(&edge).await
        };

        match &outcome {
            EdgeOutcome::Failed { reason } => {
                tracing::warn!("Failed to migrate edge {}: {}", edge, reason)
            }
            EdgeOutcome::SkippedMissingEndpoint { side, node_id } => {
                tracing::warn!("Missing {} node '{}' for edge {}", side, node_id, edge)
            }
            EdgeOutcome::SkippedSelfLoop => tracing::warn!("Skipping self-loop {}", edge),
            other => tracing::debug!("Edge {}: {:?}", edge, other),
        }

        EdgeRecordResult {
            index,
            source: Some(edge.source_id),
            target: Some(edge.target_id),
            relation: Some(edge.relation),
            outcome,
        }
    }

    async fn place_edge(&self, edge: &EdgeKey) -> EdgeOutcome {
        match self.graph.connect(edge).await {
            Ok(ConnectOutcome::Connected) => EdgeOutcome::Connected,
            Ok(ConnectOutcome::AlreadyConnected) => EdgeOutcome::SkippedAlreadyConnected,
            Err(GraphError::MissingEndpoint { side, node_id }) => {
                EdgeOutcome::SkippedMissingEndpoint { side, node_id }
            }
            Err(GraphError::SelfLoop { .. }) => EdgeOutcome::SkippedSelfLoop,
            Err(GraphError::Validation(error)) => edge_validation_outcome(error),
            Err(e) => EdgeOutcome::Failed {
                reason: e.to_string(),
            },
        }
    }

    /// Dry-run counterpart of `place_edge`; nodes planned in Phase 1 count as present
    async fn plan_edge(&self, edge: &EdgeKey, plan: &Plan) -> EdgeOutcome {
        if edge.is_self_loop() {
            return EdgeOutcome::SkippedSelfLoop;
        }

        for (side, node_id) in [
            (EndpointSide::Source, &edge.source_id),
            (EndpointSide::Target, &edge.target_id),
        ] {
            if plan.nodes.lock().await.contains(node_id) {
                continue;
            }
            match self.graph.get_node(node_id).await {
                Ok(Some(_)) => {}
                Ok(None) => {
                    return EdgeOutcome::SkippedMissingEndpoint {
                        side,
                        node_id: node_id.clone(),
                    }
                }
                Err(e) => {
                    return EdgeOutcome::Failed {
                        reason: e.to_string(),
                    }
                }
            }
        }

        match self.graph.is_connected(edge).await {
            Ok(true) => return EdgeOutcome::SkippedAlreadyConnected,
            Ok(false) => {}
            Err(e) => {
                return EdgeOutcome::Failed {
                    reason: e.to_string(),
                }
            }
        }

        if plan.edges.lock().await.insert(edge.clone()) {
            EdgeOutcome::WouldConnect
        } else {
            EdgeOutcome::SkippedAlreadyConnected
        }
    }
}

fn expand_edge_record(record: &RawRecord) -> Vec<PendingEdge> {
    match map_edges(record) {
        Ok(edges) => edges.into_iter().map(PendingEdge::Mapped).collect(),
        Err(error) => vec![PendingEdge::Unmapped {
            source: record.get("source").and_then(Value::as_str).map(String::from),
            target: record.get("target").and_then(Value::as_str).map(String::from),
            error,
        }],
    }
}

fn node_validation_outcome(error: ValidationError) -> NodeOutcome {
    match error {
        ValidationError::MissingField(field) => NodeOutcome::SkippedMissingField { field },
        other => NodeOutcome::SkippedInvalid {
            reason: other.to_string(),
        },
    }
}

fn edge_validation_outcome(error: ValidationError) -> EdgeOutcome {
    match error {
        ValidationError::MissingField(field) => EdgeOutcome::SkippedMissingField { field },
        other => EdgeOutcome::SkippedInvalid {
            reason: other.to_string(),
        },
    }
}

fn count_nodes(results: &[NodeRecordResult], pred: impl Fn(&NodeOutcome) -> bool) -> usize {
    results.iter().filter(|r| pred(&r.outcome)).count()
}

fn count_edges(results: &[EdgeRecordResult], pred: impl Fn(&EdgeOutcome) -> bool) -> usize {
    results.iter().filter(|r| pred(&r.outcome)).count()
}
