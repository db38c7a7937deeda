//! Graph Service - Tech Tree CRUD Operations
//!
//! This module provides the operation surface exposed to clients:
//!
//! - Node CRUD (create, read, full replace, partial update, delete)
//! - Edge CRUD addressed by endpoints, by opaque `EdgeId`, or by the legacy
//!   `source-target` handle
//! - Whole-graph read (`tech_tree`) in the frontend's shape
//! - Neighborhood reads (children, parent, dependencies, dependents, groups)
//!
//! # Edge Handles
//!
//! `EdgeId` is the canonical, unambiguous edge identifier. The legacy handle
//! joins source and target with `-` and is split at the *first* hyphen, so a
//! source id containing `-` cannot be addressed through it. It is kept for
//! existing clients and only addresses `DEPENDS_ON` edges.

use crate::db::{GraphStore, UpsertResult};
use crate::models::{
    parse_legacy_edge_id, Direction, EdgeId, EdgeKey, EdgeView, NodeUpdate, NodeView,
    RelationType, TechNode, TechTreeView,
};
use crate::services::consistency::{ConnectOutcome, ConsistentGraph};
use crate::services::error::GraphError;
use crate::services::retry::RetryPolicy;
use futures::TryStreamExt;
use std::sync::Arc;

#[derive(Clone)]
pub struct GraphService {
    graph: ConsistentGraph,
}

impl GraphService {
    pub fn new(store: Arc<dyn GraphStore>, retry: RetryPolicy) -> Self {
        Self::from_graph(ConsistentGraph::new(store, retry))
    }

    pub fn from_graph(graph: ConsistentGraph) -> Self {
        Self { graph }
    }

    pub fn graph(&self) -> &ConsistentGraph {
        &self.graph
    }

    pub async fn health_check(&self) -> Result<(), GraphError> {
        self.graph.health_check().await
    }

    // ========================================================================
    // Nodes
    // ========================================================================

    /// Get a node by id
    ///
    /// # Errors
    ///
    /// - `NotFound` if the node doesn't exist
    pub async fn get_node(&self, node_id: &str) -> Result<TechNode, GraphError> {
        self.graph.require_node(node_id).await
    }

    /// Create a node
    ///
    /// # Errors
    ///
    /// - `Conflict` if a node with the same id exists
    /// - `Validation` if the id is empty or malformed
    pub async fn create_node(&self, node: TechNode) -> Result<TechNode, GraphError> {
        let created = self.graph.create_node(node).await?;
        tracing::info!("Created node '{}'", created.node_id);
        Ok(created)
    }

    /// Create or merge a node by id
    pub async fn upsert_node(&self, node: TechNode) -> Result<UpsertResult, GraphError> {
        self.graph.upsert_node(node).await
    }

    /// Replace every fixed attribute of an existing node
    ///
    /// Fields absent from `node` are cleared. Extra attributes present on `node`
    /// are merged; others are kept.
    ///
    /// # Errors
    ///
    /// - `InvalidReference` if `node.node_id` differs from `node_id`
    /// - `NotFound` if the node doesn't exist
    pub async fn replace_node(
        &self,
        node_id: &str,
        node: TechNode,
    ) -> Result<TechNode, GraphError> {
        if node.node_id != node_id {
            return Err(GraphError::invalid_reference(format!(
                "body id '{}' does not match node '{}'",
                node.node_id, node_id
            )));
        }
        node.validate()?;

        let replaced = self
            .graph
            .update_node(node_id, NodeUpdate::replace_with(&node))
            .await?;
        tracing::info!("Replaced node '{}'", node_id);
        Ok(replaced)
    }

    /// Apply a partial update
    ///
    /// # Errors
    ///
    /// - `NotFound` if the node doesn't exist
    pub async fn update_node(
        &self,
        node_id: &str,
        update: NodeUpdate,
    ) -> Result<TechNode, GraphError> {
        if update.is_empty() {
            return self.get_node(node_id).await;
        }
        self.graph.update_node(node_id, update).await
    }

    /// Delete a node and every edge touching it
    ///
    /// # Errors
    ///
    /// - `NotFound` if the node doesn't exist
    pub async fn delete_node(&self, node_id: &str) -> Result<(), GraphError> {
        self.graph.delete_node(node_id).await?;
        tracing::info!("Deleted node '{}'", node_id);
        Ok(())
    }

    // ========================================================================
    // Edges
    // ========================================================================

    /// Create an edge between two existing nodes
    ///
    /// Creating an edge that already exists succeeds and returns the same view.
    pub async fn create_edge(
        &self,
        source_id: &str,
        target_id: &str,
        relation: RelationType,
    ) -> Result<EdgeView, GraphError> {
        let edge = EdgeKey::new(source_id, target_id, relation);
        match self.graph.connect(&edge).await? {
            ConnectOutcome::Connected => tracing::info!("Created edge {}", edge),
            ConnectOutcome::AlreadyConnected => {
                tracing::debug!("Edge {} already exists", edge)
            }
        }
        Ok(EdgeView::from(&edge))
    }

    /// Delete an edge addressed by its endpoints
    ///
    /// Returns whether an edge was removed.
    ///
    /// # Errors
    ///
    /// - `MissingEndpoint` if either node doesn't exist
    pub async fn delete_edge(
        &self,
        source_id: &str,
        target_id: &str,
        relation: RelationType,
    ) -> Result<bool, GraphError> {
        let edge = EdgeKey::new(source_id, target_id, relation);
        self.graph.resolve_endpoints(&edge).await?;
        self.graph.disconnect(&edge).await
    }

    /// Delete an edge addressed by its opaque id
    ///
    /// # Errors
    ///
    /// - `InvalidReference` if `edge_id` isn't an `EdgeId`
    /// - `NotFound` if no stored edge has this id
    pub async fn delete_edge_by_id(&self, edge_id: &str) -> Result<EdgeKey, GraphError> {
        let id: EdgeId = edge_id
            .parse()
            .map_err(|e| GraphError::invalid_reference(format!("{}", e)))?;

        let edge = self
            .find_edge(id)
            .await?
            .ok_or_else(|| GraphError::not_found(edge_id))?;

        self.graph.disconnect(&edge).await?;
        tracing::info!("Deleted edge {}", edge);
        Ok(edge)
    }

    /// Delete a `DEPENDS_ON` edge addressed by its legacy `source-target` handle
    ///
    /// # Errors
    ///
    /// - `InvalidReference` if the handle has no hyphen or an empty side
    /// - `MissingEndpoint` if the split ids don't both name nodes
    pub async fn delete_edge_by_legacy_id(&self, legacy_id: &str) -> Result<bool, GraphError> {
        let (source_id, target_id) = parse_legacy_edge_id(legacy_id)
            .map_err(|e| GraphError::invalid_reference(format!("{}", e)))?;
        self.delete_edge(&source_id, &target_id, RelationType::DependsOn)
            .await
    }

    async fn find_edge(&self, id: EdgeId) -> Result<Option<EdgeKey>, GraphError> {
        for relation in RelationType::ALL {
            let mut edges = self.graph.edge_stream(relation);
            while let Some(edge) = edges.try_next().await? {
                if edge.id() == id {
                    return Ok(Some(edge));
                }
            }
        }
        Ok(None)
    }

    // ========================================================================
    // Reads
    // ========================================================================

    /// Whole graph in the frontend's shape
    pub async fn tech_tree(&self) -> Result<TechTreeView, GraphError> {
        let nodes = self.graph.list_nodes().await?;
        let dependencies = self.graph.list_edges(RelationType::DependsOn).await?;
        let hierarchy = self.graph.list_edges(RelationType::ParentOf).await?;

        Ok(TechTreeView {
            nodes: nodes.into_iter().map(NodeView::from).collect(),
            edges: dependencies.iter().map(EdgeView::from).collect(),
            hierarchy: hierarchy.iter().map(EdgeView::from).collect(),
        })
    }

    pub async fn children_of(&self, node_id: &str) -> Result<Vec<TechNode>, GraphError> {
        self.related(node_id, RelationType::ParentOf, Direction::Outgoing)
            .await
    }

    pub async fn parent_of(&self, node_id: &str) -> Result<Option<TechNode>, GraphError> {
        Ok(self
            .related(node_id, RelationType::ParentOf, Direction::Incoming)
            .await?
            .into_iter()
            .next())
    }

    /// Nodes `node_id` depends on
    pub async fn dependencies_of(&self, node_id: &str) -> Result<Vec<TechNode>, GraphError> {
        self.related(node_id, RelationType::DependsOn, Direction::Outgoing)
            .await
    }

    /// Nodes that depend on `node_id`
    pub async fn dependents_of(&self, node_id: &str) -> Result<Vec<TechNode>, GraphError> {
        self.related(node_id, RelationType::DependsOn, Direction::Incoming)
            .await
    }

    pub async fn nodes_in_group(&self, group_code: &str) -> Result<Vec<TechNode>, GraphError> {
        Ok(self
            .graph
            .list_nodes()
            .await?
            .into_iter()
            .filter(|node| node.in_group(group_code))
            .collect())
    }

    async fn related(
        &self,
        node_id: &str,
        relation: RelationType,
        direction: Direction,
    ) -> Result<Vec<TechNode>, GraphError> {
        self.graph.require_node(node_id).await?;
        let ids = self.graph.neighbors(node_id, relation, direction).await?;

        let mut nodes = Vec::with_capacity(ids.len());
        for id in ids {
            // Skips neighbors deleted since the edge was read
            if let Some(node) = self.graph.get_node(&id).await? {
                nodes.push(node);
            }
        }
        nodes.sort_by(|a, b| a.node_id.cmp(&b.node_id));
        Ok(nodes)
    }
}
