//! Consistency rules over a [`GraphStore`]
//!
//! `ConsistentGraph` is the only path services use to reach the store. It
//! validates input, runs every store call under the [`RetryPolicy`], and enforces:
//!
//! - node identity: strict create, merge-on-upsert
//! - referential integrity: an edge needs both endpoints (`MissingEndpoint`)
//! - set-semantics edges: connecting twice yields `AlreadyConnected`
//! - hierarchy shape: no self-loops, a single parent per child, no cycles
//!
//! Uniqueness races are arbitrated by the store. A lost creation race surfaces
//! as `Conflict` and `upsert_node` turns it into a merge. The store also holds
//! the single-parent rule, so two concurrent `PARENT_OF` writes for one child
//! cannot both land.
//!
//! Strict writes that were retried after a missed deadline are resolved by
//! reading back: an earlier attempt may have committed, and the retry then sees
//! its own effect (`Conflict` on create, `NotFound` on delete, an edge already
//! present on connect).

use crate::db::{GraphStore, StoreError, UpsertResult};
use crate::models::node::validate_node_id;
use crate::models::{Direction, EdgeKey, NodeUpdate, RelationType, TechNode};
use crate::services::error::{EndpointSide, GraphError};
use crate::services::retry::{RetryPolicy, WriteOutcome};
use futures::stream::BoxStream;
use futures::TryStreamExt;
use serde::{Deserialize, Serialize};
use std::collections::{HashSet, VecDeque};
use std::sync::Arc;

/// Result of a connect request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConnectOutcome {
    Connected,
    AlreadyConnected,
}

impl ConnectOutcome {
    pub fn is_new(&self) -> bool {
        matches!(self, ConnectOutcome::Connected)
    }
}

#[derive(Clone)]
pub struct ConsistentGraph {
    store: Arc<dyn GraphStore>,
    retry: RetryPolicy,
}

impl ConsistentGraph {
    pub fn new(store: Arc<dyn GraphStore>, retry: RetryPolicy) -> Self {
        Self { store, retry }
    }

    pub fn store(&self) -> &Arc<dyn GraphStore> {
        &self.store
    }

    pub fn retry_policy(&self) -> &RetryPolicy {
        &self.retry
    }

    pub async fn health_check(&self) -> Result<(), GraphError> {
        self.retry
            .run("health_check", || self.store.health_check())
            .await
            .map_err(GraphError::from)
    }

    pub async fn get_node(&self, node_id: &str) -> Result<Option<TechNode>, GraphError> {
        Ok(self
            .retry
            .run("get_node", || self.store.get_node(node_id))
            .await?)
    }

    /// Get a node that must exist
    pub async fn require_node(&self, node_id: &str) -> Result<TechNode, GraphError> {
        self.get_node(node_id)
            .await?
            .ok_or_else(|| GraphError::not_found(node_id))
    }

    pub async fn list_nodes(&self) -> Result<Vec<TechNode>, GraphError> {
        Ok(self
            .retry
            .run("list_nodes", || self.store.list_nodes())
            .await?)
    }

    /// Strict create; `Conflict` when the id is taken
    pub async fn create_node(&self, node: TechNode) -> Result<TechNode, GraphError> {
        node.validate()?;
        let node_id = node.node_id.clone();

        let WriteOutcome { result, uncertain } = self
            .retry
            .run_write("create_node", || self.store.create_node(node.clone()))
            .await;

        match result {
            Ok(created) => {
                tracing::debug!("Created node '{}'", created.node_id);
                Ok(created)
            }
            Err(StoreError::Conflict { .. }) => {
                if uncertain {
                    if let Some(stored) = self.get_node(&node_id).await? {
                        if is_same_write(&stored, &node) {
                            tracing::debug!(
                                "Created node '{}' (acknowledged on readback)",
                                node_id
                            );
                            return Ok(stored);
                        }
                    }
                }
                Err(GraphError::conflict(format!(
                    "node '{}' already exists",
                    node_id
                )))
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Create the node or merge its provided fields into the existing one
    pub async fn upsert_node(&self, node: TechNode) -> Result<UpsertResult, GraphError> {
        node.validate()?;
        Ok(self
            .retry
            .run("upsert_node", || self.store.upsert_node(node.clone()))
            .await?)
    }

    pub async fn update_node(
        &self,
        node_id: &str,
        update: NodeUpdate,
    ) -> Result<TechNode, GraphError> {
        validate_node_id(node_id)?;
        Ok(self
            .retry
            .run("update_node", || {
                self.store.update_node(node_id, update.clone())
            })
            .await?)
    }

    /// Delete a node; the store detaches its edges
    pub async fn delete_node(&self, node_id: &str) -> Result<(), GraphError> {
        let WriteOutcome { result, uncertain } = self
            .retry
            .run_write("delete_node", || self.store.delete_node(node_id))
            .await;

        match result {
            Ok(()) => {}
            // A timed-out attempt removed it
            Err(StoreError::NotFound { .. }) if uncertain => {}
            Err(e) => return Err(e.into()),
        }
        tracing::debug!("Deleted node '{}'", node_id);
        Ok(())
    }

    /// Ensure both endpoints of `edge` exist
    pub async fn resolve_endpoints(&self, edge: &EdgeKey) -> Result<(), GraphError> {
        if self.get_node(&edge.source_id).await?.is_none() {
            return Err(GraphError::missing_endpoint(
                EndpointSide::Source,
                &edge.source_id,
            ));
        }
        if self.get_node(&edge.target_id).await?.is_none() {
            return Err(GraphError::missing_endpoint(
                EndpointSide::Target,
                &edge.target_id,
            ));
        }
        Ok(())
    }

    /// Connect two existing nodes
    ///
    /// # Errors
    ///
    /// - `SelfLoop` when source and target are the same node
    /// - `MissingEndpoint` naming the absent side
    /// - `Conflict` when a `PARENT_OF` child already has a different parent
    /// - `HierarchyCycle` when the child is an ancestor of the parent
    pub async fn connect(&self, edge: &EdgeKey) -> Result<ConnectOutcome, GraphError> {
        validate_node_id(&edge.source_id)?;
        validate_node_id(&edge.target_id)?;

        if edge.is_self_loop() {
            return Err(GraphError::self_loop(&edge.source_id, edge.relation));
        }

        self.resolve_endpoints(edge).await?;

        if self.is_connected(edge).await? {
            return Ok(ConnectOutcome::AlreadyConnected);
        }

        if edge.relation == RelationType::ParentOf {
            self.check_hierarchy(edge).await?;
        }

        let WriteOutcome { result, uncertain } = self
            .retry
            .run_write("connect", || self.store.connect(edge))
            .await;

        match result {
            // The edge was absent before the write, so a retry finding it present
            // is seeing an earlier attempt that committed
            Ok(created) => {
                if created || uncertain {
                    tracing::debug!("Connected {}", edge);
                    Ok(ConnectOutcome::Connected)
                } else {
                    Ok(ConnectOutcome::AlreadyConnected)
                }
            }
            // Endpoint deleted between resolution and the write
            Err(StoreError::NotFound { id }) => {
                let side = if id == edge.source_id {
                    EndpointSide::Source
                } else {
                    EndpointSide::Target
                };
                Err(GraphError::missing_endpoint(side, id))
            }
            // Another writer gave the child a parent after the hierarchy check
            Err(StoreError::Conflict { .. }) if edge.relation == RelationType::ParentOf => {
                Err(GraphError::conflict(format!(
                    "node '{}' already has a parent",
                    edge.target_id
                )))
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Remove an edge; `false` when there was nothing to remove
    pub async fn disconnect(&self, edge: &EdgeKey) -> Result<bool, GraphError> {
        let WriteOutcome { result, uncertain } = self
            .retry
            .run_write("disconnect", || self.store.disconnect(edge))
            .await;
        // After a missed deadline the retry cannot tell our own removal from an
        // edge that was never there; the timed-out attempt is credited
        let removed = result? || uncertain;
        if removed {
            tracing::debug!("Disconnected {}", edge);
        }
        Ok(removed)
    }

    pub async fn is_connected(&self, edge: &EdgeKey) -> Result<bool, GraphError> {
        Ok(self
            .retry
            .run("is_connected", || self.store.is_connected(edge))
            .await?)
    }

    /// Collect every edge of `relation`; a failed traversal restarts from scratch
    pub async fn list_edges(&self, relation: RelationType) -> Result<Vec<EdgeKey>, GraphError> {
        Ok(self
            .retry
            .run("list_edges", || {
                self.store.list_edges(relation).try_collect::<Vec<_>>()
            })
            .await?)
    }

    /// Lazy edge traversal without retry, for early-exit scans
    pub fn edge_stream(&self, relation: RelationType) -> BoxStream<'_, Result<EdgeKey, StoreError>> {
        self.store.list_edges(relation)
    }

    pub async fn neighbors(
        &self,
        node_id: &str,
        relation: RelationType,
        direction: Direction,
    ) -> Result<Vec<String>, GraphError> {
        Ok(self
            .retry
            .run("neighbors", || {
                self.store.neighbors(node_id, relation, direction)
            })
            .await?)
    }

    async fn check_hierarchy(&self, edge: &EdgeKey) -> Result<(), GraphError> {
        let parent_id = &edge.source_id;
        let child_id = &edge.target_id;

        let existing_parents = self
            .neighbors(child_id, RelationType::ParentOf, Direction::Incoming)
            .await?;
        if let Some(current) = existing_parents.iter().find(|p| *p != parent_id) {
            return Err(GraphError::conflict(format!(
                "node '{}' already has parent '{}'",
                child_id, current
            )));
        }

        // Walk the new parent's ancestors; reaching the child means a cycle
        let mut visited = HashSet::new();
        let mut queue = VecDeque::from([parent_id.clone()]);
        while let Some(current) = queue.pop_front() {
            if !visited.insert(current.clone()) {
                continue;
            }
            let ancestors = self
                .neighbors(&current, RelationType::ParentOf, Direction::Incoming)
                .await?;
            for ancestor in ancestors {
                if &ancestor == child_id {
                    return Err(GraphError::hierarchy_cycle(parent_id, child_id));
                }
                queue.push_back(ancestor);
            }
        }

        Ok(())
    }
}

/// Whether `stored` is the node this caller submitted
///
/// Timestamps are taken when the caller builds the node, so a concurrent writer
/// with the same id is told apart from our own earlier attempt.
fn is_same_write(stored: &TechNode, submitted: &TechNode) -> bool {
    stored.created_at == submitted.created_at && stored.modified_at == submitted.modified_at
}
