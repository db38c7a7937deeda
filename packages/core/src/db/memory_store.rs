//! In-memory GraphStore implementation
//!
//! Holds the whole graph behind a single `tokio::sync::RwLock`, so every method
//! is atomic with respect to the others. Used by tests and by embedders that
//! don't need persistence.

use crate::db::{GraphStore, StoreError};
use crate::models::{Direction, EdgeKey, NodeUpdate, RelationType, TechNode};
use async_trait::async_trait;
use futures::stream::{self, BoxStream, StreamExt};
use std::collections::{BTreeMap, BTreeSet};
use tokio::sync::RwLock;

#[derive(Debug, Default, Clone)]
struct GraphState {
    nodes: BTreeMap<String, TechNode>,
    edges: BTreeSet<EdgeKey>,
}

/// In-memory graph store
#[derive(Debug, Default)]
pub struct MemoryStore {
    state: RwLock<GraphState>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored edges of one relation
    pub async fn edge_count(&self, relation: RelationType) -> usize {
        let state = self.state.read().await;
        state
            .edges
            .iter()
            .filter(|edge| edge.relation == relation)
            .count()
    }

    pub async fn node_count(&self) -> usize {
        self.state.read().await.nodes.len()
    }
}

#[async_trait]
impl GraphStore for MemoryStore {
    async fn health_check(&self) -> Result<(), StoreError> {
        Ok(())
    }

    async fn get_node(&self, node_id: &str) -> Result<Option<TechNode>, StoreError> {
        Ok(self.state.read().await.nodes.get(node_id).cloned())
    }

    async fn list_nodes(&self) -> Result<Vec<TechNode>, StoreError> {
        Ok(self.state.read().await.nodes.values().cloned().collect())
    }

    async fn create_node(&self, node: TechNode) -> Result<TechNode, StoreError> {
        let mut state = self.state.write().await;
        if state.nodes.contains_key(&node.node_id) {
            return Err(StoreError::conflict(&node.node_id));
        }
        state.nodes.insert(node.node_id.clone(), node.clone());
        Ok(node)
    }

    async fn update_node(
        &self,
        node_id: &str,
        update: NodeUpdate,
    ) -> Result<TechNode, StoreError> {
        let mut state = self.state.write().await;
        let node = state
            .nodes
            .get_mut(node_id)
            .ok_or_else(|| StoreError::not_found(node_id))?;
        node.apply_update(update);
        Ok(node.clone())
    }

    async fn delete_node(&self, node_id: &str) -> Result<(), StoreError> {
        let mut state = self.state.write().await;
        if state.nodes.remove(node_id).is_none() {
            return Err(StoreError::not_found(node_id));
        }
        state
            .edges
            .retain(|edge| edge.source_id != node_id && edge.target_id != node_id);
        Ok(())
    }

    async fn connect(&self, edge: &EdgeKey) -> Result<bool, StoreError> {
        let mut state = self.state.write().await;
        for endpoint in [&edge.source_id, &edge.target_id] {
            if !state.nodes.contains_key(endpoint) {
                return Err(StoreError::not_found(endpoint.as_str()));
            }
        }
        if state.edges.contains(edge) {
            return Ok(false);
        }

        // A child has at most one parent
        let second_parent = edge.relation == RelationType::ParentOf
            && state.edges.iter().any(|existing| {
                existing.relation == RelationType::ParentOf
                    && existing.target_id == edge.target_id
            });
        if second_parent {
            return Err(StoreError::conflict(edge.target_id.as_str()));
        }

        Ok(state.edges.insert(edge.clone()))
    }

    async fn disconnect(&self, edge: &EdgeKey) -> Result<bool, StoreError> {
        Ok(self.state.write().await.edges.remove(edge))
    }

    async fn is_connected(&self, edge: &EdgeKey) -> Result<bool, StoreError> {
        Ok(self.state.read().await.edges.contains(edge))
    }

    fn list_edges(&self, relation: RelationType) -> BoxStream<'_, Result<EdgeKey, StoreError>> {
        stream::once(async move {
            let state = self.state.read().await;
            state
                .edges
                .iter()
                .filter(|edge| edge.relation == relation)
                .cloned()
                .map(Ok::<_, StoreError>)
                .collect::<Vec<_>>()
        })
        .flat_map(stream::iter)
        .boxed()
    }

    async fn neighbors(
        &self,
        node_id: &str,
        relation: RelationType,
        direction: Direction,
    ) -> Result<Vec<String>, StoreError> {
        let state = self.state.read().await;
        let ids = state
            .edges
            .iter()
            .filter(|edge| edge.relation == relation)
            .filter_map(|edge| match direction {
                Direction::Outgoing if edge.source_id == node_id => Some(edge.target_id.clone()),
                Direction::Incoming if edge.target_id == node_id => Some(edge.source_id.clone()),
                _ => None,
            })
            .collect();
        Ok(ids)
    }
}
