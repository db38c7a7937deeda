//! GraphStore Trait - Graph Store Adapter
//!
//! This module defines the `GraphStore` trait, the only abstraction that talks
//! to persistent storage. Services receive it as `Arc<dyn GraphStore>` so tests
//! can substitute [`MemoryStore`](super::MemoryStore) for the embedded
//! SurrealDB backend.
//!
//! # Design Decisions
//!
//! 1. **Async-First**: All I/O methods are async; backends may be embedded or remote
//! 2. **Store-Arbitrated Uniqueness**: `create_node` is strict and reports a lost
//!    race as `StoreError::Conflict`; no in-process locks are held
//! 3. **Set-Semantics Edges**: `connect`/`disconnect` are idempotent and report
//!    whether they changed anything
//! 4. **Atomicity**: Single-node and single-edge mutations are atomic; there is no
//!    cross-call transaction
//!
//! # Examples
//!
//! ```rust,no_run
//! use techtree_core::db::{GraphStore, MemoryStore};
//! use techtree_core::models::{EdgeKey, TechNode};
//!
//! # async fn example() -> Result<(), techtree_core::db::StoreError> {
//! let store = MemoryStore::new();
//! store.create_node(TechNode::new("A", "Alpha")).await?;
//! store.create_node(TechNode::new("B", "Beta")).await?;
//!
//! assert!(store.connect(&EdgeKey::depends_on("A", "B")).await?);
//! assert!(!store.connect(&EdgeKey::depends_on("A", "B")).await?);
//! # Ok(())
//! # }
//! ```

use crate::db::StoreError;
use crate::models::{Direction, EdgeKey, NodeUpdate, RelationType, TechNode};
use async_trait::async_trait;
use futures::stream::BoxStream;

/// Result of an upsert: whether the node was created or merged
#[derive(Debug, Clone, PartialEq)]
pub enum UpsertResult {
    Created(TechNode),
    Updated(TechNode),
}

impl UpsertResult {
    pub fn node(&self) -> &TechNode {
        match self {
            UpsertResult::Created(node) | UpsertResult::Updated(node) => node,
        }
    }

    pub fn into_node(self) -> TechNode {
        match self {
            UpsertResult::Created(node) | UpsertResult::Updated(node) => node,
        }
    }

    pub fn was_created(&self) -> bool {
        matches!(self, UpsertResult::Created(_))
    }
}

/// Persistence capability for tech tree nodes and edges
///
/// Implementations must be `Send + Sync`; a single instance is shared by every
/// service in the process.
#[async_trait]
pub trait GraphStore: Send + Sync {
    /// Verify the store answers a trivial query
    async fn health_check(&self) -> Result<(), StoreError>;

    /// Get node by `node_id`
    ///
    /// Returns `Ok(None)` when the node doesn't exist (not an error).
    async fn get_node(&self, node_id: &str) -> Result<Option<TechNode>, StoreError>;

    /// All nodes ordered by `node_id`
    async fn list_nodes(&self) -> Result<Vec<TechNode>, StoreError>;

    /// Strict create
    ///
    /// # Errors
    ///
    /// - `Conflict` if a node with this `node_id` already exists, including when a
    ///   concurrent caller won the race
    async fn create_node(&self, node: TechNode) -> Result<TechNode, StoreError>;

    /// Merge the provided fields into an existing node
    ///
    /// # Errors
    ///
    /// - `NotFound` if the node doesn't exist
    async fn update_node(&self, node_id: &str, update: NodeUpdate)
        -> Result<TechNode, StoreError>;

    /// Create the node if absent, otherwise merge its provided scalar fields
    ///
    /// A creation race lost to a concurrent caller is retried as an update once
    /// the winner's record is visible, so two upserts never both create.
    async fn upsert_node(&self, node: TechNode) -> Result<UpsertResult, StoreError> {
        if self.get_node(&node.node_id).await?.is_none() {
            match self.create_node(node.clone()).await {
                Ok(created) => return Ok(UpsertResult::Created(created)),
                Err(StoreError::Conflict { .. }) => {
                    tracing::debug!(
                        "Lost creation race for node '{}', merging instead",
                        node.node_id
                    );
                }
                Err(e) => return Err(e),
            }
        }

        let update = NodeUpdate::from_node(&node);
        self.update_node(&node.node_id, update)
            .await
            .map(UpsertResult::Updated)
    }

    /// Delete a node and detach every edge touching it
    ///
    /// # Errors
    ///
    /// - `NotFound` if the node doesn't exist
    async fn delete_node(&self, node_id: &str) -> Result<(), StoreError>;

    /// Create an edge; returns `false` if it already existed
    ///
    /// # Errors
    ///
    /// - `NotFound` naming whichever endpoint is absent
    /// - `Conflict` when a `PARENT_OF` target already has a different parent
    async fn connect(&self, edge: &EdgeKey) -> Result<bool, StoreError>;

    /// Remove an edge; returns `false` (not an error) if it didn't exist
    async fn disconnect(&self, edge: &EdgeKey) -> Result<bool, StoreError>;

    async fn is_connected(&self, edge: &EdgeKey) -> Result<bool, StoreError>;

    /// Lazily stream every edge of one relation type
    ///
    /// The stream is finite. Each call starts a fresh traversal.
    fn list_edges(&self, relation: RelationType) -> BoxStream<'_, Result<EdgeKey, StoreError>>;

    /// Ids of nodes adjacent to `node_id` through `relation` in `direction`
    async fn neighbors(
        &self,
        node_id: &str,
        relation: RelationType,
        direction: Direction,
    ) -> Result<Vec<String>, StoreError>;
}
