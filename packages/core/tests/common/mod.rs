//! Shared test stores
//!
//! `InstrumentedStore` wraps `MemoryStore` to reproduce the timing that a remote
//! backend shows and the in-process store doesn't: calls that suspend before
//! reaching the store, and writes whose acknowledgement arrives late.

#![allow(dead_code)]

use async_trait::async_trait;
use futures::stream::BoxStream;
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Duration;
use techtree_core::db::{GraphStore, MemoryStore, StoreError};
use techtree_core::models::{Direction, EdgeKey, NodeUpdate, RelationType, TechNode};

/// Delegates to `MemoryStore`
///
/// `upsert_node` is left to the provided method so its get-then-create sequence
/// goes through the instrumented calls below.
pub struct InstrumentedStore {
    pub inner: MemoryStore,
    yield_each_call: bool,
    ack_delay: Duration,
    slow_writes: AtomicU32,
}

impl InstrumentedStore {
    /// Every call yields to the scheduler once before touching the store, so
    /// concurrent callers interleave between their reads and writes
    pub fn yielding() -> Self {
        Self {
            inner: MemoryStore::new(),
            yield_each_call: true,
            ack_delay: Duration::ZERO,
            slow_writes: AtomicU32::new(0),
        }
    }

    /// The first `writes` writes commit, then take `delay` to acknowledge
    pub fn slow_ack(delay: Duration, writes: u32) -> Self {
        Self {
            inner: MemoryStore::new(),
            yield_each_call: false,
            ack_delay: delay,
            slow_writes: AtomicU32::new(writes),
        }
    }

    async fn before_call(&self) {
        if self.yield_each_call {
            tokio::task::yield_now().await;
        }
    }

    async fn after_write(&self) {
        let slow = self
            .slow_writes
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if slow {
            tokio::time::sleep(self.ack_delay).await;
        }
    }
}

#[async_trait]
impl GraphStore for InstrumentedStore {
    async fn health_check(&self) -> Result<(), StoreError> {
        self.inner.health_check().await
    }

    async fn get_node(&self, node_id: &str) -> Result<Option<TechNode>, StoreError> {
        self.before_call().await;
        self.inner.get_node(node_id).await
    }

    async fn list_nodes(&self) -> Result<Vec<TechNode>, StoreError> {
        self.before_call().await;
        self.inner.list_nodes().await
    }

    async fn create_node(&self, node: TechNode) -> Result<TechNode, StoreError> {
        self.before_call().await;
        let created = self.inner.create_node(node).await?;
        self.after_write().await;
        Ok(created)
    }

    async fn update_node(
        &self,
        node_id: &str,
        update: NodeUpdate,
    ) -> Result<TechNode, StoreError> {
        self.before_call().await;
        let updated = self.inner.update_node(node_id, update).await?;
        self.after_write().await;
        Ok(updated)
    }

    async fn delete_node(&self, node_id: &str) -> Result<(), StoreError> {
        self.before_call().await;
        self.inner.delete_node(node_id).await?;
        self.after_write().await;
        Ok(())
    }

    async fn connect(&self, edge: &EdgeKey) -> Result<bool, StoreError> {
        self.before_call().await;
        let created = self.inner.connect(edge).await?;
        self.after_write().await;
        Ok(created)
    }

    async fn disconnect(&self, edge: &EdgeKey) -> Result<bool, StoreError> {
        self.before_call().await;
        let removed = self.inner.disconnect(edge).await?;
        self.after_write().await;
        Ok(removed)
    }

    async fn is_connected(&self, edge: &EdgeKey) -> Result<bool, StoreError> {
        self.before_call().await;
        self.inner.is_connected(edge).await
    }

    fn list_edges(&self, relation: RelationType) -> BoxStream<'_, Result<EdgeKey, StoreError>> {
        self.inner.list_edges(relation)
    }

    async fn neighbors(
        &self,
        node_id: &str,
        relation: RelationType,
        direction: Direction,
    ) -> Result<Vec<String>, StoreError> {
        self.before_call().await;
        self.inner.neighbors(node_id, relation, direction).await
    }
}
