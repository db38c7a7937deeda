//! Migration Engine Integration Tests
//!
//! Exercises full migration runs against `MemoryStore`, a flaky wrapper around it,
//! and the embedded SurrealDB store:
//!
//! - Re-running a migration writes nothing (additive-only, resumable)
//! - Duplicate and dangling edge records are reported, never fatal
//! - Transient store failures are retried per call
//! - Directory exports (`nodes.json` + `edges.json`) are read end to end
//! - Hierarchy records keep one parent per child and no cycles at any concurrency

mod common;

#[cfg(test)]
mod migration_engine_tests {
    use crate::common::InstrumentedStore;
    use anyhow::Result;
    use async_trait::async_trait;
    use futures::stream::BoxStream;
    use serde_json::json;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Arc;
    use std::time::Duration;
    use techtree_core::db::{GraphStore, MemoryStore, StoreError, SurrealStore};
    use techtree_core::models::{Direction, EdgeKey, NodeUpdate, RelationType, TechNode};
    use techtree_core::services::{
        ConsistentGraph, EdgeOutcome, EndpointSide, GraphService, JsonExportSource,
        MigrationEngine, MigrationOptions, NodeOutcome, RetryPolicy, StaticSource,
    };
    use tempfile::TempDir;
    use tokio_test::assert_ok;

    fn fast_retry(max_attempts: u32) -> RetryPolicy {
        RetryPolicy {
            max_attempts,
            initial_backoff: Duration::from_millis(1),
            max_backoff: Duration::from_millis(5),
            call_timeout: Duration::from_secs(5),
        }
    }

    fn engine(store: Arc<dyn GraphStore>) -> MigrationEngine {
        MigrationEngine::new(
            ConsistentGraph::new(store, fast_retry(3)),
            MigrationOptions {
                concurrency: 4,
                dry_run: false,
            },
        )
    }

    fn fusion_source() -> StaticSource {
        StaticSource::from_values(
            vec![
                json!({"id": "tokamak", "label": "Tokamak", "type": "ReactorConcept"}),
                json!({"id": "hts_magnets", "label": "HTS Magnets", "type": "EnablingTechnology"}),
                json!({"id": "tritium_breeding", "label": "Tritium Breeding"}),
                json!({"id": "first_plasma", "label": "First Plasma", "type": "Milestone"}),
            ],
            vec![
                json!({"source": "tokamak", "targets": ["hts_magnets", "tritium_breeding"]}),
                json!({"source": "first_plasma", "target": "tokamak"}),
                json!({"source": "tokamak", "target": "hts_magnets", "relation": "PARENT_OF"}),
            ],
        )
    }

    /// Delegates to `MemoryStore`; `create_node` and `connect` fail as
    /// unavailable for the first `failures` calls each
    struct FlakyStore {
        inner: MemoryStore,
        failures: u32,
        create_calls: AtomicU32,
        connect_calls: AtomicU32,
    }

    impl FlakyStore {
        fn new(failures: u32) -> Self {
            Self {
                inner: MemoryStore::new(),
                failures,
                create_calls: AtomicU32::new(0),
                connect_calls: AtomicU32::new(0),
            }
        }

        fn trip(&self, counter: &AtomicU32) -> Result<(), StoreError> {
            if counter.fetch_add(1, Ordering::SeqCst) < self.failures {
                Err(StoreError::unavailable("connection reset by peer"))
            } else {
                Ok(())
            }
        }
    }

    #[async_trait]
    impl GraphStore for FlakyStore {
        async fn health_check(&self) -> Result<(), StoreError> {
            self.inner.health_check().await
        }

        async fn get_node(&self, node_id: &str) -> Result<Option<TechNode>, StoreError> {
            self.inner.get_node(node_id).await
        }

        async fn list_nodes(&self) -> Result<Vec<TechNode>, StoreError> {
            self.inner.list_nodes().await
        }

        async fn create_node(&self, node: TechNode) -> Result<TechNode, StoreError> {
            self.trip(&self.create_calls)?;
            self.inner.create_node(node).await
        }

        async fn update_node(
            &self,
            node_id: &str,
            update: NodeUpdate,
        ) -> Result<TechNode, StoreError> {
            self.inner.update_node(node_id, update).await
        }

        async fn delete_node(&self, node_id: &str) -> Result<(), StoreError> {
            self.inner.delete_node(node_id).await
        }

        async fn connect(&self, edge: &EdgeKey) -> Result<bool, StoreError> {
            self.trip(&self.connect_calls)?;
            self.inner.connect(edge).await
        }

        async fn disconnect(&self, edge: &EdgeKey) -> Result<bool, StoreError> {
            self.inner.disconnect(edge).await
        }

        async fn is_connected(&self, edge: &EdgeKey) -> Result<bool, StoreError> {
            self.inner.is_connected(edge).await
        }

        fn list_edges(
            &self,
            relation: RelationType,
        ) -> BoxStream<'_, Result<EdgeKey, StoreError>> {
            self.inner.list_edges(relation)
        }

        async fn neighbors(
            &self,
            node_id: &str,
            relation: RelationType,
            direction: Direction,
        ) -> Result<Vec<String>, StoreError> {
            self.inner.neighbors(node_id, relation, direction).await
        }
    }

    #[tokio::test]
    async fn test_second_run_is_noop() -> Result<()> {
        let store = Arc::new(MemoryStore::new());
        let engine = engine(store.clone());
        let source = fusion_source();

        let first = assert_ok!(engine.run(&source).await);
        assert!(first.is_clean());
        assert_eq!(first.counts.nodes_created, 4);
        assert_eq!(first.counts.edges_connected, 4);

        let graph = GraphService::new(store.clone(), RetryPolicy::no_retry());
        let before = graph.tech_tree().await?;

        let second = assert_ok!(engine.run(&source).await);
        assert!(second.is_noop());
        assert!(second
            .nodes
            .iter()
            .all(|n| n.outcome == NodeOutcome::SkippedExists));
        assert!(second
            .edges
            .iter()
            .all(|e| e.outcome == EdgeOutcome::SkippedAlreadyConnected));

        assert_eq!(graph.tech_tree().await?, before);
        Ok(())
    }

    #[tokio::test]
    async fn test_existing_node_is_not_overwritten() -> Result<()> {
        let store = Arc::new(MemoryStore::new());
        store
            .create_node(TechNode::new("tokamak", "Curated Tokamak"))
            .await?;

        let report = engine(store.clone()).run(&fusion_source()).await?;

        assert_eq!(report.nodes[0].outcome, NodeOutcome::SkippedExists);
        let stored = store.get_node("tokamak").await?.expect("node kept");
        assert_eq!(stored.label.as_deref(), Some("Curated Tokamak"));
        Ok(())
    }

    #[tokio::test]
    async fn test_duplicate_edge_records_connect_once() -> Result<()> {
        let store = Arc::new(MemoryStore::new());
        let source = StaticSource::from_values(
            vec![json!({"id": "A"}), json!({"id": "B"})],
            vec![
                json!({"source": "A", "target": "B"}),
                json!({"source": "A", "target": "B"}),
            ],
        );

        let report = engine(store.clone()).run(&source).await?;

        let outcomes: Vec<&EdgeOutcome> = report.edges.iter().map(|e| &e.outcome).collect();
        assert_eq!(outcomes.len(), 2);
        assert!(outcomes.contains(&&EdgeOutcome::Connected));
        assert!(outcomes.contains(&&EdgeOutcome::SkippedAlreadyConnected));
        assert_eq!(store.edge_count(RelationType::DependsOn).await, 1);
        Ok(())
    }

    #[tokio::test]
    async fn test_dangling_edge_does_not_stop_migration() -> Result<()> {
        let store = Arc::new(MemoryStore::new());
        let source = StaticSource::from_values(
            vec![json!({"id": "A"}), json!({"id": "B"})],
            vec![
                json!({"source": "A", "target": "Z"}),
                json!({"source": "A", "target": "B"}),
            ],
        );

        let report = engine(store.clone()).run(&source).await?;

        assert_eq!(
            report.edges[0].outcome,
            EdgeOutcome::SkippedMissingEndpoint {
                side: EndpointSide::Target,
                node_id: "Z".to_string()
            }
        );
        assert_eq!(report.edges[1].outcome, EdgeOutcome::Connected);
        assert!(report.is_clean());
        assert!(store.get_node("Z").await?.is_none());
        Ok(())
    }

    #[tokio::test]
    async fn test_targets_expand_to_one_edge_each() -> Result<()> {
        let store = Arc::new(MemoryStore::new());
        let report = engine(store.clone()).run(&fusion_source()).await?;

        let from_first_record: Vec<_> = report.edges.iter().filter(|e| e.index == 0).collect();
        assert_eq!(from_first_record.len(), 2);
        assert_eq!(from_first_record[0].target.as_deref(), Some("hts_magnets"));
        assert_eq!(
            from_first_record[1].target.as_deref(),
            Some("tritium_breeding")
        );

        let service = GraphService::new(store, RetryPolicy::no_retry());
        let dependencies: Vec<String> = service
            .dependencies_of("tokamak")
            .await?
            .into_iter()
            .map(|n| n.node_id)
            .collect();
        assert_eq!(dependencies, vec!["hts_magnets", "tritium_breeding"]);
        Ok(())
    }

    #[tokio::test]
    async fn test_transient_failures_are_retried() -> Result<()> {
        let store = Arc::new(FlakyStore::new(2));
        let report = engine(store.clone()).run(&fusion_source()).await?;

        assert!(report.is_clean());
        assert_eq!(report.counts.nodes_created, 4);
        assert_eq!(report.counts.edges_connected, 4);
        assert_eq!(store.inner.node_count().await, 4);
        Ok(())
    }

    #[tokio::test]
    async fn test_exhausted_retries_fail_the_record_only() -> Result<()> {
        let store = Arc::new(FlakyStore::new(u32::MAX));
        let report = engine(store.clone()).run(&fusion_source()).await?;

        assert!(!report.is_clean());
        assert_eq!(report.counts.nodes_failed, 4);
        assert!(report.edges.iter().all(|e| matches!(
            e.outcome,
            EdgeOutcome::SkippedMissingEndpoint { .. }
        )));
        Ok(())
    }

    #[tokio::test]
    async fn test_competing_parents_resolve_to_one() -> Result<()> {
        let store = Arc::new(InstrumentedStore::yielding());
        let source = StaticSource::from_values(
            vec![json!({"id": "P1"}), json!({"id": "P2"}), json!({"id": "C"})],
            vec![
                json!({"source": "P1", "target": "C", "relation": "PARENT_OF"}),
                json!({"source": "P2", "target": "C", "relation": "PARENT_OF"}),
            ],
        );
        let engine = MigrationEngine::new(
            ConsistentGraph::new(store.clone(), fast_retry(3)),
            MigrationOptions {
                concurrency: 8,
                dry_run: false,
            },
        );

        let report = engine.run(&source).await?;

        assert_eq!(report.edges[0].outcome, EdgeOutcome::Connected);
        assert!(matches!(report.edges[1].outcome, EdgeOutcome::Failed { .. }));
        assert_eq!(
            store
                .inner
                .neighbors("C", RelationType::ParentOf, Direction::Incoming)
                .await?,
            vec!["P1".to_string()]
        );
        Ok(())
    }

    #[tokio::test]
    async fn test_hierarchy_cycle_across_records_is_rejected() -> Result<()> {
        let store = Arc::new(InstrumentedStore::yielding());
        let source = StaticSource::from_values(
            vec![json!({"id": "A"}), json!({"id": "B"}), json!({"id": "C"})],
            vec![
                json!({"source": "A", "target": "B", "relation": "PARENT_OF"}),
                json!({"source": "B", "target": "C", "relation": "PARENT_OF"}),
                json!({"source": "C", "target": "A", "relation": "PARENT_OF"}),
                json!({"source": "C", "target": "A"}),
            ],
        );
        let engine = MigrationEngine::new(
            ConsistentGraph::new(store.clone(), fast_retry(3)),
            MigrationOptions {
                concurrency: 8,
                dry_run: false,
            },
        );

        let report = engine.run(&source).await?;

        let outcomes: Vec<&EdgeOutcome> = report.edges.iter().map(|e| &e.outcome).collect();
        assert_eq!(outcomes[0], &EdgeOutcome::Connected);
        assert_eq!(outcomes[1], &EdgeOutcome::Connected);
        assert!(matches!(outcomes[2], EdgeOutcome::Failed { .. }));
        // Dependency edges run in the other lane and are unaffected
        assert_eq!(outcomes[3], &EdgeOutcome::Connected);
        assert_eq!(store.inner.edge_count(RelationType::ParentOf).await, 2);
        Ok(())
    }

    #[tokio::test]
    async fn test_json_export_directory_into_surreal() -> Result<()> {
        let export_dir = TempDir::new()?;
        std::fs::write(
            export_dir.path().join("nodes.json"),
            serde_json::to_string(&json!([
                {"_id": {"$oid": "1"}, "id": "A", "label": "Alpha"},
                {"id": "B", "label": "Beta", "groups": [{"id": "g1", "code": "MAG"}]}
            ]))?,
        )?;
        std::fs::write(
            export_dir.path().join("edges.json"),
            "{\"source\": \"A\", \"target\": \"B\"}\n{\"source\": \"B\", \"target\": \"C\"}\n",
        )?;

        let db_dir = TempDir::new()?;
        let store: Arc<dyn GraphStore> =
            Arc::new(SurrealStore::new(db_dir.path().join("test.db")).await?);
        let engine = engine(store.clone());

        let report = engine
            .run(&JsonExportSource::new(export_dir.path()))
            .await?;

        assert_eq!(report.counts.nodes_created, 2);
        assert_eq!(report.counts.edges_connected, 1);
        assert_eq!(report.counts.edges_skipped, 1);

        let service = GraphService::new(store, RetryPolicy::no_retry());
        let tree = service.tech_tree().await?;
        assert_eq!(tree.nodes.len(), 2);
        assert_eq!(tree.edges.len(), 1);
        assert_eq!(service.nodes_in_group("MAG").await?.len(), 1);
        Ok(())
    }

    #[tokio::test]
    async fn test_unreadable_source_aborts_before_writing() {
        let store = Arc::new(MemoryStore::new());
        let missing = std::env::temp_dir().join("techtree-missing-export-dir");

        let result = engine(store.clone())
            .run(&JsonExportSource::new(missing))
            .await;

        assert!(result.is_err());
        assert_eq!(store.node_count().await, 0);
    }
}
