//! SurrealStore - GraphStore Implementation for SurrealDB Backend
//!
//! Embedded SurrealDB (RocksDB engine) holding the tech tree.
//!
//! # Schema
//!
//! 1. **`tech_node` table** - SCHEMALESS; record id is `tech_node:<node_id>` and a
//!    UNIQUE index on `node_id` backs strict creation
//! 2. **`depends_on` / `parent_of`** - `TYPE RELATION IN tech_node OUT tech_node
//!    ENFORCED` tables, so an edge can never point at a missing node. Each has a
//!    UNIQUE index on `(in, out)` so at most one edge of a type exists per
//!    ordered pair
//! 3. **`parent_of` child index** - UNIQUE on `out`; a node has at most one parent
//!
//! Timestamps are stored as RFC 3339 strings.
//!
//! # Examples
//!
//! ```rust,no_run
//! use techtree_core::db::{GraphStore, SurrealStore};
//! use std::path::PathBuf;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let store = SurrealStore::new(PathBuf::from("./data/techtree.db")).await?;
//!     store.health_check().await?;
//!     Ok(())
//! }
//! ```

use crate::config::GraphConfig;
use crate::db::{GraphStore, StoreError};
use crate::models::{
    Direction, EdgeKey, Group, NodeType, NodeUpdate, RelationType, TechNode,
};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use futures::stream::{self, BoxStream, StreamExt, TryStreamExt};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::Arc;
use surrealdb::engine::local::{Db, RocksDb};
use surrealdb::sql::{Id, Thing};
use surrealdb::Surreal;

const NODE_TABLE: &str = "tech_node";

/// Rows fetched per `list_edges` page
const EDGE_PAGE_SIZE: i64 = 500;

pub const DEFAULT_NAMESPACE: &str = "techtree";
pub const DEFAULT_DATABASE: &str = "graph";

/// Internal struct matching the stored `tech_node` record
#[derive(Debug, Clone, Serialize, Deserialize)]
struct SurrealTechNode {
    node_id: String,
    #[serde(default)]
    label: Option<String>,
    #[serde(default)]
    node_type: Option<String>,
    #[serde(default)]
    category: Option<String>,
    #[serde(default)]
    subtype: Option<String>,
    #[serde(default)]
    trl_current: Option<String>,
    #[serde(default)]
    trl_projected_5_10_years: Option<String>,
    #[serde(default)]
    description: Option<String>,
    #[serde(default)]
    detailed_description: Option<String>,
    #[serde(default)]
    references: Vec<String>,
    #[serde(default)]
    analysis: Option<Value>,
    #[serde(default)]
    analysis_html_content: Option<String>,
    #[serde(default)]
    analysis_status: Option<String>,
    #[serde(default)]
    groups: Vec<Group>,
    #[serde(default)]
    extra_attributes: BTreeMap<String, Value>,
    created_at: String,
    modified_at: String,
}

impl From<&TechNode> for SurrealTechNode {
    fn from(node: &TechNode) -> Self {
        SurrealTechNode {
            node_id: node.node_id.clone(),
            label: node.label.clone(),
            node_type: node.node_type.as_ref().map(|t| t.as_str().to_string()),
            category: node.category.clone(),
            subtype: node.subtype.clone(),
            trl_current: node.trl_current.clone(),
            trl_projected_5_10_years: node.trl_projected_5_10_years.clone(),
            description: node.description.clone(),
            detailed_description: node.detailed_description.clone(),
            references: node.references.clone(),
            analysis: node.analysis.clone(),
            analysis_html_content: node.analysis_html_content.clone(),
            analysis_status: node.analysis_status.clone(),
            groups: node.groups.clone(),
            extra_attributes: node.extra_attributes.clone(),
            created_at: node.created_at.to_rfc3339(),
            modified_at: node.modified_at.to_rfc3339(),
        }
    }
}

impl TryFrom<SurrealTechNode> for TechNode {
    type Error = StoreError;

    fn try_from(sn: SurrealTechNode) -> Result<Self, Self::Error> {
        let parse_timestamp = |field: &str, value: &str| {
            DateTime::parse_from_rfc3339(value)
                .map(|dt| dt.with_timezone(&Utc))
                .map_err(|e| {
                    StoreError::serialization(format!(
                        "node '{}' has invalid {}: {}",
                        sn.node_id, field, e
                    ))
                })
        };
        let created_at = parse_timestamp("created_at", &sn.created_at)?;
        let modified_at = parse_timestamp("modified_at", &sn.modified_at)?;

        Ok(TechNode {
            node_id: sn.node_id,
            label: sn.label,
            node_type: sn.node_type.map(NodeType::from),
            category: sn.category,
            subtype: sn.subtype,
            trl_current: sn.trl_current,
            trl_projected_5_10_years: sn.trl_projected_5_10_years,
            description: sn.description,
            detailed_description: sn.detailed_description,
            references: sn.references,
            analysis: sn.analysis,
            analysis_html_content: sn.analysis_html_content,
            analysis_status: sn.analysis_status,
            groups: sn.groups,
            extra_attributes: sn.extra_attributes,
            created_at,
            modified_at,
        })
    }
}

#[derive(Debug, Deserialize)]
struct EdgeRecord {
    #[allow(dead_code)]
    id: Thing,
}

#[derive(Debug, Deserialize)]
struct EdgeRow {
    source: Option<String>,
    target: Option<String>,
}

/// Map a SurrealDB error into a `StoreError` about `subject`
fn surreal_error(subject: &str) -> impl Fn(surrealdb::Error) -> StoreError + '_ {
    move |err| StoreError::classify(err.to_string(), subject)
}

fn node_thing(node_id: &str) -> Thing {
    Thing::from((NODE_TABLE, Id::String(node_id.to_string())))
}

/// Graph store backed by embedded SurrealDB
pub struct SurrealStore {
    db: Arc<Surreal<Db>>,
}

impl SurrealStore {
    /// Open (or create) a store at `db_path` using the default namespace/database
    pub async fn new(db_path: PathBuf) -> Result<Self, StoreError> {
        Self::with_names(db_path, DEFAULT_NAMESPACE, DEFAULT_DATABASE).await
    }

    /// Open the store described by `config`
    pub async fn open(config: &GraphConfig) -> Result<Self, StoreError> {
        Self::with_names(
            config.database_path.clone(),
            &config.namespace,
            &config.database,
        )
        .await
    }

    pub async fn with_names(
        db_path: PathBuf,
        namespace: &str,
        database: &str,
    ) -> Result<Self, StoreError> {
        if let Some(parent) = db_path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| {
                StoreError::initialization(format!(
                    "Failed to create database directory {}: {}",
                    parent.display(),
                    e
                ))
            })?;
        }

        let db = Surreal::new::<RocksDb>(db_path).await.map_err(|e| {
            StoreError::initialization(format!(
                "Failed to initialize SurrealDB with RocksDB backend: {}",
                e
            ))
        })?;

        db.use_ns(namespace).use_db(database).await.map_err(|e| {
            StoreError::initialization(format!(
                "Failed to set namespace/database: {}",
                e
            ))
        })?;

        let db = Arc::new(db);
        Self::initialize_schema(&db).await?;

        tracing::info!(
            "SurrealStore ready (namespace: {}, database: {})",
            namespace,
            database
        );

        Ok(Self { db })
    }

    /// Define the node table, relation tables and their uniqueness indexes
    async fn initialize_schema(db: &Surreal<Db>) -> Result<(), StoreError> {
        let mut statements = vec![
            format!("DEFINE TABLE IF NOT EXISTS {} SCHEMALESS;", NODE_TABLE),
            format!(
                "DEFINE INDEX IF NOT EXISTS {0}_node_id_unique ON TABLE {0} FIELDS node_id UNIQUE;",
                NODE_TABLE
            ),
        ];

        for relation in RelationType::ALL {
            let table = relation.table();
            statements.push(format!(
                "DEFINE TABLE IF NOT EXISTS {0} SCHEMALESS TYPE RELATION IN {1} OUT {1} ENFORCED;",
                table, NODE_TABLE
            ));
            statements.push(format!(
                "DEFINE INDEX IF NOT EXISTS {0}_pair_unique ON TABLE {0} FIELDS in, out UNIQUE;",
                table
            ));
        }

        statements.push(format!(
            "DEFINE INDEX IF NOT EXISTS {0}_child_unique ON TABLE {0} FIELDS out UNIQUE;",
            RelationType::ParentOf.table()
        ));

        for statement in statements {
            db.query(statement.as_str())
                .await
                .and_then(|response| response.check())
                .map_err(|e| {
                    StoreError::initialization(format!(
                        "Failed to define schema ({}): {}",
                        statement, e
                    ))
                })?;
        }

        Ok(())
    }

    async fn require_node(&self, node_id: &str) -> Result<(), StoreError> {
        match self.get_node(node_id).await? {
            Some(_) => Ok(()),
            None => Err(StoreError::not_found(node_id)),
        }
    }

    /// Re-read both endpoints after a rejected `RELATE`
    async fn require_endpoints(&self, edge: &EdgeKey) -> Result<(), StoreError> {
        self.require_node(&edge.source_id).await?;
        self.require_node(&edge.target_id).await
    }

    async fn edge_page(
        &self,
        relation: RelationType,
        start: i64,
    ) -> Result<Vec<EdgeKey>, StoreError> {
        let query = format!(
            "SELECT id, in.node_id AS source, out.node_id AS target FROM {} ORDER BY id LIMIT $limit START $start;",
            relation.table()
        );

        let mut response = self
            .db
            .query(query)
            .bind(("limit", EDGE_PAGE_SIZE))
            .bind(("start", start))
            .await
            .map_err(surreal_error(relation.table()))?;

        let rows: Vec<EdgeRow> = response
            .take(0)
            .map_err(surreal_error(relation.table()))?;

        let edges = rows
            .into_iter()
            .filter_map(|row| match (row.source, row.target) {
                (Some(source), Some(target)) => Some(EdgeKey::new(source, target, relation)),
                _ => {
                    tracing::warn!("Skipping {} edge with a dangling endpoint", relation);
                    None
                }
            })
            .collect();

        Ok(edges)
    }
}

#[async_trait]
impl GraphStore for SurrealStore {
    async fn health_check(&self) -> Result<(), StoreError> {
        let mut response = self
            .db
            .query("RETURN 1;")
            .await
            .map_err(surreal_error("health check"))?;
        let value: Option<i64> = response.take(0).map_err(surreal_error("health check"))?;

        match value {
            Some(1) => Ok(()),
            other => Err(StoreError::unavailable(format!(
                "health check returned {:?}",
                other
            ))),
        }
    }

    async fn get_node(&self, node_id: &str) -> Result<Option<TechNode>, StoreError> {
        let mut response = self
            .db
            .query("SELECT * FROM type::table($table) WHERE node_id = $node_id LIMIT 1;")
            .bind(("table", NODE_TABLE))
            .bind(("node_id", node_id.to_string()))
            .await
            .map_err(surreal_error(node_id))?;

        let nodes: Vec<SurrealTechNode> = response.take(0).map_err(surreal_error(node_id))?;
        nodes.into_iter().next().map(TechNode::try_from).transpose()
    }

    async fn list_nodes(&self) -> Result<Vec<TechNode>, StoreError> {
        let mut response = self
            .db
            .query("SELECT * FROM type::table($table) ORDER BY node_id;")
            .bind(("table", NODE_TABLE))
            .await
            .map_err(surreal_error(NODE_TABLE))?;

        let nodes: Vec<SurrealTechNode> = response.take(0).map_err(surreal_error(NODE_TABLE))?;
        nodes.into_iter().map(TechNode::try_from).collect()
    }

    async fn create_node(&self, node: TechNode) -> Result<TechNode, StoreError> {
        let content = SurrealTechNode::from(&node);

        let mut response = self
            .db
            .query("CREATE type::thing($table, $id) CONTENT $content;")
            .bind(("table", NODE_TABLE))
            .bind(("id", node.node_id.clone()))
            .bind(("content", content))
            .await
            .map_err(surreal_error(&node.node_id))?;

        let created: Vec<SurrealTechNode> =
            response.take(0).map_err(surreal_error(&node.node_id))?;

        match created.into_iter().next() {
            Some(record) => TechNode::try_from(record),
            None => Err(StoreError::rejected(format!(
                "create of node '{}' returned no record",
                node.node_id
            ))),
        }
    }

    async fn update_node(
        &self,
        node_id: &str,
        update: NodeUpdate,
    ) -> Result<TechNode, StoreError> {
        let mut current = self
            .get_node(node_id)
            .await?
            .ok_or_else(|| StoreError::not_found(node_id))?;

        current.apply_update(update);
        let content = SurrealTechNode::from(&current);

        let mut response = self
            .db
            .query("UPDATE type::table($table) CONTENT $content WHERE node_id = $node_id RETURN AFTER;")
            .bind(("table", NODE_TABLE))
            .bind(("node_id", node_id.to_string()))
            .bind(("content", content))
            .await
            .map_err(surreal_error(node_id))?;

        let updated: Vec<SurrealTechNode> = response.take(0).map_err(surreal_error(node_id))?;

        // Empty when the node was deleted between the read and the write
        match updated.into_iter().next() {
            Some(record) => TechNode::try_from(record),
            None => Err(StoreError::not_found(node_id)),
        }
    }

    async fn delete_node(&self, node_id: &str) -> Result<(), StoreError> {
        self.require_node(node_id).await?;

        let query = format!(
            "BEGIN TRANSACTION;
             DELETE {} WHERE in = $node OR out = $node;
             DELETE {} WHERE in = $node OR out = $node;
             DELETE $node;
             COMMIT TRANSACTION;",
            RelationType::DependsOn.table(),
            RelationType::ParentOf.table(),
        );

        self.db
            .query(query)
            .bind(("node", node_thing(node_id)))
            .await
            .and_then(|response| response.check())
            .map_err(surreal_error(node_id))?;

        tracing::debug!("Deleted node '{}' and its edges", node_id);
        Ok(())
    }

    async fn connect(&self, edge: &EdgeKey) -> Result<bool, StoreError> {
        self.require_node(&edge.source_id).await?;
        self.require_node(&edge.target_id).await?;

        if self.is_connected(edge).await? {
            return Ok(false);
        }

        let query = format!("RELATE $source->{}->$target;", edge.relation.table());
        let subject = edge.to_string();

        let result = self
            .db
            .query(query)
            .bind(("source", node_thing(&edge.source_id)))
            .bind(("target", node_thing(&edge.target_id)))
            .await
            .and_then(|response| response.check());

        match result.map_err(surreal_error(&subject)) {
            Ok(_) => Ok(true),
            // Pair index: a concurrent caller created the same edge.
            // Child index: the target already has a different parent.
            Err(StoreError::Conflict { .. }) => {
                if self.is_connected(edge).await? {
                    Ok(false)
                } else {
                    Err(StoreError::conflict(&edge.target_id))
                }
            }
            // ENFORCED relation: an endpoint was deleted after the reads above
            Err(e) => {
                self.require_endpoints(edge).await?;
                Err(e)
            }
        }
    }

    async fn disconnect(&self, edge: &EdgeKey) -> Result<bool, StoreError> {
        let query = format!(
            "DELETE {} WHERE in = $source AND out = $target RETURN BEFORE;",
            edge.relation.table()
        );
        let subject = edge.to_string();

        let mut response = self
            .db
            .query(query)
            .bind(("source", node_thing(&edge.source_id)))
            .bind(("target", node_thing(&edge.target_id)))
            .await
            .map_err(surreal_error(&subject))?;

        let removed: Vec<EdgeRecord> = response.take(0).map_err(surreal_error(&subject))?;
        Ok(!removed.is_empty())
    }

    async fn is_connected(&self, edge: &EdgeKey) -> Result<bool, StoreError> {
        let query = format!(
            "SELECT id FROM {} WHERE in = $source AND out = $target LIMIT 1;",
            edge.relation.table()
        );
        let subject = edge.to_string();

        let mut response = self
            .db
            .query(query)
            .bind(("source", node_thing(&edge.source_id)))
            .bind(("target", node_thing(&edge.target_id)))
            .await
            .map_err(surreal_error(&subject))?;

        let existing: Vec<EdgeRecord> = response.take(0).map_err(surreal_error(&subject))?;
        Ok(!existing.is_empty())
    }

    fn list_edges(&self, relation: RelationType) -> BoxStream<'_, Result<EdgeKey, StoreError>> {
        stream::try_unfold(Some(0i64), move |start| async move {
            let Some(start) = start else {
                return Ok::<_, StoreError>(None);
            };
            let page = self.edge_page(relation, start).await?;
            let next = (page.len() as i64 == EDGE_PAGE_SIZE).then_some(start + EDGE_PAGE_SIZE);
            Ok(Some((page, next)))
        })
        .map_ok(|page| stream::iter(page.into_iter().map(Ok::<_, StoreError>)))
        .try_flatten()
        .boxed()
    }

    async fn neighbors(
        &self,
        node_id: &str,
        relation: RelationType,
        direction: Direction,
    ) -> Result<Vec<String>, StoreError> {
        let query = match direction {
            Direction::Outgoing => format!(
                "SELECT VALUE out.node_id FROM {} WHERE in = $node ORDER BY id;",
                relation.table()
            ),
            Direction::Incoming => format!(
                "SELECT VALUE in.node_id FROM {} WHERE out = $node ORDER BY id;",
                relation.table()
            ),
        };

        let mut response = self
            .db
            .query(query)
            .bind(("node", node_thing(node_id)))
            .await
            .map_err(surreal_error(node_id))?;

        let ids: Vec<Option<String>> = response.take(0).map_err(surreal_error(node_id))?;
        Ok(ids.into_iter().flatten().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::TempDir;

    async fn create_test_store() -> Result<(SurrealStore, TempDir), Box<dyn std::error::Error>> {
        let temp_dir = TempDir::new()?;
        let db_path = temp_dir.path().join("test_techtree.db");
        let store = SurrealStore::new(db_path).await?;
        Ok((store, temp_dir))
    }

    #[tokio::test]
    async fn test_health_check() -> Result<(), Box<dyn std::error::Error>> {
        let (store, _temp_dir) = create_test_store().await?;
        store.health_check().await?;
        Ok(())
    }

    #[tokio::test]
    async fn test_create_and_get_node() -> Result<(), Box<dyn std::error::Error>> {
        let (store, _temp_dir) = create_test_store().await?;

        let mut node = TechNode::new("rebco_magnets", "REBCO Magnets")
            .with_category("Magnets")
            .with_trl("4", "7");
        node.analysis = Some(json!({"summary": "promising"}));
        node.extra_attributes
            .insert("vendor".to_string(), json!("Acme"));

        store.create_node(node.clone()).await?;

        let fetched = store.get_node("rebco_magnets").await?.expect("node exists");
        assert_eq!(fetched.label.as_deref(), Some("REBCO Magnets"));
        assert_eq!(fetched.trl_projected_5_10_years.as_deref(), Some("7"));
        assert_eq!(fetched.analysis, Some(json!({"summary": "promising"})));
        assert_eq!(fetched.extra_attributes.get("vendor"), Some(&json!("Acme")));

        assert!(store.get_node("missing").await?.is_none());
        Ok(())
    }

    #[tokio::test]
    async fn test_create_rejects_duplicate_id() -> Result<(), Box<dyn std::error::Error>> {
        let (store, _temp_dir) = create_test_store().await?;

        store.create_node(TechNode::new("A", "Alpha")).await?;
        let err = store.create_node(TechNode::new("A", "Other")).await;

        assert!(matches!(err, Err(StoreError::Conflict { .. })));
        assert_eq!(store.list_nodes().await?.len(), 1);
        Ok(())
    }

    #[tokio::test]
    async fn test_update_node_merges_fields() -> Result<(), Box<dyn std::error::Error>> {
        let (store, _temp_dir) = create_test_store().await?;
        store
            .create_node(TechNode::new("A", "Alpha").with_category("Fuel"))
            .await?;

        let updated = store
            .update_node("A", NodeUpdate::new().with_description("Tritium breeding"))
            .await?;

        assert_eq!(updated.category.as_deref(), Some("Fuel"));
        assert_eq!(updated.description.as_deref(), Some("Tritium breeding"));

        let err = store.update_node("missing", NodeUpdate::new()).await;
        assert!(matches!(err, Err(StoreError::NotFound { .. })));
        Ok(())
    }

    #[tokio::test]
    async fn test_connect_is_idempotent() -> Result<(), Box<dyn std::error::Error>> {
        let (store, _temp_dir) = create_test_store().await?;
        store.create_node(TechNode::new("A", "Alpha")).await?;
        store.create_node(TechNode::new("B", "Beta")).await?;

        let edge = EdgeKey::depends_on("A", "B");
        assert!(store.connect(&edge).await?);
        assert!(!store.connect(&edge).await?);
        assert!(store.is_connected(&edge).await?);

        let edges: Vec<EdgeKey> = store
            .list_edges(RelationType::DependsOn)
            .try_collect()
            .await?;
        assert_eq!(edges, vec![edge.clone()]);

        let missing = store.connect(&EdgeKey::depends_on("A", "Z")).await;
        assert_eq!(missing, Err(StoreError::not_found("Z")));
        Ok(())
    }

    #[tokio::test]
    async fn test_disconnect_reports_removal() -> Result<(), Box<dyn std::error::Error>> {
        let (store, _temp_dir) = create_test_store().await?;
        store.create_node(TechNode::new("A", "Alpha")).await?;
        store.create_node(TechNode::new("B", "Beta")).await?;

        let edge = EdgeKey::parent_of("A", "B");
        store.connect(&edge).await?;

        assert!(store.disconnect(&edge).await?);
        assert!(!store.disconnect(&edge).await?);
        assert!(!store.is_connected(&edge).await?);
        Ok(())
    }

    #[tokio::test]
    async fn test_delete_node_cascades() -> Result<(), Box<dyn std::error::Error>> {
        let (store, _temp_dir) = create_test_store().await?;
        for id in ["X", "Y", "Z"] {
            store.create_node(TechNode::new(id, id)).await?;
        }
        store.connect(&EdgeKey::depends_on("X", "Y")).await?;
        store.connect(&EdgeKey::depends_on("Z", "X")).await?;
        store.connect(&EdgeKey::parent_of("Z", "X")).await?;

        store.delete_node("X").await?;

        assert!(store.get_node("X").await?.is_none());
        for relation in RelationType::ALL {
            let edges: Vec<EdgeKey> = store.list_edges(relation).try_collect().await?;
            assert!(edges.is_empty(), "{} edges survived delete", relation);
        }

        let again = store.delete_node("X").await;
        assert!(matches!(again, Err(StoreError::NotFound { .. })));
        Ok(())
    }

    #[tokio::test]
    async fn test_relation_rejects_missing_endpoint() -> Result<(), Box<dyn std::error::Error>> {
        let (store, _temp_dir) = create_test_store().await?;
        store.create_node(TechNode::new("A", "Alpha")).await?;

        // Bypass `connect` so only the table definition stands between us and
        // a dangling edge
        let result = store
            .db
            .query("RELATE $source->depends_on->$target;")
            .bind(("source", node_thing("A")))
            .bind(("target", node_thing("Z")))
            .await
            .and_then(|response| response.check());
        assert!(result.is_err());

        let edges: Vec<EdgeKey> = store
            .list_edges(RelationType::DependsOn)
            .try_collect()
            .await?;
        assert!(edges.is_empty());
        Ok(())
    }

    #[tokio::test]
    async fn test_second_parent_rejected() -> Result<(), Box<dyn std::error::Error>> {
        let (store, _temp_dir) = create_test_store().await?;
        for id in ["P1", "P2", "C"] {
            store.create_node(TechNode::new(id, id)).await?;
        }

        assert!(store.connect(&EdgeKey::parent_of("P1", "C")).await?);
        assert!(!store.connect(&EdgeKey::parent_of("P1", "C")).await?);

        let second = store.connect(&EdgeKey::parent_of("P2", "C")).await;
        assert_eq!(second, Err(StoreError::conflict("C")));

        let parents = store
            .neighbors("C", RelationType::ParentOf, Direction::Incoming)
            .await?;
        assert_eq!(parents, vec!["P1".to_string()]);

        // Dependencies are not limited to one per target
        assert!(store.connect(&EdgeKey::depends_on("P1", "C")).await?);
        assert!(store.connect(&EdgeKey::depends_on("P2", "C")).await?);
        Ok(())
    }

    #[tokio::test]
    async fn test_neighbors() -> Result<(), Box<dyn std::error::Error>> {
        let (store, _temp_dir) = create_test_store().await?;
        for id in ["A", "B", "C"] {
            store.create_node(TechNode::new(id, id)).await?;
        }
        store.connect(&EdgeKey::depends_on("A", "B")).await?;
        store.connect(&EdgeKey::depends_on("A", "C")).await?;

        let mut out = store
            .neighbors("A", RelationType::DependsOn, Direction::Outgoing)
            .await?;
        out.sort();
        assert_eq!(out, vec!["B".to_string(), "C".to_string()]);

        let incoming = store
            .neighbors("B", RelationType::DependsOn, Direction::Incoming)
            .await?;
        assert_eq!(incoming, vec!["A".to_string()]);
        Ok(())
    }
}
