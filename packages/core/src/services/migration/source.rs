//! Document sources for migration
//!
//! A source hands over every node record and every edge record as raw JSON
//! objects. Sources are read-only and pull-based: the engine fetches everything
//! before writing anything.

use crate::services::error::GraphError;
use async_trait::async_trait;
use serde_json::{Map, Value};
use std::path::{Path, PathBuf};

/// One document as read from the source
pub type RawRecord = Map<String, Value>;

pub const NODES_FILE: &str = "nodes.json";
pub const EDGES_FILE: &str = "edges.json";

#[async_trait]
pub trait DocumentSource: Send + Sync {
    /// Human-readable location, used in log output
    fn describe(&self) -> String;

    async fn fetch_nodes(&self) -> Result<Vec<RawRecord>, GraphError>;

    async fn fetch_edges(&self) -> Result<Vec<RawRecord>, GraphError>;
}

/// Document-store export on disk
///
/// Either a directory holding `nodes.json` and `edges.json`, or a single file
/// shaped `{"nodes": [...], "edges": [...]}`. Collection files may be a JSON
/// array or JSON Lines (one document per line, as `mongoexport` writes).
#[derive(Debug, Clone)]
pub struct JsonExportSource {
    location: PathBuf,
}

impl JsonExportSource {
    pub fn new(location: impl Into<PathBuf>) -> Self {
        Self {
            location: location.into(),
        }
    }

    async fn read(path: &Path) -> Result<String, GraphError> {
        tokio::fs::read_to_string(path)
            .await
            .map_err(|e| GraphError::source(format!("Failed to read {}: {}", path.display(), e)))
    }

    async fn collection(&self, key: &str, file: &str) -> Result<Vec<RawRecord>, GraphError> {
        if self.location.is_dir() {
            let path = self.location.join(file);
            if key == "edges" && !path.exists() {
                tracing::warn!("No {} in {}, migrating nodes only", file, self.location.display());
                return Ok(Vec::new());
            }
            let text = Self::read(&path).await?;
            return parse_records(&text)
                .map_err(|e| GraphError::source(format!("{}: {}", path.display(), e)));
        }

        let text = Self::read(&self.location).await?;
        let document: Value = serde_json::from_str(&text).map_err(|e| {
            GraphError::source(format!("{}: {}", self.location.display(), e))
        })?;

        match document.get(key) {
            Some(Value::Array(items)) => Ok(items.iter().map(into_record).collect()),
            Some(Value::Null) | None => Ok(Vec::new()),
            Some(_) => Err(GraphError::source(format!(
                "{}: '{}' must be an array",
                self.location.display(),
                key
            ))),
        }
    }
}

#[async_trait]
impl DocumentSource for JsonExportSource {
    fn describe(&self) -> String {
        self.location.display().to_string()
    }

    async fn fetch_nodes(&self) -> Result<Vec<RawRecord>, GraphError> {
        self.collection("nodes", NODES_FILE).await
    }

    async fn fetch_edges(&self) -> Result<Vec<RawRecord>, GraphError> {
        self.collection("edges", EDGES_FILE).await
    }
}

/// In-memory records
#[derive(Debug, Clone, Default)]
pub struct StaticSource {
    nodes: Vec<RawRecord>,
    edges: Vec<RawRecord>,
}

impl StaticSource {
    pub fn new(nodes: Vec<RawRecord>, edges: Vec<RawRecord>) -> Self {
        Self { nodes, edges }
    }

    /// Build from JSON values; non-object entries become empty records
    pub fn from_values(nodes: Vec<Value>, edges: Vec<Value>) -> Self {
        Self {
            nodes: nodes.iter().map(into_record).collect(),
            edges: edges.iter().map(into_record).collect(),
        }
    }
}

#[async_trait]
impl DocumentSource for StaticSource {
    fn describe(&self) -> String {
        format!(
            "static source ({} nodes, {} edges)",
            self.nodes.len(),
            self.edges.len()
        )
    }

    async fn fetch_nodes(&self) -> Result<Vec<RawRecord>, GraphError> {
        Ok(self.nodes.clone())
    }

    async fn fetch_edges(&self) -> Result<Vec<RawRecord>, GraphError> {
        Ok(self.edges.clone())
    }
}

/// Parse a JSON array or JSON Lines text into records
pub fn parse_records(text: &str) -> Result<Vec<RawRecord>, serde_json::Error> {
    let trimmed = text.trim_start();
    if trimmed.is_empty() {
        return Ok(Vec::new());
    }

    if trimmed.starts_with('[') {
        let items: Vec<Value> = serde_json::from_str(trimmed)?;
        return Ok(items.iter().map(into_record).collect());
    }

    text.lines()
        .filter(|line| !line.trim().is_empty())
        .map(|line| serde_json::from_str::<Value>(line).map(|value| into_record(&value)))
        .collect()
}

// Keeps one record per entry so the report stays aligned with the source
fn into_record(value: &Value) -> RawRecord {
    match value {
        Value::Object(map) => map.clone(),
        other => {
            tracing::warn!("Non-object record in source: {}", other);
            RawRecord::new()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::TempDir;

    #[test]
    fn test_parse_array_and_json_lines() {
        let array = parse_records(r#"[{"id": "A"}, {"id": "B"}]"#).unwrap();
        assert_eq!(array.len(), 2);

        let lines = parse_records("{\"id\": \"A\"}\n\n{\"id\": \"B\", \"_id\": {\"$oid\": \"x\"}}\n")
            .unwrap();
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[1]["id"], json!("B"));

        assert!(parse_records("   ").unwrap().is_empty());
        assert!(parse_records("{not json").is_err());
    }

    #[tokio::test]
    async fn test_directory_export() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join(NODES_FILE), r#"[{"id": "A"}, 7]"#).unwrap();
        std::fs::write(dir.path().join(EDGES_FILE), r#"{"source": "A", "target": "B"}"#).unwrap();

        let source = JsonExportSource::new(dir.path());
        let nodes = source.fetch_nodes().await.unwrap();
        assert_eq!(nodes.len(), 2);
        assert!(nodes[1].is_empty());
        assert_eq!(source.fetch_edges().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_directory_without_edges_file() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join(NODES_FILE), r#"[{"id": "A"}]"#).unwrap();

        let source = JsonExportSource::new(dir.path());
        assert!(source.fetch_edges().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_single_file_export() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("export.json");
        std::fs::write(
            &path,
            json!({"nodes": [{"id": "A"}], "edges": [{"source": "A", "targets": ["B", "C"]}]})
                .to_string(),
        )
        .unwrap();

        let source = JsonExportSource::new(&path);
        assert_eq!(source.fetch_nodes().await.unwrap().len(), 1);
        assert_eq!(source.fetch_edges().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_missing_location_is_source_error() {
        let source = JsonExportSource::new("/definitely/not/here.json");
        assert!(matches!(
            source.fetch_nodes().await,
            Err(GraphError::Source(_))
        ));
    }
}
