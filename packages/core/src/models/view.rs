//! Whole-graph read model
//!
//! Shape consumed by the tech tree frontend:
//! `{nodes: [{id, data: {...}}], edges: [{id, legacyId, source, target}]}`.

use crate::models::{EdgeKey, Group, TechNode};
use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TechTreeView {
    pub nodes: Vec<NodeView>,

    /// Dependency edges
    pub edges: Vec<EdgeView>,

    /// Parent/child edges
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub hierarchy: Vec<EdgeView>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeView {
    pub id: String,
    pub data: NodeData,
}

/// Node attributes using the frontend's field names
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NodeData {
    pub label: Option<String>,
    pub node_label: Option<String>,
    pub description: Option<String>,
    pub detailed_description: Option<String>,
    pub category: Option<String>,
    pub subtype: Option<String>,
    #[serde(rename = "trl_current")]
    pub trl_current: Option<String>,
    #[serde(rename = "trl_projected_5_10_years")]
    pub trl_projected_5_10_years: Option<String>,
    pub references: Vec<String>,
    #[serde(rename = "infact_analysis")]
    pub analysis: Option<Value>,
    #[serde(rename = "infact_analysis_html_content")]
    pub analysis_html_content: Option<String>,
    #[serde(rename = "infact_status")]
    pub analysis_status: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub groups: Vec<Group>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EdgeView {
    pub id: String,
    pub legacy_id: String,
    pub source: String,
    pub target: String,
}

impl From<TechNode> for NodeView {
    fn from(node: TechNode) -> Self {
        NodeView {
            id: node.node_id,
            data: NodeData {
                label: node.label,
                node_label: node.node_type.map(String::from),
                description: node.description,
                detailed_description: node.detailed_description,
                category: node.category,
                subtype: node.subtype,
                trl_current: node.trl_current,
                trl_projected_5_10_years: node.trl_projected_5_10_years,
                references: node.references,
                analysis: node.analysis,
                analysis_html_content: node.analysis_html_content,
                analysis_status: node.analysis_status,
                groups: node.groups,
            },
        }
    }
}

impl From<&EdgeKey> for EdgeView {
    fn from(edge: &EdgeKey) -> Self {
        EdgeView {
            id: edge.id().to_string(),
            legacy_id: edge.legacy_id(),
            source: edge.source_id.clone(),
            target: edge.target_id.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::NodeType;

    #[test]
    fn test_node_view_uses_frontend_field_names() {
        let node = TechNode::new("A", "Alpha")
            .with_node_type(NodeType::ReactorConcept)
            .with_trl("2", "4");
        let json = serde_json::to_value(NodeView::from(node)).unwrap();

        assert_eq!(json["id"], "A");
        assert_eq!(json["data"]["nodeLabel"], "ReactorConcept");
        assert_eq!(json["data"]["trl_current"], "2");
        assert_eq!(json["data"]["trl_projected_5_10_years"], "4");
        assert!(json["data"].get("infact_analysis").is_some());
        assert!(json["data"].get("groups").is_none());
    }

    #[test]
    fn test_edge_view_carries_both_handles() {
        let key = EdgeKey::depends_on("A", "B");
        let view = EdgeView::from(&key);

        assert_eq!(view.legacy_id, "A-B");
        assert_eq!(view.id, key.id().to_string());
        assert_eq!(view.source, "A");
        assert_eq!(view.target, "B");
    }
}
