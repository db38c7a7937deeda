//! Tech Node Data Structures
//!
//! This module defines [`TechNode`], the single entity type stored in the tech tree
//! graph, together with its sparse update type and validation errors.
//!
//! # Identity
//!
//! A node is identified by `node_id` alone. Two records carrying the same
//! `node_id` describe the same logical entity even when their attributes differ;
//! use [`TechNode::same_entity`] for identity comparisons and `==` for full
//! structural equality.
//!
//! # Flexible Schema
//!
//! The fixed field set covers everything the tech tree frontend renders. Any
//! additional attribute a source system supplies lands in `extra_attributes`
//! instead of being injected ad hoc.
//!
//! # Examples
//!
//! ```rust
//! use techtree_core::models::{NodeType, TechNode};
//!
//! let node = TechNode::new("fusion-ignition", "Fusion ignition")
//!     .with_node_type(NodeType::Milestone)
//!     .with_trl("4", "6");
//! assert!(node.validate().is_ok());
//! ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;
use thiserror::Error;

/// Validation errors for node operations
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("Missing required field: {0}")]
    MissingField(String),

    #[error("Invalid node ID: {0}")]
    InvalidId(String),

    #[error("Invalid field value for {field}: {reason}")]
    InvalidField { field: String, reason: String },
}

/// Kind of tech tree entity
///
/// Source data stores the type as a free-form string. The three known kinds map
/// to dedicated variants; anything else is preserved verbatim in `Other` so a
/// round trip through the store never loses information.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum NodeType {
    Milestone,
    EnablingTechnology,
    ReactorConcept,
    Other(String),
}

impl NodeType {
    pub fn as_str(&self) -> &str {
        match self {
            NodeType::Milestone => "Milestone",
            NodeType::EnablingTechnology => "EnablingTechnology",
            NodeType::ReactorConcept => "ReactorConcept",
            NodeType::Other(value) => value,
        }
    }
}

impl From<String> for NodeType {
    fn from(value: String) -> Self {
        match value.as_str() {
            "Milestone" => NodeType::Milestone,
            "EnablingTechnology" => NodeType::EnablingTechnology,
            "ReactorConcept" => NodeType::ReactorConcept,
            _ => NodeType::Other(value),
        }
    }
}

impl From<&str> for NodeType {
    fn from(value: &str) -> Self {
        NodeType::from(value.to_string())
    }
}

impl From<NodeType> for String {
    fn from(value: NodeType) -> Self {
        match value {
            NodeType::Other(value) => value,
            known => known.as_str().to_string(),
        }
    }
}

impl fmt::Display for NodeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Named classification bucket a node may belong to
///
/// Groups are an attribute list on the node, not a graph relationship.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Group {
    pub id: String,
    pub code: String,
}

impl Group {
    pub fn new(id: impl Into<String>, code: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            code: code.into(),
        }
    }
}

/// A milestone, enabling technology or reactor concept in the tech tree.
///
/// # Fields
///
/// - `node_id`: Globally unique, stable identifier (never empty)
/// - `trl_current` / `trl_projected_5_10_years`: Technology readiness levels as
///   supplied by analysts (strings such as `"4"` or `"4-5"`)
/// - `analysis`: Opaque structured analysis blob, rendered into
///   `analysis_html_content`, with `analysis_status` tracking its state
/// - `groups`: Classification buckets
/// - `extra_attributes`: Forward-compatible fields outside the fixed schema
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TechNode {
    pub node_id: String,

    #[serde(default)]
    pub label: Option<String>,

    #[serde(default)]
    pub node_type: Option<NodeType>,

    #[serde(default)]
    pub category: Option<String>,

    #[serde(default)]
    pub subtype: Option<String>,

    #[serde(default)]
    pub trl_current: Option<String>,

    #[serde(default, rename = "trl_projected_5_10_years")]
    pub trl_projected_5_10_years: Option<String>,

    #[serde(default)]
    pub description: Option<String>,

    #[serde(default)]
    pub detailed_description: Option<String>,

    /// Ordered list of citations
    #[serde(default)]
    pub references: Vec<String>,

    #[serde(default)]
    pub analysis: Option<Value>,

    #[serde(default)]
    pub analysis_html_content: Option<String>,

    #[serde(default)]
    pub analysis_status: Option<String>,

    #[serde(default)]
    pub groups: Vec<Group>,

    #[serde(default)]
    pub extra_attributes: BTreeMap<String, Value>,

    pub created_at: DateTime<Utc>,

    pub modified_at: DateTime<Utc>,
}

impl TechNode {
    /// Create a node with the given id and label; all other attributes empty
    pub fn new(node_id: impl Into<String>, label: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            node_id: node_id.into(),
            label: Some(label.into()),
            node_type: None,
            category: None,
            subtype: None,
            trl_current: None,
            trl_projected_5_10_years: None,
            description: None,
            detailed_description: None,
            references: Vec::new(),
            analysis: None,
            analysis_html_content: None,
            analysis_status: None,
            groups: Vec::new(),
            extra_attributes: BTreeMap::new(),
            created_at: now,
            modified_at: now,
        }
    }

    pub fn with_node_type(mut self, node_type: impl Into<NodeType>) -> Self {
        self.node_type = Some(node_type.into());
        self
    }

    pub fn with_category(mut self, category: impl Into<String>) -> Self {
        self.category = Some(category.into());
        self
    }

    pub fn with_trl(mut self, current: impl Into<String>, projected: impl Into<String>) -> Self {
        self.trl_current = Some(current.into());
        self.trl_projected_5_10_years = Some(projected.into());
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn with_references(mut self, references: Vec<String>) -> Self {
        self.references = references;
        self
    }

    pub fn with_group(mut self, group: Group) -> Self {
        self.groups.push(group);
        self
    }

    /// Identity comparison: same `node_id`, attributes ignored
    pub fn same_entity(&self, other: &TechNode) -> bool {
        self.node_id == other.node_id
    }

    /// Whether the node is tagged with the given group code
    pub fn in_group(&self, code: &str) -> bool {
        self.groups.iter().any(|group| group.code == code)
    }

    /// Validate node invariants
    ///
    /// # Errors
    ///
    /// - `MissingField("node_id")` if the id is empty or whitespace
    /// - `InvalidId` if the id has leading/trailing whitespace
    pub fn validate(&self) -> Result<(), ValidationError> {
        validate_node_id(&self.node_id)?;

        if let Some(label) = &self.label {
            if label.trim().is_empty() {
                return Err(ValidationError::InvalidField {
                    field: "label".to_string(),
                    reason: "label cannot be blank when provided".to_string(),
                });
            }
        }

        Ok(())
    }

    /// Apply a sparse update in place, bumping `modified_at` if anything changed
    pub fn apply_update(&mut self, update: NodeUpdate) {
        if update.is_empty() {
            return;
        }

        if let Some(label) = update.label {
            self.label = label;
        }
        if let Some(node_type) = update.node_type {
            self.node_type = node_type;
        }
        if let Some(category) = update.category {
            self.category = category;
        }
        if let Some(subtype) = update.subtype {
            self.subtype = subtype;
        }
        if let Some(trl_current) = update.trl_current {
            self.trl_current = trl_current;
        }
        if let Some(projected) = update.trl_projected_5_10_years {
            self.trl_projected_5_10_years = projected;
        }
        if let Some(description) = update.description {
            self.description = description;
        }
        if let Some(detailed) = update.detailed_description {
            self.detailed_description = detailed;
        }
        if let Some(references) = update.references {
            self.references = references;
        }
        if let Some(analysis) = update.analysis {
            self.analysis = analysis;
        }
        if let Some(html) = update.analysis_html_content {
            self.analysis_html_content = html;
        }
        if let Some(status) = update.analysis_status {
            self.analysis_status = status;
        }
        if let Some(groups) = update.groups {
            self.groups = groups;
        }
        if let Some(extra) = update.extra_attributes {
            // Null removes the key, anything else overwrites it
            for (key, value) in extra {
                if value.is_null() {
                    self.extra_attributes.remove(&key);
                } else {
                    self.extra_attributes.insert(key, value);
                }
            }
        }

        self.modified_at = Utc::now();
    }
}

/// Validate a node identifier
pub(crate) fn validate_node_id(node_id: &str) -> Result<(), ValidationError> {
    if node_id.trim().is_empty() {
        return Err(ValidationError::MissingField("node_id".to_string()));
    }

    if node_id.trim() != node_id {
        return Err(ValidationError::InvalidId(format!(
            "'{}' has leading or trailing whitespace",
            node_id
        )));
    }

    if node_id.chars().any(char::is_control) {
        return Err(ValidationError::InvalidId(format!(
            "'{}' contains control characters",
            node_id.escape_debug()
        )));
    }

    Ok(())
}

/// Accepts a plain value or null for double-Option fields
///
/// - Missing field → None (don't update)
/// - null → Some(None) (clear the field)
/// - "value" → Some(Some("value"))
fn deserialize_optional_field<'de, D, T>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Ok(Some(Option::<T>::deserialize(deserializer)?))
}

/// Sparse node update for PATCH-style merges
///
/// Nullable scalar fields use the double-Option pattern:
///
/// - `None`: Don't change this field
/// - `Some(None)`: Clear the field
/// - `Some(Some(value))`: Set the field
///
/// `extra_attributes` merges key by key; a JSON null value removes the key.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NodeUpdate {
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "deserialize_optional_field"
    )]
    pub label: Option<Option<String>>,

    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "deserialize_optional_field"
    )]
    pub node_type: Option<Option<NodeType>>,

    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "deserialize_optional_field"
    )]
    pub category: Option<Option<String>>,

    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "deserialize_optional_field"
    )]
    pub subtype: Option<Option<String>>,

    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "deserialize_optional_field"
    )]
    pub trl_current: Option<Option<String>>,

    #[serde(
        default,
        rename = "trl_projected_5_10_years",
        skip_serializing_if = "Option::is_none",
        deserialize_with = "deserialize_optional_field"
    )]
    pub trl_projected_5_10_years: Option<Option<String>>,

    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "deserialize_optional_field"
    )]
    pub description: Option<Option<String>>,

    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "deserialize_optional_field"
    )]
    pub detailed_description: Option<Option<String>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub references: Option<Vec<String>>,

    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "deserialize_optional_field"
    )]
    pub analysis: Option<Option<Value>>,

    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "deserialize_optional_field"
    )]
    pub analysis_html_content: Option<Option<String>>,

    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "deserialize_optional_field"
    )]
    pub analysis_status: Option<Option<String>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub groups: Option<Vec<Group>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub extra_attributes: Option<BTreeMap<String, Value>>,
}

impl NodeUpdate {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(Some(label.into()));
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(Some(description.into()));
        self
    }

    pub fn with_trl_current(mut self, trl: impl Into<String>) -> Self {
        self.trl_current = Some(Some(trl.into()));
        self
    }

    /// Merge update carrying only the fields a node actually provides
    ///
    /// `Some` scalars and non-empty collections count as provided; absent ones
    /// leave the stored value untouched. Used by upsert.
    pub fn from_node(node: &TechNode) -> Self {
        fn provided<T: Clone>(value: &Option<T>) -> Option<Option<T>> {
            value.as_ref().map(|v| Some(v.clone()))
        }

        Self {
            label: provided(&node.label),
            node_type: provided(&node.node_type),
            category: provided(&node.category),
            subtype: provided(&node.subtype),
            trl_current: provided(&node.trl_current),
            trl_projected_5_10_years: provided(&node.trl_projected_5_10_years),
            description: provided(&node.description),
            detailed_description: provided(&node.detailed_description),
            references: (!node.references.is_empty()).then(|| node.references.clone()),
            analysis: provided(&node.analysis),
            analysis_html_content: provided(&node.analysis_html_content),
            analysis_status: provided(&node.analysis_status),
            groups: (!node.groups.is_empty()).then(|| node.groups.clone()),
            extra_attributes: (!node.extra_attributes.is_empty())
                .then(|| node.extra_attributes.clone()),
        }
    }

    /// Full replacement of the fixed schema: absent values are cleared
    ///
    /// `extra_attributes` still merge key by key.
    pub fn replace_with(node: &TechNode) -> Self {
        Self {
            label: Some(node.label.clone()),
            node_type: Some(node.node_type.clone()),
            category: Some(node.category.clone()),
            subtype: Some(node.subtype.clone()),
            trl_current: Some(node.trl_current.clone()),
            trl_projected_5_10_years: Some(node.trl_projected_5_10_years.clone()),
            description: Some(node.description.clone()),
            detailed_description: Some(node.detailed_description.clone()),
            references: Some(node.references.clone()),
            analysis: Some(node.analysis.clone()),
            analysis_html_content: Some(node.analysis_html_content.clone()),
            analysis_status: Some(node.analysis_status.clone()),
            groups: Some(node.groups.clone()),
            extra_attributes: (!node.extra_attributes.is_empty())
                .then(|| node.extra_attributes.clone()),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.label.is_none()
            && self.node_type.is_none()
            && self.category.is_none()
            && self.subtype.is_none()
            && self.trl_current.is_none()
            && self.trl_projected_5_10_years.is_none()
            && self.description.is_none()
            && self.detailed_description.is_none()
            && self.references.is_none()
            && self.analysis.is_none()
            && self.analysis_html_content.is_none()
            && self.analysis_status.is_none()
            && self.groups.is_none()
            && self.extra_attributes.is_none()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_node_type_round_trips_unknown_values() {
        assert_eq!(NodeType::from("Milestone"), NodeType::Milestone);
        assert_eq!(
            NodeType::from("Facility"),
            NodeType::Other("Facility".to_string())
        );

        let json = serde_json::to_value(NodeType::EnablingTechnology).unwrap();
        assert_eq!(json, json!("EnablingTechnology"));

        let parsed: NodeType = serde_json::from_value(json!("Facility")).unwrap();
        assert_eq!(parsed.as_str(), "Facility");
    }

    #[test]
    fn test_validate_rejects_blank_ids() {
        assert!(TechNode::new("", "Label").validate().is_err());
        assert!(TechNode::new("   ", "Label").validate().is_err());
        assert!(matches!(
            TechNode::new(" padded", "Label").validate(),
            Err(ValidationError::InvalidId(_))
        ));
        assert!(TechNode::new("ok", "Label").validate().is_ok());
    }

    #[test]
    fn test_same_entity_ignores_attributes() {
        let a = TechNode::new("A", "First");
        let b = TechNode::new("A", "Second");
        assert!(a.same_entity(&b));
        assert_ne!(a, b);
    }

    #[test]
    fn test_from_node_only_carries_provided_fields() {
        let node = TechNode::new("A", "Label").with_category("Fuel cycle");
        let update = NodeUpdate::from_node(&node);

        assert_eq!(update.label, Some(Some("Label".to_string())));
        assert_eq!(update.category, Some(Some("Fuel cycle".to_string())));
        assert!(update.description.is_none());
        assert!(update.references.is_none());
    }

    #[test]
    fn test_apply_update_merges_and_clears() {
        let mut node = TechNode::new("A", "Label")
            .with_description("old")
            .with_category("keep");
        node.extra_attributes.insert("color".to_string(), json!("red"));
        node.extra_attributes.insert("size".to_string(), json!(3));

        let mut extra = BTreeMap::new();
        extra.insert("color".to_string(), Value::Null);
        extra.insert("shape".to_string(), json!("round"));

        node.apply_update(NodeUpdate {
            description: Some(None),
            trl_current: Some(Some("5".to_string())),
            extra_attributes: Some(extra),
            ..Default::default()
        });

        assert_eq!(node.description, None);
        assert_eq!(node.category.as_deref(), Some("keep"));
        assert_eq!(node.trl_current.as_deref(), Some("5"));
        assert!(!node.extra_attributes.contains_key("color"));
        assert_eq!(node.extra_attributes["size"], json!(3));
        assert_eq!(node.extra_attributes["shape"], json!("round"));
    }

    #[test]
    fn test_update_deserialization_distinguishes_null_and_missing() {
        let update: NodeUpdate =
            serde_json::from_value(json!({"label": "New", "description": null})).unwrap();

        assert_eq!(update.label, Some(Some("New".to_string())));
        assert_eq!(update.description, Some(None));
        assert!(update.category.is_none());
    }

    #[test]
    fn test_node_serializes_with_frontend_field_names() {
        let node = TechNode::new("A", "Label").with_trl("3", "6");
        let json = serde_json::to_value(&node).unwrap();

        assert_eq!(json["nodeId"], "A");
        assert_eq!(json["trlCurrent"], "3");
        assert_eq!(json["trl_projected_5_10_years"], "6");
    }
}
