//! Raw record to entity mapping
//!
//! Node documents use the source's field names (`id`, `type`,
//! `detailedDescription`, `infact_*`). Keys this module doesn't know are kept in
//! `extra_attributes`, except store-internal keys starting with `_` (`_id`).

use crate::models::{EdgeKey, Group, NodeType, RelationType, TechNode, ValidationError};
use crate::services::migration::source::RawRecord;
use serde_json::Value;
use std::str::FromStr;

const KNOWN_NODE_FIELDS: [&str; 14] = [
    "id",
    "label",
    "type",
    "category",
    "subtype",
    "trl_current",
    "trl_projected_5_10_years",
    "description",
    "detailedDescription",
    "references",
    "infact_analysis",
    "infact_analysis_html_content",
    "infact_status",
    "groups",
];

/// Map a node document to a `TechNode`
///
/// # Errors
///
/// - `MissingField("id")` when the id is absent, null or blank
/// - `InvalidField` when a known field has an unusable shape
pub fn map_node(record: &RawRecord) -> Result<TechNode, ValidationError> {
    let node_id = string_field(record, "id")?
        .filter(|id| !id.trim().is_empty())
        .ok_or_else(|| ValidationError::MissingField("id".to_string()))?;

    let mut node = TechNode::new(node_id.trim(), "");
    node.label = string_field(record, "label")?.filter(|label| !label.trim().is_empty());
    node.node_type = string_field(record, "type")?.map(NodeType::from);
    node.category = string_field(record, "category")?;
    node.subtype = string_field(record, "subtype")?;
    node.trl_current = string_field(record, "trl_current")?;
    node.trl_projected_5_10_years = string_field(record, "trl_projected_5_10_years")?;
    node.description = string_field(record, "description")?;
    node.detailed_description = string_field(record, "detailedDescription")?;
    node.references = string_list(record, "references")?;
    node.analysis = record
        .get("infact_analysis")
        .filter(|value| !value.is_null())
        .cloned();
    node.analysis_html_content = string_field(record, "infact_analysis_html_content")?;
    node.analysis_status = string_field(record, "infact_status")?;
    node.groups = groups(record)?;

    node.extra_attributes = record
        .iter()
        .filter(|(key, _)| !key.starts_with('_') && !KNOWN_NODE_FIELDS.contains(&key.as_str()))
        .map(|(key, value)| (key.clone(), value.clone()))
        .collect();

    node.validate()?;
    Ok(node)
}

/// Map an edge document to the edges it describes
///
/// A non-empty `targets` list takes precedence and `target` is then ignored;
/// otherwise the single `target` is used. `relation` defaults to `DEPENDS_ON`.
pub fn map_edges(record: &RawRecord) -> Result<Vec<EdgeKey>, ValidationError> {
    let source = string_field(record, "source")?
        .filter(|id| !id.trim().is_empty())
        .ok_or_else(|| ValidationError::MissingField("source".to_string()))?;

    let relation = match string_field(record, "relation")? {
        Some(value) => RelationType::from_str(&value)?,
        None => RelationType::DependsOn,
    };

    let mut targets = string_list(record, "targets")?;
    targets.retain(|target| !target.trim().is_empty());
    if targets.is_empty() {
        targets.extend(string_field(record, "target")?);
        targets.retain(|target| !target.trim().is_empty());
    }

    if targets.is_empty() {
        return Err(ValidationError::MissingField("target".to_string()));
    }

    Ok(targets
        .into_iter()
        .map(|target| EdgeKey::new(source.trim(), target.trim(), relation))
        .collect())
}

/// Scalar as string; numbers and booleans are stringified, null is absent
fn string_field(record: &RawRecord, field: &str) -> Result<Option<String>, ValidationError> {
    match record.get(field) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(s)) => Ok(Some(s.clone())),
        Some(Value::Number(n)) => Ok(Some(n.to_string())),
        Some(Value::Bool(b)) => Ok(Some(b.to_string())),
        Some(other) => Err(invalid(field, format!("expected a scalar, got {}", other))),
    }
}

/// List of strings; a lone string is a one-element list
fn string_list(record: &RawRecord, field: &str) -> Result<Vec<String>, ValidationError> {
    match record.get(field) {
        None | Some(Value::Null) => Ok(Vec::new()),
        Some(Value::String(s)) => Ok(vec![s.clone()]),
        Some(Value::Array(items)) => items
            .iter()
            .filter(|item| !item.is_null())
            .map(|item| match item {
                Value::String(s) => Ok(s.clone()),
                Value::Number(n) => Ok(n.to_string()),
                other => Err(invalid(field, format!("unexpected list entry {}", other))),
            })
            .collect(),
        Some(other) => Err(invalid(field, format!("expected a list, got {}", other))),
    }
}

/// `groups` as `[{id, code}]`; a bare string is used as both id and code
fn groups(record: &RawRecord) -> Result<Vec<Group>, ValidationError> {
    let items = match record.get("groups") {
        None | Some(Value::Null) => return Ok(Vec::new()),
        Some(Value::Array(items)) => items,
        Some(other) => return Err(invalid("groups", format!("expected a list, got {}", other))),
    };

    items
        .iter()
        .map(|item| match item {
            Value::String(code) => Ok(Group::new(code.clone(), code.clone())),
            Value::Object(_) => serde_json::from_value::<Group>(item.clone())
                .map_err(|e| invalid("groups", e.to_string())),
            other => Err(invalid("groups", format!("unexpected entry {}", other))),
        })
        .collect()
}

fn invalid(field: &str, reason: String) -> ValidationError {
    ValidationError::InvalidField {
        field: field.to_string(),
        reason,
    }
}
