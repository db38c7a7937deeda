//! Edge identity and relation types
//!
//! Edges have no primary key of their own. An edge is the ordered triple
//! `(source_id, target_id, relation)` captured by [`EdgeKey`]; the graph holds
//! each triple at most once.
//!
//! # Edge Handles
//!
//! - [`EdgeId`] - Opaque, deterministic UUID v5 over the triple. Unambiguous for
//!   any node ids and stable across processes.
//! - Legacy `source-target` handles ([`legacy_edge_id`]) exist for clients of the
//!   previous API. They cannot be split reliably when a node id contains `-`;
//!   [`parse_legacy_edge_id`] always splits at the first separator.

use crate::models::ValidationError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// Separator used by legacy `source-target` edge handles
pub const LEGACY_EDGE_SEPARATOR: char = '-';

/// Namespace for deterministic edge ids
const EDGE_ID_NAMESPACE: Uuid = Uuid::from_u128(0x6f3c_2a1e_9b4d_4c7a_8e52_1d0f_b7a3_c915);

/// Relation carried by an edge
///
/// Dependency and hierarchy edges live in separate relation tables and never
/// stand in for each other.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RelationType {
    /// Source requires target
    DependsOn,
    /// Source is the structural parent of target
    ParentOf,
}

impl RelationType {
    pub const ALL: [RelationType; 2] = [RelationType::DependsOn, RelationType::ParentOf];

    pub fn as_str(&self) -> &'static str {
        match self {
            RelationType::DependsOn => "DEPENDS_ON",
            RelationType::ParentOf => "PARENT_OF",
        }
    }

    /// Relation table name in the graph store
    pub fn table(&self) -> &'static str {
        match self {
            RelationType::DependsOn => "depends_on",
            RelationType::ParentOf => "parent_of",
        }
    }
}

impl fmt::Display for RelationType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RelationType {
    type Err = ValidationError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_uppercase().as_str() {
            "DEPENDS_ON" => Ok(RelationType::DependsOn),
            "PARENT_OF" => Ok(RelationType::ParentOf),
            other => Err(ValidationError::InvalidField {
                field: "relation".to_string(),
                reason: format!("unknown relation type '{}'", other),
            }),
        }
    }
}

/// Traversal direction relative to a node
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    /// Edges where the node is the source
    Outgoing,
    /// Edges where the node is the target
    Incoming,
}

/// Identity of an edge: ordered pair plus relation
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EdgeKey {
    pub source_id: String,
    pub target_id: String,
    pub relation: RelationType,
}

impl EdgeKey {
    pub fn new(
        source_id: impl Into<String>,
        target_id: impl Into<String>,
        relation: RelationType,
    ) -> Self {
        Self {
            source_id: source_id.into(),
            target_id: target_id.into(),
            relation,
        }
    }

    pub fn depends_on(source_id: impl Into<String>, target_id: impl Into<String>) -> Self {
        Self::new(source_id, target_id, RelationType::DependsOn)
    }

    pub fn parent_of(parent_id: impl Into<String>, child_id: impl Into<String>) -> Self {
        Self::new(parent_id, child_id, RelationType::ParentOf)
    }

    pub fn is_self_loop(&self) -> bool {
        self.source_id == self.target_id
    }

    pub fn id(&self) -> EdgeId {
        EdgeId::for_edge(self)
    }

    pub fn legacy_id(&self) -> String {
        legacy_edge_id(&self.source_id, &self.target_id)
    }
}

impl fmt::Display for EdgeKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} -[{}]-> {}",
            self.source_id, self.relation, self.target_id
        )
    }
}

/// Opaque deterministic edge identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EdgeId(Uuid);

impl EdgeId {
    pub fn for_edge(key: &EdgeKey) -> Self {
        // NUL cannot appear in a validated node id, so the encoding is injective
        let name = format!(
            "{}\0{}\0{}",
            key.relation.as_str(),
            key.source_id,
            key.target_id
        );
        EdgeId(Uuid::new_v5(&EDGE_ID_NAMESPACE, name.as_bytes()))
    }

    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl fmt::Display for EdgeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.hyphenated())
    }
}

impl FromStr for EdgeId {
    type Err = ValidationError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        Uuid::parse_str(value.trim())
            .map(EdgeId)
            .map_err(|e| ValidationError::InvalidField {
                field: "edge_id".to_string(),
                reason: e.to_string(),
            })
    }
}

/// Build a legacy `source-target` edge handle
pub fn legacy_edge_id(source_id: &str, target_id: &str) -> String {
    format!("{}{}{}", source_id, LEGACY_EDGE_SEPARATOR, target_id)
}

/// Split a legacy `source-target` handle at the first separator
///
/// Ids that themselves contain `-` cannot be recovered unambiguously; the split
/// policy is fixed rather than guessed.
pub fn parse_legacy_edge_id(edge_id: &str) -> Result<(String, String), ValidationError> {
    let invalid = |reason: &str| ValidationError::InvalidField {
        field: "edge_id".to_string(),
        reason: format!("'{}': {}", edge_id, reason),
    };

    let (source, target) = edge_id
        .split_once(LEGACY_EDGE_SEPARATOR)
        .ok_or_else(|| invalid("expected 'source-target'"))?;

    if source.is_empty() || target.is_empty() {
        return Err(invalid("source and target must both be non-empty"));
    }

    Ok((source.to_string(), target.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_relation_parsing() {
        assert_eq!(
            "depends_on".parse::<RelationType>().unwrap(),
            RelationType::DependsOn
        );
        assert_eq!(
            "PARENT_OF".parse::<RelationType>().unwrap(),
            RelationType::ParentOf
        );
        assert!("CHILD_OF".parse::<RelationType>().is_err());
    }

    #[test]
    fn test_edge_id_is_deterministic_and_relation_aware() {
        let a = EdgeKey::depends_on("A", "B");
        let b = EdgeKey::depends_on("A", "B");
        let hierarchy = EdgeKey::parent_of("A", "B");
        let reversed = EdgeKey::depends_on("B", "A");

        assert_eq!(a.id(), b.id());
        assert_ne!(a.id(), hierarchy.id());
        assert_ne!(a.id(), reversed.id());
    }

    #[test]
    fn test_edge_id_disambiguates_hyphenated_ids() {
        // Both collapse to "a-b-c" as legacy handles
        let first = EdgeKey::depends_on("a-b", "c");
        let second = EdgeKey::depends_on("a", "b-c");

        assert_eq!(first.legacy_id(), second.legacy_id());
        assert_ne!(first.id(), second.id());
    }

    #[test]
    fn test_edge_id_parses_from_display() {
        let id = EdgeKey::depends_on("A", "B").id();
        let parsed: EdgeId = id.to_string().parse().unwrap();
        assert_eq!(parsed, id);
        assert!("not-a-uuid".parse::<EdgeId>().is_err());
    }

    #[test]
    fn test_parse_legacy_edge_id_splits_at_first_separator() {
        assert_eq!(
            parse_legacy_edge_id("A-B").unwrap(),
            ("A".to_string(), "B".to_string())
        );
        assert_eq!(
            parse_legacy_edge_id("a-b-c").unwrap(),
            ("a".to_string(), "b-c".to_string())
        );
        assert!(parse_legacy_edge_id("AB").is_err());
        assert!(parse_legacy_edge_id("-B").is_err());
        assert!(parse_legacy_edge_id("A-").is_err());
    }
}
