//! Graph Store Error Types
//!
//! Errors raised by [`GraphStore`](super::GraphStore) backends. The service layer
//! translates these into client-facing failures; `is_transient` drives retries.

use thiserror::Error;

/// Substrings marking a backend error as transient (safe to retry)
const TRANSIENT_MARKERS: [&str; 8] = [
    "connection",
    "timed out",
    "timeout",
    "unavailable",
    "broken pipe",
    "resource busy",
    "can be retried",
    "leader",
];

/// Graph store operation errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    /// Lookup miss for a node
    #[error("Node not found: {id}")]
    NotFound { id: String },

    /// Strict create of an id that already exists (uniqueness constraint)
    #[error("Record already exists: {id}")]
    Conflict { id: String },

    /// Transient connectivity failure; the call may be retried
    #[error("Graph store unavailable: {0}")]
    Unavailable(String),

    /// Non-transient store failure (malformed query, auth, constraint)
    #[error("Graph store rejected operation: {0}")]
    Rejected(String),

    /// Stored record could not be decoded
    #[error("Failed to decode stored record: {0}")]
    Serialization(String),

    /// Store could not be opened or its schema defined
    #[error("Failed to initialize graph store: {0}")]
    Initialization(String),
}

impl StoreError {
    pub fn not_found(id: impl Into<String>) -> Self {
        Self::NotFound { id: id.into() }
    }

    pub fn conflict(id: impl Into<String>) -> Self {
        Self::Conflict { id: id.into() }
    }

    pub fn unavailable(msg: impl Into<String>) -> Self {
        Self::Unavailable(msg.into())
    }

    pub fn rejected(msg: impl Into<String>) -> Self {
        Self::Rejected(msg.into())
    }

    pub fn serialization(msg: impl Into<String>) -> Self {
        Self::Serialization(msg.into())
    }

    pub fn initialization(msg: impl Into<String>) -> Self {
        Self::Initialization(msg.into())
    }

    /// Whether retrying the same call may succeed
    pub fn is_transient(&self) -> bool {
        matches!(self, StoreError::Unavailable(_))
    }

    /// Classify a backend error message
    ///
    /// `subject` names the record the call was about; it becomes the id of a
    /// `Conflict` when the message reports a uniqueness violation.
    pub fn classify(message: impl Into<String>, subject: &str) -> Self {
        let message = message.into();
        let lower = message.to_lowercase();

        if lower.contains("already exists") || lower.contains("already contains") {
            StoreError::conflict(subject)
        } else if TRANSIENT_MARKERS.iter().any(|marker| lower.contains(marker)) {
            StoreError::Unavailable(message)
        } else {
            StoreError::Rejected(message)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classify_uniqueness_violation_as_conflict() {
        let err = StoreError::classify("Database record `tech_node:A` already exists", "A");
        assert_eq!(err, StoreError::conflict("A"));

        let err = StoreError::classify(
            "Database index `depends_on_pair` already contains [tech_node:A, tech_node:B]",
            "A -> B",
        );
        assert!(matches!(err, StoreError::Conflict { .. }));
    }

    #[test]
    fn test_classify_transient_failures() {
        for message in [
            "Connection reset by peer",
            "The query was not executed because it exceeded the timeout",
            "Leader unavailable",
            "Failed to commit transaction: Resource busy",
        ] {
            let err = StoreError::classify(message, "A");
            assert!(err.is_transient(), "expected transient: {}", message);
        }
    }

    #[test]
    fn test_classify_everything_else_as_rejected() {
        let err = StoreError::classify("Parse error: unexpected token", "A");
        assert!(matches!(err, StoreError::Rejected(_)));
        assert!(!err.is_transient());
    }
}
