//! Error types for the workflow store

use thiserror::Error;
use workflow_graph::{GraphError, ValidationIssue};

use crate::store::Operation;

/// Result type for store and backend operations
pub type Result<T> = std::result::Result<T, StoreError>;

/// Errors surfaced by the store, the tracker and the backends
#[derive(Debug, Error)]
pub enum StoreError {
    /// Session expired or credential rejected; the caller should re-authenticate
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// Transport failure or server-side error; safe to retry
    #[error("Network error: {0}")]
    Network(String),

    #[error("Not found: {0}")]
    NotFound(String),

    /// The service refused the write; reload before saving again
    #[error("Conflict: {0}")]
    Conflict(String),

    /// Rejected input, or a workflow that is not ready to execute
    ///
    /// `issues` holds the blocking readiness issues when the rejection
    /// happened client-side, and is empty for service-side rejections.
    #[error("Validation failed: {detail}")]
    Validation {
        detail: String,
        issues: Vec<ValidationIssue>,
    },

    /// Execute was requested while the open workflow has unsaved edits
    #[error("Workflow has unsaved changes; save before executing")]
    StaleGraph,

    #[error("A {0} operation is already in progress")]
    OperationInProgress(Operation),

    #[error("No workflow is open")]
    NoCurrentWorkflow,

    #[error("Unexpected response status {status}: {detail}")]
    UnexpectedStatus { status: u16, detail: String },

    #[error("Graph error: {0}")]
    Graph(#[from] GraphError),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl StoreError {
    /// Service-side validation failure with a message
    pub fn validation(detail: impl Into<String>) -> Self {
        Self::Validation {
            detail: detail.into(),
            issues: Vec::new(),
        }
    }

    /// Whether retrying the same call may succeed
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Network(_))
    }

    /// Whether the caller should send the user back to login
    pub fn requires_reauth(&self) -> bool {
        matches!(self, Self::Unauthorized(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_classes() {
        assert!(StoreError::Network("reset".into()).is_retryable());
        assert!(!StoreError::Conflict("x".into()).is_retryable());
        assert!(StoreError::Unauthorized("expired".into()).requires_reauth());
        assert!(!StoreError::StaleGraph.requires_reauth());
    }

    #[test]
    fn test_display() {
        let err = StoreError::OperationInProgress(Operation::Save);
        assert_eq!(err.to_string(), "A save operation is already in progress");

        let err = StoreError::validation("name must not be empty");
        assert_eq!(err.to_string(), "Validation failed: name must not be empty");
    }

    #[test]
    fn test_graph_error_converts() {
        let err: StoreError = GraphError::schema("bad node").into();
        assert!(matches!(err, StoreError::Graph(GraphError::Schema(_))));
    }
}
