//! Error types for the workflow graph
//!
//! Every variant here is a structural rejection: the graph is left exactly
//! as it was before the failing call, and the error is meant to be shown
//! to the user as transient, correctable feedback.

use thiserror::Error;

/// Result type alias using GraphError
pub type Result<T> = std::result::Result<T, GraphError>;

/// What kind of graph element an error refers to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Element {
    Node,
    Edge,
}

impl std::fmt::Display for Element {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Element::Node => write!(f, "node"),
            Element::Edge => write!(f, "edge"),
        }
    }
}

/// Errors raised by graph mutations and graph (de)serialization
#[derive(Debug, Error)]
pub enum GraphError {
    /// A node or edge with this id already exists
    #[error("{element} '{id}' already exists")]
    DuplicateId { element: Element, id: String },

    /// The referenced node or edge is not in the graph
    #[error("{element} '{id}' not found")]
    NotFound { element: Element, id: String },

    /// An edge would connect a node to itself
    #[error("node '{0}' cannot connect to itself")]
    SelfLoop(String),

    /// A port name is not declared by the node's kind
    #[error("node '{node_id}' has no {direction} port '{port}'")]
    InvalidPort {
        node_id: String,
        port: String,
        direction: PortDirection,
    },

    /// The output port already has its single outgoing edge
    #[error("port '{port}' on node '{node_id}' is already connected by edge '{edge_id}'")]
    PortOccupied {
        node_id: String,
        port: String,
        edge_id: String,
    },

    /// A coordinate is NaN or infinite
    #[error("node '{0}' has a non-finite position")]
    InvalidPosition(String),

    /// A patch tried to change `id` or `kind`
    #[error("field '{0}' cannot be changed after creation")]
    ImmutableField(String),

    /// A node kind name that the registry does not know
    #[error("unknown node kind '{0}'")]
    InvalidNodeKind(String),

    /// Persisted data that does not describe a valid graph
    #[error("invalid workflow data: {0}")]
    Schema(String),

    /// JSON encoding/decoding error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Undo snapshot compression error
    #[error("Compression error: {0}")]
    Compression(String),
}

/// Direction of a port, used in error messages
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PortDirection {
    Inbound,
    Outbound,
}

impl std::fmt::Display for PortDirection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PortDirection::Inbound => write!(f, "inbound"),
            PortDirection::Outbound => write!(f, "outbound"),
        }
    }
}

impl GraphError {
    pub(crate) fn node_not_found(id: impl Into<String>) -> Self {
        Self::NotFound {
            element: Element::Node,
            id: id.into(),
        }
    }

    pub(crate) fn edge_not_found(id: impl Into<String>) -> Self {
        Self::NotFound {
            element: Element::Edge,
            id: id.into(),
        }
    }

    /// Create a schema error with a message
    pub fn schema(msg: impl Into<String>) -> Self {
        Self::Schema(msg.into())
    }

    /// Short machine-readable code for UI feedback
    pub fn code(&self) -> &'static str {
        match self {
            Self::DuplicateId { .. } => "duplicate_id",
            Self::NotFound { .. } => "not_found",
            Self::SelfLoop(_) => "self_loop",
            Self::InvalidPort { .. } => "invalid_port",
            Self::PortOccupied { .. } => "port_occupied",
            Self::InvalidPosition(_) => "invalid_position",
            Self::ImmutableField(_) => "immutable_field",
            Self::InvalidNodeKind(_) => "invalid_node_kind",
            Self::Schema(_) | Self::Serialization(_) => "schema_error",
            Self::Compression(_) => "compression",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_messages_name_the_element() {
        let err = GraphError::node_not_found("n1");
        assert_eq!(err.to_string(), "node 'n1' not found");

        let err = GraphError::PortOccupied {
            node_id: "t1".into(),
            port: "out".into(),
            edge_id: "e1".into(),
        };
        assert_eq!(
            err.to_string(),
            "port 'out' on node 't1' is already connected by edge 'e1'"
        );
        assert_eq!(err.code(), "port_occupied");
    }
}
