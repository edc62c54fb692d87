//! Core types for workflow graphs
//!
//! These types define the structure of workflow graphs: node kinds,
//! node instances, edges between ports, and partial node updates.

use serde::{Deserialize, Serialize};

use crate::error::GraphError;

/// Unique identifier for a node
pub type NodeId = String;

/// Unique identifier for an edge
pub type EdgeId = String;

/// Unique identifier for a port
pub type PortId = String;

/// Kind-specific node configuration (e.g. `actionType`, `condition`)
pub type NodeConfig = serde_json::Map<String, serde_json::Value>;

/// The closed set of node kinds a workflow can contain
///
/// Serialized by wire name (`trigger`, `action`, `condition`,
/// `humanApproval`). Unknown names fail deserialization instead of being
/// coerced to some default kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum NodeKind {
    /// Entry point that starts an execution
    Trigger,
    /// A step that performs work
    Action,
    /// Branches on an expression into `true` / `false`
    Condition,
    /// Pauses until a person approves
    HumanApproval,
}

impl NodeKind {
    /// All kinds, in palette order
    pub const ALL: [NodeKind; 4] = [
        NodeKind::Trigger,
        NodeKind::Action,
        NodeKind::Condition,
        NodeKind::HumanApproval,
    ];

    /// Name used in persisted workflow data
    pub fn wire_name(self) -> &'static str {
        match self {
            NodeKind::Trigger => "trigger",
            NodeKind::Action => "action",
            NodeKind::Condition => "condition",
            NodeKind::HumanApproval => "humanApproval",
        }
    }

    /// Resolve a wire name
    pub fn from_wire_name(name: &str) -> Result<Self, GraphError> {
        Self::ALL
            .into_iter()
            .find(|kind| kind.wire_name() == name)
            .ok_or_else(|| GraphError::InvalidNodeKind(name.to_string()))
    }
}

impl std::fmt::Display for NodeKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.wire_name())
    }
}

impl std::str::FromStr for NodeKind {
    type Err = GraphError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_wire_name(s)
    }
}

impl TryFrom<String> for NodeKind {
    type Error = GraphError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::from_wire_name(&value)
    }
}

impl From<NodeKind> for String {
    fn from(kind: NodeKind) -> Self {
        kind.wire_name().to_string()
    }
}

/// Canvas position, owned by the renderer but persisted with the node
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Position {
    pub x: f64,
    pub y: f64,
}

impl Position {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// JSON has no NaN or infinity, so only finite positions persist
    pub fn is_finite(&self) -> bool {
        self.x.is_finite() && self.y.is_finite()
    }
}

/// A node instance in a graph
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Node {
    /// Unique identifier, immutable after creation
    pub id: NodeId,
    /// Node kind, immutable after creation
    pub kind: NodeKind,
    /// Display label
    #[serde(default)]
    pub label: String,
    /// Kind-specific configuration
    #[serde(default)]
    pub config: NodeConfig,
    /// Position in the UI
    #[serde(default)]
    pub position: Position,
}

impl Node {
    /// Create a node with the kind's default label at the origin
    pub fn new(id: impl Into<String>, kind: NodeKind) -> Self {
        Self {
            id: id.into(),
            kind,
            label: crate::registry::NodeTypeRegistry::descriptor(kind)
                .label
                .to_string(),
            config: NodeConfig::new(),
            position: Position::default(),
        }
    }

    /// Set the label
    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = label.into();
        self
    }

    /// Set a configuration entry
    pub fn with_config(mut self, key: impl Into<String>, value: impl Into<serde_json::Value>) -> Self {
        self.config.insert(key.into(), value.into());
        self
    }

    /// Set the position
    pub fn at(mut self, x: f64, y: f64) -> Self {
        self.position = Position::new(x, y);
        self
    }
}

/// A directed edge from one node's output port to another node's input port
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Edge {
    pub id: EdgeId,
    pub source_node_id: NodeId,
    pub source_port: PortId,
    pub target_node_id: NodeId,
    pub target_port: PortId,
}

/// A requested connection; the graph assigns an id when none is given
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EdgeDraft {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<EdgeId>,
    pub source_node_id: NodeId,
    pub source_port: PortId,
    pub target_node_id: NodeId,
    pub target_port: PortId,
}

impl EdgeDraft {
    pub fn new(
        source: impl Into<String>,
        source_port: impl Into<String>,
        target: impl Into<String>,
        target_port: impl Into<String>,
    ) -> Self {
        Self {
            id: None,
            source_node_id: source.into(),
            source_port: source_port.into(),
            target_node_id: target.into(),
            target_port: target_port.into(),
        }
    }

    /// Request a specific edge id
    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }
}

impl From<Edge> for EdgeDraft {
    fn from(edge: Edge) -> Self {
        Self {
            id: Some(edge.id),
            source_node_id: edge.source_node_id,
            source_port: edge.source_port,
            target_node_id: edge.target_node_id,
            target_port: edge.target_port,
        }
    }
}

/// A partial node update from the side panel or the canvas
///
/// `id` and `kind` exist only so that a patch carrying them can be
/// rejected; a graph never applies them. In `config`, a `null` value
/// removes the key and any other value overwrites it.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NodePatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<serde_json::Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<serde_json::Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub config: Option<NodeConfig>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub position: Option<Position>,
}

impl NodePatch {
    /// Patch that only moves the node
    pub fn position(x: f64, y: f64) -> Self {
        Self {
            position: Some(Position::new(x, y)),
            ..Self::default()
        }
    }

    /// Patch that only relabels the node
    pub fn label(label: impl Into<String>) -> Self {
        Self {
            label: Some(label.into()),
            ..Self::default()
        }
    }

    /// Add a config entry to this patch
    pub fn with_config(mut self, key: impl Into<String>, value: impl Into<serde_json::Value>) -> Self {
        self.config
            .get_or_insert_with(NodeConfig::new)
            .insert(key.into(), value.into());
        self
    }

    /// Whether the patch changes nothing
    pub fn is_empty(&self) -> bool {
        self.id.is_none()
            && self.kind.is_none()
            && self.label.is_none()
            && self.config.is_none()
            && self.position.is_none()
    }
}
