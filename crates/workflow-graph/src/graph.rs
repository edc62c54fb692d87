//! The in-memory workflow graph
//!
//! Structural invariants hold after every call: every edge references two
//! present, distinct nodes, through ports their kinds declare, and no output
//! port carries more than one edge. Each mutation validates fully before it
//! touches either collection, so a rejected call leaves the graph unchanged.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use crate::error::{Element, GraphError, PortDirection, Result};
use crate::registry::NodeTypeRegistry;
use crate::types::{Edge, EdgeDraft, EdgeId, Node, NodeId, NodePatch};
use crate::validation::{self, ValidationIssue};

/// Persisted form of a graph (`workflow_data` on the wire)
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct WorkflowData {
    #[serde(default)]
    pub nodes: Vec<Node>,
    #[serde(default)]
    pub edges: Vec<Edge>,
}

impl WorkflowData {
    /// Parse persisted JSON, mapping any shape error to a schema error
    pub fn from_value(value: serde_json::Value) -> Result<Self> {
        serde_json::from_value(value).map_err(|e| GraphError::schema(e.to_string()))
    }

    /// Encode as JSON
    pub fn to_value(&self) -> Result<serde_json::Value> {
        Ok(serde_json::to_value(self)?)
    }
}

/// A node together with the edges its removal cascaded to
#[derive(Debug, Clone, PartialEq)]
pub struct RemovedNode {
    pub node: Node,
    pub edges: Vec<Edge>,
}

/// A workflow graph: nodes keyed by id and edges keyed by id
#[derive(Debug, Clone, Default, PartialEq)]
pub struct WorkflowGraph {
    nodes: BTreeMap<NodeId, Node>,
    edges: BTreeMap<EdgeId, Edge>,
}

impl WorkflowGraph {
    /// Create a new empty graph
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuild a graph from persisted data
    ///
    /// Nodes are inserted first, then edges, through the same checks as
    /// interactive edits. The first violation aborts with a schema error
    /// naming the offending element.
    pub fn from_data(data: WorkflowData) -> Result<Self> {
        let mut graph = Self::new();
        for node in data.nodes {
            let id = node.id.clone();
            graph
                .add_node(node)
                .map_err(|e| GraphError::schema(format!("node '{}': {}", id, e)))?;
        }
        for edge in data.edges {
            let id = edge.id.clone();
            graph
                .add_edge(edge.into())
                .map_err(|e| GraphError::schema(format!("edge '{}': {}", id, e)))?;
        }
        Ok(graph)
    }

    /// Rebuild a graph from a persisted JSON value
    pub fn from_value(value: serde_json::Value) -> Result<Self> {
        Self::from_data(WorkflowData::from_value(value)?)
    }

    /// Deep copy into the persisted form, ordered by id
    pub fn to_data(&self) -> WorkflowData {
        WorkflowData {
            nodes: self.nodes.values().cloned().collect(),
            edges: self.edges.values().cloned().collect(),
        }
    }

    pub fn node(&self, id: &str) -> Option<&Node> {
        self.nodes.get(id)
    }

    pub fn edge(&self, id: &str) -> Option<&Edge> {
        self.edges.get(id)
    }

    pub fn nodes(&self) -> impl Iterator<Item = &Node> {
        self.nodes.values()
    }

    pub fn edges(&self) -> impl Iterator<Item = &Edge> {
        self.edges.values()
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Get edges going out of a node
    pub fn outgoing_edges<'a>(&'a self, node_id: &'a str) -> impl Iterator<Item = &'a Edge> + 'a {
        self.edges.values().filter(move |e| e.source_node_id == node_id)
    }

    /// Get edges coming into a node
    pub fn incoming_edges<'a>(&'a self, node_id: &'a str) -> impl Iterator<Item = &'a Edge> + 'a {
        self.edges.values().filter(move |e| e.target_node_id == node_id)
    }

    /// The edge leaving `node_id` through `port`, if any
    pub fn edge_from_port(&self, node_id: &str, port: &str) -> Option<&Edge> {
        self.edges
            .values()
            .find(|e| e.source_node_id == node_id && e.source_port == port)
    }

    /// Insert a node; no edges are created
    ///
    /// An empty label is replaced by the kind's default label.
    pub fn add_node(&mut self, mut node: Node) -> Result<()> {
        if self.nodes.contains_key(&node.id) {
            return Err(GraphError::DuplicateId {
                element: Element::Node,
                id: node.id,
            });
        }
        if !node.position.is_finite() {
            return Err(GraphError::InvalidPosition(node.id));
        }
        if node.label.is_empty() {
            node.label = default_label(&node);
        }
        self.nodes.insert(node.id.clone(), node);
        Ok(())
    }

    /// Remove a node and every edge touching it
    pub fn remove_node(&mut self, id: &str) -> Result<RemovedNode> {
        let node = self
            .nodes
            .remove(id)
            .ok_or_else(|| GraphError::node_not_found(id))?;

        let attached: Vec<EdgeId> = self
            .edges
            .values()
            .filter(|e| e.source_node_id == id || e.target_node_id == id)
            .map(|e| e.id.clone())
            .collect();
        let edges = attached
            .iter()
            .filter_map(|edge_id| self.edges.remove(edge_id))
            .collect();

        Ok(RemovedNode { node, edges })
    }

    /// Merge a patch into a node's label, config and position
    ///
    /// An empty label resets to the kind's default, as in [`Self::add_node`].
    pub fn update_node(&mut self, id: &str, patch: NodePatch) -> Result<&Node> {
        if patch.id.is_some() {
            return Err(GraphError::ImmutableField("id".to_string()));
        }
        if patch.kind.is_some() {
            return Err(GraphError::ImmutableField("kind".to_string()));
        }
        let node = self
            .nodes
            .get_mut(id)
            .ok_or_else(|| GraphError::node_not_found(id))?;
        if patch.position.is_some_and(|p| !p.is_finite()) {
            return Err(GraphError::InvalidPosition(node.id.clone()));
        }

        if let Some(label) = patch.label {
            let label = if label.is_empty() {
                default_label(node)
            } else {
                label
            };
            node.label = label;
        }
        if let Some(position) = patch.position {
            node.position = position;
        }
        if let Some(config) = patch.config {
            for (key, value) in config {
                if value.is_null() {
                    node.config.remove(&key);
                } else {
                    node.config.insert(key, value);
                }
            }
        }
        Ok(node)
    }

    /// Connect two nodes, returning the edge id
    ///
    /// Checks, in order: both endpoints exist, the edge is not a self-loop,
    /// both ports are declared by the endpoint kinds, and the source port is
    /// free. A fresh id is generated when the draft has none.
    pub fn add_edge(&mut self, draft: EdgeDraft) -> Result<EdgeId> {
        let source = self
            .nodes
            .get(&draft.source_node_id)
            .ok_or_else(|| GraphError::node_not_found(&draft.source_node_id))?;
        let target = self
            .nodes
            .get(&draft.target_node_id)
            .ok_or_else(|| GraphError::node_not_found(&draft.target_node_id))?;

        if source.id == target.id {
            return Err(GraphError::SelfLoop(source.id.clone()));
        }
        if !NodeTypeRegistry::has_outbound(source.kind, &draft.source_port) {
            return Err(GraphError::InvalidPort {
                node_id: source.id.clone(),
                port: draft.source_port,
                direction: PortDirection::Outbound,
            });
        }
        if !NodeTypeRegistry::has_inbound(target.kind, &draft.target_port) {
            return Err(GraphError::InvalidPort {
                node_id: target.id.clone(),
                port: draft.target_port,
                direction: PortDirection::Inbound,
            });
        }
        if let Some(existing) = self.edge_from_port(&draft.source_node_id, &draft.source_port) {
            return Err(GraphError::PortOccupied {
                node_id: draft.source_node_id,
                port: draft.source_port,
                edge_id: existing.id.clone(),
            });
        }

        let id = match draft.id {
            Some(id) if self.edges.contains_key(&id) => {
                return Err(GraphError::DuplicateId {
                    element: Element::Edge,
                    id,
                });
            }
            Some(id) => id,
            None => self.fresh_edge_id(),
        };

        self.edges.insert(
            id.clone(),
            Edge {
                id: id.clone(),
                source_node_id: draft.source_node_id,
                source_port: draft.source_port,
                target_node_id: draft.target_node_id,
                target_port: draft.target_port,
            },
        );
        Ok(id)
    }

    /// Remove an edge; never removes nodes
    pub fn remove_edge(&mut self, id: &str) -> Result<Edge> {
        self.edges
            .remove(id)
            .ok_or_else(|| GraphError::edge_not_found(id))
    }

    /// Advisory execution-readiness check; never mutates
    pub fn validate_for_execution(&self) -> Vec<ValidationIssue> {
        validation::validate_for_execution(self)
    }

    /// Ids of nodes reachable from any trigger by following edges
    pub fn reachable_from_triggers(&self) -> BTreeSet<&str> {
        let mut visited: BTreeSet<&str> = BTreeSet::new();
        let mut stack: Vec<&str> = self
            .nodes
            .values()
            .filter(|n| n.kind == crate::types::NodeKind::Trigger)
            .map(|n| n.id.as_str())
            .collect();

        while let Some(node_id) = stack.pop() {
            if !visited.insert(node_id) {
                continue;
            }
            for edge in self.outgoing_edges(node_id) {
                if !visited.contains(edge.target_node_id.as_str()) {
                    stack.push(&edge.target_node_id);
                }
            }
        }
        visited
    }

    fn fresh_edge_id(&self) -> EdgeId {
        loop {
            let id = format!("edge-{}", uuid::Uuid::new_v4());
            if !self.edges.contains_key(&id) {
                return id;
            }
        }
    }
}

fn default_label(node: &Node) -> String {
    NodeTypeRegistry::descriptor(node.kind).label.to_string()
}
