//! Editor session
//!
//! The session sits between the canvas and the graph model. The canvas
//! reports what the user did as [`EditEvent`]s; the session applies each one
//! to its [`WorkflowGraph`] and answers with an [`EditOutcome`] or the
//! structural rejection. The canvas redraws from [`EditorSession::snapshot`]
//! and never holds a live reference into the graph, so data only flows one
//! way: events in, snapshots out.
//!
//! `apply_edit` takes `&mut self` and completes validation and mutation
//! before returning, so two edits can never interleave.

use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::graph::{WorkflowData, WorkflowGraph};
use crate::types::{EdgeDraft, EdgeId, Node, NodeId, NodePatch, Position};
use crate::undo::UndoStack;
use crate::validation::ValidationIssue;

/// An interactive edit reported by the canvas or side panel
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum EditEvent {
    /// A node was dropped from the palette
    #[serde(rename_all = "camelCase")]
    AddNode { node: Node },

    /// A node was dragged to a new position
    #[serde(rename_all = "camelCase")]
    MoveNode { node_id: NodeId, position: Position },

    /// A node was deleted
    #[serde(rename_all = "camelCase")]
    DeleteNode { node_id: NodeId },

    /// An edge was drawn between two ports
    #[serde(rename_all = "camelCase")]
    ConnectEdge { edge: EdgeDraft },

    /// An edge was deleted
    #[serde(rename_all = "camelCase")]
    DisconnectEdge { edge_id: EdgeId },

    /// Node settings were edited in the side panel
    #[serde(rename_all = "camelCase")]
    PatchNodeConfig { node_id: NodeId, patch: NodePatch },
}

impl EditEvent {
    fn name(&self) -> &'static str {
        match self {
            EditEvent::AddNode { .. } => "addNode",
            EditEvent::MoveNode { .. } => "moveNode",
            EditEvent::DeleteNode { .. } => "deleteNode",
            EditEvent::ConnectEdge { .. } => "connectEdge",
            EditEvent::DisconnectEdge { .. } => "disconnectEdge",
            EditEvent::PatchNodeConfig { .. } => "patchNodeConfig",
        }
    }
}

/// What a successful edit changed
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum EditOutcome {
    #[serde(rename_all = "camelCase")]
    NodeAdded { node_id: NodeId },
    #[serde(rename_all = "camelCase")]
    NodeMoved { node_id: NodeId },
    /// The node and every edge attached to it are gone
    #[serde(rename_all = "camelCase")]
    NodeDeleted {
        node_id: NodeId,
        removed_edges: Vec<EdgeId>,
    },
    #[serde(rename_all = "camelCase")]
    EdgeConnected { edge_id: EdgeId },
    #[serde(rename_all = "camelCase")]
    EdgeDisconnected { edge_id: EdgeId },
    #[serde(rename_all = "camelCase")]
    NodePatched { node_id: NodeId },
}

/// A live, editable workflow graph with undo history
pub struct EditorSession {
    graph: WorkflowGraph,
    history: UndoStack,
    revision: u64,
}

impl EditorSession {
    /// Start a session on an empty graph
    pub fn new() -> Self {
        Self::from_graph(WorkflowGraph::new())
    }

    /// Start a session on an existing graph
    pub fn from_graph(graph: WorkflowGraph) -> Self {
        let mut session = Self {
            graph,
            history: UndoStack::default(),
            revision: 0,
        };
        session.record_history();
        session
    }

    /// Start a session on persisted data
    pub fn from_data(data: WorkflowData) -> Result<Self> {
        Ok(Self::from_graph(WorkflowGraph::from_data(data)?))
    }

    /// Apply one edit
    ///
    /// On error the graph is unchanged and the error is meant for transient
    /// user feedback (e.g. "this node already has a next step").
    pub fn apply_edit(&mut self, event: EditEvent) -> Result<EditOutcome> {
        let name = event.name();
        let outcome = self.dispatch(event).inspect_err(|e| {
            log::debug!("Rejected {} edit: {}", name, e);
        })?;

        self.revision += 1;
        self.record_history();
        Ok(outcome)
    }

    fn dispatch(&mut self, event: EditEvent) -> Result<EditOutcome> {
        match event {
            EditEvent::AddNode { node } => {
                let node_id = node.id.clone();
                self.graph.add_node(node)?;
                Ok(EditOutcome::NodeAdded { node_id })
            }
            EditEvent::MoveNode { node_id, position } => {
                self.graph.update_node(
                    &node_id,
                    NodePatch {
                        position: Some(position),
                        ..NodePatch::default()
                    },
                )?;
                Ok(EditOutcome::NodeMoved { node_id })
            }
            EditEvent::DeleteNode { node_id } => {
                let removed = self.graph.remove_node(&node_id)?;
                Ok(EditOutcome::NodeDeleted {
                    node_id,
                    removed_edges: removed.edges.into_iter().map(|e| e.id).collect(),
                })
            }
            EditEvent::ConnectEdge { edge } => {
                let edge_id = self.graph.add_edge(edge)?;
                Ok(EditOutcome::EdgeConnected { edge_id })
            }
            EditEvent::DisconnectEdge { edge_id } => {
                self.graph.remove_edge(&edge_id)?;
                Ok(EditOutcome::EdgeDisconnected { edge_id })
            }
            EditEvent::PatchNodeConfig { node_id, patch } => {
                self.graph.update_node(&node_id, patch)?;
                Ok(EditOutcome::NodePatched { node_id })
            }
        }
    }

    /// Deep copy of the current graph for rendering or saving
    pub fn snapshot(&self) -> WorkflowData {
        self.graph.to_data()
    }

    /// Read-only access to the graph
    pub fn graph(&self) -> &WorkflowGraph {
        &self.graph
    }

    /// Advisory execution-readiness issues for the current graph
    pub fn validate(&self) -> Vec<ValidationIssue> {
        self.graph.validate_for_execution()
    }

    /// Number of successful mutations since the session started
    ///
    /// Undo and redo count as mutations.
    pub fn revision(&self) -> u64 {
        self.revision
    }

    /// Restore the previous graph state; returns false when there is none
    ///
    /// If the snapshot cannot be restored, both the graph and the history
    /// position are left as they were.
    pub fn undo(&mut self) -> Result<bool> {
        let Some(data) = self.history.peek_undo() else {
            return Ok(false);
        };
        self.restore(data?)?;
        self.history.step_back();
        Ok(true)
    }

    /// Re-apply the next graph state; returns false when there is none
    pub fn redo(&mut self) -> Result<bool> {
        let Some(data) = self.history.peek_redo() else {
            return Ok(false);
        };
        self.restore(data?)?;
        self.history.step_forward();
        Ok(true)
    }

    pub fn can_undo(&self) -> bool {
        self.history.can_undo()
    }

    pub fn can_redo(&self) -> bool {
        self.history.can_redo()
    }

    fn restore(&mut self, data: WorkflowData) -> Result<()> {
        self.graph = WorkflowGraph::from_data(data)?;
        self.revision += 1;
        Ok(())
    }

    fn record_history(&mut self) {
        if let Err(e) = self.history.record(&self.graph.to_data()) {
            // A gap in history would make undo jump to an unrelated state
            log::warn!("Failed to record undo snapshot, clearing history: {}", e);
            self.history.clear();
        }
    }
}

impl Default for EditorSession {
    fn default() -> Self {
        Self::new()
    }
}
