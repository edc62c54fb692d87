//! Workflow Graph - node-and-edge model for the workflow editor
//!
//! This crate owns the in-memory workflow graph and the rules that keep it
//! structurally sound. It provides:
//!
//! - A fixed catalog of node kinds and their ports
//! - Connection rules enforced on every mutation
//! - Advisory execution-readiness validation
//! - An editor session applying canvas events, with undo/redo
//!
//! # Architecture
//!
//! - `NodeTypeRegistry`: Kind descriptors, ports and default labels
//! - `WorkflowGraph`: Nodes and edges, rejecting every invalid mutation
//! - `EditorSession`: Event-in, snapshot-out wrapper used by the canvas
//! - `UndoStack`: Compressed snapshots of past graph states
//!
//! # Example
//!
//! ```
//! use workflow_graph::{EdgeDraft, EditEvent, EditorSession, Node, NodeKind};
//!
//! let mut session = EditorSession::new();
//! session
//!     .apply_edit(EditEvent::AddNode { node: Node::new("t1", NodeKind::Trigger) })
//!     .unwrap();
//! session
//!     .apply_edit(EditEvent::AddNode { node: Node::new("a1", NodeKind::Action) })
//!     .unwrap();
//! session
//!     .apply_edit(EditEvent::ConnectEdge { edge: EdgeDraft::new("t1", "out", "a1", "in") })
//!     .unwrap();
//!
//! assert_eq!(session.snapshot().edges.len(), 1);
//! ```

pub mod builder;
pub mod error;
pub mod graph;
pub mod registry;
pub mod session;
pub mod types;
pub mod undo;
pub mod validation;

// Re-export key types
pub use builder::GraphBuilder;
pub use error::{Element, GraphError, PortDirection, Result};
pub use graph::{RemovedNode, WorkflowData, WorkflowGraph};
pub use registry::{NodeCategory, NodeTypeDescriptor, NodeTypeRegistry, PortMetadata, Ports};
pub use session::{EditEvent, EditOutcome, EditorSession};
pub use types::{Edge, EdgeDraft, EdgeId, Node, NodeConfig, NodeId, NodeKind, NodePatch, PortId, Position};
pub use undo::UndoStack;
pub use validation::{has_blocking, Severity, ValidationIssue};
