//! Fluent builder for workflow graphs
//!
//! Provides a compact API for constructing graphs programmatically, e.g. for
//! templates and tests. Everything goes through the regular graph
//! operations, so `build` fails exactly where interactive edits would.

use crate::error::Result;
use crate::graph::WorkflowGraph;
use crate::types::{EdgeDraft, Node, NodeKind};

/// Vertical spacing used to lay out builder nodes in a column
const ROW_SPACING: f64 = 120.0;

/// Fluent builder for constructing workflow graphs
///
/// # Example
///
/// ```
/// use workflow_graph::GraphBuilder;
///
/// let graph = GraphBuilder::new()
///     .trigger("t1", "webhook")
///     .condition("c1", "amount > 100")
///     .approval("h1")
///     .action("a1", "send_email")
///     .connect("t1", "out", "c1", "in")
///     .connect("c1", "true", "h1", "in")
///     .connect("h1", "out", "a1", "in")
///     .build()
///     .unwrap();
///
/// assert_eq!(graph.node_count(), 4);
/// ```
#[derive(Debug, Default)]
pub struct GraphBuilder {
    nodes: Vec<Node>,
    edges: Vec<EdgeDraft>,
}

impl GraphBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a prepared node as is
    pub fn node(mut self, node: Node) -> Self {
        self.nodes.push(node);
        self
    }

    /// Add a trigger with its `triggerType`
    pub fn trigger(self, id: &str, trigger_type: &str) -> Self {
        let node = self.placed(id, NodeKind::Trigger).with_config("triggerType", trigger_type);
        self.node(node)
    }

    /// Add an action with its `actionType`
    pub fn action(self, id: &str, action_type: &str) -> Self {
        let node = self.placed(id, NodeKind::Action).with_config("actionType", action_type);
        self.node(node)
    }

    /// Add a condition with its expression
    pub fn condition(self, id: &str, expression: &str) -> Self {
        let node = self.placed(id, NodeKind::Condition).with_config("condition", expression);
        self.node(node)
    }

    /// Add a human approval gate
    pub fn approval(self, id: &str) -> Self {
        let node = self.placed(id, NodeKind::HumanApproval);
        self.node(node)
    }

    /// Connect two nodes (edge id is generated)
    pub fn connect(mut self, source: &str, source_port: &str, target: &str, target_port: &str) -> Self {
        self.edges
            .push(EdgeDraft::new(source, source_port, target, target_port));
        self
    }

    /// Connect two nodes with an explicit edge id
    pub fn connect_with_id(
        mut self,
        edge_id: &str,
        source: &str,
        source_port: &str,
        target: &str,
        target_port: &str,
    ) -> Self {
        self.edges.push(
            EdgeDraft::new(source, source_port, target, target_port).with_id(edge_id),
        );
        self
    }

    /// Build the graph, applying every node and then every edge
    pub fn build(self) -> Result<WorkflowGraph> {
        let mut graph = WorkflowGraph::new();
        for node in self.nodes {
            graph.add_node(node)?;
        }
        for edge in self.edges {
            graph.add_edge(edge)?;
        }
        Ok(graph)
    }

    fn placed(&self, id: &str, kind: NodeKind) -> Node {
        Node::new(id, kind).at(0.0, self.nodes.len() as f64 * ROW_SPACING)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::GraphError;

    #[test]
    fn test_builder_lays_out_a_column() {
        let graph = GraphBuilder::new()
            .trigger("t1", "schedule")
            .action("a1", "http_request")
            .connect_with_id("e1", "t1", "out", "a1", "in")
            .build()
            .unwrap();

        assert_eq!(graph.node("a1").unwrap().position.y, ROW_SPACING);
        assert_eq!(graph.edge("e1").unwrap().target_node_id, "a1");
        assert_eq!(graph.node("t1").unwrap().config["triggerType"], "schedule");
    }

    #[test]
    fn test_builder_surfaces_structural_errors() {
        let result = GraphBuilder::new()
            .trigger("t1", "manual")
            .connect("t1", "out", "t1", "in")
            .build();
        assert!(matches!(result, Err(GraphError::SelfLoop(_))));
    }
}
