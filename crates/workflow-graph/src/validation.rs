//! Execution-readiness validation
//!
//! Structural rules are enforced on every mutation by [`WorkflowGraph`];
//! the checks here are the ones a workflow may legitimately fail while it
//! is still being built. They produce issues, not errors, and the editor
//! uses them to flag incomplete workflows. Only [`Severity::Blocking`]
//! issues stop an execution.

use std::collections::BTreeMap;

use serde::Serialize;

use crate::graph::WorkflowGraph;
use crate::registry::NodeTypeRegistry;
use crate::types::{NodeId, NodeKind, PortId};

/// How serious an issue is
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    /// The workflow cannot be executed
    Blocking,
    /// The workflow runs, but probably not as intended
    Warning,
}

/// A single execution-readiness finding
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "issue", rename_all = "snake_case")]
pub enum ValidationIssue {
    /// No trigger node, so nothing can start an execution
    MissingTrigger,
    /// A condition with neither branch wired
    UnwiredCondition { node_id: NodeId },
    /// A single-successor port with more than one edge
    MultipleOutgoing {
        node_id: NodeId,
        port: PortId,
        count: usize,
    },
    /// A node whose defining config key is missing or empty
    Unconfigured { node_id: NodeId, key: String },
    /// A node that no trigger can reach
    Unreachable { node_id: NodeId },
}

impl ValidationIssue {
    pub fn severity(&self) -> Severity {
        match self {
            Self::MissingTrigger | Self::MultipleOutgoing { .. } => Severity::Blocking,
            Self::UnwiredCondition { .. } | Self::Unconfigured { .. } | Self::Unreachable { .. } => {
                Severity::Warning
            }
        }
    }

    pub fn is_blocking(&self) -> bool {
        self.severity() == Severity::Blocking
    }

    /// The node this issue is about, if any
    pub fn node_id(&self) -> Option<&str> {
        match self {
            Self::MissingTrigger => None,
            Self::UnwiredCondition { node_id }
            | Self::MultipleOutgoing { node_id, .. }
            | Self::Unconfigured { node_id, .. }
            | Self::Unreachable { node_id } => Some(node_id),
        }
    }
}

impl std::fmt::Display for ValidationIssue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::MissingTrigger => write!(f, "Workflow has no trigger node"),
            Self::UnwiredCondition { node_id } => {
                write!(f, "Condition '{}' has no outgoing branch", node_id)
            }
            Self::MultipleOutgoing {
                node_id,
                port,
                count,
            } => write!(
                f,
                "Port '{}' on node '{}' has {} outgoing edges",
                port, node_id, count
            ),
            Self::Unconfigured { node_id, key } => {
                write!(f, "Node '{}' is missing '{}'", node_id, key)
            }
            Self::Unreachable { node_id } => {
                write!(f, "Node '{}' is not reachable from a trigger", node_id)
            }
        }
    }
}

/// Whether any issue prevents execution
pub fn has_blocking(issues: &[ValidationIssue]) -> bool {
    issues.iter().any(ValidationIssue::is_blocking)
}

/// Check a graph for execution readiness
///
/// Returns every issue found, ordered by check and then by node id.
pub fn validate_for_execution(graph: &WorkflowGraph) -> Vec<ValidationIssue> {
    let mut issues = Vec::new();

    let has_trigger = graph.nodes().any(|n| n.kind == NodeKind::Trigger);
    if !has_trigger {
        issues.push(ValidationIssue::MissingTrigger);
    }

    check_port_fan_out(graph, &mut issues);
    check_condition_wiring(graph, &mut issues);
    check_configuration(graph, &mut issues);

    if has_trigger {
        check_reachability(graph, &mut issues);
    }

    issues
}

/// Single-successor ports must carry at most one edge
fn check_port_fan_out(graph: &WorkflowGraph, issues: &mut Vec<ValidationIssue>) {
    let mut per_port: BTreeMap<(&str, &str), usize> = BTreeMap::new();
    for edge in graph.edges() {
        *per_port
            .entry((edge.source_node_id.as_str(), edge.source_port.as_str()))
            .or_insert(0) += 1;
    }

    for ((node_id, port), count) in per_port {
        if count > 1 {
            issues.push(ValidationIssue::MultipleOutgoing {
                node_id: node_id.to_string(),
                port: port.to_string(),
                count,
            });
        }
    }
}

/// A condition with no branch wired is legal but useless
fn check_condition_wiring(graph: &WorkflowGraph, issues: &mut Vec<ValidationIssue>) {
    for node in graph.nodes().filter(|n| n.kind == NodeKind::Condition) {
        if graph.outgoing_edges(&node.id).next().is_none() {
            issues.push(ValidationIssue::UnwiredCondition {
                node_id: node.id.clone(),
            });
        }
    }
}

fn check_configuration(graph: &WorkflowGraph, issues: &mut Vec<ValidationIssue>) {
    for node in graph.nodes() {
        let Some(key) = NodeTypeRegistry::descriptor(node.kind).config_key else {
            continue;
        };
        let configured = match node.config.get(key) {
            Some(serde_json::Value::String(s)) => !s.trim().is_empty(),
            Some(serde_json::Value::Null) | None => false,
            Some(_) => true,
        };
        if !configured {
            issues.push(ValidationIssue::Unconfigured {
                node_id: node.id.clone(),
                key: key.to_string(),
            });
        }
    }
}

fn check_reachability(graph: &WorkflowGraph, issues: &mut Vec<ValidationIssue>) {
    let reachable = graph.reachable_from_triggers();
    for node in graph.nodes() {
        if !reachable.contains(node.id.as_str()) {
            issues.push(ValidationIssue::Unreachable {
                node_id: node.id.clone(),
            });
        }
    }
}
