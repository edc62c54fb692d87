//! Node type registry
//!
//! Declares, for each [`NodeKind`], the ports it exposes and the metadata
//! the editor palette shows. The set of kinds is closed, so the registry is
//! a static table rather than a runtime map: adding a kind means adding a
//! descriptor here and an execution-engine counterpart on the backend.

use serde::Serialize;

use crate::error::Result;
use crate::types::NodeKind;

/// The single inbound port every non-trigger kind exposes
pub const INPUT_PORT: &str = "in";

/// The single outbound port of Trigger, Action and HumanApproval
pub const OUTPUT_PORT: &str = "out";

/// Condition's branch taken when the expression holds
pub const TRUE_PORT: &str = "true";

/// Condition's branch taken otherwise
pub const FALSE_PORT: &str = "false";

/// Category of a node, for grouping in the palette
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeCategory {
    /// Starts executions
    Entry,
    /// Does work
    Step,
    /// Routes control flow
    Control,
}

/// Metadata for a port
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PortMetadata {
    /// Port identifier, as stored on edges
    pub id: &'static str,
    /// Human-readable label
    pub label: &'static str,
}

impl PortMetadata {
    const fn new(id: &'static str, label: &'static str) -> Self {
        Self { id, label }
    }
}

/// Complete metadata for a node kind
#[derive(Debug, Clone, Copy, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NodeTypeDescriptor {
    pub kind: NodeKind,
    pub category: NodeCategory,
    /// Default label for new nodes
    pub label: &'static str,
    pub description: &'static str,
    pub inbound: &'static [PortMetadata],
    pub outbound: &'static [PortMetadata],
    /// Config key whose absence means the node still needs configuring
    pub config_key: Option<&'static str>,
}

/// Port names of one kind, in declaration order
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Ports {
    pub inbound: Vec<&'static str>,
    pub outbound: Vec<&'static str>,
}

const IN: &[PortMetadata] = &[PortMetadata::new(INPUT_PORT, "Input")];
const OUT: &[PortMetadata] = &[PortMetadata::new(OUTPUT_PORT, "Next")];

const DESCRIPTORS: [NodeTypeDescriptor; 4] = [
    NodeTypeDescriptor {
        kind: NodeKind::Trigger,
        category: NodeCategory::Entry,
        label: "Trigger",
        description: "Starts the workflow when an event occurs",
        inbound: &[],
        outbound: OUT,
        config_key: Some("triggerType"),
    },
    NodeTypeDescriptor {
        kind: NodeKind::Action,
        category: NodeCategory::Step,
        label: "Action",
        description: "Performs a single automated step",
        inbound: IN,
        outbound: OUT,
        config_key: Some("actionType"),
    },
    NodeTypeDescriptor {
        kind: NodeKind::Condition,
        category: NodeCategory::Control,
        label: "Condition",
        description: "Branches on an expression",
        inbound: IN,
        outbound: &[
            PortMetadata::new(TRUE_PORT, "True"),
            PortMetadata::new(FALSE_PORT, "False"),
        ],
        config_key: Some("condition"),
    },
    NodeTypeDescriptor {
        kind: NodeKind::HumanApproval,
        category: NodeCategory::Control,
        label: "Human Approval",
        description: "Waits until a person approves",
        inbound: IN,
        outbound: OUT,
        config_key: None,
    },
];

/// Registry of node kinds with their port metadata
pub struct NodeTypeRegistry;

impl NodeTypeRegistry {
    /// Get the descriptor for a kind
    pub fn descriptor(kind: NodeKind) -> &'static NodeTypeDescriptor {
        match kind {
            NodeKind::Trigger => &DESCRIPTORS[0],
            NodeKind::Action => &DESCRIPTORS[1],
            NodeKind::Condition => &DESCRIPTORS[2],
            NodeKind::HumanApproval => &DESCRIPTORS[3],
        }
    }

    /// All descriptors, in palette order
    pub fn all() -> &'static [NodeTypeDescriptor] {
        &DESCRIPTORS
    }

    /// Inbound and outbound port names for a kind
    pub fn ports_for(kind: NodeKind) -> Ports {
        let descriptor = Self::descriptor(kind);
        Ports {
            inbound: descriptor.inbound.iter().map(|p| p.id).collect(),
            outbound: descriptor.outbound.iter().map(|p| p.id).collect(),
        }
    }

    /// Ports for a kind given by wire name, as found in persisted data
    pub fn ports_for_name(name: &str) -> Result<Ports> {
        NodeKind::from_wire_name(name).map(Self::ports_for)
    }

    /// Whether `port` is an inbound port of `kind`
    pub fn has_inbound(kind: NodeKind, port: &str) -> bool {
        Self::descriptor(kind).inbound.iter().any(|p| p.id == port)
    }

    /// Whether `port` is an outbound port of `kind`
    pub fn has_outbound(kind: NodeKind, port: &str) -> bool {
        Self::descriptor(kind).outbound.iter().any(|p| p.id == port)
    }
}
