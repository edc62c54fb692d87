//! Property tests: random edit streams keep the graph sound and persistable

use proptest::prelude::*;
use workflow_graph::{
    EdgeDraft, EditEvent, EditorSession, Node, NodeKind, NodePatch, Position, WorkflowData,
    WorkflowGraph,
};

const NODE_IDS: &[&str] = &["n0", "n1", "n2", "n3", "n4"];
const PORTS: &[&str] = &["in", "out", "true", "false", "bogus"];

fn arb_node_id() -> impl Strategy<Value = String> {
    prop::sample::select(NODE_IDS).prop_map(str::to_string)
}

fn arb_port() -> impl Strategy<Value = String> {
    prop::sample::select(PORTS).prop_map(str::to_string)
}

fn arb_kind() -> impl Strategy<Value = NodeKind> {
    prop_oneof![
        Just(NodeKind::Trigger),
        Just(NodeKind::Action),
        Just(NodeKind::Condition),
        Just(NodeKind::HumanApproval),
    ]
}

fn arb_label() -> impl Strategy<Value = String> {
    prop_oneof![Just(String::new()), Just("Renamed".to_string()), "[a-z]{1,8}"]
}

/// Mostly half-unit coordinates, sometimes values JSON cannot carry
fn arb_coordinate() -> impl Strategy<Value = f64> {
    prop_oneof![
        8 => (-4000i32..4000).prop_map(|v| f64::from(v) / 2.0),
        1 => Just(f64::NAN),
        1 => Just(f64::INFINITY),
    ]
}

fn arb_position() -> impl Strategy<Value = Position> {
    (arb_coordinate(), arb_coordinate()).prop_map(|(x, y)| Position::new(x, y))
}

fn arb_patch() -> impl Strategy<Value = NodePatch> {
    (
        prop::option::of(arb_label()),
        prop::option::of(arb_position()),
        prop::option::of(prop_oneof![
            Just(serde_json::Value::Null),
            Just(serde_json::json!("send_email")),
            Just(serde_json::json!(42)),
        ]),
    )
        .prop_map(|(label, position, config)| {
            let patch = NodePatch {
                label,
                position,
                ..NodePatch::default()
            };
            match config {
                Some(value) => patch.with_config("actionType", value),
                None => patch,
            }
        })
}

fn arb_event() -> impl Strategy<Value = EditEvent> {
    prop_oneof![
        3 => (arb_node_id(), arb_kind(), arb_label(), arb_position()).prop_map(
            |(id, kind, label, position)| EditEvent::AddNode {
                node: Node::new(id, kind)
                    .with_label(label)
                    .at(position.x, position.y),
            }
        ),
        1 => (arb_node_id(), arb_position())
            .prop_map(|(node_id, position)| EditEvent::MoveNode { node_id, position }),
        1 => arb_node_id().prop_map(|node_id| EditEvent::DeleteNode { node_id }),
        4 => (
            arb_node_id(),
            arb_port(),
            arb_node_id(),
            arb_port(),
            prop::option::of(prop::sample::select(&["e0", "e1", "e2"][..])),
        )
            .prop_map(|(source, source_port, target, target_port, id)| {
                let draft = EdgeDraft::new(source, source_port, target, target_port);
                EditEvent::ConnectEdge {
                    edge: match id {
                        Some(id) => draft.with_id(id),
                        None => draft,
                    },
                }
            }),
        1 => prop::sample::select(&["e0", "e1", "e2"][..])
            .prop_map(|id| EditEvent::DisconnectEdge { edge_id: id.to_string() }),
        2 => (arb_node_id(), arb_patch())
            .prop_map(|(node_id, patch)| EditEvent::PatchNodeConfig { node_id, patch }),
    ]
}

fn assert_sound(graph: &WorkflowGraph) -> Result<(), TestCaseError> {
    for edge in graph.edges() {
        prop_assert!(graph.node(&edge.source_node_id).is_some(), "dangling source in {:?}", edge);
        prop_assert!(graph.node(&edge.target_node_id).is_some(), "dangling target in {:?}", edge);
        prop_assert_ne!(&edge.source_node_id, &edge.target_node_id);
    }
    for node in graph.nodes() {
        prop_assert!(node.position.is_finite(), "non-finite position on {}", node.id);
    }
    for issue in graph.validate_for_execution() {
        if let Some(node_id) = issue.node_id() {
            prop_assert!(graph.node(node_id).is_some(), "issue names missing node: {}", issue);
        }
    }
    Ok(())
}

proptest! {
    /// Every intermediate graph has no dangling edges and no stale issues
    #[test]
    fn edits_never_leave_dangling_references(events in prop::collection::vec(arb_event(), 0..40)) {
        let mut session = EditorSession::new();
        for event in events {
            let _ = session.apply_edit(event);
            assert_sound(session.graph())?;
        }
    }

    /// A graph built from accepted edits survives JSON persistence unchanged
    #[test]
    fn edited_graphs_round_trip(events in prop::collection::vec(arb_event(), 0..40)) {
        let mut session = EditorSession::new();
        for event in events {
            let _ = session.apply_edit(event);
        }

        let json = serde_json::to_string(&session.snapshot()).unwrap();
        let data: WorkflowData = serde_json::from_str(&json).unwrap();
        let restored = EditorSession::from_data(data).unwrap();
        prop_assert_eq!(restored.graph(), session.graph());
    }

    /// Undoing every accepted edit walks back to an empty graph
    #[test]
    fn undo_reaches_empty_graph(events in prop::collection::vec(arb_event(), 0..20)) {
        let mut session = EditorSession::new();
        for event in events {
            let _ = session.apply_edit(event);
        }

        while session.undo().unwrap() {
            assert_sound(session.graph())?;
        }
        prop_assert!(session.graph().is_empty());
    }
}
