//! Integration tests for the FlowGraph pipeline.
//!
//! These tests verify the end-to-end flow from parsing through anchor
//! assignment, the same path the CLI commands take.

use fg_anchor::{NodeBox, assign_anchors};
use fg_core::{ArrowKind, Direction, HandleSide, NodeShape, NodeType};
use fg_parser::{parse_diagram, parse_script};

/// A rich-grammar flowchart parses into the expected model.
#[test]
fn flowchart_parses_into_expected_model() {
    let input = r#"flowchart LR
    A([Start]) --> B{Ready?}
    B -->|yes| C[Work]
    B -.->|no| D((Done))
"#;

    let result = parse_diagram(input);
    assert!(result.error.is_none(), "parse error: {:?}", result.error);
    assert_eq!(result.direction, Some(Direction::LR));
    assert_eq!(result.nodes.len(), 4);
    assert_eq!(result.edges.len(), 3);

    let a = result.nodes.iter().find(|n| n.id == "A").expect("node A");
    assert_eq!(a.node_type, NodeType::Start);
    assert_eq!(a.shape, NodeShape::Capsule);
    assert_eq!(a.label, "Start");

    let labeled = result.edges.iter().find(|e| e.source == "B" && e.target == "C");
    assert_eq!(
        labeled.and_then(|e| e.label.as_deref()),
        Some("yes"),
        "pipe label must survive"
    );
    let dotted = result.edges.iter().find(|e| e.target == "D").expect("edge to D");
    assert_eq!(dotted.arrow, ArrowKind::Dashed);
}

/// Input with no recognized header fails with a clear error and no nodes.
#[test]
fn missing_header_reports_error() {
    let result = parse_diagram("A --> B\nB --> C");
    assert!(result.error.is_some());
    assert!(result.nodes.is_empty());
    assert!(result.edges.is_empty());
}

/// A script-grammar flow parses, positions nodes on the grid, and the
/// positions feed straight into anchor assignment.
#[test]
fn script_flow_feeds_anchor_assignment() {
    let input = "flow: Checkout\n\
                 [start] Open cart\n\
                 [decision] In stock?\n\
                 [end] Confirmed\n\
                 Open cart -> In stock?\n\
                 In stock? ->|yes| Confirmed\n";

    let result = parse_script(input);
    assert!(result.error.is_none(), "parse error: {:?}", result.error);
    assert_eq!(result.title.as_deref(), Some("Checkout"));
    assert_eq!(result.nodes.len(), 3);
    assert_eq!(result.edges.len(), 2);

    // Every script node carries a grid position the anchor pass can use.
    let boxes: Vec<NodeBox> = result
        .nodes
        .iter()
        .map(|node| {
            let position = node.position.expect("script nodes are positioned");
            NodeBox {
                id: node.id.clone(),
                x: position.x,
                y: position.y,
                width: 160.0,
                height: 60.0,
                parent_id: node.parent_id.clone(),
            }
        })
        .collect();

    let anchored = assign_anchors(&boxes, &result.edges);
    assert_eq!(anchored.len(), 2);
    for edge in &anchored {
        assert!(edge.source_handle.is_some(), "edge {} unanchored", edge.id);
        assert!(edge.target_handle.is_some(), "edge {} unanchored", edge.id);
    }

    // First grid row runs left to right, so the first hop is horizontal.
    assert_eq!(anchored[0].source_handle, Some(HandleSide::Right));
    assert_eq!(anchored[0].target_handle, Some(HandleSide::Left));
}

/// Subgraph members keep their parent and the anchor pass resolves their
/// positions through it.
#[test]
fn subgraph_members_carry_parent_ids() {
    let input = r#"flowchart TB
    subgraph billing [Billing]
        P[Charge card]
        Q[Send receipt]
    end
    P --> Q
"#;

    let result = parse_diagram(input);
    assert!(result.error.is_none());

    let group = result
        .nodes
        .iter()
        .find(|n| n.id == "billing")
        .expect("group node");
    assert_eq!(group.node_type, NodeType::Group);
    assert_eq!(group.label, "Billing");

    for id in ["P", "Q"] {
        let node = result.nodes.iter().find(|n| n.id == id).expect("member");
        assert_eq!(node.parent_id.as_deref(), Some("billing"));
    }
}

/// The parse output serializes to JSON and back without loss, which the
/// `anchors` command depends on.
#[test]
fn parse_output_round_trips_through_json() {
    let input = "flowchart TD\n    A --> B\n    style A fill:#f96\n";
    let result = parse_diagram(input);

    let json = serde_json::to_string(&result).expect("serialize");
    let back: fg_parser::ParseResult = serde_json::from_str(&json).expect("deserialize");
    assert_eq!(result, back);

    let a = back.nodes.iter().find(|n| n.id == "A").expect("node A");
    assert_eq!(a.style.get("fill").map(String::as_str), Some("#f96"));
}
