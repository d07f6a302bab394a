#![forbid(unsafe_code)]

//! Connection-anchor assignment for positioned graphs.
//!
//! Given node bounding boxes and the edges between them, decide which side
//! of the source and target boxes each connector should attach to. The pass
//! is pure and idempotent: it owns no state, and re-running it on its own
//! output with unchanged positions yields identical handles.

use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};
use tracing::trace;

use fg_core::{GraphEdge, HandleSide};

/// A positioned node as the layout engine (or the script grammar's grid)
/// reports it. `x`/`y` are the top-left corner, parent-relative when
/// `parent_id` is set.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct NodeBox {
    pub id: String,
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_id: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq)]
struct Center {
    x: f64,
    y: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Axis {
    Vertical,
    Horizontal,
}

impl Axis {
    const fn perpendicular(self) -> Self {
        match self {
            Self::Vertical => Self::Horizontal,
            Self::Horizontal => Self::Vertical,
        }
    }
}

/// Assign `source_handle`/`target_handle` to every resolvable non-self-loop
/// edge. Self-loops, and edges whose endpoints are missing from `nodes`,
/// pass through untouched.
#[must_use]
pub fn assign_anchors(nodes: &[NodeBox], edges: &[GraphEdge]) -> Vec<GraphEdge> {
    // Registration order doubles as the bidirectional tie-break, so the
    // routing never depends on how ids happen to be spelled.
    let mut order: FxHashMap<&str, usize> = FxHashMap::default();
    for (index, node) in nodes.iter().enumerate() {
        order.entry(node.id.as_str()).or_insert(index);
    }
    let centers = absolute_centers(nodes);

    // Count ordered endpoint pairs up front; a pair is bidirectional when
    // both directions appear.
    let mut directed_counts: FxHashMap<(usize, usize), usize> = FxHashMap::default();
    for edge in edges {
        if let (Some(&source), Some(&target)) = (
            order.get(edge.source.as_str()),
            order.get(edge.target.as_str()),
        ) && source != target
        {
            *directed_counts.entry((source, target)).or_insert(0) += 1;
        }
    }

    // Running per-pair counters keep the sibling lookup linear even with
    // many parallel edges between one pair.
    let mut sibling_seen: FxHashMap<(usize, usize), usize> = FxHashMap::default();

    edges
        .iter()
        .map(|edge| {
            let (Some(&source), Some(&target)) = (
                order.get(edge.source.as_str()),
                order.get(edge.target.as_str()),
            ) else {
                return edge.clone();
            };
            if source == target {
                // Anchor assignment is not defined for self-loops.
                return edge.clone();
            }

            let from = centers[source];
            let to = centers[target];
            let dx = to.x - from.x;
            let dy = to.y - from.y;

            let mut axis = if dy.abs() >= dx.abs() {
                Axis::Vertical
            } else {
                Axis::Horizontal
            };

            // Reverse member of a bidirectional pair routes perpendicular so
            // the two directions separate visually.
            let bidirectional = directed_counts.contains_key(&(target, source));
            if bidirectional && source > target {
                axis = axis.perpendicular();
            }

            // Parallel same-direction siblings alternate axes by position.
            let sibling_index = {
                let counter = sibling_seen.entry((source, target)).or_insert(0);
                let current = *counter;
                *counter += 1;
                current
            };
            if sibling_index % 2 == 1 {
                axis = axis.perpendicular();
            }

            let (source_handle, target_handle) = handles_for(axis, dx, dy);
            if edge.source_handle == Some(source_handle)
                && edge.target_handle == Some(target_handle)
            {
                return edge.clone();
            }

            trace!(
                edge = edge.id.as_str(),
                source = source_handle.as_str(),
                target = target_handle.as_str(),
                "assigned anchors"
            );
            let mut updated = edge.clone();
            updated.source_handle = Some(source_handle);
            updated.target_handle = Some(target_handle);
            updated
        })
        .collect()
}

/// Default handle pair for an axis, following the sign of that axis's
/// center-to-center delta.
const fn handles_for(axis: Axis, dx: f64, dy: f64) -> (HandleSide, HandleSide) {
    match axis {
        Axis::Vertical => {
            if dy >= 0.0 {
                (HandleSide::Bottom, HandleSide::Top)
            } else {
                (HandleSide::Top, HandleSide::Bottom)
            }
        }
        Axis::Horizontal => {
            if dx >= 0.0 {
                (HandleSide::Right, HandleSide::Left)
            } else {
                (HandleSide::Left, HandleSide::Right)
            }
        }
    }
}

/// Absolute center of every node, accumulating parent offsets for nested
/// coordinate systems. Parent chains are cycle-guarded by bounding the walk
/// at the node count.
fn absolute_centers(nodes: &[NodeBox]) -> Vec<Center> {
    let index_by_id: FxHashMap<&str, usize> = nodes
        .iter()
        .enumerate()
        .map(|(index, node)| (node.id.as_str(), index))
        .collect();

    nodes
        .iter()
        .map(|node| {
            let mut x = node.x;
            let mut y = node.y;
            let mut parent = node.parent_id.as_deref();
            let mut hops = 0;
            while let Some(parent_id) = parent {
                let Some(&parent_index) = index_by_id.get(parent_id) else {
                    break;
                };
                let parent_box = &nodes[parent_index];
                x += parent_box.x;
                y += parent_box.y;
                parent = parent_box.parent_id.as_deref();
                hops += 1;
                if hops > nodes.len() {
                    break;
                }
            }
            Center {
                x: x + node.width / 2.0,
                y: y + node.height / 2.0,
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use fg_core::{ArrowKind, GraphEdge};
    use proptest::prelude::*;

    use super::*;

    fn node(id: &str, x: f64, y: f64) -> NodeBox {
        NodeBox {
            id: id.to_string(),
            x,
            y,
            width: 120.0,
            height: 60.0,
            parent_id: None,
        }
    }

    fn edge(id: &str, source: &str, target: &str) -> GraphEdge {
        GraphEdge {
            id: id.to_string(),
            source: source.to_string(),
            target: target.to_string(),
            arrow: ArrowKind::Solid,
            ..GraphEdge::default()
        }
    }

    #[test]
    fn vertical_delta_picks_bottom_to_top() {
        // Same center x, B 300 below A.
        let nodes = [node("A", -60.0, -30.0), node("B", -60.0, 270.0)];
        let anchored = assign_anchors(&nodes, &[edge("e0", "A", "B")]);
        assert_eq!(anchored[0].source_handle, Some(HandleSide::Bottom));
        assert_eq!(anchored[0].target_handle, Some(HandleSide::Top));
    }

    #[test]
    fn upward_and_leftward_deltas_mirror() {
        let nodes = [node("A", 0.0, 0.0), node("B", 0.0, 300.0), node("C", 400.0, 0.0)];
        let anchored = assign_anchors(
            &nodes,
            &[edge("e0", "B", "A"), edge("e1", "C", "A")],
        );
        assert_eq!(anchored[0].source_handle, Some(HandleSide::Top));
        assert_eq!(anchored[0].target_handle, Some(HandleSide::Bottom));
        assert_eq!(anchored[1].source_handle, Some(HandleSide::Left));
        assert_eq!(anchored[1].target_handle, Some(HandleSide::Right));
    }

    #[test]
    fn dominant_axis_ties_go_vertical() {
        let nodes = [node("A", 0.0, 0.0), node("B", 200.0, 200.0)];
        let anchored = assign_anchors(&nodes, &[edge("e0", "A", "B")]);
        assert_eq!(anchored[0].source_handle, Some(HandleSide::Bottom));
    }

    #[test]
    fn parallel_siblings_spread_across_sides() {
        let nodes = [node("A", 0.0, 0.0), node("B", 0.0, 300.0)];
        let edges = [edge("e0", "A", "B"), edge("e1", "A", "B")];
        let anchored = assign_anchors(&nodes, &edges);
        assert_ne!(
            anchored[0].source_handle, anchored[1].source_handle,
            "second sibling must not overlap the first"
        );
        assert_eq!(anchored[1].source_handle, Some(HandleSide::Right));
    }

    #[test]
    fn bidirectional_pair_routes_reverse_member_perpendicular() {
        let nodes = [node("A", 0.0, 0.0), node("B", 0.0, 300.0)];
        let edges = [edge("e0", "A", "B"), edge("e1", "B", "A")];
        let anchored = assign_anchors(&nodes, &edges);
        // Forward member keeps the vertical default.
        assert_eq!(anchored[0].source_handle, Some(HandleSide::Bottom));
        // Reverse member (its source registered later) goes horizontal.
        assert_eq!(anchored[1].source_handle, Some(HandleSide::Right));
        assert_eq!(anchored[1].target_handle, Some(HandleSide::Left));
    }

    #[test]
    fn reverse_detection_ignores_processing_order() {
        let nodes = [node("A", 0.0, 0.0), node("B", 0.0, 300.0)];
        let forward_first = assign_anchors(&nodes, &[edge("e0", "A", "B"), edge("e1", "B", "A")]);
        let reverse_first = assign_anchors(&nodes, &[edge("e1", "B", "A"), edge("e0", "A", "B")]);
        let find = |edges: &[GraphEdge], id: &str| {
            edges
                .iter()
                .find(|e| e.id == id)
                .map(|e| (e.source_handle, e.target_handle))
                .expect("edge")
        };
        assert_eq!(find(&forward_first, "e0"), find(&reverse_first, "e0"));
        assert_eq!(find(&forward_first, "e1"), find(&reverse_first, "e1"));
    }

    #[test]
    fn self_loops_and_unknown_endpoints_pass_through() {
        let nodes = [node("A", 0.0, 0.0)];
        let edges = [edge("e0", "A", "A"), edge("e1", "A", "ghost")];
        let anchored = assign_anchors(&nodes, &edges);
        assert_eq!(anchored[0], edges[0]);
        assert_eq!(anchored[1], edges[1]);
    }

    #[test]
    fn nested_positions_resolve_through_parent_chain() {
        let parent = NodeBox {
            id: "grp".to_string(),
            x: 500.0,
            y: 0.0,
            width: 300.0,
            height: 200.0,
            parent_id: None,
        };
        // Child sits at the parent's left edge; absolute center x ≈ 560.
        let child = NodeBox {
            id: "C".to_string(),
            x: 0.0,
            y: 70.0,
            width: 120.0,
            height: 60.0,
            parent_id: Some("grp".to_string()),
        };
        let outside = node("X", 0.0, 70.0);
        let anchored = assign_anchors(&[parent, child, outside], &[edge("e0", "X", "C")]);
        // Without parent offsets the delta would be zero; with them the
        // child is far to the right.
        assert_eq!(anchored[0].source_handle, Some(HandleSide::Right));
        assert_eq!(anchored[0].target_handle, Some(HandleSide::Left));
    }

    #[test]
    fn rerunning_on_own_output_changes_nothing() {
        let nodes = [
            node("A", 0.0, 0.0),
            node("B", 0.0, 300.0),
            node("C", 400.0, 150.0),
        ];
        let edges = [
            edge("e0", "A", "B"),
            edge("e1", "A", "B"),
            edge("e2", "B", "A"),
            edge("e3", "B", "C"),
        ];
        let first = assign_anchors(&nodes, &edges);
        let second = assign_anchors(&nodes, &first);
        assert_eq!(first, second);
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(64))]

        #[test]
        fn prop_assign_anchors_is_idempotent(
            coords in prop::collection::vec((-500.0_f64..500.0, -500.0_f64..500.0), 2..8),
            pairs in prop::collection::vec((0_usize..8, 0_usize..8), 0..16),
        ) {
            let nodes: Vec<NodeBox> = coords
                .iter()
                .enumerate()
                .map(|(index, &(x, y))| node(&format!("n{index}"), x, y))
                .collect();
            let edges: Vec<GraphEdge> = pairs
                .iter()
                .enumerate()
                .map(|(index, &(a, b))| {
                    edge(
                        &format!("e{index}"),
                        &format!("n{}", a % nodes.len()),
                        &format!("n{}", b % nodes.len()),
                    )
                })
                .collect();

            let first = assign_anchors(&nodes, &edges);
            let second = assign_anchors(&nodes, &first);
            prop_assert_eq!(first, second);
        }
    }
}
