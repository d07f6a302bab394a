//! Parser for the authoring-oriented line grammar.
//!
//! A stricter DSL than the diagram grammar: `flow:`/`direction:` headers,
//! `[type] Label` node declarations keyed by label text, and `->` edges.
//! Unlike the diagram grammar this parser also assigns initial grid
//! coordinates itself instead of deferring to an external layout engine.

use fg_core::{ArrowKind, Direction, GraphBuilder, NodeDecl, NodeType, ParseResult, Point};
use tracing::debug;

const GRID_COLUMNS: usize = 4;
const GRID_ORIGIN: Point = Point { x: 80.0, y: 80.0 };
const COLUMN_SPACING: f64 = 220.0;
const ROW_SPACING: f64 = 140.0;
const HORIZONTAL_SPACING: f64 = 260.0;

pub fn parse(input: &str) -> ParseResult {
    let mut builder = GraphBuilder::new();
    let mut direction = Direction::TB;

    for line in input.lines() {
        let trimmed = line.trim();
        if trimmed.is_empty() || trimmed.starts_with('#') {
            continue;
        }

        if let Some(rest) = trimmed.strip_prefix("flow:") {
            let title = rest.trim().trim_matches('"').trim();
            if !title.is_empty() {
                builder.set_title(title);
            }
            continue;
        }

        if let Some(rest) = trimmed.strip_prefix("direction:") {
            if let Some(parsed) = Direction::parse(rest) {
                // RL collapses into LR here: the grammar only distinguishes
                // vertical from horizontal flow. Known limitation, kept
                // as-is rather than silently changed.
                direction = if parsed.is_horizontal() {
                    Direction::LR
                } else {
                    parsed
                };
            }
            continue;
        }

        if let Some(decl) = parse_typed_node(trimmed) {
            let _ = builder.intern_node(decl);
            continue;
        }
        if parse_edge_line(trimmed, &mut builder) {
            continue;
        }
        debug!(line = trimmed, "skipping unrecognized script line");
    }

    builder.set_direction(direction);
    for (index, id) in builder.node_ids().iter().enumerate() {
        builder.set_node_position(id, grid_position(index, direction));
    }
    builder.finish()
}

/// `[type] Label` — nodes are keyed by their label text, so a later line
/// with the same label updates the type in place.
fn parse_typed_node(line: &str) -> Option<NodeDecl> {
    let rest = line.strip_prefix('[')?;
    let (type_raw, label_raw) = rest.split_once(']')?;
    let label = label_raw.trim();
    if label.is_empty() {
        return None;
    }
    let node_type = NodeType::parse(type_raw).unwrap_or(NodeType::Process);
    Some(NodeDecl {
        id: label.to_string(),
        node_type: Some(node_type),
        label: Some(label.to_string()),
        ..NodeDecl::default()
    })
}

/// `Source -> Target` / `Source ->|label| Target`; endpoints auto-register
/// as `process` nodes.
fn parse_edge_line(line: &str, builder: &mut GraphBuilder) -> bool {
    let Some((left, right)) = line.split_once("->") else {
        return false;
    };
    let source = left.trim();
    let right = right.trim_start();
    let (label, target) = match right.strip_prefix('|') {
        Some(rest) => match rest.split_once('|') {
            Some((label, tail)) => (Some(label.trim()), tail.trim()),
            None => (None, right.trim()),
        },
        None => (None, right.trim()),
    };
    if source.is_empty() || target.is_empty() {
        return false;
    }

    builder.push_edge(
        NodeDecl::bare(source),
        ArrowKind::Solid,
        label.filter(|text| !text.is_empty()),
        NodeDecl::bare(target),
    );
    true
}

/// Vertical flow wraps into a fixed-width column grid; horizontal flow is a
/// single row. Order follows node registration order.
fn grid_position(index: usize, direction: Direction) -> Point {
    if direction.is_horizontal() {
        Point {
            x: GRID_ORIGIN.x + index as f64 * HORIZONTAL_SPACING,
            y: GRID_ORIGIN.y,
        }
    } else {
        let column = index % GRID_COLUMNS;
        let row = index / GRID_COLUMNS;
        Point {
            x: GRID_ORIGIN.x + column as f64 * COLUMN_SPACING,
            y: GRID_ORIGIN.y + row as f64 * ROW_SPACING,
        }
    }
}
