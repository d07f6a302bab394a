//! Statement parser for the rich diagram grammar (flowchart and state
//! dialects).
//!
//! Processing is strictly line by line: normalize, split `;`-separated
//! statements, classify each one, and dispatch on the resulting
//! [`Statement`]. All scratch state lives in the shared [`GraphBuilder`].

use fg_core::{
    Direction, GraphBuilder, NodeDecl, NodeShape, NodeType, ParseError, ParseResult,
};
use tracing::debug;

use crate::normalize;
use crate::statement::{
    Dialect, EndpointToken, Statement, classify, is_comment, split_statements,
};

pub fn parse(input: &str) -> ParseResult {
    let normalized = normalize::normalize(input);
    let mut builder = GraphBuilder::new();
    let mut header_seen = false;
    let mut dialect = Dialect::default();
    let mut wildcard_count = 0_usize;

    for line in normalized.lines() {
        let trimmed = line.trim();
        if trimmed.is_empty() || is_comment(trimmed) {
            continue;
        }

        for raw_statement in split_statements(trimmed) {
            match classify(raw_statement, dialect) {
                Statement::Header {
                    dialect: declared,
                    direction,
                } => {
                    header_seen = true;
                    dialect = declared;
                    builder.set_direction(direction.unwrap_or(Direction::TB));
                }
                Statement::DirectionHint(direction) => builder.set_direction(direction),
                Statement::ScopeOpen { id, label } => builder.open_scope(&id, label.as_deref()),
                Statement::ScopeClose => builder.close_scope(),
                Statement::ClassDef { names, props } => {
                    for name in names {
                        builder.define_class(&name, props.clone());
                    }
                }
                Statement::NodeStyle { id, props } => builder.style_node(&id, props),
                Statement::EdgeStyle { indexes, props } => builder.style_edges(&indexes, props),
                Statement::Edge(segments) => {
                    let mut carried: Option<NodeDecl> = None;
                    for segment in segments {
                        let source = match carried.take() {
                            Some(decl) => decl,
                            None => resolve_endpoint(segment.source, true, &mut wildcard_count),
                        };
                        let target =
                            resolve_endpoint(segment.target, false, &mut wildcard_count);
                        // The chain reuses the previous right-hand endpoint,
                        // so a wildcard in the middle stays one node.
                        carried = Some(NodeDecl::bare(target.id.clone()));
                        builder.push_edge(source, segment.arrow, segment.label.as_deref(), target);
                    }
                }
                Statement::NodeDecl(decl) => {
                    let _ = builder.intern_node(decl);
                }
                Statement::Skip => {
                    debug!(statement = raw_statement, "skipping unrecognized statement");
                }
            }
        }
    }

    if !header_seen {
        return ParseResult::failure(ParseError::MissingDiagramDeclaration);
    }
    builder.finish()
}

/// Materialize an endpoint token. Each `[*]` occurrence mints a distinct
/// synthetic node: a start marker when used as a source, an end marker when
/// used as a target.
fn resolve_endpoint(token: EndpointToken, is_source: bool, counter: &mut usize) -> NodeDecl {
    match token {
        EndpointToken::Declared(decl) => decl,
        EndpointToken::AnyState => {
            let id = format!("__any_{counter}");
            *counter += 1;
            NodeDecl {
                id,
                node_type: Some(if is_source { NodeType::Start } else { NodeType::End }),
                shape: Some(NodeShape::Circle),
                label: Some("*".to_string()),
                classes: Vec::new(),
            }
        }
    }
}
