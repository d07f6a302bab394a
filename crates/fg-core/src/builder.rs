use std::collections::BTreeMap;

use rustc_hash::FxHashMap;
use tracing::debug;

use crate::{
    ArrowKind, ClassStyle, Direction, GraphEdge, GraphNode, NodeShape, NodeType, ParseError,
    ParseResult, Point,
};

/// One node declaration as seen in the source text.
///
/// Fields left as `None` mean "not stated" and never overwrite values from an
/// earlier declaration of the same id; a bare edge endpoint is the extreme
/// case, carrying nothing but the id.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct NodeDecl {
    pub id: String,
    pub node_type: Option<NodeType>,
    pub shape: Option<NodeShape>,
    pub label: Option<String>,
    pub classes: Vec<String>,
}

impl NodeDecl {
    #[must_use]
    pub fn bare(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            ..Self::default()
        }
    }
}

#[derive(Debug, Clone, Default)]
struct PendingNode {
    id: String,
    node_type: Option<NodeType>,
    shape: Option<NodeShape>,
    label: Option<String>,
    classes: Vec<String>,
    inline_style: ClassStyle,
    parent_id: Option<String>,
    position: Option<Point>,
}

#[derive(Debug, Clone)]
struct PendingEdge {
    source: String,
    target: String,
    arrow: ArrowKind,
    label: Option<String>,
}

/// Shared graph assembly used by both grammars.
///
/// Holds all scratch state for one parse call: the id-keyed node table with
/// merge-on-redeclare semantics, the open-scope stack, and the class and
/// positional-edge style tables. `finish` materializes the `ParseResult` and
/// discards the scratch.
#[derive(Debug, Default)]
pub struct GraphBuilder {
    direction: Option<Direction>,
    title: Option<String>,
    nodes: Vec<PendingNode>,
    index_by_id: FxHashMap<String, usize>,
    edges: Vec<PendingEdge>,
    scope_stack: Vec<String>,
    class_styles: BTreeMap<String, ClassStyle>,
    edge_styles: BTreeMap<usize, ClassStyle>,
}

impl GraphBuilder {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_direction(&mut self, direction: Direction) {
        self.direction = Some(direction);
    }

    pub fn set_title(&mut self, title: impl Into<String>) {
        self.title = Some(title.into());
    }

    #[must_use]
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// 0-based index the next recorded edge will get. `linkStyle` directives
    /// bind to these encounter indexes.
    #[must_use]
    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }

    /// Register or update a node. Later explicit label/type/shape win over
    /// earlier ones; class tags accumulate; the first declaration fixes the
    /// scope parent.
    pub fn intern_node(&mut self, decl: NodeDecl) -> Option<usize> {
        let id = decl.id.trim();
        if id.is_empty() {
            return None;
        }

        if let Some(&existing) = self.index_by_id.get(id) {
            let node = &mut self.nodes[existing];
            if decl.node_type.is_some() {
                node.node_type = decl.node_type;
            }
            if decl.shape.is_some() {
                node.shape = decl.shape;
            }
            if decl.label.is_some() {
                node.label = decl.label;
            }
            node.classes.extend(decl.classes);
            return Some(existing);
        }

        let index = self.nodes.len();
        self.nodes.push(PendingNode {
            id: id.to_string(),
            node_type: decl.node_type,
            shape: decl.shape,
            label: decl.label,
            classes: decl.classes,
            inline_style: ClassStyle::new(),
            parent_id: self.scope_stack.last().cloned(),
            position: None,
        });
        self.index_by_id.insert(id.to_string(), index);
        Some(index)
    }

    /// Open a named scope. The scope itself is registered as a `Group` node
    /// (nested under any already-open scope) before being pushed.
    pub fn open_scope(&mut self, id: &str, label: Option<&str>) {
        let decl = NodeDecl {
            id: id.to_string(),
            node_type: Some(NodeType::Group),
            label: label.map(str::to_string),
            ..NodeDecl::default()
        };
        if self.intern_node(decl).is_some() {
            self.scope_stack.push(id.trim().to_string());
        }
    }

    /// Close the innermost open scope. A close with no open scope is a no-op.
    pub fn close_scope(&mut self) {
        let _ = self.scope_stack.pop();
    }

    /// Record one edge, auto-registering both endpoints. Endpoints that fail
    /// to intern (empty ids) drop the edge.
    pub fn push_edge(
        &mut self,
        source: NodeDecl,
        arrow: ArrowKind,
        label: Option<&str>,
        target: NodeDecl,
    ) {
        let source_id = source.id.trim().to_string();
        let target_id = target.id.trim().to_string();
        if self.intern_node(source).is_none() || self.intern_node(target).is_none() {
            return;
        }
        self.edges.push(PendingEdge {
            source: source_id,
            target: target_id,
            arrow,
            label: label.map(str::to_string),
        });
    }

    pub fn define_class(&mut self, name: &str, props: ClassStyle) {
        self.class_styles
            .entry(name.trim().to_string())
            .or_default()
            .extend(props);
    }

    /// Attach an inline style bundle to one node, auto-registering a stub if
    /// the id has not been seen yet.
    pub fn style_node(&mut self, id: &str, props: ClassStyle) {
        if let Some(index) = self.intern_node(NodeDecl::bare(id)) {
            self.nodes[index].inline_style.extend(props);
        }
    }

    /// Attach a style bundle to edges by 0-based encounter index.
    pub fn style_edges(&mut self, indexes: &[usize], props: ClassStyle) {
        for &index in indexes {
            self.edge_styles
                .entry(index)
                .or_default()
                .extend(props.clone());
        }
    }

    /// Set a node's layout position (used by the script grammar's grid pass).
    pub fn set_node_position(&mut self, id: &str, position: Point) {
        if let Some(&index) = self.index_by_id.get(id) {
            self.nodes[index].position = Some(position);
        }
    }

    /// Ids in registration order.
    #[must_use]
    pub fn node_ids(&self) -> Vec<String> {
        self.nodes.iter().map(|node| node.id.clone()).collect()
    }

    /// Materialize the final result. Shape defaults resolve from the node
    /// type; styles layer as type default, then classes in tag order, then
    /// inline overrides. Edges with an endpoint that never resolved are
    /// dropped without failing the parse.
    #[must_use]
    pub fn finish(self) -> ParseResult {
        if self.nodes.is_empty() {
            return ParseResult::failure(ParseError::NoNodesFound);
        }

        let nodes: Vec<GraphNode> = self
            .nodes
            .iter()
            .map(|pending| {
                let node_type = pending.node_type.unwrap_or_default();
                let shape = pending.shape.unwrap_or_else(|| node_type.default_shape());

                let mut style = ClassStyle::new();
                style.insert("fill".to_string(), node_type.default_fill().to_string());
                for class in &pending.classes {
                    if let Some(class_style) = self.class_styles.get(class) {
                        style.extend(class_style.clone());
                    }
                }
                style.extend(pending.inline_style.clone());

                GraphNode {
                    id: pending.id.clone(),
                    node_type,
                    shape,
                    label: pending.label.clone().unwrap_or_else(|| pending.id.clone()),
                    parent_id: pending.parent_id.clone(),
                    style,
                    position: pending.position,
                }
            })
            .collect();

        let edges: Vec<GraphEdge> = self
            .edges
            .iter()
            .enumerate()
            .filter_map(|(index, pending)| {
                if !self.index_by_id.contains_key(&pending.source)
                    || !self.index_by_id.contains_key(&pending.target)
                {
                    debug!(
                        source = pending.source.as_str(),
                        target = pending.target.as_str(),
                        "dropping edge with unresolved endpoint"
                    );
                    return None;
                }
                let mut style = pending.arrow.style_markers();
                if let Some(positional) = self.edge_styles.get(&index) {
                    style.extend(positional.clone());
                }
                Some(GraphEdge {
                    id: format!("e{index}"),
                    source: pending.source.clone(),
                    target: pending.target.clone(),
                    label: pending.label.clone(),
                    arrow: pending.arrow,
                    style,
                    source_handle: None,
                    target_handle: None,
                })
            })
            .collect();

        ParseResult {
            nodes,
            edges,
            direction: self.direction,
            title: self.title,
            error: None,
        }
    }
}
