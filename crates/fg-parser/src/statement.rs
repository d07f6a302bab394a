//! Line classification for the rich grammar.
//!
//! Every statement is turned into exactly one [`Statement`] variant by
//! [`classify`]; the parse loop then dispatches on the variant with a single
//! exhaustive match. Keeping classification separate from state mutation
//! makes each statement kind testable on its own.

use fg_core::{ArrowKind, ClassStyle, Direction, NodeDecl, NodeShape, NodeType, parse_style_props};
use unicode_segmentation::UnicodeSegmentation;

/// Arrow tokens, longest lexical form first so `-.->` is never split into
/// shorter operators.
pub(crate) const ARROW_OPERATORS: [(&str, ArrowKind); 3] = [
    ("-.->", ArrowKind::Dashed),
    ("==>", ArrowKind::Thick),
    ("-->", ArrowKind::Solid),
];

/// Grammar family announced by the header. Some statement forms are only
/// meaningful in one dialect; the state dialect's trailing `: label` edge
/// spelling in particular must not consume colons in flowchart input.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub(crate) enum Dialect {
    #[default]
    Flowchart,
    State,
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Statement {
    Header {
        dialect: Dialect,
        direction: Option<Direction>,
    },
    DirectionHint(Direction),
    ScopeOpen { id: String, label: Option<String> },
    ScopeClose,
    ClassDef { names: Vec<String>, props: ClassStyle },
    NodeStyle { id: String, props: ClassStyle },
    EdgeStyle { indexes: Vec<usize>, props: ClassStyle },
    Edge(Vec<EdgeSegment>),
    NodeDecl(NodeDecl),
    Skip,
}

/// One hop of a (possibly chained) edge statement.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct EdgeSegment {
    pub source: EndpointToken,
    pub arrow: ArrowKind,
    pub label: Option<String>,
    pub target: EndpointToken,
}

/// An edge endpoint: either a concrete declaration or the state-dialect
/// `[*]` wildcard, which mints a fresh synthetic node per occurrence.
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum EndpointToken {
    Declared(NodeDecl),
    AnyState,
}

pub(crate) fn classify(statement: &str, dialect: Dialect) -> Statement {
    let trimmed = statement.trim();
    if trimmed.is_empty() || is_comment(trimmed) {
        return Statement::Skip;
    }

    if let Some(header) = parse_header(trimmed) {
        return header;
    }

    if let Some(rest) = trimmed.strip_prefix("direction ")
        && let Some(direction) = Direction::parse(rest)
    {
        return Statement::DirectionHint(direction);
    }

    if let Some(scope) = parse_subgraph(trimmed) {
        return scope;
    }
    if trimmed == "end" || trimmed == "}" {
        return Statement::ScopeClose;
    }
    if let Some(state) = parse_state_declaration(trimmed) {
        return state;
    }

    if let Some(rest) = trimmed.strip_prefix("classDef ")
        && let Some((names_raw, props_raw)) = rest.trim().split_once(char::is_whitespace)
    {
        let names: Vec<String> = names_raw
            .split(',')
            .map(str::trim)
            .filter(|name| !name.is_empty())
            .map(str::to_string)
            .collect();
        if !names.is_empty() {
            return Statement::ClassDef {
                names,
                props: parse_style_props(props_raw),
            };
        }
    }

    if let Some(rest) = trimmed.strip_prefix("linkStyle ")
        && let Some((indexes_raw, props_raw)) = rest.trim().split_once(char::is_whitespace)
    {
        let indexes: Vec<usize> = indexes_raw
            .split(',')
            .filter_map(|token| token.trim().parse().ok())
            .collect();
        // `linkStyle default ...` and friends fall through to Skip.
        if !indexes.is_empty() {
            return Statement::EdgeStyle {
                indexes,
                props: parse_style_props(props_raw),
            };
        }
        return Statement::Skip;
    }

    if let Some(rest) = trimmed.strip_prefix("style ")
        && let Some((id, props_raw)) = rest.trim().split_once(char::is_whitespace)
    {
        return Statement::NodeStyle {
            id: id.to_string(),
            props: parse_style_props(props_raw),
        };
    }

    if is_ignored_directive(trimmed) {
        return Statement::Skip;
    }

    if let Some(segments) = parse_edge_chain(trimmed, dialect) {
        return Statement::Edge(segments);
    }

    match parse_endpoint_token(trimmed) {
        Some(EndpointToken::Declared(decl)) => Statement::NodeDecl(decl),
        // A lone `[*]` line declares nothing by itself.
        Some(EndpointToken::AnyState) | None => Statement::Skip,
    }
}

pub(crate) fn is_comment(line: &str) -> bool {
    line.starts_with('#') || line.starts_with("%%")
}

fn is_ignored_directive(line: &str) -> bool {
    ["click ", "accTitle", "accDescr", "title ", "note "]
        .iter()
        .any(|prefix| line.starts_with(prefix))
}

fn parse_header(line: &str) -> Option<Statement> {
    let lower = line.to_ascii_lowercase();
    let dialect = if lower.starts_with("statediagram") {
        Dialect::State
    } else if lower == "graph"
        || lower.starts_with("graph ")
        || lower == "flowchart"
        || lower.starts_with("flowchart ")
    {
        Dialect::Flowchart
    } else {
        return None;
    };
    let direction = line.split_whitespace().skip(1).find_map(Direction::parse);
    Some(Statement::Header { dialect, direction })
}

fn parse_subgraph(line: &str) -> Option<Statement> {
    let rest = line.strip_prefix("subgraph")?;
    if !rest.starts_with(char::is_whitespace) {
        return None;
    }
    let body = rest.trim();
    if body.is_empty() {
        return None;
    }

    // `subgraph id[Title]` reuses node-style labeling.
    if body.contains(['[', '(', '{'])
        && let Some(decl) = parse_node_token(body)
    {
        return Some(Statement::ScopeOpen {
            id: decl.id,
            label: decl.label,
        });
    }

    // `subgraph id "Title"` splits at the first whitespace.
    if let Some((head, tail)) = body.split_once(char::is_whitespace)
        && tail.trim_start().starts_with(['"', '\''])
    {
        let id = normalize_identifier(head);
        if !id.is_empty() {
            return Some(Statement::ScopeOpen {
                id,
                label: clean_label(tail),
            });
        }
    }

    let id = normalize_identifier(body);
    if id.is_empty() {
        return None;
    }
    let label = clean_label(body).filter(|title| title != &id);
    Some(Statement::ScopeOpen { id, label })
}

/// State-dialect declarations: `state Id {` / `state "Title" as id {` open a
/// scope; the same forms without the trailing brace declare a plain node.
fn parse_state_declaration(line: &str) -> Option<Statement> {
    let rest = line.strip_prefix("state ")?;
    let body = rest.trim();

    if let Some(open) = body.strip_suffix('{') {
        let (id, label) = state_name_parts(open.trim())?;
        return Some(Statement::ScopeOpen { id, label });
    }

    let (id, label) = state_name_parts(body)?;
    Some(Statement::NodeDecl(NodeDecl {
        id,
        node_type: Some(NodeType::Process),
        label,
        ..NodeDecl::default()
    }))
}

fn state_name_parts(body: &str) -> Option<(String, Option<String>)> {
    if let Some(rest) = body.strip_prefix('"') {
        let close = rest.find('"')?;
        let title = rest[..close].to_string();
        let after = rest[close + 1..].trim();
        let id = after
            .strip_prefix("as ")
            .map(|alias| normalize_identifier(alias.trim()))
            .filter(|alias| !alias.is_empty())
            .unwrap_or_else(|| normalize_identifier(&title));
        if id.is_empty() {
            return None;
        }
        return Some((id, Some(title)));
    }

    let id = normalize_identifier(body);
    if id.is_empty() {
        None
    } else {
        Some((id, None))
    }
}

/// Walk a statement left to right, emitting one segment per arrow found.
/// `A --> B --> C` yields `(A,B)` then `(B,C)`. Returns the segments parsed
/// so far when a later endpoint fails to parse, or `None` when the statement
/// holds no usable edge at all.
pub(crate) fn parse_edge_chain(statement: &str, dialect: Dialect) -> Option<Vec<EdgeSegment>> {
    let (first_idx, first_operator, first_arrow) = find_operator(statement, 0)?;
    let source_raw = statement[..first_idx].trim();
    let mut source = parse_endpoint_token(source_raw)?;

    let mut segments = Vec::new();
    let mut operator_idx = first_idx;
    let mut operator = first_operator;
    let mut arrow = first_arrow;

    loop {
        let rhs_start = operator_idx + operator.len();
        let next = find_operator(statement, rhs_start);
        let right_segment = match next {
            Some((next_idx, _, _)) => &statement[rhs_start..next_idx],
            None => &statement[rhs_start..],
        }
        .trim();
        if right_segment.is_empty() {
            return (!segments.is_empty()).then_some(segments);
        }

        let (pipe_label, right_rest) = extract_pipe_label(right_segment);
        // Trailing `: label` is a state-dialect spelling; a flowchart label
        // keeps its colons.
        let (right_rest, colon_label) = if next.is_none() && dialect == Dialect::State {
            split_trailing_label(right_rest)
        } else {
            (right_rest, None)
        };
        let Some(target) = parse_endpoint_token(right_rest) else {
            return (!segments.is_empty()).then_some(segments);
        };

        segments.push(EdgeSegment {
            source: source.clone(),
            arrow,
            label: pipe_label.or(colon_label),
            target: target.clone(),
        });

        match next {
            Some((next_idx, next_operator, next_arrow)) => {
                source = target;
                operator_idx = next_idx;
                operator = next_operator;
                arrow = next_arrow;
            }
            None => break,
        }
    }

    Some(segments)
}

/// Find the next arrow operator at bracket depth zero outside quotes,
/// preferring the longest token when several match at one position.
fn find_operator(statement: &str, start_index: usize) -> Option<(usize, &'static str, ArrowKind)> {
    let mut in_quote: Option<char> = None;
    let mut escaped = false;
    let mut depth = 0_usize;

    for (idx, ch) in statement.char_indices() {
        if idx < start_index {
            continue;
        }

        if let Some(quote) = in_quote {
            if escaped {
                escaped = false;
            } else if ch == '\\' {
                escaped = true;
            } else if ch == quote {
                in_quote = None;
            }
            continue;
        }

        match ch {
            '"' | '\'' | '`' => {
                in_quote = Some(ch);
                continue;
            }
            '[' | '(' | '{' => {
                depth = depth.saturating_add(1);
                continue;
            }
            ']' | ')' | '}' => {
                depth = depth.saturating_sub(1);
                continue;
            }
            _ => {}
        }
        if depth != 0 {
            continue;
        }

        let tail = &statement[idx..];
        let mut best: Option<(&'static str, ArrowKind)> = None;
        for (operator, kind) in ARROW_OPERATORS {
            if tail.starts_with(operator)
                && best.is_none_or(|(current, _)| operator.len() > current.len())
            {
                best = Some((operator, kind));
            }
        }
        if let Some((operator, kind)) = best {
            return Some((idx, operator, kind));
        }
    }

    None
}

fn extract_pipe_label(right_hand_side: &str) -> (Option<String>, &str) {
    let trimmed = right_hand_side.trim();
    let Some(after_open) = trimmed.strip_prefix('|') else {
        return (None, trimmed);
    };
    let Some(close_idx) = after_open.find('|') else {
        return (None, trimmed);
    };
    let label = clean_label(&after_open[..close_idx]);
    (label, after_open[close_idx + 1..].trim())
}

/// Split a state-dialect `target: label` suffix, leaving `:::` class tags
/// and colons inside brackets or quotes alone.
fn split_trailing_label(segment: &str) -> (&str, Option<String>) {
    let mut in_quote: Option<char> = None;
    let mut depth = 0_usize;
    let mut previous = '\0';

    for (idx, ch) in segment.char_indices() {
        if let Some(quote) = in_quote {
            if ch == quote {
                in_quote = None;
            }
            previous = ch;
            continue;
        }
        match ch {
            '"' | '\'' | '`' => in_quote = Some(ch),
            '[' | '(' | '{' => depth = depth.saturating_add(1),
            ']' | ')' | '}' => depth = depth.saturating_sub(1),
            ':' if depth == 0 && previous != ':' && !segment[idx..].starts_with("::") => {
                let label = clean_label(&segment[idx + 1..]);
                return (segment[..idx].trim_end(), label);
            }
            _ => {}
        }
        previous = ch;
    }

    (segment, None)
}

pub(crate) fn parse_endpoint_token(raw: &str) -> Option<EndpointToken> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return None;
    }
    if trimmed == "[*]" {
        return Some(EndpointToken::AnyState);
    }
    parse_node_token(trimmed).map(EndpointToken::Declared)
}

/// Shape bracket pairs, most specific first. Multi-character brackets must
/// come before any single-character bracket that is a textual prefix of
/// them, so `([...])` is never read as `(...)`. `[`/`]` must also come
/// before `>`/`]`: a rectangle label may contain `>` (`A[x > y]`), while
/// `>text]` holds no `[` and still reaches the asymmetric pair.
const SHAPE_BRACKETS: [(&str, &str, NodeType, NodeShape); 8] = [
    ("([", "])", NodeType::Start, NodeShape::Capsule),
    ("[(", ")]", NodeType::System, NodeShape::Cylinder),
    ("((", "))", NodeType::End, NodeShape::Circle),
    ("{{", "}}", NodeType::Decision, NodeShape::Hexagon),
    ("[", "]", NodeType::Process, NodeShape::Rectangle),
    (">", "]", NodeType::Annotation, NodeShape::Parallelogram),
    ("(", ")", NodeType::Process, NodeShape::Rounded),
    ("{", "}", NodeType::Decision, NodeShape::Diamond),
];

/// Parse one standalone node declaration: optional shape bracket pair around
/// a label, optional `:::class[,class]` suffix. A bare identifier yields a
/// declaration with no explicit type or shape.
pub(crate) fn parse_node_token(raw: &str) -> Option<NodeDecl> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return None;
    }

    let (core, classes) = split_class_tag(trimmed);
    let core = core.trim();
    if core.is_empty() {
        return None;
    }

    for (open, close, node_type, shape) in SHAPE_BRACKETS {
        if let Some(mut decl) = parse_wrapped(core, open, close, node_type, shape) {
            decl.classes = classes;
            return Some(decl);
        }
    }

    let id = normalize_identifier(core);
    if id.is_empty() {
        return None;
    }
    let label = clean_label(core).filter(|value| value != &id);
    Some(NodeDecl {
        id,
        node_type: None,
        shape: None,
        label,
        classes,
    })
}

fn parse_wrapped(
    raw: &str,
    open: &str,
    close: &str,
    node_type: NodeType,
    shape: NodeShape,
) -> Option<NodeDecl> {
    let start = raw.find(open)?;
    if !raw.ends_with(close) {
        return None;
    }
    let inner_start = start + open.len();
    let end = raw.len().saturating_sub(close.len());
    if inner_start > end {
        return None;
    }

    let id_raw = raw[..start].trim();
    let label_raw = raw[inner_start..end].trim();
    let mut id = normalize_identifier(id_raw);
    if id.is_empty() {
        id = normalize_identifier(label_raw);
    }
    if id.is_empty() {
        return None;
    }

    Some(NodeDecl {
        id,
        node_type: Some(node_type),
        shape: Some(shape),
        label: resolve_label(label_raw),
        classes: Vec::new(),
    })
}

fn split_class_tag(raw: &str) -> (&str, Vec<String>) {
    let Some((core, tag)) = raw.split_once(":::") else {
        return (raw, Vec::new());
    };
    let classes = tag
        .split(',')
        .map(str::trim)
        .filter(|class| !class.is_empty())
        .map(str::to_string)
        .collect();
    (core, classes)
}

/// Clean a label and strip an embedded `fa:fa-...` icon-font prefix. When
/// stripping leaves no text, the icon name itself (separators turned into
/// spaces) becomes the label.
fn resolve_label(raw: &str) -> Option<String> {
    let cleaned = clean_label(raw)?;
    let Some(rest) = cleaned.strip_prefix("fa:") else {
        return Some(cleaned);
    };

    let (icon, remainder) = match rest.split_once(char::is_whitespace) {
        Some((icon, remainder)) => (icon, remainder.trim()),
        None => (rest, ""),
    };
    if !remainder.is_empty() {
        return Some(remainder.to_string());
    }
    let spelled = icon.trim_start_matches("fa-").replace(['-', '_'], " ");
    if spelled.is_empty() { None } else { Some(spelled) }
}

/// Trim quoting and unescape the `\n` sequences left by the quoted-newline
/// fold into real newlines.
pub(crate) fn clean_label(raw: &str) -> Option<String> {
    let cleaned = raw
        .trim()
        .trim_matches('"')
        .trim_matches('\'')
        .trim_matches('`')
        .trim();
    if cleaned.is_empty() {
        return None;
    }
    Some(cleaned.replace("\\n", "\n").replace("\\\"", "\""))
}

/// Reduce free-form text to a usable identifier: keep the leading run of
/// identifier characters, or fall back to a grapheme-wise sanitized form for
/// fully non-ASCII input.
pub(crate) fn normalize_identifier(raw: &str) -> String {
    let cleaned = raw
        .trim()
        .trim_matches('"')
        .trim_matches('\'')
        .trim_matches('`')
        .trim();
    if cleaned.is_empty() {
        return String::new();
    }

    let mut out = String::with_capacity(cleaned.len());
    for ch in cleaned.chars() {
        if ch.is_ascii_alphanumeric() || matches!(ch, '_' | '-' | '.' | '/') {
            out.push(ch);
        } else if !out.is_empty() {
            break;
        } else if !ch.is_whitespace() && !matches!(ch, ':' | ';' | ',') {
            break;
        }
    }

    if out.is_empty() {
        let mut fallback = String::with_capacity(cleaned.len());
        for grapheme in cleaned.graphemes(true) {
            if grapheme
                .chars()
                .all(|ch| ch.is_ascii_alphanumeric() || matches!(ch, '_' | '-'))
            {
                fallback.push_str(grapheme);
            } else {
                fallback.push('_');
            }
        }
        fallback.trim_matches('_').to_string()
    } else {
        out
    }
}

/// Split a physical line into `;`-separated statements, ignoring semicolons
/// inside brackets and quotes.
pub(crate) fn split_statements(line: &str) -> Vec<&str> {
    let mut statements = Vec::new();
    let mut current_start = 0;
    let mut in_quote: Option<char> = None;
    let mut escaped = false;
    let mut depth = 0_usize;

    for (idx, ch) in line.char_indices() {
        if let Some(quote) = in_quote {
            if escaped {
                escaped = false;
            } else if ch == '\\' {
                escaped = true;
            } else if ch == quote {
                in_quote = None;
            }
            continue;
        }
        match ch {
            '"' | '\'' | '`' => in_quote = Some(ch),
            '[' | '(' | '{' => depth = depth.saturating_add(1),
            ']' | ')' | '}' => depth = depth.saturating_sub(1),
            ';' if depth == 0 => {
                let segment = line[current_start..idx].trim();
                if !segment.is_empty() {
                    statements.push(segment);
                }
                current_start = idx + 1;
            }
            _ => {}
        }
    }

    let remainder = line[current_start..].trim();
    if !remainder.is_empty() {
        statements.push(remainder);
    }
    statements
}
