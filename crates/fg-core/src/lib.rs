#![forbid(unsafe_code)]

mod builder;

pub use builder::{GraphBuilder, NodeDecl};

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Named bundle of visual property overrides (`fill`, `stroke`, ...).
pub type ClassStyle = BTreeMap<String, String>;

/// Reading direction of a diagram.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
pub enum Direction {
    #[default]
    TB,
    LR,
    RL,
    BT,
}

impl Direction {
    /// Parse a direction token. The legacy `TD` spelling normalizes to `TB`.
    #[must_use]
    pub fn parse(token: &str) -> Option<Self> {
        match token.trim() {
            "TB" | "TD" => Some(Self::TB),
            "LR" => Some(Self::LR),
            "RL" => Some(Self::RL),
            "BT" => Some(Self::BT),
            _ => None,
        }
    }

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::TB => "TB",
            Self::LR => "LR",
            Self::RL => "RL",
            Self::BT => "BT",
        }
    }

    #[must_use]
    pub const fn is_horizontal(self) -> bool {
        matches!(self, Self::LR | Self::RL)
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "lowercase")]
pub enum NodeType {
    Start,
    #[default]
    Process,
    Decision,
    End,
    System,
    Annotation,
    Group,
}

impl NodeType {
    #[must_use]
    pub fn parse(token: &str) -> Option<Self> {
        match token.trim().to_ascii_lowercase().as_str() {
            "start" => Some(Self::Start),
            "process" => Some(Self::Process),
            "decision" => Some(Self::Decision),
            "end" => Some(Self::End),
            "system" | "custom" => Some(Self::System),
            "annotation" => Some(Self::Annotation),
            "group" | "section" => Some(Self::Group),
            _ => None,
        }
    }

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Start => "start",
            Self::Process => "process",
            Self::Decision => "decision",
            Self::End => "end",
            Self::System => "system",
            Self::Annotation => "annotation",
            Self::Group => "group",
        }
    }

    /// Default shape used when a declaration carries no shape bracket.
    #[must_use]
    pub const fn default_shape(self) -> NodeShape {
        match self {
            Self::Start => NodeShape::Capsule,
            Self::Process | Self::Group => NodeShape::Rectangle,
            Self::Decision => NodeShape::Diamond,
            Self::End => NodeShape::Circle,
            Self::System => NodeShape::Cylinder,
            Self::Annotation => NodeShape::Parallelogram,
        }
    }

    /// Default fill color, overridden by class and inline styles.
    #[must_use]
    pub const fn default_fill(self) -> &'static str {
        match self {
            Self::Start => "#2f9e44",
            Self::Process => "#1971c2",
            Self::Decision => "#f08c00",
            Self::End => "#e03131",
            Self::System => "#6741d9",
            Self::Annotation => "#868e96",
            Self::Group => "#f1f3f5",
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "lowercase")]
pub enum NodeShape {
    #[default]
    Rectangle,
    Rounded,
    Capsule,
    Diamond,
    Hexagon,
    Cylinder,
    Parallelogram,
    Circle,
}

impl NodeShape {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Rectangle => "rectangle",
            Self::Rounded => "rounded",
            Self::Capsule => "capsule",
            Self::Diamond => "diamond",
            Self::Hexagon => "hexagon",
            Self::Cylinder => "cylinder",
            Self::Parallelogram => "parallelogram",
            Self::Circle => "circle",
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "lowercase")]
pub enum ArrowKind {
    #[default]
    Solid,
    Dashed,
    Thick,
}

impl ArrowKind {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Solid => "-->",
            Self::Dashed => "-.->",
            Self::Thick => "==>",
        }
    }

    /// Stroke markers contributed to the edge style map at build time.
    #[must_use]
    pub fn style_markers(self) -> ClassStyle {
        let mut style = ClassStyle::new();
        match self {
            Self::Solid => {}
            Self::Dashed => {
                style.insert("stroke-dasharray".to_string(), "6 4".to_string());
            }
            Self::Thick => {
                style.insert("stroke-width".to_string(), "3".to_string());
            }
        }
        style
    }
}

/// Side of a node's bounding box where a connector attaches.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum HandleSide {
    Top,
    Bottom,
    Left,
    Right,
}

impl HandleSide {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Top => "top",
            Self::Bottom => "bottom",
            Self::Left => "left",
            Self::Right => "right",
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Default)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct GraphNode {
    pub id: String,
    #[serde(rename = "type")]
    pub node_type: NodeType,
    pub shape: NodeShape,
    pub label: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_id: Option<String>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub style: ClassStyle,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub position: Option<Point>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct GraphEdge {
    pub id: String,
    pub source: String,
    pub target: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    pub arrow: ArrowKind,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub style: ClassStyle,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_handle: Option<HandleSide>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_handle: Option<HandleSide>,
}

/// Hard parse failures. Everything else is dropped silently.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Error, PartialEq, Eq)]
pub enum ParseError {
    #[error(
        "Missing chart type declaration: expected a 'flowchart', 'graph', or 'stateDiagram' header"
    )]
    MissingDiagramDeclaration,
    #[error("No valid nodes found in input")]
    NoNodesFound,
}

/// Immutable snapshot returned by both parsers.
///
/// Callers must check `error` before using `nodes`/`edges`; parsing never
/// panics and never returns a partially-failed result.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct ParseResult {
    pub nodes: Vec<GraphNode>,
    pub edges: Vec<GraphEdge>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub direction: Option<Direction>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ParseResult {
    #[must_use]
    pub fn failure(error: ParseError) -> Self {
        Self {
            error: Some(error.to_string()),
            ..Self::default()
        }
    }

    #[must_use]
    pub const fn is_ok(&self) -> bool {
        self.error.is_none()
    }
}

/// Parse a comma-separated `key:value` property list as used by
/// `classDef`, `style`, and `linkStyle` directives.
#[must_use]
pub fn parse_style_props(raw: &str) -> ClassStyle {
    let mut props = ClassStyle::new();
    for entry in raw.split(',') {
        let Some((key, value)) = entry.split_once(':') else {
            continue;
        };
        let key = key.trim();
        let value = value.trim();
        if !key.is_empty() && !value.is_empty() {
            props.insert(key.to_string(), value.to_string());
        }
    }
    props
}
