#![forbid(unsafe_code)]

//! Two text grammars that compile into the shared graph model.
//!
//! [`parse_diagram`] handles the rich diagram grammar (flowchart and state
//! dialects); [`parse_script`] handles the stricter authoring DSL. Both are
//! pure functions over their input text and never panic: hard failures are
//! reported through [`ParseResult::error`].

mod diagram;
mod normalize;
mod script;
mod statement;

pub use fg_core::{ParseResult, parse_style_props};

/// Parse rich diagram-description text into a [`ParseResult`].
#[must_use]
pub fn parse_diagram(input: &str) -> ParseResult {
    diagram::parse(input)
}

/// Parse the line-oriented authoring DSL into a [`ParseResult`], including
/// its built-in grid coordinates.
#[must_use]
pub fn parse_script(input: &str) -> ParseResult {
    script::parse(input)
}
