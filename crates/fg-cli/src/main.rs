#![forbid(unsafe_code)]

//! FlowGraph CLI - parse diagram text and assign connection anchors.
//!
//! # Commands
//!
//! - `parse`: Convert diagram text to a graph model as JSON
//! - `anchors`: Assign connector anchor sides to a positioned graph

use std::io::{self, Read, Write};
use std::path::Path;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use fg_anchor::{NodeBox, assign_anchors};
use fg_core::GraphEdge;
use fg_parser::{parse_diagram, parse_script};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

/// FlowGraph CLI - parse diagram text and assign connection anchors.
#[derive(Debug, Parser)]
#[command(
    name = "fg-cli",
    version,
    about = "FlowGraph CLI - parse diagram text and assign connection anchors"
)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Enable verbose logging (can be repeated for more detail: -v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Suppress all output except errors
    #[arg(short, long, global = true)]
    quiet: bool,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Parse diagram text and output the graph model as JSON.
    Parse {
        /// Input file path or "-" for stdin. If omitted, reads from stdin.
        #[arg(default_value = "-")]
        input: String,

        /// Input grammar
        #[arg(short, long, value_enum, default_value = "diagram")]
        grammar: Grammar,

        /// Pretty-print JSON output
        #[arg(long)]
        pretty: bool,

        /// Output file path. If omitted, writes to stdout.
        #[arg(short, long)]
        output: Option<String>,
    },

    /// Assign anchor sides to the edges of a positioned graph.
    ///
    /// Reads a JSON object with `nodes` (bounding boxes) and `edges`
    /// and writes the same object back with handles filled in.
    Anchors {
        /// Input file path or "-" for stdin. If omitted, reads from stdin.
        #[arg(default_value = "-")]
        input: String,

        /// Pretty-print JSON output
        #[arg(long)]
        pretty: bool,

        /// Output file path. If omitted, writes to stdout.
        #[arg(short, long)]
        output: Option<String>,
    },
}

/// Which of the two input grammars to parse with.
#[derive(Debug, Clone, Copy, ValueEnum, PartialEq, Eq)]
enum Grammar {
    /// Rich flowchart grammar (flowchart/graph/stateDiagram headers)
    Diagram,
    /// Line-oriented script grammar (`[type] Label`, `A -> B`)
    Script,
}

/// Input/output payload of the `anchors` command.
#[derive(Debug, Serialize, Deserialize)]
struct AnchorScene {
    nodes: Vec<NodeBox>,
    edges: Vec<GraphEdge>,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    init_tracing(cli.verbose, cli.quiet);

    match cli.command {
        Command::Parse {
            input,
            grammar,
            pretty,
            output,
        } => cmd_parse(&input, grammar, pretty, output.as_deref()),

        Command::Anchors {
            input,
            pretty,
            output,
        } => cmd_anchors(&input, pretty, output.as_deref()),
    }
}

fn init_tracing(verbose: u8, quiet: bool) {
    let filter = if quiet {
        "error"
    } else {
        match verbose {
            0 => "warn",
            1 => "info",
            2 => "debug",
            _ => "trace",
        }
    };

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .without_time()
        .try_init();
}

fn load_input(input: &str) -> Result<String> {
    if input == "-" {
        let mut buffer = String::new();
        io::stdin()
            .read_to_string(&mut buffer)
            .context("Failed to read from stdin")?;
        Ok(buffer)
    } else if Path::new(input).exists() {
        std::fs::read_to_string(input).context(format!("Failed to read file: {input}"))
    } else {
        // Treat as inline diagram text
        Ok(input.to_string())
    }
}

fn write_output(output: Option<&str>, content: &str) -> Result<()> {
    match output {
        Some(path) => {
            std::fs::write(path, content).context(format!("Failed to write to: {path}"))?;
            info!("Wrote output to: {path}");
        }
        None => {
            io::stdout()
                .write_all(content.as_bytes())
                .context("Failed to write to stdout")?;
            io::stdout()
                .write_all(b"\n")
                .context("Failed to write to stdout")?;
        }
    }
    Ok(())
}

fn cmd_parse(input: &str, grammar: Grammar, pretty: bool, output: Option<&str>) -> Result<()> {
    let source = load_input(input)?;
    let result = match grammar {
        Grammar::Diagram => parse_diagram(&source),
        Grammar::Script => parse_script(&source),
    };

    debug!(
        nodes = result.nodes.len(),
        edges = result.edges.len(),
        error = result.error.is_some(),
        "parsed input"
    );

    let json = if pretty {
        serde_json::to_string_pretty(&result)?
    } else {
        serde_json::to_string(&result)?
    };
    write_output(output, &json)?;

    if let Some(error) = &result.error {
        tracing::error!("Parse failed: {error}");
        std::process::exit(1);
    }
    Ok(())
}

fn cmd_anchors(input: &str, pretty: bool, output: Option<&str>) -> Result<()> {
    let source = load_input(input)?;
    let mut scene: AnchorScene =
        serde_json::from_str(&source).context("Failed to parse input JSON")?;

    scene.edges = assign_anchors(&scene.nodes, &scene.edges);

    let json = if pretty {
        serde_json::to_string_pretty(&scene)?
    } else {
        serde_json::to_string(&scene)?
    };
    write_output(output, &json)
}
