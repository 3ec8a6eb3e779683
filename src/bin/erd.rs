//! CLI binary for ER diagram generation.
//!
//! Maps flags to `DiagramConfig` and the manual-entry collector, then
//! writes one file per requested format.

use anyhow::{Context, Result};
use clap::Parser;
use edgequake_docsketch::erd::{self, Cardinality, ErModel, ImageFormat, InputCollector};
use edgequake_docsketch::{
    AttributeStyle, DiagramConfig, DiagramOutput, RankDir, ReferencePolicy,
};
use serde::Serialize;
use std::io::{self, Read, Write};
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

// ── ANSI colour helpers ──────────────────────────────────────────────────────

fn green(s: &str) -> String {
    format!("\x1b[32m{s}\x1b[0m")
}
fn red(s: &str) -> String {
    format!("\x1b[31m{s}\x1b[0m")
}
fn dim(s: &str) -> String {
    format!("\x1b[2m{s}\x1b[0m")
}
fn bold(s: &str) -> String {
    format!("\x1b[1m{s}\x1b[0m")
}

const AFTER_HELP: &str = r#"EXAMPLES:
  # Diagram from an upload (writes er_diagram.png and er_diagram.pdf)
  erd schema.txt

  # Upload plus manual entries, SVG only
  erd schema.txt --entity "Invoice:id,total" \
      --relationship "Order,Invoice,billed_by,one-to-one" -f svg

  # Manual entries only, relationships may name undeclared entities
  erd --implicit-entities --relationship "User,Group,member_of,many-to-many"

  # Print DOT without rendering
  erd schema.txt --print-dot -f dot

UPLOAD FORMAT:
  {
    "entities": {"User": ["id", "name"], "Order": ["id", "date"]},
    "relationships": [("User", "Order", "places", "one-to-many")]
  }
  Python-style literals (single quotes, tuples, True/False/None) and JSON
  are both accepted. The upload is parsed, never evaluated.

ENVIRONMENT VARIABLES:
  ERD_OUTPUT      Output file stem (default: er_diagram)
  ERD_FORMATS     Comma-separated formats (default: png,pdf)
  ERD_DOT_BINARY  Graphviz executable (default: dot)
  ERD_RANKDIR     Layout direction: LR, TB, RL, BT
  ERD_VERBOSE     Enable debug logging
"#;

/// Render entity-relationship diagrams with Graphviz.
#[derive(Parser, Debug)]
#[command(
    name = "erd",
    version,
    about = "Render entity-relationship diagrams with Graphviz",
    long_about = "Build an entity-relationship diagram from an uploaded literal record and/or \
entities and relationships given on the command line, and render it with Graphviz.",
    arg_required_else_help = true,
    color = clap::ColorChoice::Auto,
    after_long_help = AFTER_HELP
)]
struct Cli {
    /// Upload file with `entities` and `relationships` (`-` for stdin).
    upload: Option<PathBuf>,

    /// Manual entity: NAME or NAME:attr,attr,... (repeatable, max 10).
    #[arg(short, long = "entity", value_name = "NAME[:ATTRS]")]
    entities: Vec<String>,

    /// Manual relationship: SRC,DST,NAME[,TYPE] (repeatable, max 10).
    #[arg(short, long = "relationship", value_name = "SRC,DST,NAME[,TYPE]")]
    relationships: Vec<String>,

    /// Output file stem; extensions are added per format.
    #[arg(short, long, env = "ERD_OUTPUT", default_value = "er_diagram")]
    output: PathBuf,

    /// Output formats: png, pdf, svg, jpeg, dot.
    #[arg(short, long = "format", env = "ERD_FORMATS", value_delimiter = ',',
          default_values_t = [ImageFormat::Png, ImageFormat::Pdf])]
    formats: Vec<ImageFormat>,

    /// How attributes are drawn.
    #[arg(long, value_enum, default_value = "table")]
    attributes: AttributeArg,

    /// Layout direction: LR, TB, RL, BT.
    #[arg(long, env = "ERD_RANKDIR", default_value = "LR")]
    rankdir: RankDir,

    /// Graphviz size in inches, "W,H".
    #[arg(long, default_value = "8,8")]
    size: String,

    /// Do not label link ends with 1 / N / M.
    #[arg(long)]
    no_cardinality: bool,

    /// Create attribute-less entities for undeclared relationship endpoints.
    #[arg(long)]
    implicit_entities: bool,

    /// Graphviz executable.
    #[arg(long, env = "ERD_DOT_BINARY", default_value = "dot")]
    dot_binary: PathBuf,

    /// Per-format render timeout in seconds.
    #[arg(long, default_value_t = 30)]
    render_timeout: u64,

    /// Print the DOT source to stdout.
    #[arg(long)]
    print_dot: bool,

    /// Print a JSON report (model, graph counts, files) to stdout.
    #[arg(long)]
    json: bool,

    /// Enable DEBUG-level tracing logs.
    #[arg(short, long, env = "ERD_VERBOSE")]
    verbose: bool,

    /// Suppress all output except errors.
    #[arg(short, long)]
    quiet: bool,
}

#[derive(clap::ValueEnum, Clone, Copy, Debug)]
enum AttributeArg {
    Table,
    Satellite,
}

impl From<AttributeArg> for AttributeStyle {
    fn from(v: AttributeArg) -> Self {
        match v {
            AttributeArg::Table => AttributeStyle::Table,
            AttributeArg::Satellite => AttributeStyle::Satellite,
        }
    }
}

#[derive(Serialize)]
struct Report<'a> {
    model: &'a ErModel,
    diagram: &'a DiagramOutput,
    files: Vec<erd::ExportedFile>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose {
        "debug"
    } else if cli.quiet {
        "error"
    } else {
        "info"
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .with_writer(io::stderr)
        .init();

    let config = DiagramConfig::builder()
        .attribute_style(cli.attributes.into())
        .rankdir(cli.rankdir)
        .size(cli.size.clone())
        .annotate_cardinality(!cli.no_cardinality)
        .reference_policy(if cli.implicit_entities {
            ReferencePolicy::Implicit
        } else {
            ReferencePolicy::Strict
        })
        .dot_binary(cli.dot_binary.clone())
        .render_timeout_secs(cli.render_timeout)
        .build()
        .context("Invalid configuration")?;

    // ── Collect entities and relationships ───────────────────────────────
    let mut collector = InputCollector::new();

    if let Some(ref path) = cli.upload {
        let text = read_upload(path)?;
        // A bad upload is reported and skipped; manual entries still count.
        if let Err(e) = collector.load_upload(&text) {
            eprintln!("{} {}", red("✗"), red(&e.to_string()));
        } else if !cli.quiet {
            eprintln!(
                "{} Entities and relationships extracted from upload",
                green("✓")
            );
        }
    }

    for entry in &cli.entities {
        let (name, attrs) = parse_entity(entry);
        collector
            .add_entity(name, &attrs)
            .with_context(|| format!("Cannot add entity '{entry}'"))?;
    }
    for entry in &cli.relationships {
        let (source, target, name, cardinality) = parse_relationship(entry)?;
        collector
            .add_relationship(source, target, name, cardinality)
            .with_context(|| format!("Cannot add relationship '{entry}'"))?;
    }

    let (model, starter) = collector
        .finish_or_starter(config.reference_policy)
        .context("Invalid relationship")?;
    if starter && !cli.quiet {
        eprintln!(
            "{} {}",
            dim("ℹ"),
            dim("Nothing else to draw; using the starter diagram (Entity_1 → Rel_1 → Entity_2)")
        );
    }

    // ── Generate and render ──────────────────────────────────────────────
    let diagram = erd::generate_diagram(&model, &config);
    if cli.print_dot {
        io::stdout()
            .write_all(diagram.dot.as_bytes())
            .context("Failed to write to stdout")?;
    }

    let files = erd::export::write_diagram(&diagram.dot, &cli.output, &cli.formats, &config)
        .await
        .context("Diagram rendering failed")?;

    if cli.json {
        let report = Report {
            model: &model,
            diagram: &diagram,
            files,
        };
        println!(
            "{}",
            serde_json::to_string_pretty(&report).context("Failed to serialise report")?
        );
    } else if !cli.quiet {
        eprintln!(
            "{} {} entities, {} relationships  {}",
            green("✔"),
            bold(&diagram.entity_nodes.to_string()),
            bold(&diagram.relationship_nodes.to_string()),
            dim(&format!("{} nodes / {} edges", diagram.total_nodes, diagram.total_edges)),
        );
        for f in &files {
            eprintln!("   → {}  {}", bold(&f.path.display().to_string()), dim(&format!("{} bytes", f.bytes)));
        }
    }

    Ok(())
}

fn read_upload(path: &Path) -> Result<String> {
    if path.as_os_str() == "-" {
        let mut text = String::new();
        io::stdin()
            .read_to_string(&mut text)
            .context("Failed to read upload from stdin")?;
        return Ok(text);
    }
    std::fs::read_to_string(path).with_context(|| format!("Failed to read upload {:?}", path))
}

/// `User:id,name` → ("User", ["id", "name"]). The attribute list is optional.
fn parse_entity(entry: &str) -> (&str, Vec<&str>) {
    match entry.split_once(':') {
        Some((name, attrs)) => (name, attrs.split(',').collect()),
        None => (entry, Vec::new()),
    }
}

/// `User,Order,places[,one-to-many]`.
fn parse_relationship(entry: &str) -> Result<(&str, &str, &str, Option<Cardinality>)> {
    let parts: Vec<&str> = entry.split(',').map(str::trim).collect();
    match parts.as_slice() {
        [source, target, name] => Ok((*source, *target, *name, None)),
        [source, target, name, kind] if kind.is_empty() => Ok((*source, *target, *name, None)),
        [source, target, name, kind] => {
            let cardinality = kind
                .parse::<Cardinality>()
                .with_context(|| format!("Invalid relationship '{entry}'"))?;
            Ok((*source, *target, *name, Some(cardinality)))
        }
        _ => anyhow::bail!(
            "Invalid relationship '{}': expected SRC,DST,NAME[,TYPE]",
            entry
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn entity_entries() {
        assert_eq!(parse_entity("User"), ("User", vec![]));
        assert_eq!(parse_entity("User:id,name"), ("User", vec!["id", "name"]));
    }

    #[test]
    fn relationship_entries() {
        let (s, t, n, c) = parse_relationship("User, Order, places, one-to-many").unwrap();
        assert_eq!((s, t, n), ("User", "Order", "places"));
        assert_eq!(c, Some(Cardinality::OneToMany));
        assert!(parse_relationship("User,Order").is_err());
        assert!(parse_relationship("A,B,r,sideways").is_err());
    }
}
