//! Entity-relationship diagram generation.
//!
//! ## Data Flow
//!
//! ```text
//! upload text ──▶ literal ──▶ validate ─┐
//!                                       ├─▶ collect ──▶ graph ──▶ dot ──▶ export
//! --entity / --relationship ────────────┘   (ErModel)  (petgraph) (text) (Graphviz)
//! ```
//!
//! 1. [`literal`]  — parse the upload as a literal record, never evaluating it
//! 2. [`validate`] — check the `entities` / `relationships` shape and references
//! 3. [`collect`]  — merge upload and manual entries under the entry caps
//! 4. [`graph`]    — one entity node, one connector per relationship
//! 5. [`dot`]      — Graphviz DOT text
//! 6. [`export`]   — pipe through `dot -T<fmt>` and write files

pub mod collect;
pub mod dot;
pub mod export;
pub mod graph;
pub mod literal;
pub mod model;
pub mod validate;

use crate::config::DiagramConfig;
use crate::error::ErdError;
use crate::output::DiagramOutput;
use std::path::Path;
use tracing::info;

pub use collect::{starter_model, InputCollector};
pub use export::{ExportedFile, ImageFormat};
pub use graph::{ErEdge, ErGraph, ErNode, LinkEnd};
pub use model::{Cardinality, Entity, ErModel, Relationship};

/// Build the graph and DOT text for a model. No Graphviz call is made.
pub fn generate_diagram(model: &ErModel, config: &DiagramConfig) -> DiagramOutput {
    let graph = ErGraph::build(model, config.attribute_style, config.annotate_cardinality);
    let dot = dot::to_dot(&graph, config);
    info!(
        "Generated ER diagram: {} entities, {} relationships",
        graph.entity_count(),
        graph.connector_count()
    );
    DiagramOutput {
        dot,
        entity_nodes: graph.entity_count(),
        relationship_nodes: graph.connector_count(),
        total_nodes: graph.node_count(),
        total_edges: graph.edge_count(),
    }
}

/// Generate a diagram and write one file per format next to `stem`.
pub async fn export_diagram(
    model: &ErModel,
    config: &DiagramConfig,
    stem: impl AsRef<Path>,
    formats: &[ImageFormat],
) -> Result<Vec<ExportedFile>, ErdError> {
    let output = generate_diagram(model, config);
    export::write_diagram(&output.dot, stem.as_ref(), formats, config).await
}

/// Render a model to the bytes of a single format.
pub async fn render_diagram(
    model: &ErModel,
    config: &DiagramConfig,
    format: ImageFormat,
) -> Result<Vec<u8>, ErdError> {
    let output = generate_diagram(model, config);
    export::render(&output.dot, format, config).await
}
