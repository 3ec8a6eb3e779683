//! Integration tests for the ER diagram pipeline.
//!
//! Rendering through Graphviz is skipped when `dot` is not on PATH.

use edgequake_docsketch::erd::{self, validate::parse_upload, ErGraph, ImageFormat, InputCollector};
use edgequake_docsketch::{
    AttributeStyle, DiagramConfig, ErdError, ReferencePolicy,
};
use pretty_assertions::assert_eq;
use std::collections::BTreeSet;
use std::process::Command;

// ── Test helpers ─────────────────────────────────────────────────────────────

const SHOP: &str = r#"
{
    'entities': {
        'User': ['id', 'name', 'email'],
        'Order': ['id', 'date'],
        'Product': ['sku', 'price'],
    },
    'relationships': [
        ('User', 'Order', 'places', 'one-to-many'),
        ('Order', 'Product', 'contains', 'many-to-many'),
        ['User', 'Product', 'reviews'],
    ],
}
"#;

fn graphviz_available() -> bool {
    Command::new("dot")
        .arg("-V")
        .output()
        .map(|o| o.status.success())
        .unwrap_or(false)
}

macro_rules! skip_unless_graphviz {
    () => {
        if !graphviz_available() {
            println!("SKIP: Graphviz `dot` not found on PATH");
            return;
        }
    };
}

fn names(model: &edgequake_docsketch::erd::ErModel) -> BTreeSet<String> {
    model.entity_names().map(str::to_string).collect()
}

// ── Upload → model ───────────────────────────────────────────────────────────

#[test]
fn single_entity_upload_yields_one_node_and_no_connectors() {
    let model = parse_upload(r#"{"entities": {"User": ["id","name"]}, "relationships": []}"#).unwrap();
    let diagram = erd::generate_diagram(&model, &DiagramConfig::default());
    assert_eq!(diagram.entity_nodes, 1);
    assert_eq!(diagram.relationship_nodes, 0);
    assert_eq!(diagram.total_edges, 0);
}

#[test]
fn python_style_upload_parses() {
    let model = parse_upload(SHOP).unwrap();
    assert_eq!(model.entities.len(), 3);
    assert_eq!(model.relationships.len(), 3);
    assert_eq!(model.entity("User").unwrap().attributes, vec!["id", "name", "email"]);
    assert!(model.relationships[2].cardinality.is_none());
}

#[test]
fn every_relationship_gets_one_connector_and_two_links() {
    let model = parse_upload(SHOP).unwrap();
    for style in [AttributeStyle::Table, AttributeStyle::Satellite] {
        let graph = ErGraph::build(&model, style, true);
        assert_eq!(graph.connector_count(), model.relationships.len());
        for rel in &model.relationships {
            let id = format!("{}_{}_{}", rel.source, rel.target, rel.name);
            assert_eq!(graph.degree(&id), 2, "connector {id}");
            assert_eq!(
                graph.connector_endpoints(&id),
                Some((rel.source.as_str(), rel.target.as_str()))
            );
        }
    }
}

#[test]
fn malformed_upload_leaves_working_set_empty() {
    let mut collector = InputCollector::new();
    for bad in [
        "{'entities': {'User': ['id']}, 'relationships': [",
        "{'entities': {}}",
        "{'entities': [], 'relationships': []}",
        "__import__('os').system('true')",
        "{'entities': {'A': []}, 'relationships': [('A', 'B', 'r')]}",
    ] {
        assert!(collector.load_upload(bad).is_err(), "accepted: {bad}");
        assert!(collector.model().is_empty(), "state changed by: {bad}");
    }
}

#[test]
fn bad_upload_without_manual_entries_draws_starter_diagram() {
    let mut collector = InputCollector::new();
    assert!(collector.load_upload("{'entities': {'User': ['id'}").is_err());
    let (model, starter) = collector.finish_or_starter(ReferencePolicy::Strict).unwrap();
    assert!(starter);

    let diagram = erd::generate_diagram(&model, &DiagramConfig::default());
    assert_eq!(diagram.entity_nodes, 2);
    assert_eq!(diagram.relationship_nodes, 1);
    assert!(diagram.dot.contains("\"Entity_1_Entity_2_Rel_1\" [label=\"Rel_1\""));
}

#[test]
fn syntax_errors_are_user_facing() {
    let err = parse_upload("{'entities': {'User': ['id' 'name'}, 'relationships': []}").unwrap_err();
    assert!(matches!(err, ErdError::Syntax { .. }), "got {err:?}");
    assert!(err.to_string().contains("line 1"));
}

// ── Collector merge rules ────────────────────────────────────────────────────

#[test]
fn merged_set_is_union_with_manual_override() {
    let mut collector = InputCollector::new();
    collector.load_upload(SHOP).unwrap();
    collector.add_entity("Invoice", &["id", "total"]).unwrap();
    collector.add_entity("User", &["uid"]).unwrap();
    collector.add_relationship("Order", "Invoice", "billed", None).unwrap();
    let model = collector.finish(ReferencePolicy::Strict).unwrap();

    let expected: BTreeSet<String> = ["User", "Order", "Product", "Invoice"]
        .into_iter()
        .map(String::from)
        .collect();
    assert_eq!(names(&model), expected);
    assert_eq!(model.entity("User").unwrap().attributes, vec!["uid"]);
    // Overridden entity keeps its position.
    assert_eq!(model.entities[0].name, "User");
    assert_eq!(model.relationships.len(), 4);
}

#[test]
fn strict_and_implicit_reference_policies() {
    let mut strict = InputCollector::new();
    strict.add_relationship("A", "B", "r", None).unwrap();
    assert!(matches!(
        strict.finish(ReferencePolicy::Strict),
        Err(ErdError::UnknownEntity { .. })
    ));

    let mut implicit = InputCollector::new();
    implicit.add_relationship("A", "B", "r", None).unwrap();
    let model = implicit.finish(ReferencePolicy::Implicit).unwrap();
    assert_eq!(model.entities.len(), 2);
    assert!(model.entities.iter().all(|e| e.attributes.is_empty()));
}

#[test]
fn manual_limits() {
    let mut collector = InputCollector::new();
    for i in 0..10 {
        collector.add_entity(&format!("E{i}"), &[] as &[&str]).unwrap();
    }
    assert!(matches!(
        collector.add_entity("E10", &[] as &[&str]),
        Err(ErdError::LimitExceeded { .. })
    ));
    assert!(matches!(
        InputCollector::new().add_entity("Wide", &["a", "b", "c", "d", "e", "f"]),
        Err(ErdError::LimitExceeded { .. })
    ));
}

// ── DOT and rendering ────────────────────────────────────────────────────────

#[test]
fn dot_carries_layout_attributes() {
    let model = parse_upload(SHOP).unwrap();
    let config = DiagramConfig::builder().size("10,6").build().unwrap();
    let dot = erd::generate_diagram(&model, &config).dot;
    assert!(dot.starts_with("digraph {\n"));
    assert!(dot.contains("size=\"10,6\""));
    assert!(dot.contains("rankdir=LR"));
    assert!(dot.contains("\"User_Order_places\" [label=\"places\""));
}

#[tokio::test]
async fn dot_export_without_graphviz() {
    let dir = tempfile::tempdir().unwrap();
    let model = parse_upload(SHOP).unwrap();
    let config = DiagramConfig::builder()
        .dot_binary("/definitely/not/graphviz")
        .build()
        .unwrap();
    let files = erd::export_diagram(&model, &config, dir.path().join("er"), &[ImageFormat::Dot])
        .await
        .unwrap();
    let written = std::fs::read_to_string(&files[0].path).unwrap();
    assert_eq!(written, erd::generate_diagram(&model, &config).dot);
}

#[tokio::test]
async fn renders_png_and_pdf() {
    skip_unless_graphviz!();
    let dir = tempfile::tempdir().unwrap();
    let model = parse_upload(SHOP).unwrap();
    let files = erd::export_diagram(
        &model,
        &DiagramConfig::default(),
        dir.path().join("er_diagram"),
        &[ImageFormat::Png, ImageFormat::Pdf],
    )
    .await
    .unwrap();
    assert_eq!(files.len(), 2);

    let png = std::fs::read(dir.path().join("er_diagram.png")).unwrap();
    assert!(png.starts_with(b"\x89PNG"));
    let pdf = std::fs::read(dir.path().join("er_diagram.pdf")).unwrap();
    assert!(pdf.starts_with(b"%PDF"));
}

#[tokio::test]
async fn renders_svg_bytes() {
    skip_unless_graphviz!();
    let model = parse_upload(SHOP).unwrap();
    let svg = erd::render_diagram(&model, &DiagramConfig::default(), ImageFormat::Svg)
        .await
        .unwrap();
    let text = String::from_utf8(svg).unwrap();
    assert!(text.contains("<svg"));
    assert!(text.contains("places"));
}
