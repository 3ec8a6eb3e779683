//! Graphviz DOT emission for an [`ErGraph`].
//!
//! Entities become plaintext nodes whose label is an HTML-like table (name
//! row in bold, one row per attribute). Relationships become grey diamonds
//! connected by arrowless edges.

use crate::config::DiagramConfig;
use crate::erd::graph::{ErEdge, ErGraph, ErNode, LinkEnd};
use std::fmt::Write;

/// Render the graph as a DOT `digraph`.
pub fn to_dot(graph: &ErGraph, config: &DiagramConfig) -> String {
    let mut out = String::new();
    out.push_str("digraph {\n");
    let _ = writeln!(
        out,
        "\tgraph [rankdir={} ratio={} size={}]",
        config.rankdir.as_str(),
        quote(&config.ratio),
        quote(&config.size)
    );

    for node in graph.nodes() {
        match node {
            ErNode::Entity { name, attributes } => {
                let _ = writeln!(
                    out,
                    "\t{} [label={} shape=plaintext]",
                    quote(name),
                    entity_table(name, attributes)
                );
            }
            ErNode::Attribute { id, name, .. } => {
                let _ = writeln!(out, "\t{} [label={} shape=ellipse]", quote(id), quote(name));
            }
            ErNode::Connector { id, label, .. } => {
                let _ = writeln!(
                    out,
                    "\t{} [label={} color=lightgray fontcolor=black height=0.25 shape=diamond style=filled width=0.75]",
                    quote(id),
                    quote(label)
                );
            }
        }
    }

    for (from, to, edge) in graph.edges() {
        match edge {
            ErEdge::Link {
                end,
                label: Some(label),
            } => {
                // The label sits at the entity end of the link.
                let end = match end {
                    LinkEnd::Tail => "taillabel",
                    LinkEnd::Head => "headlabel",
                };
                let _ = writeln!(
                    out,
                    "\t{} -> {} [arrowhead=none {}={}]",
                    quote(from),
                    quote(to),
                    end,
                    quote(label)
                );
            }
            ErEdge::Link { label: None, .. } => {
                let _ = writeln!(out, "\t{} -> {} [arrowhead=none]", quote(from), quote(to));
            }
            ErEdge::Attribute => {
                let _ = writeln!(
                    out,
                    "\t{} -> {} [arrowhead=none style=dashed]",
                    quote(from),
                    quote(to)
                );
            }
        }
    }

    out.push_str("}\n");
    out
}

fn entity_table(name: &str, attributes: &[String]) -> String {
    let mut label = String::from("<<TABLE BORDER='0' CELLBORDER='1' CELLSPACING='0'>");
    let _ = write!(label, "<TR><TD><B>{}</B></TD></TR>", escape_html(name));
    for attr in attributes {
        let _ = write!(label, "<TR><TD>{}</TD></TR>", escape_html(attr));
    }
    label.push_str("</TABLE>>");
    label
}

/// Quote a DOT identifier or string attribute.
pub fn quote(s: &str) -> String {
    let mut out = String::with_capacity(s.len() + 2);
    out.push('"');
    for c in s.chars() {
        match c {
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\r' => {}
            _ => out.push(c),
        }
    }
    out.push('"');
    out
}

/// Escape text for a DOT HTML-like label.
pub fn escape_html(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            _ => out.push(c),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AttributeStyle;
    use crate::erd::model::{Cardinality, Entity, ErModel, Relationship};
    use pretty_assertions::assert_eq;

    #[test]
    fn renders_table_entities_and_diamond_connectors() {
        let mut m = ErModel::new();
        m.upsert_entity(Entity::new("User", vec!["id".into()]));
        m.upsert_entity(Entity::new("Order", vec![]));
        m.push_relationship(Relationship::new("User", "Order", "places", Some(Cardinality::OneToMany)));

        let config = DiagramConfig::default();
        let g = ErGraph::build(&m, AttributeStyle::Table, true);
        let dot = to_dot(&g, &config);

        let expected = "digraph {\n\
\tgraph [rankdir=LR ratio=\"fill\" size=\"8,8\"]\n\
\t\"User\" [label=<<TABLE BORDER='0' CELLBORDER='1' CELLSPACING='0'><TR><TD><B>User</B></TD></TR><TR><TD>id</TD></TR></TABLE>> shape=plaintext]\n\
\t\"Order\" [label=<<TABLE BORDER='0' CELLBORDER='1' CELLSPACING='0'><TR><TD><B>Order</B></TD></TR></TABLE>> shape=plaintext]\n\
\t\"User_Order_places\" [label=\"places\" color=lightgray fontcolor=black height=0.25 shape=diamond style=filled width=0.75]\n\
\t\"User\" -> \"User_Order_places\" [arrowhead=none taillabel=\"1\"]\n\
\t\"User_Order_places\" -> \"Order\" [arrowhead=none headlabel=\"N\"]\n\
}\n";
        assert_eq!(dot, expected);
    }

    #[test]
    fn escapes_identifiers_and_html() {
        assert_eq!(quote(r#"a "b" \c"#), r#""a \"b\" \\c""#);
        assert_eq!(escape_html("<id & \"pk\">"), "&lt;id &amp; &quot;pk&quot;&gt;");
    }

    #[test]
    fn satellite_edges_are_dashed() {
        let mut m = ErModel::new();
        m.upsert_entity(Entity::new("User", vec!["id".into()]));
        let g = ErGraph::build(&m, AttributeStyle::Satellite, true);
        let dot = to_dot(&g, &DiagramConfig::default());
        assert!(dot.contains("\"User__id\" [label=\"id\" shape=ellipse]"));
        assert!(dot.contains("\"User\" -> \"User__id\" [arrowhead=none style=dashed]"));
    }

    #[test]
    fn self_loop_labels_both_ends_of_one_entity() {
        let mut m = ErModel::new();
        m.push_relationship(Relationship::new("Emp", "Emp", "manages", Some(Cardinality::OneToMany)));
        let g = ErGraph::build(&m, AttributeStyle::Table, true);
        let dot = to_dot(&g, &DiagramConfig::default());
        assert_eq!(dot.matches("\"Emp\" [label=").count(), 1);
        assert!(dot.contains("\t\"Emp\" -> \"Emp_Emp_manages\" [arrowhead=none taillabel=\"1\"]\n"));
        assert!(dot.contains("\t\"Emp_Emp_manages\" -> \"Emp\" [arrowhead=none headlabel=\"N\"]\n"));
    }
}
