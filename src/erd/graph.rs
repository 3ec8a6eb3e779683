//! Graph description of an ER model.
//!
//! One node per entity, one connector node per relationship instance, and
//! exactly two link edges per connector (`source → connector → target`).
//! In satellite mode every attribute also becomes its own node hanging off
//! the entity.

use crate::config::AttributeStyle;
use crate::erd::model::{Cardinality, ErModel};
use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::visit::EdgeRef;
use petgraph::Direction;
use std::collections::{HashMap, HashSet};
use tracing::debug;

/// A node of the rendered diagram.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ErNode {
    Entity {
        name: String,
        /// Attributes drawn inside the entity box (table style only).
        attributes: Vec<String>,
    },
    Attribute {
        id: String,
        entity: String,
        name: String,
    },
    Connector {
        id: String,
        label: String,
        cardinality: Option<Cardinality>,
    },
}

impl ErNode {
    /// DOT node identifier.
    pub fn id(&self) -> &str {
        match self {
            ErNode::Entity { name, .. } => name,
            ErNode::Attribute { id, .. } | ErNode::Connector { id, .. } => id,
        }
    }

    pub fn is_connector(&self) -> bool {
        matches!(self, ErNode::Connector { .. })
    }
}

/// An edge of the rendered diagram.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErEdge {
    /// Entity to connector, or connector to entity.
    Link {
        /// Which end of the edge the entity sits on.
        end: LinkEnd,
        /// End label when cardinality annotation is on.
        label: Option<&'static str>,
    },
    /// Entity to one of its satellite attributes.
    Attribute,
}

/// Position of the entity on a relationship link.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkEnd {
    /// Entity -> connector.
    Tail,
    /// Connector -> entity.
    Head,
}

/// The diagram as a directed graph.
#[derive(Debug, Clone)]
pub struct ErGraph {
    graph: DiGraph<ErNode, ErEdge>,
    style: AttributeStyle,
}

impl ErGraph {
    /// Build the diagram graph. Relationship endpoints missing from the
    /// entity list get a bare entity node.
    pub fn build(model: &ErModel, style: AttributeStyle, annotate_cardinality: bool) -> Self {
        let mut graph = DiGraph::new();
        let mut entity_index: HashMap<&str, NodeIndex> = HashMap::new();
        let mut used_ids: HashSet<String> = HashSet::new();

        for entity in &model.entities {
            let attributes = match style {
                AttributeStyle::Table => entity.attributes.clone(),
                AttributeStyle::Satellite => Vec::new(),
            };
            let idx = graph.add_node(ErNode::Entity {
                name: entity.name.clone(),
                attributes,
            });
            used_ids.insert(entity.name.clone());
            entity_index.insert(entity.name.as_str(), idx);
        }

        if style == AttributeStyle::Satellite {
            for entity in &model.entities {
                let owner = entity_index[entity.name.as_str()];
                for attr in &entity.attributes {
                    let id = unique_id(&mut used_ids, format!("{}__{}", entity.name, attr));
                    let node = graph.add_node(ErNode::Attribute {
                        id,
                        entity: entity.name.clone(),
                        name: attr.clone(),
                    });
                    graph.add_edge(owner, node, ErEdge::Attribute);
                }
            }
        }

        for rel in &model.relationships {
            let source = endpoint(&rel.source, &mut graph, &mut entity_index, &mut used_ids);
            let target = endpoint(&rel.target, &mut graph, &mut entity_index, &mut used_ids);

            let id = unique_id(
                &mut used_ids,
                format!("{}_{}_{}", rel.source, rel.target, rel.name),
            );
            let connector = graph.add_node(ErNode::Connector {
                id,
                label: rel.name.clone(),
                cardinality: rel.cardinality,
            });

            let (source_label, target_label) = match (annotate_cardinality, rel.cardinality) {
                (true, Some(c)) => {
                    let (s, t) = c.end_labels();
                    (Some(s), Some(t))
                }
                _ => (None, None),
            };
            graph.add_edge(
                source,
                connector,
                ErEdge::Link {
                    end: LinkEnd::Tail,
                    label: source_label,
                },
            );
            graph.add_edge(
                connector,
                target,
                ErEdge::Link {
                    end: LinkEnd::Head,
                    label: target_label,
                },
            );
        }

        debug!(
            "Built ER graph: {} nodes, {} edges",
            graph.node_count(),
            graph.edge_count()
        );
        Self { graph, style }
    }

    pub fn style(&self) -> AttributeStyle {
        self.style
    }

    pub fn node_count(&self) -> usize {
        self.graph.node_count()
    }

    pub fn edge_count(&self) -> usize {
        self.graph.edge_count()
    }

    pub fn nodes(&self) -> impl Iterator<Item = &ErNode> {
        self.graph.node_weights()
    }

    pub fn entity_count(&self) -> usize {
        self.nodes()
            .filter(|n| matches!(n, ErNode::Entity { .. }))
            .count()
    }

    pub fn connector_count(&self) -> usize {
        self.nodes().filter(|n| n.is_connector()).count()
    }

    /// Edges as `(from_id, to_id, edge)` in insertion order.
    pub fn edges(&self) -> impl Iterator<Item = (&str, &str, ErEdge)> {
        self.graph.edge_references().map(|e| {
            (
                self.graph[e.source()].id(),
                self.graph[e.target()].id(),
                *e.weight(),
            )
        })
    }

    /// The `(source entity, target entity)` a connector links, if `id`
    /// names a connector with both links present.
    pub fn connector_endpoints(&self, id: &str) -> Option<(&str, &str)> {
        let idx = self
            .graph
            .node_indices()
            .find(|&i| self.graph[i].is_connector() && self.graph[i].id() == id)?;
        let mut incoming = self.graph.neighbors_directed(idx, Direction::Incoming);
        let mut outgoing = self.graph.neighbors_directed(idx, Direction::Outgoing);
        let source = incoming.next()?;
        let target = outgoing.next()?;
        Some((self.graph[source].id(), self.graph[target].id()))
    }

    /// Number of edges touching the node `id`.
    pub fn degree(&self, id: &str) -> usize {
        self.graph
            .node_indices()
            .find(|&i| self.graph[i].id() == id)
            .map(|i| {
                self.graph.edges_directed(i, Direction::Incoming).count()
                    + self.graph.edges_directed(i, Direction::Outgoing).count()
            })
            .unwrap_or(0)
    }
}

/// Entity node for a relationship endpoint. Names missing from the entity
/// list get one bare node, shared by every later reference.
fn endpoint<'a>(
    name: &'a str,
    graph: &mut DiGraph<ErNode, ErEdge>,
    entity_index: &mut HashMap<&'a str, NodeIndex>,
    used_ids: &mut HashSet<String>,
) -> NodeIndex {
    *entity_index.entry(name).or_insert_with(|| {
        debug!("Relationship endpoint '{}' has no entity; adding bare node", name);
        used_ids.insert(name.to_string());
        graph.add_node(ErNode::Entity {
            name: name.to_string(),
            attributes: Vec::new(),
        })
    })
}

/// Reserve `candidate` as a node id, suffixing `_2`, `_3`, … on collision.
fn unique_id(used: &mut HashSet<String>, candidate: String) -> String {
    if used.insert(candidate.clone()) {
        return candidate;
    }
    let mut n = 2;
    loop {
        let next = format!("{candidate}_{n}");
        if used.insert(next.clone()) {
            return next;
        }
        n += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::erd::model::{Entity, Relationship};

    fn shop() -> ErModel {
        let mut m = ErModel::new();
        m.upsert_entity(Entity::new("User", vec!["id".into(), "name".into()]));
        m.upsert_entity(Entity::new("Order", vec!["id".into()]));
        m.push_relationship(Relationship::new("User", "Order", "places", Some(Cardinality::OneToMany)));
        m.push_relationship(Relationship::new("Order", "User", "belongs", Some(Cardinality::ManyToMany)));
        m
    }

    #[test]
    fn one_connector_and_two_links_per_relationship() {
        let g = ErGraph::build(&shop(), AttributeStyle::Table, true);
        assert_eq!(g.entity_count(), 2);
        assert_eq!(g.connector_count(), 2);
        assert_eq!(g.edge_count(), 4);
        assert_eq!(g.degree("User_Order_places"), 2);
        assert_eq!(g.connector_endpoints("User_Order_places"), Some(("User", "Order")));
        assert_eq!(g.connector_endpoints("Order_User_belongs"), Some(("Order", "User")));
    }

    #[test]
    fn many_to_many_has_same_topology() {
        let mut m = ErModel::new();
        m.upsert_entity(Entity::new("A", vec![]));
        m.upsert_entity(Entity::new("B", vec![]));
        for c in [Cardinality::OneToOne, Cardinality::OneToMany, Cardinality::ManyToMany] {
            m.push_relationship(Relationship::new("A", "B", c.to_string(), Some(c)));
        }
        let g = ErGraph::build(&m, AttributeStyle::Table, false);
        assert_eq!(g.connector_count(), 3);
        assert_eq!(g.edge_count(), 6);
        for (_, _, edge) in g.edges() {
            assert!(matches!(edge, ErEdge::Link { label: None, .. }));
        }
    }

    #[test]
    fn cardinality_labels_decorate_link_ends() {
        let g = ErGraph::build(&shop(), AttributeStyle::Table, true);
        let labels: Vec<Option<&str>> = g
            .edges()
            .map(|(_, _, e)| match e {
                ErEdge::Link { label, .. } => label,
                ErEdge::Attribute => None,
            })
            .collect();
        assert_eq!(labels, vec![Some("1"), Some("N"), Some("M"), Some("N")]);
    }

    #[test]
    fn duplicate_relationship_triples_get_distinct_connectors() {
        let mut m = shop();
        m.push_relationship(Relationship::new("User", "Order", "places", None));
        let g = ErGraph::build(&m, AttributeStyle::Table, true);
        assert_eq!(g.connector_count(), 3);
        assert!(g.connector_endpoints("User_Order_places_2").is_some());
    }

    #[test]
    fn satellite_attributes() {
        let g = ErGraph::build(&shop(), AttributeStyle::Satellite, true);
        let attrs = g
            .nodes()
            .filter(|n| matches!(n, ErNode::Attribute { .. }))
            .count();
        assert_eq!(attrs, 3);
        // Connectors still have exactly two links each.
        assert_eq!(g.degree("User_Order_places"), 2);
        // Entities carry no inline attributes in satellite mode.
        assert!(g.nodes().all(|n| match n {
            ErNode::Entity { attributes, .. } => attributes.is_empty(),
            _ => true,
        }));
    }

    #[test]
    fn single_entity_no_relationships() {
        let mut m = ErModel::new();
        m.upsert_entity(Entity::new("User", vec!["id".into(), "name".into()]));
        let g = ErGraph::build(&m, AttributeStyle::Table, true);
        assert_eq!(g.entity_count(), 1);
        assert_eq!(g.connector_count(), 0);
        assert_eq!(g.edge_count(), 0);
    }

    #[test]
    fn dangling_endpoint_gets_single_bare_node() {
        let mut m = ErModel::new();
        m.upsert_entity(Entity::new("A", vec![]));
        m.push_relationship(Relationship::new("A", "Ghost", "r1", None));
        m.push_relationship(Relationship::new("Ghost", "A", "r2", None));
        let g = ErGraph::build(&m, AttributeStyle::Table, true);
        assert_eq!(g.entity_count(), 2);
    }

    #[test]
    fn undeclared_self_loop_gets_one_node() {
        let mut m = ErModel::new();
        m.push_relationship(Relationship::new("Ghost", "Ghost", "knows", None));
        let g = ErGraph::build(&m, AttributeStyle::Table, true);
        assert_eq!(g.entity_count(), 1);
        assert_eq!(g.connector_endpoints("Ghost_Ghost_knows"), Some(("Ghost", "Ghost")));
        assert_eq!(g.degree("Ghost"), 2);
    }

    #[test]
    fn links_record_which_end_the_entity_is_on() {
        let g = ErGraph::build(&shop(), AttributeStyle::Table, true);
        let ends: Vec<(&str, LinkEnd)> = g
            .edges()
            .filter_map(|(from, _, e)| match e {
                ErEdge::Link { end, .. } => Some((from, end)),
                ErEdge::Attribute => None,
            })
            .collect();
        assert_eq!(
            ends,
            vec![
                ("User", LinkEnd::Tail),
                ("User_Order_places", LinkEnd::Head),
                ("Order", LinkEnd::Tail),
                ("Order_User_belongs", LinkEnd::Head),
            ]
        );
    }
}
