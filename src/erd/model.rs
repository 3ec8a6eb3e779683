//! Entity/relationship data model.

use crate::error::ErdError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// A named record type with an ordered list of attribute names.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Entity {
    pub name: String,
    pub attributes: Vec<String>,
}

impl Entity {
    pub fn new(name: impl Into<String>, attributes: Vec<String>) -> Self {
        Self {
            name: name.into(),
            attributes,
        }
    }
}

/// Cardinality tag attached to a relationship.
///
/// Accepted on input and kept on the model; the renderer only uses it to
/// decorate edge ends.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Cardinality {
    OneToOne,
    OneToMany,
    ManyToMany,
}

impl Cardinality {
    /// Labels for the (source, target) ends of the relationship.
    pub fn end_labels(self) -> (&'static str, &'static str) {
        match self {
            Cardinality::OneToOne => ("1", "1"),
            Cardinality::OneToMany => ("1", "N"),
            Cardinality::ManyToMany => ("M", "N"),
        }
    }
}

impl fmt::Display for Cardinality {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Cardinality::OneToOne => "One-to-One",
            Cardinality::OneToMany => "One-to-Many",
            Cardinality::ManyToMany => "Many-to-Many",
        })
    }
}

impl FromStr for Cardinality {
    type Err = ErdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let key: String = s
            .trim()
            .chars()
            .filter(|c| !matches!(c, '-' | '_' | ' '))
            .collect::<String>()
            .to_lowercase();

        match key.as_str() {
            "onetoone" | "1:1" => Ok(Cardinality::OneToOne),
            "onetomany" | "1:n" | "1:m" | "1:*" => Ok(Cardinality::OneToMany),
            "manytomany" | "n:m" | "m:n" | "*:*" => Ok(Cardinality::ManyToMany),
            _ => Err(ErdError::UnknownCardinality(s.to_string())),
        }
    }
}

/// A named association between two entities.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Relationship {
    pub source: String,
    pub target: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cardinality: Option<Cardinality>,
}

impl Relationship {
    pub fn new(
        source: impl Into<String>,
        target: impl Into<String>,
        name: impl Into<String>,
        cardinality: Option<Cardinality>,
    ) -> Self {
        Self {
            source: source.into(),
            target: target.into(),
            name: name.into(),
            cardinality,
        }
    }
}

impl fmt::Display for Relationship {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} -[{}]-> {}", self.source, self.name, self.target)
    }
}

/// The working set of entities and relationships for one invocation.
///
/// Entities keep insertion order; re-inserting a name replaces the
/// attributes but keeps the original position.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErModel {
    pub entities: Vec<Entity>,
    pub relationships: Vec<Relationship>,
}

impl ErModel {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.entities.is_empty() && self.relationships.is_empty()
    }

    pub fn entity(&self, name: &str) -> Option<&Entity> {
        self.entities.iter().find(|e| e.name == name)
    }

    pub fn contains_entity(&self, name: &str) -> bool {
        self.entity(name).is_some()
    }

    /// Insert or overwrite an entity. Returns `true` when a previous entry
    /// with the same name was replaced.
    pub fn upsert_entity(&mut self, entity: Entity) -> bool {
        match self.entities.iter_mut().find(|e| e.name == entity.name) {
            Some(existing) => {
                existing.attributes = entity.attributes;
                true
            }
            None => {
                self.entities.push(entity);
                false
            }
        }
    }

    pub fn push_relationship(&mut self, relationship: Relationship) {
        self.relationships.push(relationship);
    }

    /// Merge `other` into `self`: entities upsert, relationships append.
    pub fn merge(&mut self, other: ErModel) {
        for entity in other.entities {
            self.upsert_entity(entity);
        }
        self.relationships.extend(other.relationships);
    }

    pub fn entity_names(&self) -> impl Iterator<Item = &str> {
        self.entities.iter().map(|e| e.name.as_str())
    }
}
