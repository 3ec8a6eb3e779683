//! Shape validation for uploaded literal records.
//!
//! An upload must look like
//! `{"entities": {name: [attr, ...]}, "relationships": [(src, dst, name[, type]), ...]}`.
//! Validation is all-or-nothing: the first problem is reported and no part
//! of the record is returned.

use crate::erd::literal::{self, Literal};
use crate::erd::model::{Cardinality, Entity, ErModel, Relationship};
use crate::error::ErdError;
use tracing::debug;

/// Parse and validate an upload in one step.
pub fn parse_upload(input: &str) -> Result<ErModel, ErdError> {
    let value = literal::parse(input)?;
    validate_record(&value)
}

/// Validate a parsed literal against the upload contract.
pub fn validate_record(value: &Literal) -> Result<ErModel, ErdError> {
    let (Some(entities), Some(relationships)) =
        (value.get("entities"), value.get("relationships"))
    else {
        return Err(ErdError::MissingTopLevelKeys);
    };

    let (Some(entity_pairs), Some(relationship_items)) =
        (entities.as_dict(), relationships.as_sequence())
    else {
        return Err(ErdError::InvalidTopLevelShape);
    };

    let mut model = ErModel::new();

    for (key, attrs) in entity_pairs {
        let Some(name) = key.as_str() else {
            return Err(ErdError::InvalidEntity {
                name: key.to_string(),
                reason: format!("entity names must be strings, got {}", key.type_name()),
            });
        };
        model.upsert_entity(Entity::new(name, attribute_list(name, attrs)?));
    }

    for (index, item) in relationship_items.iter().enumerate() {
        let relationship = relationship_tuple(index, item)?;
        for endpoint in [&relationship.source, &relationship.target] {
            if !model.contains_entity(endpoint) {
                return Err(ErdError::UnknownEntity {
                    relationship: relationship.name.clone(),
                    entity: endpoint.clone(),
                });
            }
        }
        model.push_relationship(relationship);
    }

    debug!(
        "Validated upload: {} entities, {} relationships",
        model.entities.len(),
        model.relationships.len()
    );
    Ok(model)
}

fn attribute_list(name: &str, value: &Literal) -> Result<Vec<String>, ErdError> {
    let Some(items) = value.as_sequence() else {
        return Err(ErdError::InvalidEntity {
            name: name.to_string(),
            reason: format!("attributes must be a list of strings, got {}", value.type_name()),
        });
    };

    items
        .iter()
        .map(|item| {
            item.as_str()
                .map(str::to_string)
                .ok_or_else(|| ErdError::InvalidEntity {
                    name: name.to_string(),
                    reason: format!("attribute {item} is a {}, expected str", item.type_name()),
                })
        })
        .collect()
}

fn relationship_tuple(index: usize, value: &Literal) -> Result<Relationship, ErdError> {
    let invalid = |reason: String| ErdError::InvalidRelationship { index, reason };

    let Some(fields) = value.as_sequence() else {
        return Err(invalid(format!(
            "expected a tuple (entity, entity, name[, type]), got {}",
            value.type_name()
        )));
    };
    if !(3..=4).contains(&fields.len()) {
        return Err(invalid(format!(
            "expected 3 or 4 elements, got {}",
            fields.len()
        )));
    }

    let mut strings = Vec::with_capacity(3);
    for (pos, field) in fields.iter().take(3).enumerate() {
        match field.as_str() {
            Some(s) => strings.push(s.to_string()),
            None => {
                return Err(invalid(format!(
                    "element {pos} must be a string, got {}",
                    field.type_name()
                )))
            }
        }
    }

    let cardinality = match fields.get(3) {
        None | Some(Literal::None) => None,
        Some(Literal::Str(tag)) => Some(tag.parse::<Cardinality>()?),
        Some(other) => {
            return Err(invalid(format!(
                "relationship type must be a string, got {}",
                other.type_name()
            )))
        }
    };

    let mut strings = strings.into_iter();
    let (source, target, name) = match (strings.next(), strings.next(), strings.next()) {
        (Some(s), Some(t), Some(n)) => (s, t, n),
        _ => return Err(invalid("missing relationship fields".into())),
    };

    Ok(Relationship::new(source, target, name, cardinality))
}
