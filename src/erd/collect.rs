//! Input collection: merge an upload with manually entered definitions.
//!
//! Manual entries come from the command line (`--entity`, `--relationship`)
//! and are capped the same way the interactive form capped them. Uploaded
//! records are not capped.

use crate::config::ReferencePolicy;
use crate::erd::model::{Cardinality, Entity, ErModel, Relationship};
use crate::erd::validate;
use crate::error::ErdError;
use tracing::{debug, info, warn};

/// Most manual entities accepted per invocation.
pub const MAX_MANUAL_ENTITIES: usize = 10;
/// Most attributes accepted per manual entity.
pub const MAX_ATTRIBUTES_PER_ENTITY: usize = 5;
/// Most manual relationships accepted per invocation.
pub const MAX_MANUAL_RELATIONSHIPS: usize = 10;

/// Accumulates the working entity/relationship set for one diagram.
#[derive(Debug, Default)]
pub struct InputCollector {
    model: ErModel,
    manual_entities: usize,
    manual_relationships: Vec<Relationship>,
}

impl InputCollector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Validate `text` as an upload and merge it.
    ///
    /// On error the working set is left exactly as it was.
    pub fn load_upload(&mut self, text: &str) -> Result<(), ErdError> {
        let uploaded = validate::parse_upload(text)?;
        info!(
            "Entities and relationships extracted from upload: {} entities, {} relationships",
            uploaded.entities.len(),
            uploaded.relationships.len()
        );
        self.model.merge(uploaded);
        Ok(())
    }

    /// Add a manually defined entity.
    ///
    /// Blank names are ignored and blank attribute names dropped; returns
    /// `Ok(false)` when the entry was ignored.
    pub fn add_entity<S: AsRef<str>>(
        &mut self,
        name: &str,
        attributes: &[S],
    ) -> Result<bool, ErdError> {
        let name = name.trim();
        if name.is_empty() {
            debug!("Skipping manual entity with blank name");
            return Ok(false);
        }
        if self.manual_entities >= MAX_MANUAL_ENTITIES {
            return Err(ErdError::LimitExceeded {
                what: "manual entities",
                max: MAX_MANUAL_ENTITIES,
            });
        }

        let attributes: Vec<String> = attributes
            .iter()
            .map(|a| a.as_ref().trim())
            .filter(|a| !a.is_empty())
            .map(str::to_string)
            .collect();
        if attributes.len() > MAX_ATTRIBUTES_PER_ENTITY {
            return Err(ErdError::LimitExceeded {
                what: "attributes per entity",
                max: MAX_ATTRIBUTES_PER_ENTITY,
            });
        }

        self.manual_entities += 1;
        if self.model.upsert_entity(Entity::new(name, attributes)) {
            warn!("Manual entity '{}' overrides an earlier definition", name);
        }
        Ok(true)
    }

    /// Add a manually defined relationship. Entries with a blank field are
    /// ignored (`Ok(false)`). Endpoints are checked in [`Self::finish`] so
    /// that entities may be defined after the relationships that use them.
    pub fn add_relationship(
        &mut self,
        source: &str,
        target: &str,
        name: &str,
        cardinality: Option<Cardinality>,
    ) -> Result<bool, ErdError> {
        let (source, target, name) = (source.trim(), target.trim(), name.trim());
        if source.is_empty() || target.is_empty() || name.is_empty() {
            debug!("Skipping manual relationship with a blank field");
            return Ok(false);
        }
        if self.manual_relationships.len() >= MAX_MANUAL_RELATIONSHIPS {
            return Err(ErdError::LimitExceeded {
                what: "manual relationships",
                max: MAX_MANUAL_RELATIONSHIPS,
            });
        }
        self.manual_relationships
            .push(Relationship::new(source, target, name, cardinality));
        Ok(true)
    }

    /// Current working set, without the pending manual relationships.
    pub fn model(&self) -> &ErModel {
        &self.model
    }

    /// Resolve pending manual relationships and return the merged model.
    pub fn finish(mut self, policy: ReferencePolicy) -> Result<ErModel, ErdError> {
        for relationship in std::mem::take(&mut self.manual_relationships) {
            for endpoint in [&relationship.source, &relationship.target] {
                if self.model.contains_entity(endpoint) {
                    continue;
                }
                match policy {
                    ReferencePolicy::Strict => {
                        return Err(ErdError::UnknownEntity {
                            relationship: relationship.name.clone(),
                            entity: endpoint.clone(),
                        })
                    }
                    ReferencePolicy::Implicit => {
                        debug!("Adding implicit entity '{}'", endpoint);
                        self.model.upsert_entity(Entity::new(endpoint.clone(), Vec::new()));
                    }
                }
            }
            self.model.push_relationship(relationship);
        }
        Ok(self.model)
    }

    /// Like [`Self::finish`], but an empty result is replaced by
    /// [`starter_model`]. The flag reports whether that happened.
    pub fn finish_or_starter(self, policy: ReferencePolicy) -> Result<(ErModel, bool), ErdError> {
        let model = self.finish(policy)?;
        if model.is_empty() {
            warn!("No entities or relationships provided; drawing the starter diagram");
            return Ok((starter_model(), true));
        }
        Ok((model, false))
    }
}

/// The two-entity diagram the manual form starts with: `Entity_1` and
/// `Entity_2`, one attribute each, joined one-to-one by `Rel_1`.
pub fn starter_model() -> ErModel {
    let mut model = ErModel::new();
    for name in ["Entity_1", "Entity_2"] {
        model.upsert_entity(Entity::new(name, vec!["attr_1".to_string()]));
    }
    model.push_relationship(Relationship::new(
        "Entity_1",
        "Entity_2",
        "Rel_1",
        Some(Cardinality::OneToOne),
    ));
    model
}
