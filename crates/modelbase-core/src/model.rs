//! Model definitions: the per-type attribute registry.
//!
//! A [`ModelDefinition`] maps attribute names to their declared options and
//! carries the relations of the model. Definitions are assembled once with a
//! [`ModelDefinitionBuilder`] and shared immutably (`Arc`) by every record of
//! the model.
//!
//! # Example
//!
//! ```
//! use modelbase_core::{AttributeOptions, BelongsTo, ModelDefinition};
//!
//! let post = ModelDefinition::builder("Post")
//!     .attribute("title", AttributeOptions::string().identity(true))
//!     .belongs_to(BelongsTo::new("author"))
//!     .build();
//!
//! assert!(post.has_attribute("author_id"));
//! assert_eq!(post.identity_attributes(), vec!["title"]);
//! ```

use std::sync::Arc;

use crate::attribute::AttributeOptions;
use crate::inflect;
use crate::relationship::{BelongsTo, HasMany, Relation};

/// The identity attribute every model carries.
pub const ID: &str = "id";

/// Model-level configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ModelConfig {
    /// Reject belongs-to assignments and has-many ids of records whose model
    /// differs from the declared related model.
    /// When false (the default), mismatched records are accepted by
    /// belongs-to setters and silently dropped by has-many appends.
    pub enforce_association_types: bool,
}

impl ModelConfig {
    /// Create a new ModelConfig with all defaults.
    pub const fn new() -> Self {
        Self {
            enforce_association_types: false,
        }
    }

    #[must_use]
    pub const fn enforce_association_types(mut self, value: bool) -> Self {
        self.enforce_association_types = value;
        self
    }
}

/// Declared attributes and relations of one model type.
#[derive(Debug, Clone)]
pub struct ModelDefinition {
    name: String,
    parent: Option<Arc<ModelDefinition>>,
    attributes: Vec<(String, AttributeOptions)>,
    relations: Vec<Relation>,
    config: ModelConfig,
}

impl ModelDefinition {
    /// Start a definition with only the `id` attribute declared.
    pub fn builder(name: impl Into<String>) -> ModelDefinitionBuilder {
        ModelDefinitionBuilder {
            definition: ModelDefinition {
                name: name.into(),
                parent: None,
                attributes: vec![(ID.to_string(), AttributeOptions::new())],
                relations: Vec::new(),
                config: ModelConfig::new(),
            },
        }
    }

    /// Start a definition that inherits every attribute, relation and the
    /// configuration of `parent`. Re-declarations refine the inherited entries.
    pub fn extend(
        parent: &Arc<ModelDefinition>,
        name: impl Into<String>,
    ) -> ModelDefinitionBuilder {
        ModelDefinitionBuilder {
            definition: ModelDefinition {
                name: name.into(),
                parent: Some(Arc::clone(parent)),
                attributes: parent.attributes.clone(),
                relations: parent.relations.clone(),
                config: parent.config.clone(),
            },
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn parent(&self) -> Option<&Arc<ModelDefinition>> {
        self.parent.as_ref()
    }

    /// True when this model is `model_name` or derives from it.
    pub fn is_a(&self, model_name: &str) -> bool {
        if self.name == model_name {
            return true;
        }
        self.parent.as_ref().is_some_and(|p| p.is_a(model_name))
    }

    pub fn config(&self) -> &ModelConfig {
        &self.config
    }

    /// Attributes in declaration order.
    pub fn attributes(&self) -> impl Iterator<Item = (&str, &AttributeOptions)> {
        self.attributes.iter().map(|(n, o)| (n.as_str(), o))
    }

    pub fn attribute_names(&self) -> Vec<&str> {
        self.attributes.iter().map(|(n, _)| n.as_str()).collect()
    }

    pub fn attribute(&self, name: &str) -> Option<&AttributeOptions> {
        self.attributes
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, o)| o)
    }

    pub fn has_attribute(&self, name: &str) -> bool {
        self.attribute(name).is_some()
    }

    /// Attributes declared with `identity`, ordered by name.
    pub fn identity_attributes(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self
            .attributes
            .iter()
            .filter(|(_, o)| o.identity)
            .map(|(n, _)| n.as_str())
            .collect();
        names.sort_unstable();
        names
    }

    pub fn is_identity_attribute(&self, name: &str) -> bool {
        self.attribute(name).is_some_and(|o| o.identity)
    }

    pub fn relations(&self) -> &[Relation] {
        &self.relations
    }

    pub fn relation(&self, name: &str) -> Option<&Relation> {
        self.relations.iter().find(|r| r.name() == name)
    }

    pub fn belongs_to(&self, name: &str) -> Option<&BelongsTo> {
        match self.relation(name)? {
            Relation::BelongsTo(rel) => Some(rel),
            Relation::HasMany(_) => None,
        }
    }

    pub fn has_many(&self, name: &str) -> Option<&HasMany> {
        match self.relation(name)? {
            Relation::HasMany(rel) => Some(rel),
            Relation::BelongsTo(_) => None,
        }
    }

    /// Find a has-many relation by its id-list accessor name (`post_ids`).
    pub fn has_many_by_ids_name(&self, ids_name: &str) -> Option<&HasMany> {
        self.relations.iter().find_map(|r| match r {
            Relation::HasMany(rel) if rel.ids_name() == ids_name => Some(rel),
            _ => None,
        })
    }
}

/// Assembles a [`ModelDefinition`].
#[derive(Debug, Clone)]
pub struct ModelDefinitionBuilder {
    definition: ModelDefinition,
}

impl ModelDefinitionBuilder {
    /// Declare an attribute. Re-declaring a name replaces its options.
    #[must_use]
    pub fn attribute(mut self, name: impl Into<String>, options: AttributeOptions) -> Self {
        self.declare(name.into(), options);
        self
    }

    /// Declare several attributes sharing the same options.
    #[must_use]
    pub fn attributes(mut self, names: &[&str], options: &AttributeOptions) -> Self {
        for name in names {
            self.declare((*name).to_string(), options.clone());
        }
        self
    }

    /// Declare a belongs-to relation and its foreign key attribute.
    #[must_use]
    pub fn belongs_to(mut self, relation: BelongsTo) -> Self {
        let fk_options = AttributeOptions::new()
            .identity(relation.identity)
            .allow_nil(relation.allow_nil);
        self.declare(relation.foreign_key.clone(), fk_options);
        self.relate(Relation::BelongsTo(relation));
        self
    }

    /// Declare a has-many relation.
    #[must_use]
    pub fn has_many(mut self, relation: HasMany) -> Self {
        self.relate(Relation::HasMany(relation));
        self
    }

    #[must_use]
    pub fn config(mut self, config: ModelConfig) -> Self {
        self.definition.config = config;
        self
    }

    /// Finish the definition, filling in conventional has-many foreign keys.
    pub fn build(mut self) -> Arc<ModelDefinition> {
        let owner_key = format!("{}_id", inflect::underscore(&self.definition.name));
        for relation in &mut self.definition.relations {
            if let Relation::HasMany(rel) = relation {
                if rel.foreign_key.is_empty() {
                    rel.foreign_key.clone_from(&owner_key);
                }
            }
        }
        tracing::trace!(
            model = %self.definition.name,
            attributes = self.definition.attributes.len(),
            relations = self.definition.relations.len(),
            "Model definition built"
        );
        Arc::new(self.definition)
    }

    fn declare(&mut self, name: String, options: AttributeOptions) {
        match self.definition.attributes.iter_mut().find(|(n, _)| *n == name) {
            Some((_, existing)) => *existing = options,
            None => self.definition.attributes.push((name, options)),
        }
    }

    fn relate(&mut self, relation: Relation) {
        match self
            .definition
            .relations
            .iter_mut()
            .find(|r| r.name() == relation.name())
        {
            Some(existing) => *existing = relation,
            None => self.definition.relations.push(relation),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::attribute::AttributeType;

    #[test]
    fn id_is_always_declared() {
        let def = ModelDefinition::builder("Empty").build();
        assert_eq!(def.attribute_names(), vec!["id"]);
        assert_eq!(def.attribute(ID), Some(&AttributeOptions::new()));
    }

    #[test]
    fn redeclaration_overwrites_in_place() {
        let def = ModelDefinition::builder("GenericRecord")
            .attribute("value", AttributeOptions::integer())
            .attribute("id", AttributeOptions::integer())
            .attribute("value", AttributeOptions::string().readonly(true))
            .build();

        assert_eq!(def.attribute_names(), vec!["id", "value"]);
        assert_eq!(def.attribute("id").unwrap().ty, Some(AttributeType::Integer));
        let value = def.attribute("value").unwrap();
        assert_eq!(value.ty, Some(AttributeType::String));
        assert!(value.readonly);
        assert!(value.allow_nil);
    }

    #[test]
    fn identity_attributes_sorted_by_name() {
        let def = ModelDefinition::builder("FinderTest")
            .attribute("value", AttributeOptions::integer().identity(true))
            .attribute("name", AttributeOptions::string().identity(true))
            .attribute("description", AttributeOptions::new())
            .build();
        assert_eq!(def.identity_attributes(), vec!["name", "value"]);
        assert!(def.is_identity_attribute("value"));
        assert!(!def.is_identity_attribute("description"));
    }

    #[test]
    fn belongs_to_declares_foreign_key() {
        let def = ModelDefinition::builder("Post")
            .belongs_to(BelongsTo::new("rating").foreign_key("appreciation_id"))
            .belongs_to(BelongsTo::new("author").allow_nil(false))
            .build();
        assert!(def.has_attribute("appreciation_id"));
        assert!(!def.has_attribute("rating_id"));
        assert!(!def.attribute("author_id").unwrap().allow_nil);
        assert_eq!(def.belongs_to("rating").unwrap().class_name, "Rating");
        assert!(def.has_many("rating").is_none());
    }

    #[test]
    fn has_many_foreign_key_defaults_to_owner() {
        let def = ModelDefinition::builder("GenericRecord")
            .has_many(HasMany::new("posts"))
            .has_many(HasMany::new("notes").foreign_key("owner_id"))
            .build();
        assert_eq!(def.has_many("posts").unwrap().foreign_key, "generic_record_id");
        assert_eq!(def.has_many("notes").unwrap().foreign_key, "owner_id");
        assert_eq!(def.has_many_by_ids_name("post_ids").unwrap().name, "posts");
    }

    #[test]
    fn extended_definitions_inherit_and_refine() {
        let base = ModelDefinition::builder("Animal")
            .attribute("name", AttributeOptions::string().identity(true))
            .config(ModelConfig::new().enforce_association_types(true))
            .build();
        let dog = ModelDefinition::extend(&base, "Dog")
            .attribute("name", AttributeOptions::string())
            .attribute("breed", AttributeOptions::string())
            .build();

        assert!(dog.is_a("Dog"));
        assert!(dog.is_a("Animal"));
        assert!(!base.is_a("Dog"));
        assert!(dog.identity_attributes().is_empty());
        assert!(base.is_identity_attribute("name"));
        assert!(dog.config().enforce_association_types);
        assert_eq!(dog.attribute_names(), vec!["id", "name", "breed"]);
    }
}
