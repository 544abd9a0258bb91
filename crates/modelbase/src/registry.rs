//! Registry of models by name.
//!
//! Associations name their related model by class name; the registry is
//! where those names resolve. It is assembled once, checked, and then
//! read-only.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use modelbase_core::{Error, ModelDefinition, Relation, Result};

use crate::model::Model;
use crate::store::Store;

/// Every model of an application, keyed by name.
pub struct Registry {
    models: HashMap<String, Arc<Model>>,
}

impl Registry {
    #[must_use]
    pub fn builder() -> RegistryBuilder {
        RegistryBuilder::new()
    }

    /// The model registered under `name`.
    pub fn model(&self, name: &str) -> Result<Arc<Model>> {
        self.models
            .get(name)
            .cloned()
            .ok_or_else(|| Error::config(format!("unknown model '{name}'")))
    }

    pub fn contains(&self, name: &str) -> bool {
        self.models.contains_key(name)
    }

    /// Registered model names, sorted.
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.models.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    pub fn len(&self) -> usize {
        self.models.len()
    }

    pub fn is_empty(&self) -> bool {
        self.models.is_empty()
    }
}

impl fmt::Debug for Registry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Registry")
            .field("models", &self.names())
            .finish()
    }
}

/// Collects model definitions with their stores.
#[derive(Default)]
pub struct RegistryBuilder {
    entries: Vec<(Arc<ModelDefinition>, Arc<dyn Store>)>,
}

impl RegistryBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a model with its own store.
    #[must_use]
    pub fn model(self, definition: Arc<ModelDefinition>, store: impl Store + 'static) -> Self {
        self.model_with_store(definition, Arc::new(store))
    }

    /// Register a model with a store that may be shared or inspected elsewhere.
    #[must_use]
    pub fn model_with_store(
        mut self,
        definition: Arc<ModelDefinition>,
        store: Arc<dyn Store>,
    ) -> Self {
        self.entries.push((definition, store));
        self
    }

    /// Check every relation and build the registry.
    ///
    /// Fails with `Config` on duplicate model names, relations naming an
    /// unregistered model, and keys the related models do not declare.
    pub fn build(self) -> Result<Arc<Registry>> {
        let mut definitions: HashMap<&str, &ModelDefinition> = HashMap::new();
        for (definition, _) in &self.entries {
            if definitions.insert(definition.name(), definition.as_ref()).is_some() {
                return Err(Error::config(format!(
                    "model '{}' registered twice",
                    definition.name()
                )));
            }
        }

        for (definition, _) in &self.entries {
            for relation in definition.relations() {
                check_relation(definition, relation, &definitions)?;
            }
        }

        let registry = Arc::new_cyclic(|weak| Registry {
            models: self
                .entries
                .iter()
                .map(|(definition, store)| {
                    let model = Model::new(Arc::clone(definition), Arc::clone(store), weak.clone());
                    (definition.name().to_string(), Arc::new(model))
                })
                .collect(),
        });
        tracing::debug!(models = registry.len(), "Registry built");
        Ok(registry)
    }
}

fn check_relation(
    owner: &ModelDefinition,
    relation: &Relation,
    definitions: &HashMap<&str, &ModelDefinition>,
) -> Result<()> {
    let target = definitions.get(relation.class_name()).ok_or_else(|| {
        Error::config(format!(
            "{}.{} refers to unknown model '{}'",
            owner.name(),
            relation.name(),
            relation.class_name()
        ))
    })?;

    let (holder, key) = match relation {
        Relation::BelongsTo(rel) => (*target, &rel.primary_key),
        Relation::HasMany(rel) => {
            if !owner.has_attribute(&rel.primary_key) {
                return Err(missing_key(owner, relation, owner.name(), &rel.primary_key));
            }
            (*target, &rel.foreign_key)
        }
    };
    if holder.has_attribute(key) {
        Ok(())
    } else {
        Err(missing_key(owner, relation, holder.name(), key))
    }
}

fn missing_key(owner: &ModelDefinition, relation: &Relation, holder: &str, key: &str) -> Error {
    Error::config(format!(
        "{}.{} needs attribute '{}' on {}",
        owner.name(),
        relation.name(),
        key,
        holder
    ))
}
