//! Models: a definition bound to its store.
//!
//! A [`Model`] is the class-level face of a record type. It constructs and
//! saves records, answers finders by asking its [`Store`] for candidates, and
//! (see [`crate::association`]) wires related records together.

use std::fmt;
use std::sync::{Arc, Weak};

use rand::Rng;

use modelbase_core::{
    Error, ID, ModelDefinition, ReadOnlyRecordError, Record, RecordHandle, Result,
    ValidationError, Value,
};
use modelbase_query::{
    CandidateSource, FinderKind, Filters, Found, IdLookup, parse, resolve, resolve_by_attributes,
    resolve_by_id,
};

use crate::registry::Registry;
use crate::store::Store;

/// A model definition bound to its host store and registry.
pub struct Model {
    definition: Arc<ModelDefinition>,
    store: Arc<dyn Store>,
    registry: Weak<Registry>,
}

impl Model {
    pub(crate) fn new(
        definition: Arc<ModelDefinition>,
        store: Arc<dyn Store>,
        registry: Weak<Registry>,
    ) -> Self {
        Self {
            definition,
            store,
            registry,
        }
    }

    pub fn name(&self) -> &str {
        self.definition.name()
    }

    pub fn definition(&self) -> &Arc<ModelDefinition> {
        &self.definition
    }

    pub fn store(&self) -> &Arc<dyn Store> {
        &self.store
    }

    /// The registry this model was built into.
    pub fn registry(&self) -> Result<Arc<Registry>> {
        self.registry
            .upgrade()
            .ok_or_else(|| Error::config(format!("registry of model {} was dropped", self.name())))
    }

    /// Look up another model of the same registry by name.
    pub fn related(&self, class_name: &str) -> Result<Arc<Model>> {
        self.registry()?.model(class_name)
    }

    // ------------------------------------------------------------------
    // Lifecycle
    // ------------------------------------------------------------------

    /// Construct a new record from `attributes`.
    ///
    /// Values are written through the internal path, so readonly attributes
    /// can be initialised and identity attributes recompute `id`.
    pub fn new_record<K, V>(
        &self,
        attributes: impl IntoIterator<Item = (K, V)>,
    ) -> Result<RecordHandle>
    where
        K: AsRef<str>,
        V: Into<Value>,
    {
        let record = Record::with_attributes(Arc::clone(&self.definition), attributes)?;
        tracing::trace!(model = self.name(), id = %record.id(), "New record");
        Ok(RecordHandle::new(record))
    }

    /// Construct a record and save it.
    ///
    /// The record is returned whether or not the save was accepted; check
    /// `is_new` to tell. Errors raised by the store propagate.
    pub fn create<K, V>(&self, attributes: impl IntoIterator<Item = (K, V)>) -> Result<RecordHandle>
    where
        K: AsRef<str>,
        V: Into<Value>,
    {
        let record = self.new_record(attributes)?;
        self.save(&record)?;
        Ok(record)
    }

    /// Run host validation and keep the reported errors on the record.
    pub fn validate(&self, record: &RecordHandle) -> std::result::Result<(), ValidationError> {
        let outcome = self.store.validate(self, record);
        let errors = match &outcome {
            Ok(()) => ValidationError::new(),
            Err(errors) => errors.clone(),
        };
        record.write().set_errors(errors);
        outcome
    }

    pub fn is_valid(&self, record: &RecordHandle) -> bool {
        self.validate(record).is_ok()
    }

    /// Save a record through the store.
    ///
    /// Records built by an unrelated model fail with a `Config` error and
    /// readonly records with `ReadOnlyRecord`. Failed validation returns
    /// `Ok(false)`. Otherwise attributes are coerced, the identity is written
    /// and the store asked to persist. When the store rejects (`Ok(false)`)
    /// or fails, the previous `id` is restored; coerced attribute values stay.
    #[tracing::instrument(level = "debug", skip(self, record), fields(model = %self.name()))]
    pub fn save(&self, record: &RecordHandle) -> Result<bool> {
        if !record.definition().is_a(self.name()) {
            return Err(Error::config(format!(
                "cannot save a {} record through model {}",
                record.model_name(),
                self.name()
            )));
        }
        if record.is_readonly() {
            return Err(Error::ReadOnlyRecord(ReadOnlyRecordError {
                model: record.model_name(),
                id: record.id(),
            }));
        }

        if let Err(errors) = self.validate(record) {
            tracing::debug!(errors = errors.errors.len(), "Validation failed, record not saved");
            return Ok(false);
        }

        let previous_id = {
            let mut guard = record.write();
            guard.coerce_attributes();
            let previous = guard.id();
            let identity = guard.calculated_identity();
            guard.write_attribute(ID, identity)?;
            previous
        };

        match self.store.persist(self, record) {
            Ok(true) => {
                record.write().mark_persisted();
                tracing::debug!(id = %record.id(), "Record saved");
                Ok(true)
            }
            Ok(false) => {
                record.write().write_attribute(ID, previous_id)?;
                tracing::debug!("Store rejected record");
                Ok(false)
            }
            Err(e) => {
                record.write().write_attribute(ID, previous_id)?;
                tracing::debug!(error = %e, "Store failed to persist record");
                Err(e)
            }
        }
    }

    // ------------------------------------------------------------------
    // Class-level reads
    // ------------------------------------------------------------------

    pub fn all(&self) -> Vec<RecordHandle> {
        self.store.all(self)
    }

    pub fn count(&self) -> usize {
        self.store.count(self)
    }

    pub fn first(&self) -> Option<RecordHandle> {
        self.all().into_iter().next()
    }

    pub fn last(&self) -> Option<RecordHandle> {
        self.all().pop()
    }

    /// A uniformly chosen record.
    pub fn random(&self) -> Option<RecordHandle> {
        let mut records = self.all();
        if records.is_empty() {
            return None;
        }
        let index = rand::thread_rng().gen_range(0..records.len());
        Some(records.swap_remove(index))
    }

    // ------------------------------------------------------------------
    // Finders
    // ------------------------------------------------------------------

    /// Identity lookup: one id yields `Found::One`, a list `Found::Many` in
    /// requested order. Any miss is `NotFound`.
    pub fn find(&self, lookup: impl Into<IdLookup>) -> Result<Found> {
        resolve_by_id(self, &lookup.into())
    }

    /// First record matching every filter.
    pub fn find_by(&self, filters: &Filters) -> Result<Option<RecordHandle>> {
        filters.check(&self.definition)?;
        Ok(resolve_by_attributes(self, FinderKind::First, filters).into_one())
    }

    /// Last record matching every filter.
    pub fn find_last_by(&self, filters: &Filters) -> Result<Option<RecordHandle>> {
        filters.check(&self.definition)?;
        Ok(resolve_by_attributes(self, FinderKind::Last, filters).into_one())
    }

    /// Every record matching every filter, in store order.
    pub fn find_all_by(&self, filters: &Filters) -> Result<Vec<RecordHandle>> {
        filters.check(&self.definition)?;
        Ok(resolve_by_attributes(self, FinderKind::All, filters).into_vec())
    }

    /// Run a finder by name, as in `find_all_by_name_and_value`.
    ///
    /// Returns `Ok(None)` when `token` is not a finder of this model.
    pub fn dispatch(&self, token: &str, args: &[Value]) -> Result<Option<Found>> {
        match parse(token, &self.definition) {
            Some(request) => resolve(self, &request, args).map(Some),
            None => Ok(None),
        }
    }

    /// Whether `token` names a finder of this model.
    pub fn responds_to(&self, token: &str) -> bool {
        parse(token, &self.definition).is_some()
    }
}

impl CandidateSource for Model {
    fn definition(&self) -> &ModelDefinition {
        &self.definition
    }

    fn candidates(&self, hint: &Filters, kind: FinderKind) -> Vec<RecordHandle> {
        self.store.all_for(self, hint, kind)
    }
}

impl fmt::Debug for Model {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Model")
            .field("name", &self.name())
            .field("attributes", &self.definition.attribute_names())
            .finish_non_exhaustive()
    }
}
