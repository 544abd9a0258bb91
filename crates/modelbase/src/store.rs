//! The host contract for record storage.
//!
//! modelbase never owns storage. Every model is bound to a [`Store`] that
//! produces candidate records for finders, persists saves and validates
//! records. Candidate production is layered: a store overrides whichever of
//! [`Store::all`], [`Store::all_hinted`] or [`Store::all_for`] it can answer
//! best, and finders always enter through `all_for`.

use std::sync::{PoisonError, RwLock};

use modelbase_core::{Record, RecordHandle, Result, ValidationError};
use modelbase_query::{FinderKind, Filters};

use crate::model::Model;

/// Storage operations supplied by the host for one model.
pub trait Store: Send + Sync {
    /// Every record of the model. Default: none.
    fn all(&self, model: &Model) -> Vec<RecordHandle> {
        let _ = model;
        Vec::new()
    }

    /// Records for a finder with the given filters. Default: [`Store::all`].
    fn all_hinted(&self, model: &Model, hint: &Filters) -> Vec<RecordHandle> {
        let _ = hint;
        self.all(model)
    }

    /// Records for a finder of the given kind. Default: [`Store::all_hinted`].
    fn all_for(&self, model: &Model, hint: &Filters, kind: FinderKind) -> Vec<RecordHandle> {
        let _ = kind;
        self.all_hinted(model, hint)
    }

    /// Number of records. Default: length of [`Store::all`].
    fn count(&self, model: &Model) -> usize {
        self.all(model).len()
    }

    /// Persist a record after its identity was computed.
    ///
    /// `Ok(true)` marks the record persisted, `Ok(false)` rejects the save
    /// and an error propagates out of `save`. Default: `Ok(false)`.
    fn persist(&self, model: &Model, record: &RecordHandle) -> Result<bool> {
        let _ = (model, record);
        Ok(false)
    }

    /// Validate a record before saving. Default: valid.
    fn validate(
        &self,
        model: &Model,
        record: &RecordHandle,
    ) -> std::result::Result<(), ValidationError> {
        let _ = (model, record);
        Ok(())
    }
}

/// A record validator for [`MemoryStore`].
pub type Validator = Box<dyn Fn(&Record) -> std::result::Result<(), ValidationError> + Send + Sync>;

/// A store that keeps saved records in memory, in insertion order.
///
/// Saving a record that is already stored keeps its position.
#[derive(Default)]
pub struct MemoryStore {
    records: RwLock<Vec<RecordHandle>>,
    validator: Option<Validator>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Validate records with `validator` before every save.
    #[must_use]
    pub fn with_validator(
        mut self,
        validator: impl Fn(&Record) -> std::result::Result<(), ValidationError>
        + Send
        + Sync
        + 'static,
    ) -> Self {
        self.validator = Some(Box::new(validator));
        self
    }

    /// Add a record without going through `save`.
    pub fn insert(&self, record: RecordHandle) {
        let mut records = self.records.write().unwrap_or_else(PoisonError::into_inner);
        if !records.iter().any(|r| r.ptr_eq(&record)) {
            records.push(record);
        }
    }

    /// Drop a stored record. Returns whether it was present.
    pub fn remove(&self, record: &RecordHandle) -> bool {
        let mut records = self.records.write().unwrap_or_else(PoisonError::into_inner);
        let before = records.len();
        records.retain(|r| !r.ptr_eq(record));
        records.len() != before
    }

    pub fn records(&self) -> Vec<RecordHandle> {
        self.records
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn len(&self) -> usize {
        self.records.read().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl std::fmt::Debug for MemoryStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemoryStore")
            .field("records", &self.len())
            .field("validator", &self.validator.is_some())
            .finish()
    }
}

impl Store for MemoryStore {
    fn all(&self, _model: &Model) -> Vec<RecordHandle> {
        self.records()
    }

    fn count(&self, _model: &Model) -> usize {
        self.len()
    }

    fn persist(&self, model: &Model, record: &RecordHandle) -> Result<bool> {
        tracing::trace!(model = model.name(), id = %record.id(), "Storing record in memory");
        self.insert(record.clone());
        Ok(true)
    }

    fn validate(
        &self,
        _model: &Model,
        record: &RecordHandle,
    ) -> std::result::Result<(), ValidationError> {
        match &self.validator {
            Some(validator) => validator(&record.read()),
            None => Ok(()),
        }
    }
}
