//! Records: attribute values of one model instance plus lifecycle flags.
//!
//! A [`Record`] stores the raw values written to it, whether it has been
//! persisted yet, and whether it was marked readonly. Records are shared
//! between host stores, association proxies and callers through
//! [`RecordHandle`], so a change made through one handle is visible through
//! every other.

use std::any::Any;
use std::cmp::Ordering;
use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard, Weak};

use uuid::Uuid;

use crate::attribute::coerce_attribute;
use crate::error::{Error, Result, ValidationError};
use crate::model::{ID, ModelDefinition};
use crate::value::Value;

static NULL: Value = Value::Null;

/// One model instance.
pub struct Record {
    definition: Arc<ModelDefinition>,
    values: HashMap<String, Value>,
    new_record: bool,
    readonly: bool,
    errors: ValidationError,
    association_cache: HashMap<String, Arc<dyn Any + Send + Sync>>,
}

impl Record {
    /// Create an empty, new record.
    pub fn new(definition: Arc<ModelDefinition>) -> Self {
        Self {
            definition,
            values: HashMap::new(),
            new_record: true,
            readonly: false,
            errors: ValidationError::new(),
            association_cache: HashMap::new(),
        }
    }

    /// Create a new record and apply `attributes` in order.
    ///
    /// Initial values go through the internal writer: readonly attributes
    /// may be initialised here, undeclared names fail with `UnknownAttribute`.
    pub fn with_attributes<K, V>(
        definition: Arc<ModelDefinition>,
        attributes: impl IntoIterator<Item = (K, V)>,
    ) -> Result<Self>
    where
        K: AsRef<str>,
        V: Into<Value>,
    {
        let mut record = Self::new(definition);
        for (name, value) in attributes {
            record.write_attribute(name.as_ref(), value.into())?;
        }
        Ok(record)
    }

    pub fn definition(&self) -> &Arc<ModelDefinition> {
        &self.definition
    }

    pub fn model_name(&self) -> &str {
        self.definition.name()
    }

    /// Read an attribute; unset attributes read as null.
    pub fn read_attribute(&self, name: &str) -> Result<&Value> {
        if !self.definition.has_attribute(name) {
            return Err(Error::unknown_attribute(self.model_name(), name));
        }
        Ok(self.values.get(name).unwrap_or(&NULL))
    }

    /// Read an attribute by value.
    pub fn get(&self, name: &str) -> Result<Value> {
        self.read_attribute(name).cloned()
    }

    pub fn id(&self) -> Value {
        self.values.get(ID).cloned().unwrap_or(Value::Null)
    }

    /// External write: refuses readonly attributes.
    pub fn set(&mut self, name: &str, value: impl Into<Value>) -> Result<()> {
        match self.definition.attribute(name) {
            None => Err(Error::unknown_attribute(self.model_name(), name)),
            Some(options) if options.readonly => {
                Err(Error::readonly_attribute(self.model_name(), name))
            }
            Some(_) => self.write_attribute(name, value.into()),
        }
    }

    /// Internal write used by construction and association maintenance.
    ///
    /// Bypasses the readonly check. Writing an identity attribute recomputes
    /// `id` before returning.
    pub fn write_attribute(&mut self, name: &str, value: Value) -> Result<()> {
        if !self.definition.has_attribute(name) {
            return Err(Error::unknown_attribute(self.model_name(), name));
        }
        self.values.insert(name.to_string(), value);
        if self.definition.is_identity_attribute(name) {
            let identity = self.calculated_identity();
            self.values.insert(ID.to_string(), identity);
        }
        Ok(())
    }

    /// The identity this record would have if saved now.
    ///
    /// With identity attributes: their string forms ordered by attribute
    /// name, joined with `_`. Otherwise the current `id`, or a fresh opaque
    /// token when there is none.
    pub fn calculated_identity(&self) -> Value {
        let identity_attributes = self.definition.identity_attributes();
        if identity_attributes.is_empty() {
            let current = self.id();
            if current.is_null() {
                Value::Text(Uuid::new_v4().simple().to_string())
            } else {
                current
            }
        } else {
            let parts: Vec<String> = identity_attributes
                .iter()
                .map(|name| self.values.get(*name).unwrap_or(&NULL).to_string())
                .collect();
            Value::Text(parts.join("_"))
        }
    }

    /// Coerce every declared attribute to its declared type.
    pub fn coerce_attributes(&mut self) {
        let definition = Arc::clone(&self.definition);
        for (name, options) in definition.attributes() {
            let current = self.values.get(name).unwrap_or(&NULL);
            let coerced = coerce_attribute(name, options, current);
            if coerced.is_null() && !self.values.contains_key(name) {
                continue;
            }
            self.values.insert(name.to_string(), coerced);
        }
    }

    /// Values of the requested attributes (all declared attributes when empty).
    pub fn attributes(&self, keys: &[&str]) -> Vec<(String, Value)> {
        let names = if keys.is_empty() {
            self.definition.attribute_names()
        } else {
            keys.to_vec()
        };
        names
            .into_iter()
            .map(|name| {
                let value = self.values.get(name).cloned().unwrap_or(Value::Null);
                (name.to_string(), value)
            })
            .collect()
    }

    /// Serialize the declared attributes as a JSON object.
    pub fn to_json(&self) -> serde_json::Value {
        let map: serde_json::Map<String, serde_json::Value> = self
            .attributes(&[])
            .into_iter()
            .map(|(name, value)| (name, value.to_json()))
            .collect();
        serde_json::Value::Object(map)
    }

    pub fn is_new(&self) -> bool {
        self.new_record
    }

    pub fn is_persisted(&self) -> bool {
        !self.new_record
    }

    /// Record a successful persistence. There is no way back to `new`.
    pub fn mark_persisted(&mut self) {
        self.new_record = false;
    }

    pub fn is_readonly(&self) -> bool {
        self.readonly
    }

    /// Make the record readonly for the rest of its life.
    pub fn mark_readonly(&mut self) {
        self.readonly = true;
    }

    /// Errors reported by the last validation.
    pub fn errors(&self) -> &ValidationError {
        &self.errors
    }

    pub fn set_errors(&mut self, errors: ValidationError) {
        self.errors = errors;
    }

    /// A cached association value of type `T`, if one is stored under `name`.
    pub fn cached_association<T: Any + Send + Sync>(&self, name: &str) -> Option<Arc<T>> {
        let slot = self.association_cache.get(name)?;
        Arc::clone(slot).downcast::<T>().ok()
    }

    pub fn cache_association<T: Any + Send + Sync>(&mut self, name: &str, value: T) -> Arc<T> {
        let value = Arc::new(value);
        self.association_cache
            .insert(name.to_string(), Arc::clone(&value) as Arc<dyn Any + Send + Sync>);
        value
    }

    pub fn clear_association_cache(&mut self) {
        self.association_cache.clear();
    }
}

impl fmt::Debug for Record {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Record")
            .field("model", &self.model_name())
            .field("attributes", &self.attributes(&[]))
            .field("new_record", &self.new_record)
            .field("readonly", &self.readonly)
            .finish_non_exhaustive()
    }
}

/// Records are equal when they belong to the same model and every declared
/// attribute, `id` included, holds the same value.
impl PartialEq for Record {
    fn eq(&self, other: &Self) -> bool {
        self.model_name() == other.model_name()
            && self.definition.attribute_names().into_iter().all(|name| {
                self.values.get(name).unwrap_or(&NULL) == other.values.get(name).unwrap_or(&NULL)
            })
    }
}

/// Orders by `id`, then by the remaining attributes in name order. Pairs of
/// values without a meaningful order count as equal.
impl PartialOrd for Record {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        if self.model_name() != other.model_name() {
            return None;
        }
        let mut names: Vec<&str> = self
            .definition
            .attribute_names()
            .into_iter()
            .filter(|n| *n != ID)
            .collect();
        names.sort_unstable();

        let ordering = std::iter::once(ID)
            .chain(names)
            .map(|name| {
                let a = self.values.get(name).unwrap_or(&NULL);
                let b = other.values.get(name).unwrap_or(&NULL);
                a.compare(b).unwrap_or(Ordering::Equal)
            })
            .find(|ord| *ord != Ordering::Equal)
            .unwrap_or(Ordering::Equal);
        Some(ordering)
    }
}

/// Shared, mutable access to one record.
///
/// Cloning a handle yields another reference to the same record. Poisoned
/// locks are recovered; a record is always left consistent between writes.
#[derive(Clone)]
pub struct RecordHandle(Arc<RwLock<Record>>);

impl RecordHandle {
    pub fn new(record: Record) -> Self {
        Self(Arc::new(RwLock::new(record)))
    }

    pub fn read(&self) -> RwLockReadGuard<'_, Record> {
        self.0.read().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn write(&self) -> RwLockWriteGuard<'_, Record> {
        self.0.write().unwrap_or_else(PoisonError::into_inner)
    }

    /// True when both handles refer to the same record instance.
    pub fn ptr_eq(&self, other: &RecordHandle) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }

    pub fn downgrade(&self) -> WeakRecordHandle {
        WeakRecordHandle(Arc::downgrade(&self.0))
    }

    pub fn get(&self, name: &str) -> Result<Value> {
        self.read().get(name)
    }

    pub fn set(&self, name: &str, value: impl Into<Value>) -> Result<()> {
        self.write().set(name, value)
    }

    pub fn id(&self) -> Value {
        self.read().id()
    }

    pub fn model_name(&self) -> String {
        self.read().model_name().to_string()
    }

    pub fn definition(&self) -> Arc<ModelDefinition> {
        Arc::clone(self.read().definition())
    }

    pub fn is_new(&self) -> bool {
        self.read().is_new()
    }

    pub fn is_readonly(&self) -> bool {
        self.read().is_readonly()
    }

    pub fn mark_readonly(&self) {
        self.write().mark_readonly();
    }

    pub fn errors(&self) -> ValidationError {
        self.read().errors().clone()
    }
}

impl PartialEq for RecordHandle {
    fn eq(&self, other: &Self) -> bool {
        self.ptr_eq(other) || *self.read() == *other.read()
    }
}

impl PartialOrd for RecordHandle {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        if self.ptr_eq(other) {
            return Some(Ordering::Equal);
        }
        self.read().partial_cmp(&*other.read())
    }
}

impl fmt::Debug for RecordHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.read().fmt(f)
    }
}

/// Non-owning reference to a record.
#[derive(Clone, Debug)]
pub struct WeakRecordHandle(Weak<RwLock<Record>>);

impl WeakRecordHandle {
    pub fn upgrade(&self) -> Option<RecordHandle> {
        self.0.upgrade().map(RecordHandle)
    }
}
