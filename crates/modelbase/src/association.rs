//! Association wiring between models.
//!
//! `belongs_to` relations are read and written through a scalar foreign key
//! on the owner. `has_many` relations are served by a [`CollectionProxy`]
//! cached on the owner record: the related records whose foreign key holds
//! the owner's primary key.
//!
//! Operations touching several records are sequences of single-record saves.
//! A store error stops the sequence and propagates; records already saved
//! stay saved.

use std::fmt;
use std::sync::{Arc, PoisonError, RwLock, Weak};

use modelbase_core::{
    AssociationTypeMismatchError, BelongsTo, Error, HasMany, ModelDefinition, ReadOnlyRecordError,
    RecordHandle, Result, Value, WeakRecordHandle,
};
use modelbase_query::{
    CandidateSource, FinderKind, Filters, Found, IdLookup, parse, resolve, resolve_by_attributes,
    resolve_by_id,
};

use crate::model::Model;

impl Model {
    fn belongs_to_relation(&self, name: &str) -> Result<&BelongsTo> {
        self.definition()
            .belongs_to(name)
            .ok_or_else(|| Error::unknown_attribute(self.name(), name))
    }

    fn has_many_relation(&self, name: &str) -> Result<&HasMany> {
        self.definition()
            .has_many(name)
            .ok_or_else(|| Error::unknown_attribute(self.name(), name))
    }

    fn has_many_ids_relation(&self, ids_name: &str) -> Result<&HasMany> {
        self.definition()
            .has_many_by_ids_name(ids_name)
            .ok_or_else(|| Error::unknown_attribute(self.name(), ids_name))
    }

    /// The record `record` belongs to through `name`, if any.
    ///
    /// Looks up the first related record whose primary key equals the
    /// foreign key. A null foreign key finds nothing. Records fetched
    /// through a readonly relation are marked readonly.
    #[tracing::instrument(level = "trace", skip(self, record), fields(model = %self.name()))]
    pub fn belongs_to(&self, record: &RecordHandle, name: &str) -> Result<Option<RecordHandle>> {
        let relation = self.belongs_to_relation(name)?;
        let key = record.get(&relation.foreign_key)?;
        if key.is_null() {
            return Ok(None);
        }
        let target = self.related(&relation.class_name)?;
        let found = target.find_by(&Filters::new().equals(relation.primary_key.as_str(), key))?;
        if relation.readonly {
            if let Some(found) = &found {
                found.mark_readonly();
            }
        }
        Ok(found)
    }

    /// Assign the record `record` belongs to through `name`.
    ///
    /// Refused with `ReadOnlyAttribute` when the relation is readonly.
    pub fn set_belongs_to(
        &self,
        record: &RecordHandle,
        name: &str,
        target: Option<&RecordHandle>,
    ) -> Result<Option<RecordHandle>> {
        if self.belongs_to_relation(name)?.readonly {
            return Err(Error::readonly_attribute(self.name(), name));
        }
        self.write_belongs_to(record, name, target)
    }

    /// Assign a belongs-to relation without the readonly check.
    pub fn write_belongs_to(
        &self,
        record: &RecordHandle,
        name: &str,
        target: Option<&RecordHandle>,
    ) -> Result<Option<RecordHandle>> {
        let relation = self.belongs_to_relation(name)?;
        let key = match target {
            None => Value::Null,
            Some(target) => {
                check_association_type(self.definition(), name, &relation.class_name, target)?;
                target.get(&relation.primary_key)?
            }
        };
        tracing::trace!(association = name, key = %key, "Assigning belongs-to");
        record.write().write_attribute(&relation.foreign_key, key)?;
        Ok(target.cloned())
    }

    /// The collection behind `record`'s has-many relation `name`.
    ///
    /// Loaded on first access and cached on the record afterwards.
    pub fn has_many(&self, record: &RecordHandle, name: &str) -> Result<CollectionProxy> {
        self.load_has_many(record, name, false)
    }

    /// Reload the collection, replacing the cached one.
    pub fn reload_has_many(&self, record: &RecordHandle, name: &str) -> Result<CollectionProxy> {
        self.load_has_many(record, name, true)
    }

    #[tracing::instrument(level = "debug", skip(self, record), fields(model = %self.name()))]
    fn load_has_many(
        &self,
        record: &RecordHandle,
        name: &str,
        force: bool,
    ) -> Result<CollectionProxy> {
        let relation = self.has_many_relation(name)?;
        if !force {
            let cached = record.read().cached_association::<CollectionProxy>(name);
            if let Some(cached) = cached {
                return Ok((*cached).clone());
            }
        }

        let related = self.related(&relation.class_name)?;
        let owner_key = record.get(&relation.primary_key)?;
        let members: Vec<RecordHandle> = if owner_key.is_null() {
            Vec::new()
        } else {
            related
                .find_all_by(&Filters::new().equals(relation.foreign_key.as_str(), owner_key))?
                .into_iter()
                .skip(relation.offset)
                .take(relation.limit.unwrap_or(usize::MAX))
                .collect()
        };
        if relation.readonly {
            for member in &members {
                member.mark_readonly();
            }
        }
        tracing::debug!(association = name, members = members.len(), "Loaded has-many");

        let proxy = CollectionProxy {
            owner: record.downgrade(),
            owner_model: self.name().to_string(),
            relation: Arc::new(relation.clone()),
            enforce_types: self.definition().config().enforce_association_types,
            definition: Arc::clone(Model::definition(&related)),
            model: Arc::downgrade(&related),
            members: Arc::new(RwLock::new(members)),
        };
        record.write().cache_association(name, proxy.clone());
        Ok(proxy)
    }

    /// Replace the members of a has-many relation: `clear`, then `append`.
    pub fn set_has_many(
        &self,
        record: &RecordHandle,
        name: &str,
        records: &[RecordHandle],
    ) -> Result<CollectionProxy> {
        let proxy = self.has_many(record, name)?;
        proxy.clear()?;
        proxy.append(records)?;
        Ok(proxy)
    }

    /// Member ids of the has-many relation behind `ids_name` (`post_ids`),
    /// read from the cached collection.
    pub fn has_many_ids(&self, record: &RecordHandle, ids_name: &str) -> Result<Vec<Value>> {
        let relation = self.has_many_ids_relation(ids_name)?;
        Ok(self.has_many(record, &relation.name)?.ids())
    }

    /// Member ids after reloading the collection from the store.
    pub fn reload_has_many_ids(&self, record: &RecordHandle, ids_name: &str) -> Result<Vec<Value>> {
        let relation = self.has_many_ids_relation(ids_name)?;
        Ok(self.reload_has_many(record, &relation.name)?.ids())
    }

    /// Replace a has-many relation with the records having `ids`.
    ///
    /// Every id must exist on the related model, otherwise `NotFound` is
    /// returned before anything changes.
    pub fn set_has_many_ids(
        &self,
        record: &RecordHandle,
        ids_name: &str,
        ids: Vec<Value>,
    ) -> Result<Vec<Value>> {
        let relation = self.has_many_ids_relation(ids_name)?;
        if relation.readonly {
            return Err(Error::readonly_attribute(self.name(), relation.name.as_str()));
        }
        let related = self.related(&relation.class_name)?;
        let records = related.find(IdLookup::Many(ids.clone()))?.into_vec();
        self.set_has_many(record, &relation.name, &records)?;
        Ok(ids)
    }
}

fn check_association_type(
    owner: &ModelDefinition,
    association: &str,
    expected: &str,
    record: &RecordHandle,
) -> Result<()> {
    if !owner.config().enforce_association_types || record.definition().is_a(expected) {
        return Ok(());
    }
    Err(Error::AssociationTypeMismatch(AssociationTypeMismatchError {
        association: association.to_string(),
        expected: expected.to_string(),
        actual: record.model_name(),
    }))
}

/// Refuse a change touching readonly records before any of them is modified.
fn ensure_saveable(records: &[RecordHandle]) -> Result<()> {
    match records.iter().find(|r| r.is_readonly()) {
        Some(record) => Err(Error::ReadOnlyRecord(ReadOnlyRecordError {
            model: record.model_name(),
            id: record.id(),
        })),
        None => Ok(()),
    }
}

/// The related records of one owner's has-many relation.
///
/// Cloning yields another handle to the same collection. The owner and the
/// related model are held weakly; operations that need them fail once they
/// are dropped. Collections of a readonly relation refuse every change.
#[derive(Clone)]
pub struct CollectionProxy {
    owner: WeakRecordHandle,
    owner_model: String,
    relation: Arc<HasMany>,
    enforce_types: bool,
    definition: Arc<ModelDefinition>,
    model: Weak<Model>,
    members: Arc<RwLock<Vec<RecordHandle>>>,
}

impl CollectionProxy {
    pub fn relation(&self) -> &HasMany {
        &self.relation
    }

    /// The related model.
    pub fn model(&self) -> Result<Arc<Model>> {
        self.model.upgrade().ok_or_else(|| {
            Error::config(format!("model {} no longer exists", self.definition.name()))
        })
    }

    pub fn owner(&self) -> Result<RecordHandle> {
        self.owner.upgrade().ok_or_else(|| {
            Error::Custom(format!(
                "owner of association '{}' no longer exists",
                self.relation.name
            ))
        })
    }

    fn owner_key(&self) -> Result<Value> {
        self.owner()?.get(&self.relation.primary_key)
    }

    fn ensure_writable(&self) -> Result<()> {
        if self.relation.readonly {
            return Err(Error::readonly_attribute(
                self.owner_model.as_str(),
                self.relation.name.as_str(),
            ));
        }
        Ok(())
    }

    /// Attach `records` to the owner and save each of them.
    ///
    /// Records of another model are skipped (or rejected with
    /// `AssociationTypeMismatch` when the owner enforces association types).
    /// With the relation's `validate` option every accepted record must pass
    /// host validation before anything is attached. Readonly relations and
    /// readonly records are refused before anything changes.
    #[tracing::instrument(level = "debug", skip_all, fields(association = %self.relation.name))]
    pub fn append(&self, records: &[RecordHandle]) -> Result<()> {
        self.ensure_writable()?;
        let model = self.model()?;
        let mut accepted = Vec::with_capacity(records.len());
        for record in records {
            if record.definition().is_a(&self.relation.class_name) {
                accepted.push(record.clone());
            } else if self.enforce_types {
                return Err(Error::AssociationTypeMismatch(AssociationTypeMismatchError {
                    association: self.relation.name.clone(),
                    expected: self.relation.class_name.clone(),
                    actual: record.model_name(),
                }));
            } else {
                tracing::trace!(model = %record.model_name(), "Skipping record of another model");
            }
        }

        if self.relation.validate {
            for record in &accepted {
                model.validate(record).map_err(Error::Validation)?;
            }
        }

        ensure_saveable(&accepted)?;
        let key = self.owner_key()?;
        for record in &accepted {
            record
                .write()
                .write_attribute(&self.relation.foreign_key, key.clone())?;
            {
                let mut members = self.write_members();
                if !members.iter().any(|m| m.ptr_eq(record)) {
                    members.push(record.clone());
                }
            }
            if !model.save(record)? {
                tracing::warn!(id = %record.id(), "Appended record was not saved");
            }
        }
        Ok(())
    }

    /// Detach every member and save each of them.
    pub fn clear(&self) -> Result<()> {
        self.ensure_writable()?;
        let members = self.to_vec();
        self.detach(&members)
    }

    /// Detach the given members and save each of them. Records that are not
    /// members are ignored.
    pub fn delete(&self, records: &[RecordHandle]) -> Result<()> {
        self.ensure_writable()?;
        let members: Vec<RecordHandle> = self
            .to_vec()
            .into_iter()
            .filter(|m| records.iter().any(|r| m == r))
            .collect();
        self.detach(&members)
    }

    #[tracing::instrument(
        level = "debug",
        skip_all,
        fields(association = %self.relation.name, count = records.len())
    )]
    fn detach(&self, records: &[RecordHandle]) -> Result<()> {
        let model = self.model()?;
        ensure_saveable(records)?;
        for record in records {
            record
                .write()
                .write_attribute(&self.relation.foreign_key, Value::Null)?;
            self.write_members().retain(|m| !m.ptr_eq(record));
            if !model.save(record)? {
                tracing::warn!(id = %record.id(), "Detached record was not saved");
            }
        }
        Ok(())
    }

    /// Construct a related record attached to the owner, without saving it.
    pub fn build<K, V>(&self, attributes: impl IntoIterator<Item = (K, V)>) -> Result<RecordHandle>
    where
        K: AsRef<str>,
        V: Into<Value>,
    {
        self.ensure_writable()?;
        let key = self.owner_key()?;
        let record = self.model()?.new_record(attributes)?;
        record
            .write()
            .write_attribute(&self.relation.foreign_key, key)?;
        self.write_members().push(record.clone());
        Ok(record)
    }

    /// Create a related record and append it.
    pub fn create<K, V>(&self, attributes: impl IntoIterator<Item = (K, V)>) -> Result<RecordHandle>
    where
        K: AsRef<str>,
        V: Into<Value>,
    {
        self.ensure_writable()?;
        let record = self.model()?.create(attributes)?;
        self.append(std::slice::from_ref(&record))?;
        Ok(record)
    }

    pub fn len(&self) -> usize {
        self.read_members().len()
    }

    pub fn is_empty(&self) -> bool {
        self.read_members().is_empty()
    }

    pub fn get(&self, index: usize) -> Option<RecordHandle> {
        self.read_members().get(index).cloned()
    }

    pub fn first(&self) -> Option<RecordHandle> {
        self.read_members().first().cloned()
    }

    pub fn last(&self) -> Option<RecordHandle> {
        self.read_members().last().cloned()
    }

    pub fn to_vec(&self) -> Vec<RecordHandle> {
        self.read_members().clone()
    }

    /// Whether `record` is a member, by instance or by equal attributes.
    pub fn contains(&self, record: &RecordHandle) -> bool {
        self.read_members().iter().any(|m| m == record)
    }

    /// Member ids in collection order.
    pub fn ids(&self) -> Vec<Value> {
        self.to_vec().iter().map(RecordHandle::id).collect()
    }

    /// Identity lookup among the members.
    pub fn find(&self, lookup: impl Into<IdLookup>) -> Result<Found> {
        resolve_by_id(self, &lookup.into())
    }

    pub fn find_by(&self, filters: &Filters) -> Result<Option<RecordHandle>> {
        filters.check(&self.definition)?;
        Ok(resolve_by_attributes(self, FinderKind::First, filters).into_one())
    }

    pub fn find_last_by(&self, filters: &Filters) -> Result<Option<RecordHandle>> {
        filters.check(&self.definition)?;
        Ok(resolve_by_attributes(self, FinderKind::Last, filters).into_one())
    }

    pub fn find_all_by(&self, filters: &Filters) -> Result<Vec<RecordHandle>> {
        filters.check(&self.definition)?;
        Ok(resolve_by_attributes(self, FinderKind::All, filters).into_vec())
    }

    /// Run a finder by name over the members.
    pub fn dispatch(&self, token: &str, args: &[Value]) -> Result<Option<Found>> {
        match parse(token, &self.definition) {
            Some(request) => resolve(self, &request, args).map(Some),
            None => Ok(None),
        }
    }

    fn read_members(&self) -> std::sync::RwLockReadGuard<'_, Vec<RecordHandle>> {
        self.members.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write_members(&self) -> std::sync::RwLockWriteGuard<'_, Vec<RecordHandle>> {
        self.members.write().unwrap_or_else(PoisonError::into_inner)
    }
}

impl CandidateSource for CollectionProxy {
    fn definition(&self) -> &ModelDefinition {
        &self.definition
    }

    fn candidates(&self, _hint: &Filters, _kind: FinderKind) -> Vec<RecordHandle> {
        self.to_vec()
    }
}

impl fmt::Debug for CollectionProxy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CollectionProxy")
            .field("association", &self.relation.name)
            .field("model", &self.definition.name())
            .field("ids", &self.ids())
            .finish_non_exhaustive()
    }
}
