//! Finder resolution over host-supplied candidates.

use std::sync::Arc;

use modelbase_core::{Error, ID, ModelDefinition, NotFoundError, RecordHandle, Result, Value};

use crate::filter::{Filters, coerce_for};
use crate::finder::{FinderKind, FinderRequest};

/// Something that can hand out the records a finder scans.
///
/// Model stores implement this through the facade crate; collection proxies
/// implement it over their cached members.
pub trait CandidateSource {
    /// Definition used to coerce and compare attribute values.
    fn definition(&self) -> &ModelDefinition;

    /// Records to scan, in their natural order.
    ///
    /// `hint` carries the finder's filters and `kind` what the caller wants;
    /// a source may use them to narrow the set but never has to.
    fn candidates(&self, hint: &Filters, kind: FinderKind) -> Vec<RecordHandle>;
}

impl<T: CandidateSource + ?Sized> CandidateSource for Arc<T> {
    fn definition(&self) -> &ModelDefinition {
        (**self).definition()
    }

    fn candidates(&self, hint: &Filters, kind: FinderKind) -> Vec<RecordHandle> {
        (**self).candidates(hint, kind)
    }
}

/// Ids requested from `find`.
#[derive(Debug, Clone, PartialEq)]
pub enum IdLookup {
    /// A single id; resolves to a single record.
    One(Value),
    /// A list of ids; resolves to records in the requested order.
    Many(Vec<Value>),
}

impl IdLookup {
    /// Interpret finder arguments: one scalar is a single lookup, anything
    /// else is flattened into a list lookup.
    pub fn from_args(args: &[Value]) -> Self {
        match args {
            [single] if !matches!(single, Value::Array(_)) => IdLookup::One(single.clone()),
            _ => IdLookup::Many(
                args.iter()
                    .flat_map(|arg| match arg {
                        Value::Array(items) => items.clone(),
                        other => vec![other.clone()],
                    })
                    .collect(),
            ),
        }
    }

    pub fn ids(&self) -> &[Value] {
        match self {
            IdLookup::One(id) => std::slice::from_ref(id),
            IdLookup::Many(ids) => ids,
        }
    }
}

impl From<Value> for IdLookup {
    fn from(id: Value) -> Self {
        IdLookup::One(id)
    }
}

impl From<Vec<Value>> for IdLookup {
    fn from(ids: Vec<Value>) -> Self {
        IdLookup::Many(ids)
    }
}

/// The result of a finder: one optional record or a list.
#[derive(Debug, Clone, PartialEq)]
pub enum Found {
    One(Option<RecordHandle>),
    Many(Vec<RecordHandle>),
}

impl Found {
    /// The single record, or the first of a list.
    pub fn into_one(self) -> Option<RecordHandle> {
        match self {
            Found::One(record) => record,
            Found::Many(records) => records.into_iter().next(),
        }
    }

    pub fn into_vec(self) -> Vec<RecordHandle> {
        match self {
            Found::One(record) => record.into_iter().collect(),
            Found::Many(records) => records,
        }
    }

    pub fn len(&self) -> usize {
        match self {
            Found::One(record) => usize::from(record.is_some()),
            Found::Many(records) => records.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Resolve an attribute finder.
///
/// `First` (and `Id`) returns the first match scanning forward, `Last` the
/// first match scanning backward, `All` every match in candidate order.
#[tracing::instrument(
    level = "debug",
    skip_all,
    fields(model = source.definition().name(), kind = %kind)
)]
pub fn resolve_by_attributes<S: CandidateSource + ?Sized>(
    source: &S,
    kind: FinderKind,
    filters: &Filters,
) -> Found {
    let candidates = source.candidates(filters, kind);
    let definition = source.definition();
    let scanned = candidates.len();
    let matches = |record: &RecordHandle| filters.matches(definition, &record.read());

    let found = match kind {
        FinderKind::Id | FinderKind::First => {
            Found::One(candidates.into_iter().find(|r| matches(r)))
        }
        FinderKind::Last => Found::One(candidates.into_iter().rev().find(|r| matches(r))),
        FinderKind::All => Found::Many(candidates.into_iter().filter(|r| matches(r)).collect()),
    };

    tracing::debug!(
        filters = filters.len(),
        scanned,
        matched = found.len(),
        "Finder resolved"
    );
    found
}

/// Resolve an identity lookup.
///
/// Ids are compared after coercion to the declared type of `id`. Every
/// requested id must resolve, otherwise `NotFound` reports how many did.
#[tracing::instrument(level = "debug", skip_all, fields(model = source.definition().name()))]
pub fn resolve_by_id<S: CandidateSource + ?Sized>(source: &S, lookup: &IdLookup) -> Result<Found> {
    let definition = source.definition();
    let ids = lookup.ids();

    let hint = match lookup {
        IdLookup::One(id) => Filters::new().equals(ID, id.clone()),
        IdLookup::Many(ids) => Filters::new().any_of(ID, ids.iter().cloned()),
    };
    let keyed: Vec<(Value, RecordHandle)> = source
        .candidates(&hint, FinderKind::Id)
        .into_iter()
        .map(|record| (coerce_for(definition, ID, &record.id()), record))
        .collect();

    let found: Vec<RecordHandle> = ids
        .iter()
        .filter_map(|id| {
            let wanted = coerce_for(definition, ID, id);
            keyed
                .iter()
                .find(|(key, _)| *key == wanted)
                .map(|(_, record)| record.clone())
        })
        .collect();

    if ids.is_empty() || found.len() < ids.len() {
        tracing::debug!(requested = ids.len(), found = found.len(), "Identity lookup missed");
        return Err(Error::NotFound(NotFoundError {
            model: definition.name().to_string(),
            requested: ids.to_vec(),
            found: found.len(),
        }));
    }

    tracing::trace!(requested = ids.len(), "Identity lookup resolved");
    Ok(match lookup {
        IdLookup::One(_) => Found::One(found.into_iter().next()),
        IdLookup::Many(_) => Found::Many(found),
    })
}

/// Resolve a parsed finder against call arguments.
///
/// Attribute finders called with fewer arguments than attributes find
/// nothing: an empty list for `All`, no record otherwise.
pub fn resolve<S: CandidateSource + ?Sized>(
    source: &S,
    request: &FinderRequest,
    args: &[Value],
) -> Result<Found> {
    if request.kind == FinderKind::Id {
        return resolve_by_id(source, &IdLookup::from_args(args));
    }
    match Filters::from_request(request, args) {
        Some(filters) => Ok(resolve_by_attributes(source, request.kind, &filters)),
        None if request.kind == FinderKind::All => Ok(Found::Many(Vec::new())),
        None => Ok(Found::One(None)),
    }
}
