//! Attribute filters applied by finders.

use serde::{Deserialize, Serialize};

use modelbase_core::{Error, ModelDefinition, Record, Result, Value, try_coerce};

use crate::finder::FinderRequest;

/// The value side of one attribute filter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum FilterValue {
    /// Matches when the attribute equals the value.
    Eq(Value),
    /// Matches when the attribute equals any member.
    AnyOf(Vec<Value>),
}

impl FilterValue {
    /// An array argument becomes a set filter, anything else an equality.
    pub fn from_argument(value: Value) -> Self {
        match value {
            Value::Array(items) => FilterValue::AnyOf(items),
            other => FilterValue::Eq(other),
        }
    }

    fn values(&self) -> &[Value] {
        match self {
            FilterValue::Eq(v) => std::slice::from_ref(v),
            FilterValue::AnyOf(vs) => vs,
        }
    }
}

/// Ordered attribute filters.
///
/// Also passed to stores as the finder hint, so it carries `finder_aid`
/// attributes that never take part in matching.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Filters {
    entries: Vec<(String, FilterValue)>,
}

impl Filters {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an equality filter.
    #[must_use]
    pub fn equals(mut self, attribute: impl Into<String>, value: impl Into<Value>) -> Self {
        self.push(attribute, FilterValue::Eq(value.into()));
        self
    }

    /// Add a set filter.
    #[must_use]
    pub fn any_of<V: Into<Value>>(
        mut self,
        attribute: impl Into<String>,
        values: impl IntoIterator<Item = V>,
    ) -> Self {
        let values = values.into_iter().map(Into::into).collect();
        self.push(attribute, FilterValue::AnyOf(values));
        self
    }

    /// Add or replace the filter on `attribute`.
    pub fn push(&mut self, attribute: impl Into<String>, value: FilterValue) {
        let attribute = attribute.into();
        match self.entries.iter_mut().find(|(a, _)| *a == attribute) {
            Some((_, existing)) => *existing = value,
            None => self.entries.push((attribute, value)),
        }
    }

    /// Pair a finder's attributes with call arguments.
    ///
    /// Returns `None` when fewer arguments than attributes were supplied;
    /// surplus arguments are ignored.
    pub fn from_request(request: &FinderRequest, args: &[Value]) -> Option<Self> {
        if args.len() < request.attributes.len() {
            return None;
        }
        let mut filters = Self::new();
        for (attribute, arg) in request.attributes.iter().zip(args) {
            filters.push(attribute.clone(), FilterValue::from_argument(arg.clone()));
        }
        Some(filters)
    }

    pub fn get(&self, attribute: &str) -> Option<&FilterValue> {
        self.entries
            .iter()
            .find(|(a, _)| a == attribute)
            .map(|(_, v)| v)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &FilterValue)> {
        self.entries.iter().map(|(a, v)| (a.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Fail with `UnknownAttribute` on the first undeclared attribute.
    pub fn check(&self, definition: &ModelDefinition) -> Result<()> {
        match self
            .entries
            .iter()
            .find(|(a, _)| !definition.has_attribute(a))
        {
            Some((attribute, _)) => Err(Error::unknown_attribute(definition.name(), attribute)),
            None => Ok(()),
        }
    }

    /// Whether `record` satisfies every compared filter.
    ///
    /// Both sides are coerced to the attribute type declared on `definition`
    /// before comparison. `finder_aid` attributes always match.
    pub fn matches(&self, definition: &ModelDefinition, record: &Record) -> bool {
        self.entries.iter().all(|(attribute, filter)| {
            if definition
                .attribute(attribute)
                .is_some_and(|options| options.finder_aid)
            {
                return true;
            }
            let Ok(candidate) = record.read_attribute(attribute) else {
                return false;
            };
            let candidate = coerce_for(definition, attribute, candidate);
            filter
                .values()
                .iter()
                .any(|wanted| coerce_for(definition, attribute, wanted) == candidate)
        })
    }
}

impl<K: Into<String>, V: Into<Value>> FromIterator<(K, V)> for Filters {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut filters = Self::new();
        for (attribute, value) in iter {
            filters.push(attribute, FilterValue::from_argument(value.into()));
        }
        filters
    }
}

/// Coerce a value for comparison on `attribute`.
///
/// Null stays null and untyped attributes compare raw. A value that cannot
/// be converted to the declared type compares as null.
pub fn coerce_for(definition: &ModelDefinition, attribute: &str, value: &Value) -> Value {
    if value.is_null() {
        return Value::Null;
    }
    match definition.attribute(attribute).and_then(|options| options.ty.as_ref()) {
        Some(ty) => try_coerce(ty, value).unwrap_or(Value::Null),
        None => value.clone(),
    }
}
