//! Dynamic attribute values.

use std::cmp::Ordering;
use std::fmt;
use std::sync::Arc;

use chrono::{DateTime, FixedOffset, NaiveDate};
use serde::{Deserialize, Serialize};

/// A dynamically-typed attribute value.
///
/// Records store raw values as they were written; coercion to the declared
/// attribute type happens on save (see [`crate::attribute::try_coerce`]).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Value {
    /// Absent value
    Null,

    /// Boolean value
    Bool(bool),

    /// 64-bit signed integer
    Int(i64),

    /// 64-bit floating point
    Float(f64),

    /// Text string
    Text(String),

    /// Calendar date
    Date(NaiveDate),

    /// Date and time with offset
    DateTime(DateTime<FixedOffset>),

    /// JSON value
    Json(serde_json::Value),

    /// Array of values
    Array(Vec<Value>),

    /// Host object with its own conversions (never serialized)
    #[serde(skip)]
    Object(ObjectValue),
}

/// Conversions an opaque host object offers to the coercion layer.
///
/// `convert` is called with the declared type name (`"integer"`, `"string"`,
/// or any custom name such as `"custom"`); returning `None` means the object
/// cannot be converted and the attribute becomes null.
pub trait Convert: fmt::Debug + Send + Sync {
    fn convert(&self, type_name: &str) -> Option<Value>;
}

/// Shared handle to a host object stored in a [`Value::Object`].
///
/// Two object values are equal only when they wrap the same instance.
#[derive(Clone)]
pub struct ObjectValue(Arc<dyn Convert>);

impl ObjectValue {
    pub fn new(object: impl Convert + 'static) -> Self {
        Self(Arc::new(object))
    }

    /// Ask the wrapped object for a conversion to `type_name`.
    pub fn convert(&self, type_name: &str) -> Option<Value> {
        self.0.convert(type_name)
    }
}

impl PartialEq for ObjectValue {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}

impl fmt::Debug for ObjectValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl Value {
    /// Check if this value is null.
    pub const fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Get the type name of this value.
    pub const fn type_name(&self) -> &'static str {
        match self {
            Value::Null => "null",
            Value::Bool(_) => "boolean",
            Value::Int(_) => "integer",
            Value::Float(_) => "float",
            Value::Text(_) => "string",
            Value::Date(_) => "date",
            Value::DateTime(_) => "datetime",
            Value::Json(_) => "json",
            Value::Array(_) => "array",
            Value::Object(_) => "object",
        }
    }

    /// Try to convert this value to a bool.
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(v) => Some(*v),
            Value::Int(v) => Some(*v != 0),
            _ => None,
        }
    }

    /// Try to convert this value to an i64.
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Int(v) => Some(*v),
            Value::Bool(v) => Some(if *v { 1 } else { 0 }),
            _ => None,
        }
    }

    /// Try to convert this value to an f64.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Float(v) => Some(*v),
            Value::Int(v) => Some(*v as f64),
            _ => None,
        }
    }

    /// Try to get this value as a string reference.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Text(s) => Some(s),
            _ => None,
        }
    }

    /// Try to get this value as a date.
    pub fn as_date(&self) -> Option<NaiveDate> {
        match self {
            Value::Date(d) => Some(*d),
            Value::DateTime(dt) => Some(dt.date_naive()),
            _ => None,
        }
    }

    /// Try to get this value as a datetime.
    pub fn as_datetime(&self) -> Option<DateTime<FixedOffset>> {
        match self {
            Value::DateTime(dt) => Some(*dt),
            _ => None,
        }
    }

    /// Order two values of compatible kinds.
    ///
    /// Integers and floats compare numerically, null sorts before everything
    /// else. Returns `None` for kinds that have no meaningful order.
    pub fn compare(&self, other: &Value) -> Option<Ordering> {
        match (self, other) {
            (Value::Null, Value::Null) => Some(Ordering::Equal),
            (Value::Null, _) => Some(Ordering::Less),
            (_, Value::Null) => Some(Ordering::Greater),
            (Value::Bool(a), Value::Bool(b)) => Some(a.cmp(b)),
            (Value::Int(a), Value::Int(b)) => Some(a.cmp(b)),
            (Value::Int(_) | Value::Float(_), Value::Int(_) | Value::Float(_)) => {
                self.as_f64()?.partial_cmp(&other.as_f64()?)
            }
            (Value::Text(a), Value::Text(b)) => Some(a.cmp(b)),
            (Value::Date(a), Value::Date(b)) => Some(a.cmp(b)),
            (Value::DateTime(a), Value::DateTime(b)) => Some(a.cmp(b)),
            (Value::Array(a), Value::Array(b)) => {
                for (x, y) in a.iter().zip(b) {
                    match x.compare(y)? {
                        Ordering::Equal => {}
                        ord => return Some(ord),
                    }
                }
                Some(a.len().cmp(&b.len()))
            }
            _ => None,
        }
    }

    /// Convert to a JSON value for record serialization.
    pub fn to_json(&self) -> serde_json::Value {
        match self {
            Value::Null => serde_json::Value::Null,
            Value::Bool(v) => serde_json::Value::Bool(*v),
            Value::Int(v) => serde_json::Value::from(*v),
            Value::Float(v) => serde_json::Number::from_f64(*v)
                .map_or(serde_json::Value::Null, serde_json::Value::Number),
            Value::Text(s) => serde_json::Value::String(s.clone()),
            Value::Date(_) | Value::DateTime(_) | Value::Object(_) => {
                serde_json::Value::String(self.to_string())
            }
            Value::Json(v) => v.clone(),
            Value::Array(items) => {
                serde_json::Value::Array(items.iter().map(Value::to_json).collect())
            }
        }
    }
}

/// The string form used for identity keys and messages.
///
/// Null renders as the empty string; floats always carry a fractional part.
impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => Ok(()),
            Value::Bool(v) => write!(f, "{v}"),
            Value::Int(v) => write!(f, "{v}"),
            Value::Float(v) => write!(f, "{v:?}"),
            Value::Text(s) => f.write_str(s),
            Value::Date(d) => write!(f, "{}", d.format("%Y-%m-%d")),
            Value::DateTime(dt) => f.write_str(&dt.to_rfc3339()),
            Value::Json(v) => write!(f, "{v}"),
            Value::Array(items) => {
                let parts: Vec<String> = items.iter().map(ToString::to_string).collect();
                write!(f, "[{}]", parts.join(", "))
            }
            Value::Object(obj) => match obj.convert("string") {
                Some(Value::Text(s)) => f.write_str(&s),
                _ => write!(f, "{obj:?}"),
            },
        }
    }
}

// Conversion implementations
impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Bool(v)
    }
}

impl From<i32> for Value {
    fn from(v: i32) -> Self {
        Value::Int(i64::from(v))
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::Int(v)
    }
}

impl From<u32> for Value {
    fn from(v: u32) -> Self {
        Value::Int(i64::from(v))
    }
}

impl From<usize> for Value {
    fn from(v: usize) -> Self {
        i64::try_from(v).map_or_else(
            |_| {
                tracing::warn!(
                    value = v,
                    clamped_to = i64::MAX,
                    "usize value exceeds i64::MAX; clamping to i64::MAX"
                );
                Value::Int(i64::MAX)
            },
            Value::Int,
        )
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Float(v)
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::Text(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::Text(v.to_string())
    }
}

impl From<NaiveDate> for Value {
    fn from(v: NaiveDate) -> Self {
        Value::Date(v)
    }
}

impl From<DateTime<FixedOffset>> for Value {
    fn from(v: DateTime<FixedOffset>) -> Self {
        Value::DateTime(v)
    }
}

impl From<serde_json::Value> for Value {
    fn from(v: serde_json::Value) -> Self {
        Value::Json(v)
    }
}

impl From<ObjectValue> for Value {
    fn from(v: ObjectValue) -> Self {
        Value::Object(v)
    }
}

impl From<Vec<Value>> for Value {
    fn from(v: Vec<Value>) -> Self {
        Value::Array(v)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Self {
        match v {
            Some(v) => v.into(),
            None => Value::Null,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug)]
    struct Celsius(f64);

    impl Convert for Celsius {
        fn convert(&self, type_name: &str) -> Option<Value> {
            match type_name {
                "fahrenheit" => Some(Value::Float(self.0 * 9.0 / 5.0 + 32.0)),
                "string" => Some(Value::Text(format!("{}C", self.0))),
                _ => None,
            }
        }
    }

    #[test]
    fn test_from_primitives() {
        assert_eq!(Value::from(true), Value::Bool(true));
        assert_eq!(Value::from(7_i32), Value::Int(7));
        assert_eq!(Value::from(7_u32), Value::Int(7));
        assert_eq!(Value::from(1.5), Value::Float(1.5));
        assert_eq!(Value::from("x"), Value::Text("x".to_string()));
        assert_eq!(Value::from(None::<i64>), Value::Null);
        assert_eq!(Value::from(Some("y")), Value::Text("y".to_string()));
    }

    #[test]
    fn test_display_forms() {
        assert_eq!(Value::Null.to_string(), "");
        assert_eq!(Value::Int(3).to_string(), "3");
        assert_eq!(Value::Float(1.0).to_string(), "1.0");
        assert_eq!(Value::from("bannana").to_string(), "bannana");
        let date = NaiveDate::from_ymd_opt(2024, 2, 29).unwrap();
        assert_eq!(Value::Date(date).to_string(), "2024-02-29");
        let obj = ObjectValue::new(Celsius(20.0));
        assert_eq!(Value::Object(obj).to_string(), "20C");
    }

    #[test]
    fn test_compare() {
        assert_eq!(Value::Int(1).compare(&Value::Int(2)), Some(Ordering::Less));
        assert_eq!(
            Value::Int(2).compare(&Value::Float(1.5)),
            Some(Ordering::Greater)
        );
        assert_eq!(Value::Null.compare(&Value::Int(0)), Some(Ordering::Less));
        assert_eq!(Value::from("a").compare(&Value::Int(1)), None);
    }

    #[test]
    fn test_object_identity_equality() {
        let a = ObjectValue::new(Celsius(1.0));
        let b = ObjectValue::new(Celsius(1.0));
        assert_eq!(Value::Object(a.clone()), Value::Object(a.clone()));
        assert_ne!(Value::Object(a), Value::Object(b));
    }

    #[test]
    fn test_to_json() {
        assert_eq!(Value::Int(4).to_json(), serde_json::json!(4));
        assert_eq!(
            Value::Array(vec![Value::from("a"), Value::Null]).to_json(),
            serde_json::json!(["a", null])
        );
    }

    #[test]
    fn test_serde_round_trip_of_plain_values() {
        let value = Value::Array(vec![Value::Int(1), Value::from("two")]);
        let json = serde_json::to_string(&value).unwrap();
        let back: Value = serde_json::from_str(&json).unwrap();
        assert_eq!(back, value);
    }
}
