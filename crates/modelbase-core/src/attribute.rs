//! Attribute declarations and type coercion.
//!
//! Each model attribute is declared with an [`AttributeOptions`] entry in its
//! [`ModelDefinition`](crate::model::ModelDefinition). Values are stored
//! raw when written and coerced to the declared [`AttributeType`] on save.
//! Coercion never fails: a value that cannot be converted becomes null.

use chrono::{DateTime, FixedOffset, NaiveDate, NaiveDateTime, NaiveTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};

use crate::value::Value;

/// The declared type of an attribute.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum AttributeType {
    Integer,
    Float,
    String,
    Date,
    DateTime,
    /// Converted by asking the value's host object (see [`crate::value::Convert`]).
    Custom(String),
}

impl AttributeType {
    /// The name passed to [`crate::value::Convert::convert`].
    pub fn name(&self) -> &str {
        match self {
            AttributeType::Integer => "integer",
            AttributeType::Float => "float",
            AttributeType::String => "string",
            AttributeType::Date => "date",
            AttributeType::DateTime => "datetime",
            AttributeType::Custom(name) => name,
        }
    }

    /// Parse a type name; unknown names become [`AttributeType::Custom`].
    pub fn from_name(name: &str) -> Self {
        match name {
            "integer" => AttributeType::Integer,
            "float" => AttributeType::Float,
            "string" => AttributeType::String,
            "date" => AttributeType::Date,
            "datetime" => AttributeType::DateTime,
            other => AttributeType::Custom(other.to_string()),
        }
    }
}

/// Declared options of a single attribute.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttributeOptions {
    /// Declared type; `None` stores values untouched
    pub ty: Option<AttributeType>,
    /// Participates in the derived record identity
    pub identity: bool,
    /// Rejects external writes after construction
    pub readonly: bool,
    /// Null values are left alone by coercion
    pub allow_nil: bool,
    /// Passed to the store as a finder hint but never compared
    pub finder_aid: bool,
}

impl AttributeOptions {
    /// Untyped, writable, nullable, not part of the identity.
    pub const fn new() -> Self {
        Self {
            ty: None,
            identity: false,
            readonly: false,
            allow_nil: true,
            finder_aid: false,
        }
    }

    pub fn typed(ty: AttributeType) -> Self {
        Self {
            ty: Some(ty),
            ..Self::new()
        }
    }

    pub fn integer() -> Self {
        Self::typed(AttributeType::Integer)
    }

    pub fn float() -> Self {
        Self::typed(AttributeType::Float)
    }

    pub fn string() -> Self {
        Self::typed(AttributeType::String)
    }

    pub fn date() -> Self {
        Self::typed(AttributeType::Date)
    }

    pub fn datetime() -> Self {
        Self::typed(AttributeType::DateTime)
    }

    pub fn custom(name: impl Into<String>) -> Self {
        Self::typed(AttributeType::Custom(name.into()))
    }

    #[must_use]
    pub const fn identity(mut self, value: bool) -> Self {
        self.identity = value;
        self
    }

    #[must_use]
    pub const fn readonly(mut self, value: bool) -> Self {
        self.readonly = value;
        self
    }

    #[must_use]
    pub const fn allow_nil(mut self, value: bool) -> Self {
        self.allow_nil = value;
        self
    }

    #[must_use]
    pub const fn finder_aid(mut self, value: bool) -> Self {
        self.finder_aid = value;
        self
    }
}

impl Default for AttributeOptions {
    fn default() -> Self {
        Self::new()
    }
}

/// Convert `value` to `ty`, returning `None` when no conversion exists.
///
/// Null converts to the zero value of numeric and string types; dates and
/// custom types have none. Host objects are asked for a conversion by type
/// name.
pub fn try_coerce(ty: &AttributeType, value: &Value) -> Option<Value> {
    if let Value::Object(obj) = value {
        return obj.convert(ty.name());
    }
    match ty {
        AttributeType::Integer => to_integer(value).map(Value::Int),
        AttributeType::Float => to_float(value).map(Value::Float),
        AttributeType::String => to_text(value).map(Value::Text),
        AttributeType::Date => to_date(value).map(Value::Date),
        AttributeType::DateTime => to_datetime(value).map(Value::DateTime),
        AttributeType::Custom(_) => None,
    }
}

/// Coerce a stored value according to its attribute options.
///
/// Null stays null when `allow_nil` is set; untyped attributes are returned
/// unchanged; failed conversions yield null.
pub fn coerce_attribute(name: &str, options: &AttributeOptions, value: &Value) -> Value {
    if value.is_null() && options.allow_nil {
        return Value::Null;
    }
    let Some(ty) = &options.ty else {
        return value.clone();
    };
    match try_coerce(ty, value) {
        Some(coerced) => coerced,
        None => {
            tracing::warn!(
                attribute = name,
                ty = ty.name(),
                found = value.type_name(),
                "coercion failed; storing null"
            );
            Value::Null
        }
    }
}

#[allow(clippy::cast_possible_truncation)]
fn to_integer(value: &Value) -> Option<i64> {
    match value {
        Value::Null => Some(0),
        Value::Int(v) => Some(*v),
        Value::Float(v) if v.is_finite() => Some(v.trunc() as i64),
        Value::Text(s) => {
            let s = s.trim();
            s.parse::<i64>().ok().or_else(|| {
                s.parse::<f64>()
                    .ok()
                    .filter(|f| f.is_finite())
                    .map(|f| f.trunc() as i64)
            })
        }
        Value::Json(serde_json::Value::Number(n)) => n.as_i64(),
        _ => None,
    }
}

fn to_float(value: &Value) -> Option<f64> {
    match value {
        Value::Null => Some(0.0),
        Value::Int(v) => Some(*v as f64),
        Value::Float(v) => Some(*v),
        Value::Text(s) => s.trim().parse::<f64>().ok(),
        Value::Json(serde_json::Value::Number(n)) => n.as_f64(),
        _ => None,
    }
}

fn to_text(value: &Value) -> Option<String> {
    match value {
        Value::Null => Some(String::new()),
        Value::Text(s) => Some(s.clone()),
        Value::Json(serde_json::Value::String(s)) => Some(s.clone()),
        other => Some(other.to_string()),
    }
}

const DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M",
];

fn to_date(value: &Value) -> Option<NaiveDate> {
    match value {
        Value::Date(d) => Some(*d),
        Value::DateTime(dt) => Some(dt.date_naive()),
        Value::Text(s) => {
            let s = s.trim();
            NaiveDate::parse_from_str(s, "%Y-%m-%d")
                .ok()
                .or_else(|| parse_datetime(s).map(|dt| dt.date_naive()))
        }
        _ => None,
    }
}

fn to_datetime(value: &Value) -> Option<DateTime<FixedOffset>> {
    match value {
        Value::DateTime(dt) => Some(*dt),
        Value::Date(d) => Some(midnight_utc(*d)),
        Value::Text(s) => {
            let s = s.trim();
            parse_datetime(s).or_else(|| {
                NaiveDate::parse_from_str(s, "%Y-%m-%d")
                    .ok()
                    .map(midnight_utc)
            })
        }
        _ => None,
    }
}

fn parse_datetime(s: &str) -> Option<DateTime<FixedOffset>> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt);
    }
    if let Ok(dt) = DateTime::parse_from_rfc2822(s) {
        return Some(dt);
    }
    DATETIME_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(s, fmt).ok())
        .map(|naive| Utc.from_utc_datetime(&naive).fixed_offset())
}

fn midnight_utc(date: NaiveDate) -> DateTime<FixedOffset> {
    Utc.from_utc_datetime(&date.and_time(NaiveTime::MIN))
        .fixed_offset()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::{Convert, ObjectValue};

    #[derive(Debug)]
    struct CustomValue(String);

    impl Convert for CustomValue {
        fn convert(&self, type_name: &str) -> Option<Value> {
            (type_name == "custom").then(|| {
                Value::Array(vec![Value::Text(self.0.clone()), Value::Text(self.0.clone())])
            })
        }
    }

    #[test]
    fn integer_coercion() {
        let ty = AttributeType::Integer;
        assert_eq!(try_coerce(&ty, &Value::from("1")), Some(Value::Int(1)));
        assert_eq!(try_coerce(&ty, &Value::from(" 42 ")), Some(Value::Int(42)));
        assert_eq!(try_coerce(&ty, &Value::Float(3.9)), Some(Value::Int(3)));
        assert_eq!(try_coerce(&ty, &Value::from("abc")), None);
        assert_eq!(try_coerce(&ty, &Value::Null), Some(Value::Int(0)));
    }

    #[test]
    fn float_and_string_coercion() {
        assert_eq!(
            try_coerce(&AttributeType::Float, &Value::from("1.1")),
            Some(Value::Float(1.1))
        );
        assert_eq!(
            try_coerce(&AttributeType::String, &Value::Int(1)),
            Some(Value::from("1"))
        );
        assert_eq!(
            try_coerce(&AttributeType::String, &Value::Float(2.0)),
            Some(Value::from("2.0"))
        );
    }

    #[test]
    fn date_coercion() {
        let date = NaiveDate::from_ymd_opt(2011, 3, 14).unwrap();
        assert_eq!(
            try_coerce(&AttributeType::Date, &Value::from("2011-03-14")),
            Some(Value::Date(date))
        );
        assert_eq!(
            try_coerce(&AttributeType::Date, &Value::from("not a date")),
            None
        );
        assert_eq!(try_coerce(&AttributeType::Date, &Value::Null), None);
    }

    #[test]
    fn datetime_coercion() {
        let parsed = try_coerce(
            &AttributeType::DateTime,
            &Value::from("2011-03-14T09:26:53+02:00"),
        )
        .unwrap();
        let dt = parsed.as_datetime().unwrap();
        assert_eq!(dt.to_rfc3339(), "2011-03-14T09:26:53+02:00");

        let naive = try_coerce(&AttributeType::DateTime, &Value::from("2011-03-14 09:26:53"))
            .unwrap()
            .as_datetime()
            .unwrap();
        assert_eq!(naive.offset().local_minus_utc(), 0);

        let from_date = try_coerce(
            &AttributeType::DateTime,
            &Value::Date(NaiveDate::from_ymd_opt(2011, 3, 14).unwrap()),
        )
        .unwrap();
        assert_eq!(from_date.to_string(), "2011-03-14T00:00:00+00:00");
    }

    #[test]
    fn custom_coercion_uses_host_object() {
        let value = Value::Object(ObjectValue::new(CustomValue("test".into())));
        assert_eq!(
            try_coerce(&AttributeType::Custom("custom".into()), &value),
            Some(Value::Array(vec![Value::from("test"), Value::from("test")]))
        );
        assert_eq!(try_coerce(&AttributeType::Integer, &value), None);
        assert_eq!(
            try_coerce(&AttributeType::Custom("custom".into()), &Value::Int(1)),
            None
        );
    }

    #[test]
    fn attribute_coercion_respects_allow_nil() {
        let nullable = AttributeOptions::integer();
        assert_eq!(coerce_attribute("n", &nullable, &Value::Null), Value::Null);

        let required = AttributeOptions::integer().allow_nil(false);
        assert_eq!(coerce_attribute("n", &required, &Value::Null), Value::Int(0));

        let untyped = AttributeOptions::new();
        let raw = Value::Json(serde_json::json!({"a": 1}));
        assert_eq!(coerce_attribute("g", &untyped, &raw), raw);

        assert_eq!(
            coerce_attribute("n", &nullable, &Value::from("nope")),
            Value::Null
        );
    }

    #[test]
    fn type_names_round_trip() {
        for name in ["integer", "float", "string", "date", "datetime", "money"] {
            assert_eq!(AttributeType::from_name(name).name(), name);
        }
    }
}
