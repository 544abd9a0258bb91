//! Error types for modelbase operations.

use std::fmt;

use crate::value::Value;

/// The primary error type for all modelbase operations.
#[derive(Debug)]
pub enum Error {
    /// Attribute access errors (undeclared name, readonly attribute)
    Attribute(AttributeError),
    /// `save` was called on a readonly record
    ReadOnlyRecord(ReadOnlyRecordError),
    /// Identity lookup found fewer records than requested
    NotFound(NotFoundError),
    /// A record of the wrong model was assigned to an association
    AssociationTypeMismatch(AssociationTypeMismatchError),
    /// The host store raised while persisting a record
    Persistence(PersistenceError),
    /// Validation errors
    Validation(ValidationError),
    /// Registry/definition configuration errors
    Config(ConfigError),
    /// Custom error with message
    Custom(String),
}

#[derive(Debug)]
pub struct AttributeError {
    pub kind: AttributeErrorKind,
    pub model: String,
    pub attribute: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttributeErrorKind {
    /// The attribute was never declared on the model
    Unknown,
    /// The attribute (or association) does not accept external writes
    ReadOnly,
}

#[derive(Debug)]
pub struct ReadOnlyRecordError {
    pub model: String,
    pub id: Value,
}

/// A failed identity lookup.
///
/// `requested` holds every id that was asked for; `found` is how many of them
/// resolved to a record.
#[derive(Debug)]
pub struct NotFoundError {
    pub model: String,
    pub requested: Vec<Value>,
    pub found: usize,
}

#[derive(Debug)]
pub struct AssociationTypeMismatchError {
    pub association: String,
    pub expected: String,
    pub actual: String,
}

#[derive(Debug)]
pub struct PersistenceError {
    pub model: String,
    pub message: String,
    pub source: Option<Box<dyn std::error::Error + Send + Sync>>,
}

#[derive(Debug)]
pub struct ConfigError {
    pub message: String,
    pub source: Option<Box<dyn std::error::Error + Send + Sync>>,
}

/// Validation errors reported by a store for one record.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ValidationError {
    /// The errors in the order they were reported
    pub errors: Vec<FieldValidationError>,
}

/// A single validation error for an attribute.
#[derive(Debug, Clone, PartialEq)]
pub struct FieldValidationError {
    /// The attribute name that failed validation ("__model__" for record-level)
    pub field: String,
    /// The kind of validation that failed
    pub kind: ValidationErrorKind,
    /// Human-readable error message
    pub message: String,
}

/// The type of validation constraint that was violated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValidationErrorKind {
    /// Required attribute is missing/null
    Required,
    /// Custom validation failed
    Custom,
    /// Record-level validation failed
    Model,
}

impl ValidationError {
    /// Create a new empty validation error container.
    pub fn new() -> Self {
        Self { errors: Vec::new() }
    }

    /// Check if there are any validation errors.
    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }

    /// Add a field validation error.
    pub fn add(
        &mut self,
        field: impl Into<String>,
        kind: ValidationErrorKind,
        message: impl Into<String>,
    ) {
        self.errors.push(FieldValidationError {
            field: field.into(),
            kind,
            message: message.into(),
        });
    }

    /// Add a required attribute error.
    pub fn add_required(&mut self, field: impl Into<String>) {
        self.add(field, ValidationErrorKind::Required, "can't be blank");
    }

    /// Add a custom validation error.
    pub fn add_custom(&mut self, field: impl Into<String>, message: impl Into<String>) {
        self.add(field, ValidationErrorKind::Custom, message);
    }

    /// Add a record-level validation error, recorded with field "__model__".
    pub fn add_model_error(&mut self, message: impl Into<String>) {
        self.add("__model__", ValidationErrorKind::Model, message);
    }

    /// Messages reported for one attribute.
    pub fn on(&self, field: &str) -> Vec<&str> {
        self.errors
            .iter()
            .filter(|e| e.field == field)
            .map(|e| e.message.as_str())
            .collect()
    }

    /// Convert to Result, returning Ok(()) if no errors, Err(self) otherwise.
    pub fn into_result(self) -> std::result::Result<(), Self> {
        if self.is_empty() { Ok(()) } else { Err(self) }
    }
}

impl Error {
    /// Shorthand for an unknown attribute error.
    pub fn unknown_attribute(model: impl Into<String>, attribute: impl Into<String>) -> Self {
        Error::Attribute(AttributeError {
            kind: AttributeErrorKind::Unknown,
            model: model.into(),
            attribute: attribute.into(),
        })
    }

    /// Shorthand for a readonly attribute error.
    pub fn readonly_attribute(model: impl Into<String>, attribute: impl Into<String>) -> Self {
        Error::Attribute(AttributeError {
            kind: AttributeErrorKind::ReadOnly,
            model: model.into(),
            attribute: attribute.into(),
        })
    }

    /// Shorthand for a configuration error.
    pub fn config(message: impl Into<String>) -> Self {
        Error::Config(ConfigError {
            message: message.into(),
            source: None,
        })
    }

    /// Shorthand for a store failure raised while persisting.
    pub fn persistence(model: impl Into<String>, message: impl Into<String>) -> Self {
        Error::Persistence(PersistenceError {
            model: model.into(),
            message: message.into(),
            source: None,
        })
    }

    /// Is this an undeclared attribute error?
    pub fn is_unknown_attribute(&self) -> bool {
        matches!(self, Error::Attribute(e) if e.kind == AttributeErrorKind::Unknown)
    }

    /// Is this a write to a readonly attribute or association?
    pub fn is_readonly_attribute(&self) -> bool {
        matches!(self, Error::Attribute(e) if e.kind == AttributeErrorKind::ReadOnly)
    }

    /// Is this a save of a readonly record?
    pub fn is_readonly_record(&self) -> bool {
        matches!(self, Error::ReadOnlyRecord(_))
    }

    /// Is this a failed identity lookup?
    pub fn is_not_found(&self) -> bool {
        matches!(self, Error::NotFound(_))
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Attribute(e) => write!(f, "{}", e),
            Error::ReadOnlyRecord(e) => write!(f, "{}", e),
            Error::NotFound(e) => write!(f, "{}", e),
            Error::AssociationTypeMismatch(e) => write!(f, "{}", e),
            Error::Persistence(e) => write!(f, "Persistence error: {}", e),
            Error::Validation(e) => write!(f, "Validation error: {}", e),
            Error::Config(e) => write!(f, "Configuration error: {}", e.message),
            Error::Custom(msg) => write!(f, "{}", msg),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Persistence(e) => e
                .source
                .as_deref()
                .map(|err| err as &(dyn std::error::Error + 'static)),
            Error::Config(e) => e
                .source
                .as_deref()
                .map(|err| err as &(dyn std::error::Error + 'static)),
            Error::Validation(e) => Some(e),
            _ => None,
        }
    }
}

impl fmt::Display for AttributeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.kind {
            AttributeErrorKind::Unknown => {
                write!(f, "unknown attribute '{}' for {}", self.attribute, self.model)
            }
            AttributeErrorKind::ReadOnly => {
                write!(f, "{}#{} is read only", self.model, self.attribute)
            }
        }
    }
}

impl fmt::Display for ReadOnlyRecordError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} with ID={} is read only", self.model, self.id)
    }
}

impl fmt::Display for NotFoundError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.requested.len() > 1 {
            let ids = self
                .requested
                .iter()
                .map(ToString::to_string)
                .collect::<Vec<_>>()
                .join(", ");
            write!(
                f,
                "Couldn't find all {} with IDs ({}) (found {} results, but was looking for {})",
                crate::inflect::pluralize(&self.model),
                ids,
                self.found,
                self.requested.len()
            )
        } else {
            let id = self.requested.first().cloned().unwrap_or(Value::Null);
            write!(f, "Couldn't find {} with ID={}", self.model, id)
        }
    }
}

impl fmt::Display for AssociationTypeMismatchError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} expected, got {} (association '{}')",
            self.expected, self.actual, self.association
        )
    }
}

impl fmt::Display for PersistenceError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.message, self.model)
    }
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.errors.is_empty() {
            write!(f, "validation passed")
        } else if self.errors.len() == 1 {
            let err = &self.errors[0];
            write!(f, "validation error on '{}': {}", err.field, err.message)
        } else {
            writeln!(f, "validation errors:")?;
            for err in &self.errors {
                writeln!(f, "  - {}: {}", err.field, err.message)?;
            }
            Ok(())
        }
    }
}

impl std::error::Error for ValidationError {}

impl From<AttributeError> for Error {
    fn from(err: AttributeError) -> Self {
        Error::Attribute(err)
    }
}

impl From<NotFoundError> for Error {
    fn from(err: NotFoundError) -> Self {
        Error::NotFound(err)
    }
}

impl From<PersistenceError> for Error {
    fn from(err: PersistenceError) -> Self {
        Error::Persistence(err)
    }
}

impl From<ConfigError> for Error {
    fn from(err: ConfigError) -> Self {
        Error::Config(err)
    }
}

impl From<ValidationError> for Error {
    fn from(err: ValidationError) -> Self {
        Error::Validation(err)
    }
}

/// Result type alias for modelbase operations.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn not_found_messages() {
        let single = NotFoundError {
            model: "Author".to_string(),
            requested: vec![Value::from("Zed")],
            found: 0,
        };
        assert_eq!(single.to_string(), "Couldn't find Author with ID=Zed");

        let batch = NotFoundError {
            model: "Author".to_string(),
            requested: vec![Value::from("Adam"), Value::from("Zed")],
            found: 1,
        };
        assert_eq!(
            batch.to_string(),
            "Couldn't find all Authors with IDs (Adam, Zed) \
             (found 1 results, but was looking for 2)"
        );
    }

    #[test]
    fn kind_helpers() {
        assert!(Error::unknown_attribute("Post", "body").is_unknown_attribute());
        assert!(Error::readonly_attribute("Post", "title").is_readonly_attribute());
        assert!(!Error::config("bad").is_not_found());

        let err = Error::ReadOnlyRecord(ReadOnlyRecordError {
            model: "Post".to_string(),
            id: Value::Int(3),
        });
        assert!(err.is_readonly_record());
        assert_eq!(err.to_string(), "Post with ID=3 is read only");
    }

    #[test]
    fn validation_messages_by_field() {
        let mut errors = ValidationError::new();
        errors.add_required("name");
        errors.add_custom("name", "is too short");
        errors.add_model_error("inconsistent");

        assert_eq!(errors.on("name"), vec!["can't be blank", "is too short"]);
        assert!(errors.clone().into_result().is_err());
        assert!(ValidationError::new().into_result().is_ok());
    }
}
