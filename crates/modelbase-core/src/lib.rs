//! Core types for modelbase.
//!
//! This crate provides the storage-agnostic building blocks of a model layer:
//!
//! - `ModelDefinition` for declared attributes and relations
//! - `Record` and `RecordHandle` for shared model instances
//! - `Value` for dynamically typed attribute values
//! - `AttributeOptions` and coercion rules
//! - `Error` and `Result` for every modelbase operation

pub mod attribute;
pub mod error;
pub mod inflect;
pub mod model;
pub mod record;
pub mod relationship;
pub mod value;

pub use attribute::{AttributeOptions, AttributeType, coerce_attribute, try_coerce};
pub use error::{
    AssociationTypeMismatchError, AttributeError, AttributeErrorKind, ConfigError, Error,
    FieldValidationError, NotFoundError, PersistenceError, ReadOnlyRecordError, Result,
    ValidationError, ValidationErrorKind,
};
pub use model::{ID, ModelConfig, ModelDefinition, ModelDefinitionBuilder};
pub use record::{Record, RecordHandle, WeakRecordHandle};
pub use relationship::{BelongsTo, HasMany, Relation, RelationKind};
pub use value::{Convert, ObjectValue, Value};
