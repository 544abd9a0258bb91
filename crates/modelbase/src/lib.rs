//! modelbase - framework-style model records over host-supplied stores.
//!
//! modelbase provides the model layer of a web framework without owning any
//! storage:
//!
//! - Attribute declaration with typed coercion on save
//! - Identity derived from identity attributes, or generated
//! - `belongs_to` / `has_many` associations with cached collections
//! - Dynamic finders (`find_all_by_name_and_value`)
//! - A record lifecycle: new, persisted, readonly, validated, saved
//!
//! Each model is bound to a [`Store`] implemented by the host. The store
//! decides where records live, which are persisted and which are valid.
//!
//! # Quick Start
//!
//! ```
//! use modelbase::prelude::*;
//!
//! let author = ModelDefinition::builder("Author")
//!     .attribute("name", AttributeOptions::string().identity(true))
//!     .has_many(HasMany::new("posts"))
//!     .build();
//! let post = ModelDefinition::builder("Post")
//!     .attribute("title", AttributeOptions::string().identity(true))
//!     .belongs_to(BelongsTo::new("author"))
//!     .build();
//!
//! let registry = Registry::builder()
//!     .model(author, MemoryStore::new())
//!     .model(post, MemoryStore::new())
//!     .build()?;
//! let authors = registry.model("Author")?;
//! let posts = registry.model("Post")?;
//!
//! let adam = authors.create([("name", "Adam")])?;
//! assert_eq!(adam.id(), Value::from("Adam"));
//!
//! let hello = posts.create([("title", "Hello")])?;
//! authors.has_many(&adam, "posts")?.append(&[hello.clone()])?;
//! assert_eq!(hello.get("author_id")?, Value::from("Adam"));
//! assert_eq!(posts.belongs_to(&hello, "author")?, Some(adam.clone()));
//!
//! let found = posts.dispatch("find_all_by_author_id", &[Value::from("Adam")])?;
//! assert_eq!(found.map(|f| f.len()), Some(1));
//! # Ok::<(), modelbase::Error>(())
//! ```

pub mod association;
pub mod model;
pub mod registry;
pub mod store;

pub use association::CollectionProxy;
pub use model::Model;
pub use registry::{Registry, RegistryBuilder};
pub use store::{MemoryStore, Store, Validator};

pub use modelbase_core::{
    AttributeOptions, AttributeType, BelongsTo, Convert, Error, HasMany, ID, ModelConfig,
    ModelDefinition, ModelDefinitionBuilder, ObjectValue, Record, RecordHandle, Relation, Result,
    ValidationError, ValidationErrorKind, Value, WeakRecordHandle,
};
pub use modelbase_query::{
    CandidateSource, FilterValue, Filters, FinderKind, FinderRequest, Found, IdLookup,
};

/// Commonly used types.
///
/// ```
/// use modelbase::prelude::*;
/// ```
pub mod prelude {
    pub use crate::{
        AttributeOptions, AttributeType, BelongsTo, CollectionProxy, Error, FilterValue, Filters,
        FinderKind, Found, HasMany, IdLookup, MemoryStore, Model, ModelConfig, ModelDefinition,
        Record, RecordHandle, Registry, Result, Store, ValidationError, Value,
    };
}
