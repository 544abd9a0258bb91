//! Relation descriptors for modelbase models.
//!
//! Relations are declared once on a [`ModelDefinition`](crate::model::ModelDefinition)
//! and never change afterwards. The association layer in `modelbase` turns
//! them into getters, setters and collection proxies.

use serde::{Deserialize, Serialize};

use crate::inflect;

/// The type of relationship between two models.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RelationKind {
    /// Many-to-one: a `Post` belongs to one `Author` through `author_id`.
    BelongsTo,
    /// One-to-many: an `Author` has many `Post`s pointing back at it.
    HasMany,
}

/// A scalar foreign key on the owner bound to one related record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BelongsTo {
    /// Association name (`author`).
    pub name: String,
    /// Related model name. Default: `classify(name)`.
    pub class_name: String,
    /// Foreign key attribute declared on the owner. Default: `{name}_id`.
    pub foreign_key: String,
    /// Attribute of the related model the key points at. Default: `id`.
    pub primary_key: String,
    /// Mark fetched records readonly and refuse external assignment.
    pub readonly: bool,
    /// Whether the foreign key attribute allows null.
    pub allow_nil: bool,
    /// Whether the foreign key attribute participates in the owner identity.
    pub identity: bool,
}

impl BelongsTo {
    /// Create a belongs-to relation with conventional defaults.
    pub fn new(name: impl Into<String>) -> Self {
        let name = name.into();
        Self {
            class_name: inflect::classify(&name),
            foreign_key: format!("{name}_id"),
            primary_key: "id".to_string(),
            readonly: false,
            allow_nil: true,
            identity: false,
            name,
        }
    }

    #[must_use]
    pub fn class_name(mut self, class_name: impl Into<String>) -> Self {
        self.class_name = class_name.into();
        self
    }

    #[must_use]
    pub fn foreign_key(mut self, key: impl Into<String>) -> Self {
        self.foreign_key = key.into();
        self
    }

    #[must_use]
    pub fn primary_key(mut self, key: impl Into<String>) -> Self {
        self.primary_key = key.into();
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
    pub const fn identity(mut self, value: bool) -> Self {
        self.identity = value;
        self
    }
}

/// A virtual collection of related records whose foreign key points at the owner.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HasMany {
    /// Association name (`posts`).
    pub name: String,
    /// Related model name. Default: `classify(name)`.
    pub class_name: String,
    /// Foreign key attribute on the related model.
    ///
    /// Left empty until the owning definition is built, which fills in
    /// `underscore(owner) + "_id"`.
    pub foreign_key: String,
    /// Owner attribute the foreign key holds. Default: `id`.
    pub primary_key: String,
    /// Maximum number of members loaded.
    pub limit: Option<usize>,
    /// Number of leading matches skipped when loading.
    pub offset: usize,
    /// Mark loaded members readonly.
    pub readonly: bool,
    /// Require host validation to pass before appending a member.
    pub validate: bool,
}

impl HasMany {
    /// Create a has-many relation with conventional defaults.
    pub fn new(name: impl Into<String>) -> Self {
        let name = name.into();
        Self {
            class_name: inflect::classify(&name),
            foreign_key: String::new(),
            primary_key: "id".to_string(),
            limit: None,
            offset: 0,
            readonly: false,
            validate: false,
            name,
        }
    }

    /// Name of the id-list accessors: `posts` -> `post_ids`.
    pub fn ids_name(&self) -> String {
        format!("{}_ids", inflect::singularize(&self.name))
    }

    #[must_use]
    pub fn class_name(mut self, class_name: impl Into<String>) -> Self {
        self.class_name = class_name.into();
        self
    }

    #[must_use]
    pub fn foreign_key(mut self, key: impl Into<String>) -> Self {
        self.foreign_key = key.into();
        self
    }

    #[must_use]
    pub fn primary_key(mut self, key: impl Into<String>) -> Self {
        self.primary_key = key.into();
        self
    }

    #[must_use]
    pub const fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    #[must_use]
    pub const fn offset(mut self, offset: usize) -> Self {
        self.offset = offset;
        self
    }

    #[must_use]
    pub const fn readonly(mut self, value: bool) -> Self {
        self.readonly = value;
        self
    }

    #[must_use]
    pub const fn validate(mut self, value: bool) -> Self {
        self.validate = value;
        self
    }
}

/// A declared relation of either kind.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Relation {
    BelongsTo(BelongsTo),
    HasMany(HasMany),
}

impl Relation {
    pub fn name(&self) -> &str {
        match self {
            Relation::BelongsTo(r) => &r.name,
            Relation::HasMany(r) => &r.name,
        }
    }

    pub fn kind(&self) -> RelationKind {
        match self {
            Relation::BelongsTo(_) => RelationKind::BelongsTo,
            Relation::HasMany(_) => RelationKind::HasMany,
        }
    }

    /// Name of the related model.
    pub fn class_name(&self) -> &str {
        match self {
            Relation::BelongsTo(r) => &r.class_name,
            Relation::HasMany(r) => &r.class_name,
        }
    }
}
