//! Entity shape contracts for the generic repository.
//!
//! # Responsibility
//! - Describe a stored entity through a static field registry, so field names
//!   can be checked without reflection.
//! - Convert between typed shapes and field mappings ([`Record`]).
//!
//! # Invariants
//! - Every `Table` has exactly one primary-key field, present in `fields`.
//! - Shape conversion goes through serde; unknown keys are ignored when
//!   building a shape from a record.

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::{Map, Value};
use std::fmt::Display;

mod value;

pub use value::{decode_column, encode_value};

/// Insertion-ordered field mapping, the currency between shapes and storage.
pub type Record = Map<String, Value>;

/// Storage class of a registered field.
///
/// Drives how JSON values are bound as SQL parameters and how column values
/// are decoded back into a [`Record`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    Integer,
    Real,
    Text,
    /// Stored as `0`/`1`.
    Bool,
    /// Arbitrary JSON stored as text.
    Json,
    Blob,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Field {
    pub name: &'static str,
    pub kind: FieldKind,
}

impl Field {
    pub const fn new(name: &'static str, kind: FieldKind) -> Self {
        Self { name, kind }
    }

    pub const fn integer(name: &'static str) -> Self {
        Self::new(name, FieldKind::Integer)
    }

    pub const fn real(name: &'static str) -> Self {
        Self::new(name, FieldKind::Real)
    }

    pub const fn text(name: &'static str) -> Self {
        Self::new(name, FieldKind::Text)
    }

    pub const fn boolean(name: &'static str) -> Self {
        Self::new(name, FieldKind::Bool)
    }

    pub const fn json(name: &'static str) -> Self {
        Self::new(name, FieldKind::Json)
    }

    pub const fn blob(name: &'static str) -> Self {
        Self::new(name, FieldKind::Blob)
    }
}

/// Static description of where and how an entity is stored.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Table {
    /// Entity type name used in error messages, e.g. `User`.
    pub entity: &'static str,
    pub name: &'static str,
    pub primary_key: &'static str,
    /// Registered fields in column order, primary key included.
    pub fields: &'static [Field],
}

impl Table {
    pub fn field(&self, name: &str) -> Option<&'static Field> {
        self.fields.iter().find(|field| field.name == name)
    }

    pub fn has_field(&self, name: &str) -> bool {
        self.field(name).is_some()
    }

    pub fn primary_key_field(&self) -> Option<&'static Field> {
        self.field(self.primary_key)
    }

    /// Keeps only registered fields of `record`, in record order.
    pub fn known_fields<'r>(
        &self,
        record: &'r Record,
    ) -> impl Iterator<Item = (&'static Field, &'r Value)> + 'r {
        let table = *self;
        record
            .iter()
            .filter_map(move |(name, value)| table.field(name).map(|field| (field, value)))
    }
}

/// A persisted entity shape.
///
/// # Example
///
/// ```ignore
/// #[derive(Serialize, Deserialize)]
/// struct User { id: Option<i64>, name: String }
///
/// impl Model for User {
///     type Id = i64;
///     const TABLE: Table = Table {
///         entity: "User",
///         name: "users",
///         primary_key: "id",
///         fields: &[Field::integer("id"), Field::text("name")],
///     };
/// }
/// ```
pub trait Model: Serialize + DeserializeOwned {
    /// Primary-key type accepted by lookups.
    type Id: Serialize + Display;

    const TABLE: Table;
}

/// Serializes any shape into a field mapping.
///
/// Fails when the shape does not serialize to a JSON object.
pub fn to_record<T: Serialize + ?Sized>(shape: &T) -> Result<Record, serde_json::Error> {
    match serde_json::to_value(shape)? {
        Value::Object(record) => Ok(record),
        other => Err(<serde_json::Error as serde::ser::Error>::custom(format!(
            "expected a struct-like shape, got `{other}`"
        ))),
    }
}

/// Builds a shape from a field mapping, ignoring keys the shape does not know.
pub fn from_record<T: DeserializeOwned>(record: Record) -> Result<T, serde_json::Error> {
    serde_json::from_value(Value::Object(record))
}

/// Serializes a primary-key value.
pub fn id_value<T: Serialize + ?Sized>(id: &T) -> Result<Value, serde_json::Error> {
    serde_json::to_value(id)
}
