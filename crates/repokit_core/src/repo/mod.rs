//! Generic repository layer and its error contract.
//!
//! # Responsibility
//! - Provide CRUD and filter operations over any registered entity shape.
//! - Map storage, shape and filter failures into one error type.
//!
//! # Invariants
//! - Primary-key lookups that find nothing surface `RepoError::Missing`.
//! - Storage errors pass through unchanged inside `RepoError::Db`.

use crate::db::DbError;
use crate::error::{DuplicateEntry, MissingEntry};
use crate::query::{FilterError, IdentifierError};
use std::error::Error;
use std::fmt::{Display, Formatter};

mod generic_repo;

pub use generic_repo::{Filtered, GenericRepository, DEFAULT_PAGE_LIMIT};

pub type RepoResult<T> = Result<T, RepoError>;

#[derive(Debug)]
pub enum RepoError {
    Missing(MissingEntry),
    Duplicate(DuplicateEntry),
    Db(DbError),
    InvalidFilter(FilterError),
    InvalidIdentifier(IdentifierError),
    /// A shape could not be converted to or from a field mapping.
    Shape(serde_json::Error),
    InvalidData(String),
    MissingRequiredTable(String),
    MissingRequiredColumn {
        table: String,
        column: String,
    },
}

impl RepoError {
    pub fn missing(object_type: impl Into<String>, object_id: impl Display) -> Self {
        Self::Missing(MissingEntry::new(object_type, object_id))
    }

    pub fn duplicate(object_type: impl Into<String>, object_id: impl Display) -> Self {
        Self::Duplicate(DuplicateEntry::new(object_type, object_id))
    }

    pub fn is_missing(&self) -> bool {
        matches!(self, Self::Missing(_))
    }

    /// Entity type named by a `Missing`/`Duplicate` error.
    pub fn object_type(&self) -> Option<&str> {
        match self {
            Self::Missing(entry) => Some(&entry.object_type),
            Self::Duplicate(entry) => Some(&entry.object_type),
            _ => None,
        }
    }
}

impl Display for RepoError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Missing(err) => write!(f, "{err}"),
            Self::Duplicate(err) => write!(f, "{err}"),
            Self::Db(err) => write!(f, "{err}"),
            Self::InvalidFilter(err) => write!(f, "invalid filter: {err}"),
            Self::InvalidIdentifier(err) => write!(f, "{err}"),
            Self::Shape(err) => write!(f, "shape conversion failed: {err}"),
            Self::InvalidData(message) => write!(f, "invalid persisted data: {message}"),
            Self::MissingRequiredTable(table) => {
                write!(f, "required table `{table}` does not exist")
            }
            Self::MissingRequiredColumn { table, column } => {
                write!(f, "required column `{table}.{column}` does not exist")
            }
        }
    }
}

impl Error for RepoError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Missing(err) => Some(err),
            Self::Duplicate(err) => Some(err),
            Self::Db(err) => Some(err),
            Self::InvalidFilter(err) => Some(err),
            Self::InvalidIdentifier(err) => Some(err),
            Self::Shape(err) => Some(err),
            Self::InvalidData(_)
            | Self::MissingRequiredTable(_)
            | Self::MissingRequiredColumn { .. } => None,
        }
    }
}

impl From<MissingEntry> for RepoError {
    fn from(value: MissingEntry) -> Self {
        Self::Missing(value)
    }
}

impl From<DuplicateEntry> for RepoError {
    fn from(value: DuplicateEntry) -> Self {
        Self::Duplicate(value)
    }
}

impl From<DbError> for RepoError {
    fn from(value: DbError) -> Self {
        Self::Db(value)
    }
}

impl From<rusqlite::Error> for RepoError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Db(DbError::Sqlite(value))
    }
}

impl From<FilterError> for RepoError {
    fn from(value: FilterError) -> Self {
        Self::InvalidFilter(value)
    }
}

impl From<IdentifierError> for RepoError {
    fn from(value: IdentifierError) -> Self {
        Self::InvalidIdentifier(value)
    }
}

impl From<serde_json::Error> for RepoError {
    fn from(value: serde_json::Error) -> Self {
        Self::Shape(value)
    }
}
