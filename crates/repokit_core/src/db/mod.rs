//! Connection parameters and SQLite connection bootstrap.
//!
//! # Responsibility
//! - Validate how to reach a database and render the connection URI.
//! - Open and configure SQLite connections for the repository layer.
//!
//! # Invariants
//! - A `ConnectionParams` value is always validated; there is no unchecked
//!   constructor.
//! - Only the `sqlite` engine can be opened in-process; other engines are
//!   rendered to URIs for external drivers.

use std::error::Error;
use std::fmt::{Display, Formatter};

mod open;
mod params;

pub use open::{open_db, open_db_in_memory, open_db_path};
pub use params::{ConfigError, ConnectionParams, ConnectionParamsError, ConnectionSettings};

/// Engine name that switches validation and URI rendering to file mode.
pub const SQLITE_ENGINE: &str = "sqlite";

pub type DbResult<T> = Result<T, DbError>;

#[derive(Debug)]
pub enum DbError {
    Sqlite(rusqlite::Error),
    UnsupportedEngine(String),
}

impl Display for DbError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Sqlite(err) => write!(f, "{err}"),
            Self::UnsupportedEngine(engine) => write!(
                f,
                "engine `{engine}` cannot be opened in-process; only `{SQLITE_ENGINE}` is supported"
            ),
        }
    }
}

impl Error for DbError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Sqlite(err) => Some(err),
            Self::UnsupportedEngine(_) => None,
        }
    }
}

impl From<rusqlite::Error> for DbError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Sqlite(value)
    }
}
