//! Generic data-access layer over SQLite.
//!
//! Connection parameters, missing/duplicate entry errors and a type-parameterized
//! repository offering CRUD and a small filter language.

pub mod db;
pub mod error;
pub mod logging;
pub mod model;
pub mod query;
pub mod repo;
pub mod session;

pub use db::{
    open_db, open_db_in_memory, open_db_path, ConfigError, ConnectionParams,
    ConnectionParamsError, ConnectionSettings, DbError, DbResult,
};
pub use error::{DuplicateEntry, MissingEntry};
pub use logging::{default_log_level, init_logging, logging_status, LoggingError};
pub use model::{Field, FieldKind, Model, Record, Table};
pub use query::{Condition, Criteria, FilterError, Operator};
pub use repo::{Filtered, GenericRepository, RepoError, RepoResult, DEFAULT_PAGE_LIMIT};
pub use session::{PendingCommit, SqliteSession, UnitOfWork};

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

#[cfg(test)]
mod tests {
    use super::core_version;

    #[test]
    fn version_is_not_empty() {
        assert!(!core_version().is_empty());
    }
}
