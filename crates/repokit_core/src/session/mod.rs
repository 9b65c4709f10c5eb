//! Unit-of-work contract consumed by the generic repository.
//!
//! # Responsibility
//! - Define the minimal session surface the repository needs: keyed reads,
//!   queries, row writes, bulk writes and commit.
//! - Provide the SQLite-backed session.
//!
//! # Invariants
//! - Writes stay pending until `commit`; bulk writes never commit on their own.
//! - Sessions are passed per call; repositories never own one.

use crate::model::{Record, Table};
use crate::query::SelectQuery;
use crate::repo::{RepoError, RepoResult};
use serde_json::Value;

mod sqlite;

pub use sqlite::SqliteSession;

/// Session / unit-of-work handle.
///
/// Keys are primary-key values already serialized to JSON.
pub trait UnitOfWork {
    /// Fetches one row by primary key.
    fn get(&mut self, table: &Table, key: &Value) -> RepoResult<Option<Record>>;

    /// Runs a query and returns every matching row.
    fn select(&mut self, table: &Table, query: &SelectQuery) -> RepoResult<Vec<Record>>;

    /// Runs a query and returns its first row.
    fn select_first(&mut self, table: &Table, query: &SelectQuery) -> RepoResult<Option<Record>> {
        Ok(self.select(table, &query.first())?.into_iter().next())
    }

    /// Registers a new row and returns its primary key.
    fn add(&mut self, table: &Table, record: &Record) -> RepoResult<Value>;

    /// Writes `changes` onto the row identified by `key`.
    fn update(&mut self, table: &Table, key: &Value, changes: &Record) -> RepoResult<()>;

    fn delete(&mut self, table: &Table, key: &Value) -> RepoResult<()>;

    /// Inserts raw mappings without building model instances.
    fn bulk_insert(&mut self, table: &Table, records: &[Record]) -> RepoResult<PendingCommit>;

    /// Applies raw mappings keyed by their primary-key entry.
    fn bulk_update(&mut self, table: &Table, records: &[Record]) -> RepoResult<PendingCommit>;

    fn commit(&mut self) -> RepoResult<()>;

    fn rollback(&mut self) -> RepoResult<()>;

    /// Whether writes are waiting for `commit`.
    fn has_pending_writes(&self) -> bool;

    /// Column names of a table, or `None` when the table does not exist.
    fn table_columns(&mut self, table_name: &str) -> RepoResult<Option<Vec<String>>>;

    /// Re-reads a row from storage, picking up generated values.
    fn refresh(&mut self, table: &Table, key: &Value) -> RepoResult<Record> {
        self.get(table, key)?
            .ok_or_else(|| RepoError::missing(table.entity, key_label(key)))
    }
}

/// Rows written by a bulk operation that are not durable yet.
#[must_use = "bulk writes are not durable until the session commits"]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PendingCommit {
    rows: usize,
}

impl PendingCommit {
    pub fn new(rows: usize) -> Self {
        Self { rows }
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    /// Commits `session` and returns the number of rows this marker covered.
    pub fn commit<S: UnitOfWork + ?Sized>(self, session: &mut S) -> RepoResult<usize> {
        session.commit()?;
        Ok(self.rows)
    }
}

/// Human-readable form of a key for error messages.
pub(crate) fn key_label(key: &Value) -> String {
    match key {
        Value::String(raw) => raw.clone(),
        other => other.to_string(),
    }
}
