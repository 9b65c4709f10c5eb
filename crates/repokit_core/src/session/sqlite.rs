//! SQLite implementation of [`UnitOfWork`].
//!
//! # Responsibility
//! - Execute repository statements on a borrowed `rusqlite::Connection`.
//! - Decode rows into field mappings using each table's field registry.
//!
//! # Invariants
//! - The first write opens a transaction; nothing is durable until `commit`.
//! - Dropping a session rolls back uncommitted writes it started.
//! - A transaction opened by the caller is joined, never nested.
//! - A failed bulk call leaves none of its rows pending.

use super::{PendingCommit, UnitOfWork};
use crate::model::{decode_column, Record, Table};
use crate::query::sql::{self, Statement};
use crate::query::SelectQuery;
use crate::repo::{RepoError, RepoResult};
use log::{debug, error, warn};
use rusqlite::{params_from_iter, Connection};
use serde_json::Value;

/// Unit of work over one SQLite connection.
#[derive(Debug)]
pub struct SqliteSession<'conn> {
    conn: &'conn Connection,
    began: bool,
}

impl<'conn> SqliteSession<'conn> {
    pub fn new(conn: &'conn Connection) -> Self {
        Self { conn, began: false }
    }

    pub fn connection(&self) -> &'conn Connection {
        self.conn
    }

    fn begin_write(&mut self) -> RepoResult<()> {
        if self.conn.is_autocommit() {
            self.conn.execute_batch("BEGIN;")?;
            self.began = true;
            debug!("event=session_begin module=session status=ok");
        }
        Ok(())
    }

    fn execute(&mut self, (sql, params): Statement) -> RepoResult<usize> {
        self.begin_write()?;
        let mut stmt = self.conn.prepare_cached(&sql)?;
        Ok(stmt.execute(params_from_iter(params))?)
    }

    fn query(&self, table: &Table, (sql, params): Statement) -> RepoResult<Vec<Record>> {
        let mut stmt = self.conn.prepare_cached(&sql)?;
        let mut rows = stmt.query(params_from_iter(params))?;
        let mut records = Vec::new();

        while let Some(row) = rows.next()? {
            let mut record = Record::new();
            for (index, field) in table.fields.iter().enumerate() {
                let value = decode_column(field.kind, row.get_ref(index)?).map_err(|message| {
                    RepoError::InvalidData(format!("{}.{}: {message}", table.name, field.name))
                })?;
                record.insert(field.name.to_string(), value);
            }
            records.push(record);
        }

        Ok(records)
    }

    /// Runs `write` inside a savepoint and undoes all of it on error.
    fn in_savepoint<T>(
        &mut self,
        table: &Table,
        write: impl FnOnce(&mut Self) -> RepoResult<T>,
    ) -> RepoResult<T> {
        self.begin_write()?;
        self.conn.execute_batch("SAVEPOINT repokit_bulk;")?;

        match write(self) {
            Ok(value) => {
                self.conn.execute_batch("RELEASE repokit_bulk;")?;
                Ok(value)
            }
            Err(err) => {
                warn!(
                    "event=session_bulk module=session status=rollback table={} error={err}",
                    table.name
                );
                if let Err(undo) = self
                    .conn
                    .execute_batch("ROLLBACK TO repokit_bulk; RELEASE repokit_bulk;")
                {
                    error!(
                        "event=session_bulk module=session status=error table={} error={undo}",
                        table.name
                    );
                }
                Err(err)
            }
        }
    }

    fn insert_row(&mut self, table: &Table, record: &Record) -> RepoResult<Value> {
        // A null key is left out so SQLite can assign the rowid.
        let values = table
            .known_fields(record)
            .filter(|(field, value)| !(field.name == table.primary_key && value.is_null()));
        let statement = sql::insert(table, values)?;
        self.execute(statement)?;

        match record.get(table.primary_key) {
            Some(key) if !key.is_null() => Ok(key.clone()),
            _ => Ok(Value::from(self.conn.last_insert_rowid())),
        }
    }

    fn update_row(&mut self, table: &Table, key: &Value, changes: &Record) -> RepoResult<usize> {
        let values = table
            .known_fields(changes)
            .filter(|(field, _)| field.name != table.primary_key);
        match sql::update_by_key(table, key, values)? {
            Some(statement) => self.execute(statement),
            None => Ok(0),
        }
    }
}

impl UnitOfWork for SqliteSession<'_> {
    fn get(&mut self, table: &Table, key: &Value) -> RepoResult<Option<Record>> {
        let statement = sql::select_by_key(table, key)?;
        Ok(self.query(table, statement)?.into_iter().next())
    }

    fn select(&mut self, table: &Table, query: &SelectQuery) -> RepoResult<Vec<Record>> {
        let statement = sql::select(table, query)?;
        self.query(table, statement)
    }

    fn add(&mut self, table: &Table, record: &Record) -> RepoResult<Value> {
        let key = self.insert_row(table, record)?;
        debug!(
            "event=session_add module=session status=ok table={} key={key}",
            table.name
        );
        Ok(key)
    }

    fn update(&mut self, table: &Table, key: &Value, changes: &Record) -> RepoResult<()> {
        let changed = self.update_row(table, key, changes)?;
        debug!(
            "event=session_update module=session status=ok table={} key={key} changed={changed}",
            table.name
        );
        Ok(())
    }

    fn delete(&mut self, table: &Table, key: &Value) -> RepoResult<()> {
        let changed = self.execute(sql::delete_by_key(table, key)?)?;
        debug!(
            "event=session_delete module=session status=ok table={} key={key} changed={changed}",
            table.name
        );
        Ok(())
    }

    fn bulk_insert(&mut self, table: &Table, records: &[Record]) -> RepoResult<PendingCommit> {
        self.in_savepoint(table, |session| {
            records
                .iter()
                .try_for_each(|record| session.insert_row(table, record).map(|_| ()))
        })?;
        debug!(
            "event=session_bulk_insert module=session status=pending table={} rows={}",
            table.name,
            records.len()
        );
        Ok(PendingCommit::new(records.len()))
    }

    fn bulk_update(&mut self, table: &Table, records: &[Record]) -> RepoResult<PendingCommit> {
        let changed = self.in_savepoint(table, |session| {
            let mut changed = 0;
            for record in records {
                let key = match record.get(table.primary_key) {
                    Some(key) if !key.is_null() => key,
                    _ => {
                        return Err(RepoError::InvalidData(format!(
                            "bulk update mapping for `{}` has no `{}` value",
                            table.name, table.primary_key
                        )))
                    }
                };
                changed += session.update_row(table, key, record)?;
            }
            Ok(changed)
        })?;
        debug!(
            "event=session_bulk_update module=session status=pending table={} rows={changed}",
            table.name
        );
        Ok(PendingCommit::new(changed))
    }

    fn commit(&mut self) -> RepoResult<()> {
        if !self.conn.is_autocommit() {
            self.conn.execute_batch("COMMIT;")?;
            debug!("event=session_commit module=session status=ok");
        }
        self.began = false;
        Ok(())
    }

    fn rollback(&mut self) -> RepoResult<()> {
        if !self.conn.is_autocommit() {
            self.conn.execute_batch("ROLLBACK;")?;
            debug!("event=session_rollback module=session status=ok");
        }
        self.began = false;
        Ok(())
    }

    fn has_pending_writes(&self) -> bool {
        !self.conn.is_autocommit()
    }

    fn table_columns(&mut self, table_name: &str) -> RepoResult<Option<Vec<String>>> {
        let mut stmt = self
            .conn
            .prepare_cached("SELECT name FROM pragma_table_info(?1)")?;
        let names = stmt
            .query_map([table_name], |row| row.get::<_, String>(0))?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(if names.is_empty() { None } else { Some(names) })
    }
}

impl Drop for SqliteSession<'_> {
    fn drop(&mut self) {
        if !self.began || self.conn.is_autocommit() {
            return;
        }

        warn!("event=session_drop module=session status=rollback reason=uncommitted_writes");
        if let Err(err) = self.conn.execute_batch("ROLLBACK;") {
            error!("event=session_drop module=session status=error error={err}");
        }
    }
}
