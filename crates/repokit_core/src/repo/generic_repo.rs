//! Generic CRUD and filter repository.
//!
//! # Responsibility
//! - Run create/read/update/delete for any [`Model`] through a caller-owned
//!   [`UnitOfWork`].
//! - Translate [`Criteria`] into queries and convert rows to the read shape.
//!
//! # Invariants
//! - `create`, `update*` and `delete` commit eagerly; bulk operations never do.
//! - Every row handed back is decoded as the stored shape first, then rebuilt
//!   as the read shape from the stored shape's full field mapping.
//! - Keyed writes on an absent row fail with `MissingEntry`.

use super::{RepoError, RepoResult};
use crate::model::{from_record, id_value, to_record, Model, Record, Table};
use crate::query::{plan_filter, Criteria, FilterPlan, SelectQuery};
use crate::session::{PendingCommit, UnitOfWork};
use log::{debug, warn};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::fmt::{Debug, Formatter};
use std::marker::PhantomData;

/// Page size used by callers that do not pick one.
pub const DEFAULT_PAGE_LIMIT: u64 = 100;

/// Result of [`GenericRepository::filter_by`], shaped by its `one` flag.
#[derive(Debug, Clone, PartialEq)]
pub enum Filtered<R> {
    One(Option<R>),
    Many(Vec<R>),
}

impl<R> Filtered<R> {
    pub fn into_one(self) -> Option<R> {
        match self {
            Self::One(item) => item,
            Self::Many(items) => items.into_iter().next(),
        }
    }

    pub fn into_many(self) -> Vec<R> {
        match self {
            Self::One(item) => item.into_iter().collect(),
            Self::Many(items) => items,
        }
    }
}

/// Repository bound to a stored shape `M`, a create-input shape `C` and a
/// read shape `R`.
///
/// Holds no state; one instance can serve any number of sessions.
pub struct GenericRepository<M, C, R> {
    _shapes: PhantomData<fn() -> (M, C, R)>,
}

impl<M, C, R> GenericRepository<M, C, R>
where
    M: Model,
    C: Serialize,
    R: DeserializeOwned,
{
    pub fn new() -> Self {
        Self {
            _shapes: PhantomData,
        }
    }

    pub fn table(&self) -> Table {
        M::TABLE
    }

    /// Inserts `input`, commits, and returns the stored row as read shape.
    pub fn create<S: UnitOfWork + ?Sized>(&self, session: &mut S, input: &C) -> RepoResult<R> {
        let table = M::TABLE;
        let entity: M = from_record(to_record(input)?)?;
        let key = session.add(&table, &to_record(&entity)?)?;
        session.commit()?;

        let created = self.decode(session.refresh(&table, &key)?)?;
        debug!(
            "event=repo_create module=repo status=ok entity={} key={key}",
            table.entity
        );
        self.read(&created)
    }

    /// Queues raw mappings for insertion; the caller must commit.
    pub fn create_bulk<S: UnitOfWork + ?Sized>(
        &self,
        session: &mut S,
        entities: &[Record],
    ) -> RepoResult<PendingCommit> {
        session.bulk_insert(&M::TABLE, entities)
    }

    /// Loads every row, in storage order.
    pub fn get_all<S: UnitOfWork + ?Sized>(&self, session: &mut S) -> RepoResult<Vec<R>> {
        let rows = session.select(&M::TABLE, &SelectQuery::new())?;
        self.read_all(rows)
    }

    pub fn get_paginated<S: UnitOfWork + ?Sized>(
        &self,
        session: &mut S,
        offset: u64,
        limit: u64,
    ) -> RepoResult<Vec<R>> {
        let query = SelectQuery::new().offset(offset).limit(limit);
        let rows = session.select(&M::TABLE, &query)?;
        self.read_all(rows)
    }

    /// Looks up one row by primary key.
    ///
    /// With `error` set, an absent row is `RepoError::Missing`; otherwise it
    /// is `Ok(None)`.
    pub fn get_one<S: UnitOfWork + ?Sized>(
        &self,
        session: &mut S,
        id: &M::Id,
        error: bool,
    ) -> RepoResult<Option<R>> {
        let table = M::TABLE;
        match session.get(&table, &id_value(id)?)? {
            Some(row) => Ok(Some(self.read(&self.decode(row)?)?)),
            None if error => Err(RepoError::missing(table.entity, id)),
            None => Ok(None),
        }
    }

    /// Filters rows by `criteria`.
    ///
    /// An unknown field yields `One(None)` / `Many(vec![])` regardless of the
    /// stored rows. Conditions with an unknown operator or a mismatched value
    /// add no constraint. Both cases are logged at `warn`.
    pub fn filter_by<S: UnitOfWork + ?Sized>(
        &self,
        session: &mut S,
        criteria: &Criteria,
        one: bool,
    ) -> RepoResult<Filtered<R>> {
        let table = M::TABLE;
        let plan = match plan_filter(&table, criteria) {
            Ok(plan) => plan,
            Err(err) => {
                warn!(
                    "event=repo_filter module=repo status=invalid entity={} error={err}",
                    table.entity
                );
                return Ok(empty(one));
            }
        };

        for skipped in &plan.skipped {
            warn!(
                "event=repo_filter module=repo status=skipped entity={} error={skipped}",
                table.entity
            );
        }

        self.run_filter(session, plan, one)
    }

    /// Strict [`Self::filter_by`]: malformed criteria are errors.
    pub fn try_filter_by<S: UnitOfWork + ?Sized>(
        &self,
        session: &mut S,
        criteria: &Criteria,
        one: bool,
    ) -> RepoResult<Filtered<R>> {
        let mut plan = plan_filter(&M::TABLE, criteria)?;
        if !plan.skipped.is_empty() {
            return Err(RepoError::InvalidFilter(plan.skipped.remove(0)));
        }
        self.run_filter(session, plan, one)
    }

    pub fn filter_one<S: UnitOfWork + ?Sized>(
        &self,
        session: &mut S,
        criteria: &Criteria,
    ) -> RepoResult<Option<R>> {
        Ok(self.filter_by(session, criteria, true)?.into_one())
    }

    pub fn filter_all<S: UnitOfWork + ?Sized>(
        &self,
        session: &mut S,
        criteria: &Criteria,
    ) -> RepoResult<Vec<R>> {
        Ok(self.filter_by(session, criteria, false)?.into_many())
    }

    /// Partial update from any serializable changes value.
    ///
    /// Only keys present in the serialized mapping are written, so fields
    /// declared as `Option` with `skip_serializing_if = "Option::is_none"`
    /// stay untouched when unset.
    pub fn update<S, U>(&self, session: &mut S, id: &M::Id, changes: &U) -> RepoResult<R>
    where
        S: UnitOfWork + ?Sized,
        U: Serialize + ?Sized,
    {
        self.update_by_keys_dict(session, id, &to_record(changes)?)
    }

    /// Applies `fields` onto the stored row, commits, and returns it.
    ///
    /// Keys that are not registered fields, and the primary key, are ignored.
    pub fn update_by_keys_dict<S: UnitOfWork + ?Sized>(
        &self,
        session: &mut S,
        id: &M::Id,
        fields: &Record,
    ) -> RepoResult<R> {
        let table = M::TABLE;
        let key = id_value(id)?;
        let Some(mut current) = session.get(&table, &key)? else {
            return Err(RepoError::missing(table.entity, id));
        };

        let changed = table
            .known_fields(fields)
            .filter(|(field, _)| field.name != table.primary_key)
            .map(|(field, _)| field.name)
            .collect::<Vec<_>>();
        for name in &changed {
            if let Some(value) = fields.get(*name) {
                current.insert(name.to_string(), value.clone());
            }
        }

        // The merged row must still be a valid stored shape.
        let merged = to_record(&self.decode(current)?)?;
        let changes = changed
            .iter()
            .filter_map(|name| {
                merged
                    .get(*name)
                    .map(|value| (name.to_string(), value.clone()))
            })
            .collect::<Record>();

        session.update(&table, &key, &changes)?;
        session.commit()?;

        let updated = self.decode(session.refresh(&table, &key)?)?;
        debug!(
            "event=repo_update module=repo status=ok entity={} key={key} fields={}",
            table.entity,
            changed.len()
        );
        self.read(&updated)
    }

    /// Applies raw mappings, each carrying its primary key; the caller must
    /// commit.
    pub fn update_bulk<S: UnitOfWork + ?Sized>(
        &self,
        session: &mut S,
        entities: &[Record],
    ) -> RepoResult<PendingCommit> {
        session.bulk_update(&M::TABLE, entities)
    }

    /// Deletes one row by primary key and commits.
    ///
    /// Returns `true` on success; an absent row is `RepoError::Missing`.
    pub fn delete<S: UnitOfWork + ?Sized>(&self, session: &mut S, id: &M::Id) -> RepoResult<bool> {
        let table = M::TABLE;
        let key = id_value(id)?;
        if session.get(&table, &key)?.is_none() {
            return Err(RepoError::missing(table.entity, id));
        }

        session.delete(&table, &key)?;
        session.commit()?;
        debug!(
            "event=repo_delete module=repo status=ok entity={} key={key}",
            table.entity
        );
        Ok(true)
    }

    /// Checks that the backing table and every registered column exist.
    pub fn verify_schema<S: UnitOfWork + ?Sized>(&self, session: &mut S) -> RepoResult<()> {
        let table = M::TABLE;
        let Some(columns) = session.table_columns(table.name)? else {
            return Err(RepoError::MissingRequiredTable(table.name.to_string()));
        };

        if let Some(field) = table
            .fields
            .iter()
            .find(|field| !columns.iter().any(|column| column == field.name))
        {
            return Err(RepoError::MissingRequiredColumn {
                table: table.name.to_string(),
                column: field.name.to_string(),
            });
        }

        Ok(())
    }

    fn run_filter<S: UnitOfWork + ?Sized>(
        &self,
        session: &mut S,
        plan: FilterPlan,
        one: bool,
    ) -> RepoResult<Filtered<R>> {
        let query = SelectQuery::with_constraints(plan.constraints);
        if one {
            let row = session.select_first(&M::TABLE, &query)?;
            let item = match row {
                Some(row) => Some(self.read(&self.decode(row)?)?),
                None => None,
            };
            return Ok(Filtered::One(item));
        }

        let rows = session.select(&M::TABLE, &query)?;
        Ok(Filtered::Many(self.read_all(rows)?))
    }

    fn decode(&self, row: Record) -> RepoResult<M> {
        from_record(row).map_err(|err| {
            RepoError::InvalidData(format!("{} row does not match its shape: {err}", M::TABLE.entity))
        })
    }

    fn read(&self, entry: &M) -> RepoResult<R> {
        Ok(from_record(to_record(entry)?)?)
    }

    fn read_all(&self, rows: Vec<Record>) -> RepoResult<Vec<R>> {
        rows.into_iter()
            .map(|row| self.decode(row).and_then(|entry| self.read(&entry)))
            .collect()
    }
}

fn empty<R>(one: bool) -> Filtered<R> {
    if one {
        Filtered::One(None)
    } else {
        Filtered::Many(Vec::new())
    }
}

impl<M, C, R> Default for GenericRepository<M, C, R>
where
    M: Model,
    C: Serialize,
    R: DeserializeOwned,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<M, C, R> Clone for GenericRepository<M, C, R> {
    fn clone(&self) -> Self {
        Self {
            _shapes: PhantomData,
        }
    }
}

impl<M, C, R> Copy for GenericRepository<M, C, R> {}

impl<M: Model, C, R> Debug for GenericRepository<M, C, R> {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GenericRepository")
            .field("entity", &M::TABLE.entity)
            .field("table", &M::TABLE.name)
            .finish()
    }
}
