//! Connection bootstrap utilities for SQLite.
//!
//! # Responsibility
//! - Open file or in-memory SQLite connections, directly or from
//!   [`ConnectionParams`].
//! - Configure connection pragmas the repository layer relies on.
//!
//! # Invariants
//! - Returned connections have `foreign_keys=ON`.
//! - Returned connections wait up to five seconds on a locked database.
//! - Schema creation is left to the caller.

use super::{ConnectionParams, DbError, DbResult};
use log::{error, info};
use rusqlite::Connection;
use std::path::Path;
use std::time::{Duration, Instant};

const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

/// Opens the database described by `params`.
///
/// A `sqlite` params value without a database name opens an in-memory
/// database, matching the `sqlite://` URI it renders to.
///
/// # Errors
/// - `DbError::UnsupportedEngine` for any engine other than `sqlite`.
pub fn open_db(params: &ConnectionParams) -> DbResult<Connection> {
    if !params.is_sqlite() {
        error!(
            "event=db_open module=db status=error error_code=unsupported_engine engine={}",
            params.engine()
        );
        return Err(DbError::UnsupportedEngine(params.engine().to_string()));
    }

    match params.name() {
        Some(name) => open_db_path(name),
        None => open_db_in_memory(),
    }
}

/// Opens a SQLite database file, creating it when absent.
///
/// # Side effects
/// - Emits `db_open` logging events with duration and status.
pub fn open_db_path(path: impl AsRef<Path>) -> DbResult<Connection> {
    open_with("file", || Connection::open(path))
}

/// Opens a private in-memory SQLite database.
///
/// # Side effects
/// - Emits `db_open` logging events with duration and status.
pub fn open_db_in_memory() -> DbResult<Connection> {
    open_with("memory", Connection::open_in_memory)
}

fn open_with(
    mode: &'static str,
    open: impl FnOnce() -> rusqlite::Result<Connection>,
) -> DbResult<Connection> {
    let started_at = Instant::now();
    info!("event=db_open module=db status=start mode={mode}");

    let conn = open().map_err(|err| {
        error!(
            "event=db_open module=db status=error mode={mode} duration_ms={} error_code=db_open_failed error={err}",
            started_at.elapsed().as_millis()
        );
        DbError::from(err)
    })?;

    if let Err(err) = configure_connection(&conn) {
        error!(
            "event=db_open module=db status=error mode={mode} duration_ms={} error_code=db_configure_failed error={err}",
            started_at.elapsed().as_millis()
        );
        return Err(err);
    }

    info!(
        "event=db_open module=db status=ok mode={mode} duration_ms={}",
        started_at.elapsed().as_millis()
    );
    Ok(conn)
}

fn configure_connection(conn: &Connection) -> DbResult<()> {
    conn.execute_batch("PRAGMA foreign_keys = ON;")?;
    conn.busy_timeout(BUSY_TIMEOUT)?;
    Ok(())
}
