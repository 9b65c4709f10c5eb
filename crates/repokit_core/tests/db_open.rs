use repokit_core::db::{open_db, open_db_in_memory, open_db_path};
use repokit_core::{ConnectionParams, ConnectionSettings, DbError};

fn pragma_i64(conn: &rusqlite::Connection, name: &str) -> i64 {
    conn.query_row(&format!("PRAGMA {name}"), [], |row| row.get(0))
        .unwrap()
}

#[test]
fn in_memory_connection_is_configured() {
    let conn = open_db_in_memory().unwrap();
    assert_eq!(pragma_i64(&conn, "foreign_keys"), 1);
    assert_eq!(pragma_i64(&conn, "busy_timeout"), 5000);
}

#[test]
fn params_with_file_name_open_that_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("store.db");
    let params = ConnectionParams::sqlite(path.to_str()).unwrap();

    {
        let conn = open_db(&params).unwrap();
        conn.execute_batch("CREATE TABLE marker (id INTEGER PRIMARY KEY);")
            .unwrap();
    }

    assert!(path.exists());
    let reopened = open_db_path(&path).unwrap();
    let tables: i64 = reopened
        .query_row(
            "SELECT COUNT(*) FROM sqlite_master WHERE type = 'table' AND name = 'marker'",
            [],
            |row| row.get(0),
        )
        .unwrap();
    assert_eq!(tables, 1);
}

#[test]
fn params_without_name_open_in_memory() {
    let params = ConnectionParams::sqlite(None).unwrap();
    let conn = open_db(&params).unwrap();
    assert_eq!(pragma_i64(&conn, "foreign_keys"), 1);
}

#[test]
fn network_engines_are_not_opened_in_process() {
    let settings = ConnectionSettings {
        driver: Some("psycopg2".to_string()),
        host: Some("db".to_string()),
        port: Some(5432),
        username: Some("app".to_string()),
        password: Some("secret".to_string()),
        name: Some("app".to_string()),
        ..ConnectionSettings::new("postgresql")
    };
    let params = ConnectionParams::new(settings).unwrap();

    let err = open_db(&params).unwrap_err();
    assert!(matches!(err, DbError::UnsupportedEngine(engine) if engine == "postgresql"));
}
