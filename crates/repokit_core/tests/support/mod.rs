#![allow(dead_code)]

use repokit_core::db::open_db_in_memory;
use repokit_core::{Field, GenericRepository, Model, Table};
use rusqlite::Connection;
use serde::{Deserialize, Serialize};

pub const USERS_SCHEMA: &str = "
CREATE TABLE users (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    name TEXT NOT NULL,
    age INTEGER NOT NULL,
    active INTEGER NOT NULL DEFAULT 1,
    tags TEXT
);";

/// Stored shape.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    pub id: Option<i64>,
    pub name: String,
    pub age: i64,
    pub active: bool,
    #[serde(default)]
    pub tags: Option<Vec<String>>,
}

impl Model for User {
    type Id = i64;

    const TABLE: Table = Table {
        entity: "User",
        name: "users",
        primary_key: "id",
        fields: &[
            Field::integer("id"),
            Field::text("name"),
            Field::integer("age"),
            Field::boolean("active"),
            Field::json("tags"),
        ],
    };
}

/// Create-input shape.
#[derive(Debug, Clone, Serialize)]
pub struct NewUser {
    pub name: String,
    pub age: i64,
    pub active: bool,
}

/// Read shape.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct UserView {
    pub id: i64,
    pub name: String,
    pub age: i64,
    pub active: bool,
}

/// Sparse changes; unset fields are left out of the mapping.
#[derive(Debug, Default, Serialize)]
pub struct UserChanges {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub age: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub active: Option<bool>,
}

pub type UserRepo = GenericRepository<User, NewUser, UserView>;

pub fn new_user(name: &str, age: i64) -> NewUser {
    NewUser {
        name: name.to_string(),
        age,
        active: true,
    }
}

pub fn users_db() -> Connection {
    let conn = open_db_in_memory().unwrap();
    conn.execute_batch(USERS_SCHEMA).unwrap();
    conn
}

pub fn count_users(conn: &Connection) -> i64 {
    conn.query_row("SELECT COUNT(*) FROM users", [], |row| row.get(0))
        .unwrap()
}
