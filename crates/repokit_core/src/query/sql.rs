//! SQLite statement text for the generic repository.
//!
//! # Invariants
//! - Every identifier is checked against `^[A-Za-z_][A-Za-z0-9_]*$` and
//!   double-quoted; values are always bound, never inlined.
//! - `= NULL` / `!= NULL` compile to `IS NULL` / `IS NOT NULL`.
//! - An empty `IN` list matches nothing.

use super::select::{Comparison, Constraint, SelectQuery};
use crate::model::{encode_value, Field, Table};
use once_cell::sync::Lazy;
use regex::Regex;
use rusqlite::types::Value as SqlValue;
use serde_json::Value;
use std::error::Error;
use std::fmt::{Display, Formatter};

static IDENTIFIER: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*$").expect("identifier pattern is valid")
});

/// Statement text plus positional bind values.
pub type Statement = (String, Vec<SqlValue>);

/// An identifier that cannot be safely quoted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IdentifierError(pub String);

impl Display for IdentifierError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "invalid SQL identifier `{}`", self.0)
    }
}

impl Error for IdentifierError {}

pub fn quote_identifier(ident: &str) -> Result<String, IdentifierError> {
    if IDENTIFIER.is_match(ident) {
        Ok(format!("\"{ident}\""))
    } else {
        Err(IdentifierError(ident.to_string()))
    }
}

fn column_list(table: &Table) -> Result<String, IdentifierError> {
    let columns = table
        .fields
        .iter()
        .map(|field| quote_identifier(field.name))
        .collect::<Result<Vec<_>, _>>()?;
    Ok(columns.join(", "))
}

/// `SELECT <registered columns> FROM <table> [WHERE ...] [LIMIT ? [OFFSET ?]]`.
pub fn select(table: &Table, query: &SelectQuery) -> Result<Statement, IdentifierError> {
    let mut sql = format!(
        "SELECT {} FROM {}",
        column_list(table)?,
        quote_identifier(table.name)?
    );
    let mut params = Vec::new();

    let terms = query
        .constraints()
        .iter()
        .map(|constraint| where_term(constraint, &mut params))
        .collect::<Result<Vec<_>, _>>()?;
    if !terms.is_empty() {
        sql.push_str(" WHERE ");
        sql.push_str(&terms.join(" AND "));
    }

    match (query.limit_value(), query.offset_value()) {
        (Some(limit), offset) => {
            sql.push_str(" LIMIT ?");
            params.push(SqlValue::Integer(clamp_i64(limit)));
            if let Some(offset) = offset.filter(|offset| *offset > 0) {
                sql.push_str(" OFFSET ?");
                params.push(SqlValue::Integer(clamp_i64(offset)));
            }
        }
        (None, Some(offset)) if offset > 0 => {
            sql.push_str(" LIMIT -1 OFFSET ?");
            params.push(SqlValue::Integer(clamp_i64(offset)));
        }
        (None, _) => {}
    }

    Ok((sql, params))
}

/// Primary-key lookup returning at most one row.
pub fn select_by_key(table: &Table, key: &Value) -> Result<Statement, IdentifierError> {
    let field = key_field(table)?;
    let query = SelectQuery::new()
        .filter(Constraint::compare(field, Comparison::Eq, key.clone()))
        .limit(1);
    select(table, &query)
}

/// `INSERT` of the registered fields present in `values`.
pub fn insert<'f, 'v>(
    table: &Table,
    values: impl IntoIterator<Item = (&'f Field, &'v Value)>,
) -> Result<Statement, IdentifierError> {
    let mut columns = Vec::new();
    let mut params = Vec::new();
    for (field, value) in values {
        columns.push(quote_identifier(field.name)?);
        params.push(encode_value(field.kind, value));
    }

    let table_name = quote_identifier(table.name)?;
    if columns.is_empty() {
        return Ok((format!("INSERT INTO {table_name} DEFAULT VALUES"), params));
    }

    let placeholders = (1..=columns.len())
        .map(|index| format!("?{index}"))
        .collect::<Vec<_>>();
    Ok((
        format!(
            "INSERT INTO {table_name} ({}) VALUES ({})",
            columns.join(", "),
            placeholders.join(", ")
        ),
        params,
    ))
}

/// `UPDATE ... SET` of the given fields for one primary key.
///
/// Returns `None` when there is nothing to set.
pub fn update_by_key<'f, 'v>(
    table: &Table,
    key: &Value,
    values: impl IntoIterator<Item = (&'f Field, &'v Value)>,
) -> Result<Option<Statement>, IdentifierError> {
    let mut assignments = Vec::new();
    let mut params = Vec::new();
    for (field, value) in values {
        params.push(encode_value(field.kind, value));
        assignments.push(format!("{} = ?{}", quote_identifier(field.name)?, params.len()));
    }
    if assignments.is_empty() {
        return Ok(None);
    }

    let field = key_field(table)?;
    params.push(encode_value(field.kind, key));
    Ok(Some((
        format!(
            "UPDATE {} SET {} WHERE {} = ?{}",
            quote_identifier(table.name)?,
            assignments.join(", "),
            quote_identifier(field.name)?,
            params.len()
        ),
        params,
    )))
}

pub fn delete_by_key(table: &Table, key: &Value) -> Result<Statement, IdentifierError> {
    let field = key_field(table)?;
    Ok((
        format!(
            "DELETE FROM {} WHERE {} = ?1",
            quote_identifier(table.name)?,
            quote_identifier(field.name)?
        ),
        vec![encode_value(field.kind, key)],
    ))
}

fn key_field(table: &Table) -> Result<&'static Field, IdentifierError> {
    table
        .primary_key_field()
        .ok_or_else(|| IdentifierError(table.primary_key.to_string()))
}

fn where_term(
    constraint: &Constraint,
    params: &mut Vec<SqlValue>,
) -> Result<String, IdentifierError> {
    let field = constraint.field();
    let column = quote_identifier(field.name)?;

    let term = match constraint {
        Constraint::Compare {
            op: Comparison::Eq,
            value: Value::Null,
            ..
        } => format!("{column} IS NULL"),
        Constraint::Compare {
            op: Comparison::NotEq,
            value: Value::Null,
            ..
        } => format!("{column} IS NOT NULL"),
        Constraint::Compare { op, value, .. } => {
            params.push(encode_value(field.kind, value));
            format!("{column} {} ?", op.sql())
        }
        Constraint::In { values, .. } if values.is_empty() => "1 = 0".to_string(),
        Constraint::In { values, .. } => {
            params.extend(values.iter().map(|value| encode_value(field.kind, value)));
            let placeholders = vec!["?"; values.len()].join(", ");
            format!("{column} IN ({placeholders})")
        }
        Constraint::Like { pattern, .. } => {
            params.push(SqlValue::Text(pattern.clone()));
            format!("{column} LIKE ?")
        }
        Constraint::Between { low, high, .. } => {
            params.push(encode_value(field.kind, low));
            params.push(encode_value(field.kind, high));
            format!("{column} BETWEEN ? AND ?")
        }
    };

    Ok(term)
}

fn clamp_i64(value: u64) -> i64 {
    i64::try_from(value).unwrap_or(i64::MAX)
}

#[cfg(test)]
mod tests {
    use super::{delete_by_key, insert, quote_identifier, select, update_by_key};
    use crate::model::{Field, Table};
    use crate::query::select::{Comparison, Constraint, SelectQuery};
    use rusqlite::types::Value as SqlValue;
    use serde_json::json;

    const FIELDS: &[Field] = &[
        Field::integer("id"),
        Field::text("name"),
        Field::boolean("active"),
    ];

    const USERS: Table = Table {
        entity: "User",
        name: "users",
        primary_key: "id",
        fields: FIELDS,
    };

    #[test]
    fn plain_select_lists_registered_columns() {
        let (sql, params) = select(&USERS, &SelectQuery::new()).unwrap();
        assert_eq!(sql, "SELECT \"id\", \"name\", \"active\" FROM \"users\"");
        assert!(params.is_empty());
    }

    #[test]
    fn select_with_constraints_and_page() {
        let query = SelectQuery::new()
            .filter(Constraint::compare(&FIELDS[1], Comparison::NotEq, json!("bob")))
            .filter(Constraint::compare(&FIELDS[2], Comparison::Eq, json!(true)))
            .offset(20)
            .limit(10);

        let (sql, params) = select(&USERS, &query).unwrap();
        assert_eq!(
            sql,
            "SELECT \"id\", \"name\", \"active\" FROM \"users\" WHERE \"name\" != ? AND \"active\" = ? LIMIT ? OFFSET ?"
        );
        assert_eq!(
            params,
            vec![
                SqlValue::Text("bob".to_string()),
                SqlValue::Integer(1),
                SqlValue::Integer(10),
                SqlValue::Integer(20),
            ]
        );
    }

    #[test]
    fn offset_without_limit_uses_unbounded_limit() {
        let (sql, params) = select(&USERS, &SelectQuery::new().offset(5)).unwrap();
        assert!(sql.ends_with(" LIMIT -1 OFFSET ?"));
        assert_eq!(params, vec![SqlValue::Integer(5)]);
    }

    #[test]
    fn null_equality_and_empty_membership() {
        let query = SelectQuery::new()
            .filter(Constraint::compare(&FIELDS[1], Comparison::Eq, json!(null)))
            .filter(Constraint::In {
                field: &FIELDS[0],
                values: vec![],
            });

        let (sql, params) = select(&USERS, &query).unwrap();
        assert!(sql.ends_with("WHERE \"name\" IS NULL AND 1 = 0"));
        assert!(params.is_empty());
    }

    #[test]
    fn between_and_like_bind_values() {
        let query = SelectQuery::new()
            .filter(Constraint::Between {
                field: &FIELDS[0],
                low: json!(2),
                high: json!(4),
            })
            .filter(Constraint::Like {
                field: &FIELDS[1],
                pattern: "a%".to_string(),
            });

        let (sql, params) = select(&USERS, &query).unwrap();
        assert!(sql.ends_with("WHERE \"id\" BETWEEN ? AND ? AND \"name\" LIKE ?"));
        assert_eq!(params.len(), 3);
    }

    #[test]
    fn write_statements_use_numbered_placeholders() {
        let name = json!("ann");
        let active = json!(false);

        let (sql, _) = insert(&USERS, [(&FIELDS[1], &name), (&FIELDS[2], &active)]).unwrap();
        assert_eq!(
            sql,
            "INSERT INTO \"users\" (\"name\", \"active\") VALUES (?1, ?2)"
        );

        let (sql, params) = update_by_key(&USERS, &json!(7), [(&FIELDS[1], &name)])
            .unwrap()
            .unwrap();
        assert_eq!(sql, "UPDATE \"users\" SET \"name\" = ?1 WHERE \"id\" = ?2");
        assert_eq!(params[1], SqlValue::Integer(7));

        let (sql, _) = delete_by_key(&USERS, &json!(7)).unwrap();
        assert_eq!(sql, "DELETE FROM \"users\" WHERE \"id\" = ?1");
    }

    #[test]
    fn update_without_values_is_skipped() {
        let nothing: [(&Field, &serde_json::Value); 0] = [];
        assert!(update_by_key(&USERS, &json!(1), nothing).unwrap().is_none());
    }

    #[test]
    fn rejects_unsafe_identifiers() {
        assert!(quote_identifier("users; drop").is_err());
        assert!(quote_identifier("1abc").is_err());
        assert_eq!(quote_identifier("_ok9").unwrap(), "\"_ok9\"");
    }
}
