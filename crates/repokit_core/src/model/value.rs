//! Conversion between JSON field values and SQLite storage values.

use super::FieldKind;
use rusqlite::types::{Value as SqlValue, ValueRef};
use serde_json::{Number, Value};

/// Converts a JSON field value into a bindable SQLite value.
///
/// Arrays and objects are stored as JSON text, except byte arrays bound to a
/// `Blob` field.
pub fn encode_value(kind: FieldKind, value: &Value) -> SqlValue {
    match value {
        Value::Null => SqlValue::Null,
        Value::Bool(flag) => SqlValue::Integer(i64::from(*flag)),
        Value::Number(number) => encode_number(number),
        Value::String(text) => SqlValue::Text(text.clone()),
        Value::Array(items) if kind == FieldKind::Blob => match as_bytes(items) {
            Some(bytes) => SqlValue::Blob(bytes),
            None => SqlValue::Text(value.to_string()),
        },
        Value::Array(_) | Value::Object(_) => SqlValue::Text(value.to_string()),
    }
}

/// Decodes one column back into the JSON shape its field kind expects.
///
/// Returns a description of the mismatch when the stored value cannot be
/// represented as `kind`.
pub fn decode_column(kind: FieldKind, column: ValueRef<'_>) -> Result<Value, String> {
    match (kind, column) {
        (_, ValueRef::Null) => Ok(Value::Null),
        (FieldKind::Bool, ValueRef::Integer(raw)) => match raw {
            0 => Ok(Value::Bool(false)),
            1 => Ok(Value::Bool(true)),
            other => Err(format!("expected 0 or 1 for a boolean, got {other}")),
        },
        (FieldKind::Real, ValueRef::Integer(raw)) => Ok(float_value(raw as f64)),
        (_, ValueRef::Integer(raw)) => Ok(Value::from(raw)),
        (_, ValueRef::Real(raw)) => Ok(float_value(raw)),
        (FieldKind::Json, ValueRef::Text(raw)) => serde_json::from_slice(raw)
            .map_err(|err| format!("stored JSON text is malformed: {err}")),
        (_, ValueRef::Text(raw)) => std::str::from_utf8(raw)
            .map(|text| Value::String(text.to_string()))
            .map_err(|_| "stored text is not valid UTF-8".to_string()),
        (_, ValueRef::Blob(raw)) => Ok(Value::Array(
            raw.iter().map(|byte| Value::from(*byte)).collect(),
        )),
    }
}

fn encode_number(number: &Number) -> SqlValue {
    if let Some(int) = number.as_i64() {
        return SqlValue::Integer(int);
    }
    match number.as_f64() {
        Some(float) => SqlValue::Real(float),
        None => SqlValue::Text(number.to_string()),
    }
}

fn float_value(raw: f64) -> Value {
    Number::from_f64(raw).map_or(Value::Null, Value::Number)
}

fn as_bytes(items: &[Value]) -> Option<Vec<u8>> {
    items
        .iter()
        .map(|item| item.as_u64().and_then(|byte| u8::try_from(byte).ok()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::{decode_column, encode_value};
    use crate::model::FieldKind;
    use rusqlite::types::{Value as SqlValue, ValueRef};
    use serde_json::json;

    #[test]
    fn booleans_round_trip_through_integers() {
        assert_eq!(
            encode_value(FieldKind::Bool, &json!(true)),
            SqlValue::Integer(1)
        );
        assert_eq!(
            decode_column(FieldKind::Bool, ValueRef::Integer(0)).unwrap(),
            json!(false)
        );
        assert!(decode_column(FieldKind::Bool, ValueRef::Integer(7)).is_err());
    }

    #[test]
    fn json_fields_are_stored_as_text() {
        let encoded = encode_value(FieldKind::Json, &json!({"tags": ["a"]}));
        assert_eq!(encoded, SqlValue::Text("{\"tags\":[\"a\"]}".to_string()));

        let decoded =
            decode_column(FieldKind::Json, ValueRef::Text(b"{\"tags\":[\"a\"]}")).unwrap();
        assert_eq!(decoded, json!({"tags": ["a"]}));
    }

    #[test]
    fn blob_fields_accept_byte_arrays_only() {
        assert_eq!(
            encode_value(FieldKind::Blob, &json!([1, 2, 255])),
            SqlValue::Blob(vec![1, 2, 255])
        );
        assert_eq!(
            encode_value(FieldKind::Blob, &json!([1, 300])),
            SqlValue::Text("[1,300]".to_string())
        );
        assert_eq!(
            decode_column(FieldKind::Blob, ValueRef::Blob(&[9, 8])).unwrap(),
            json!([9, 8])
        );
    }

    #[test]
    fn real_fields_widen_stored_integers() {
        assert_eq!(
            decode_column(FieldKind::Real, ValueRef::Integer(3)).unwrap(),
            json!(3.0)
        );
        assert_eq!(
            decode_column(FieldKind::Integer, ValueRef::Integer(3)).unwrap(),
            json!(3)
        );
    }
}
