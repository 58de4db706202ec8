use crate::error::StoreError;
use crate::events::Payload;

/// Get a required column value from a row, returning CorruptRow on failure.
pub fn get<T: rusqlite::types::FromSql>(
    row: &rusqlite::Row<'_>,
    idx: usize,
    table: &'static str,
    column: &'static str,
) -> Result<T, StoreError> {
    row.get(idx).map_err(|e| StoreError::CorruptRow {
        table,
        column,
        detail: e.to_string(),
    })
}

/// Get an optional column value.
pub fn get_opt<T: rusqlite::types::FromSql>(
    row: &rusqlite::Row<'_>,
    idx: usize,
    table: &'static str,
    column: &'static str,
) -> Result<Option<T>, StoreError> {
    row.get(idx).map_err(|e| StoreError::CorruptRow {
        table,
        column,
        detail: e.to_string(),
    })
}

/// Decode a stored payload column.
///
/// Absent, empty and `null` payloads decode to an empty map. Anything else
/// must be a JSON object.
pub fn parse_payload(
    raw: Option<&str>,
    table: &'static str,
    column: &'static str,
) -> Result<Payload, StoreError> {
    let raw = match raw.map(str::trim) {
        None | Some("") | Some("null") => return Ok(Payload::new()),
        Some(raw) => raw,
    };
    match serde_json::from_str::<serde_json::Value>(raw) {
        Ok(serde_json::Value::Object(map)) => Ok(map),
        Ok(other) => Err(StoreError::CorruptRow {
            table,
            column,
            detail: format!("expected object, found {}", json_kind(&other)),
        }),
        Err(e) => Err(StoreError::CorruptRow {
            table,
            column,
            detail: format!("invalid JSON: {e}"),
        }),
    }
}

fn json_kind(value: &serde_json::Value) -> &'static str {
    match value {
        serde_json::Value::Null => "null",
        serde_json::Value::Bool(_) => "boolean",
        serde_json::Value::Number(_) => "number",
        serde_json::Value::String(_) => "string",
        serde_json::Value::Array(_) => "array",
        serde_json::Value::Object(_) => "object",
    }
}
