use deadpool_sqlite::rusqlite::types::Value;

use crate::types::RowValues;

/// Convert a single [`RowValues`] into a rusqlite value.
///
/// Timestamps are stored in SQLite's text form; JSON is serialized once.
#[must_use]
pub fn row_value_to_sqlite_value(value: &RowValues) -> Value {
    match value {
        RowValues::Int(i) => Value::Integer(*i),
        RowValues::Float(f) => Value::Real(*f),
        RowValues::Text(s) => Value::Text(s.clone()),
        RowValues::Bool(b) => Value::Integer(i64::from(*b)),
        RowValues::Timestamp(dt) => Value::Text(dt.format("%F %T%.f").to_string()),
        RowValues::Null => Value::Null,
        RowValues::JSON(jval) => Value::Text(jval.to_string()),
        RowValues::Blob(bytes) => Value::Blob(bytes.clone()),
    }
}

/// Convert an ordered parameter list into owned rusqlite values suitable for
/// moving into an interact closure.
#[must_use]
pub fn convert(params: &[RowValues]) -> Vec<Value> {
    params.iter().map(row_value_to_sqlite_value).collect()
}
