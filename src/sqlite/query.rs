use std::sync::Arc;

use deadpool_sqlite::rusqlite;
use deadpool_sqlite::rusqlite::types::Value;
use deadpool_sqlite::rusqlite::Statement;

use crate::error::SqlTransactError;
use crate::results::{Columns, Row};
use crate::types::RowValues;

/// Extract one column of a SQLite row as a [`RowValues`].
///
/// # Errors
/// Returns `SqlTransactError` if the value cannot be read.
pub fn extract_value(row: &rusqlite::Row, idx: usize) -> Result<RowValues, SqlTransactError> {
    let value: Value = row.get(idx).map_err(SqlTransactError::SqliteError)?;
    match value {
        Value::Null => Ok(RowValues::Null),
        Value::Integer(i) => Ok(RowValues::Int(i)),
        Value::Real(f) => Ok(RowValues::Float(f)),
        Value::Text(s) => Ok(RowValues::Text(s)),
        Value::Blob(b) => Ok(RowValues::Blob(b)),
    }
}

/// Run a prepared SELECT and materialize every row in cursor order.
///
/// Column metadata is captured once and shared by all rows.
///
/// # Errors
/// Returns `SqlTransactError` if execution or value extraction fails.
pub fn build_rows(stmt: &mut Statement, params: &[Value]) -> Result<Vec<Row>, SqlTransactError> {
    let column_names: Vec<String> = stmt
        .column_names()
        .iter()
        .map(ToString::to_string)
        .collect();
    let columns = Arc::new(Columns::new(column_names));
    let column_count = columns.len();

    let mut out = Vec::new();
    let mut rows = stmt.query(rusqlite::params_from_iter(params.iter()))?;
    while let Some(row) = rows.next()? {
        let mut values = Vec::with_capacity(column_count);
        for idx in 0..column_count {
            values.push(extract_value(row, idx)?);
        }
        out.push(Row::new(Arc::clone(&columns), values));
    }

    Ok(out)
}
