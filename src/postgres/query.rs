use std::sync::Arc;

use chrono::NaiveDateTime;
use serde_json::Value as JsonValue;
use tokio_postgres::Statement;

use crate::error::SqlTransactError;
use crate::results::{Columns, Row};
use crate::types::RowValues;

/// Extract one column of a Postgres row as a [`RowValues`], dispatching on
/// the column's declared type. Unknown types fall back to text.
///
/// # Errors
/// Returns `SqlTransactError` if the column cannot be read.
pub fn extract_value(
    row: &tokio_postgres::Row,
    idx: usize,
) -> Result<RowValues, SqlTransactError> {
    let type_name = row.columns()[idx].type_().name();
    match type_name {
        "int2" => {
            let val: Option<i16> = row.try_get(idx)?;
            Ok(val.map_or(RowValues::Null, |v| RowValues::Int(i64::from(v))))
        }
        "int4" => {
            let val: Option<i32> = row.try_get(idx)?;
            Ok(val.map_or(RowValues::Null, |v| RowValues::Int(i64::from(v))))
        }
        "int8" => {
            let val: Option<i64> = row.try_get(idx)?;
            Ok(val.map_or(RowValues::Null, RowValues::Int))
        }
        "float4" | "float8" => {
            let val: Option<f64> = row.try_get(idx)?;
            Ok(val.map_or(RowValues::Null, RowValues::Float))
        }
        "bool" => {
            let val: Option<bool> = row.try_get(idx)?;
            Ok(val.map_or(RowValues::Null, RowValues::Bool))
        }
        "timestamp" | "timestamptz" => {
            let val: Option<NaiveDateTime> = row.try_get(idx)?;
            Ok(val.map_or(RowValues::Null, RowValues::Timestamp))
        }
        "json" | "jsonb" => {
            let val: Option<JsonValue> = row.try_get(idx)?;
            Ok(val.map_or(RowValues::Null, RowValues::JSON))
        }
        "bytea" => {
            let val: Option<Vec<u8>> = row.try_get(idx)?;
            Ok(val.map_or(RowValues::Null, RowValues::Blob))
        }
        _ => {
            let val: Option<String> = row.try_get(idx)?;
            Ok(val.map_or(RowValues::Null, RowValues::Text))
        }
    }
}

/// Materialize driver rows using the prepared statement's column metadata,
/// shared by every produced row.
///
/// # Errors
/// Returns `SqlTransactError` if value extraction fails.
pub fn build_rows(
    stmt: &Statement,
    rows: &[tokio_postgres::Row],
) -> Result<Vec<Row>, SqlTransactError> {
    let column_names: Vec<String> = stmt
        .columns()
        .iter()
        .map(|col| col.name().to_string())
        .collect();
    let columns = Arc::new(Columns::new(column_names));
    let column_count = columns.len();

    let mut out = Vec::with_capacity(rows.len());
    for row in rows {
        let mut values = Vec::with_capacity(column_count);
        for idx in 0..column_count {
            values.push(extract_value(row, idx)?);
        }
        out.push(Row::new(Arc::clone(&columns), values));
    }

    Ok(out)
}
