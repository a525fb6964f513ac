// Postgres backend.
//
// - config: pool setup from a DbConfig
// - params: ToSql bridging for RowValues
// - query: row materialization
//
// Transaction control is issued as explicit BEGIN/COMMIT/ROLLBACK on the
// exclusively-owned pooled connection; statements are prepared fresh per
// execution so placeholder arity can be checked before anything runs.

pub mod config;
pub mod params;
pub mod query;

use deadpool_postgres::Object;

use crate::error::SqlTransactError;
use crate::results::Row;
use crate::statement::check_arity;
use crate::types::RowValues;

pub use params::Params;

/// Open a transaction on the pooled connection.
///
/// # Errors
/// Returns `SqlTransactError` if the BEGIN cannot be issued.
pub async fn begin(conn: &Object) -> Result<(), SqlTransactError> {
    let client: &tokio_postgres::Client = conn;
    client.batch_execute("BEGIN").await?;
    Ok(())
}

/// Commit the open transaction.
///
/// # Errors
/// Returns `SqlTransactError` if the COMMIT fails.
pub async fn commit(conn: &Object) -> Result<(), SqlTransactError> {
    let client: &tokio_postgres::Client = conn;
    client.batch_execute("COMMIT").await?;
    Ok(())
}

/// Roll back the open transaction.
///
/// # Errors
/// Returns `SqlTransactError` if the ROLLBACK fails.
pub async fn rollback(conn: &Object) -> Result<(), SqlTransactError> {
    let client: &tokio_postgres::Client = conn;
    client.batch_execute("ROLLBACK").await?;
    Ok(())
}

/// Execute a DML statement.
///
/// When `want_keys` is set and the prepared statement declares result
/// columns (a `RETURNING` clause), the statement runs as a query: the row
/// count is the number of returned rows and the first row is surfaced as the
/// generated-key row. Otherwise it runs as a plain execute.
///
/// # Errors
/// Returns a precondition error on parameter-arity mismatch, otherwise the
/// driver error.
pub async fn execute_dml(
    conn: &Object,
    sql: &str,
    params: &[RowValues],
    want_keys: bool,
) -> Result<(usize, Option<Row>), SqlTransactError> {
    let client: &tokio_postgres::Client = conn;
    let stmt = client.prepare(sql).await?;
    check_arity(stmt.params().len(), params.len())?;
    let converted = Params::convert(params);

    if want_keys && !stmt.columns().is_empty() {
        let rows = client.query(&stmt, converted.as_refs()).await?;
        let mut materialized = query::build_rows(&stmt, &rows)?;
        let key = if materialized.is_empty() {
            None
        } else {
            Some(materialized.swap_remove(0))
        };
        Ok((rows.len(), key))
    } else {
        let rows = client.execute(&stmt, converted.as_refs()).await?;
        let rows = usize::try_from(rows).map_err(|e| {
            SqlTransactError::ExecutionError(format!("invalid rows affected count: {e}"))
        })?;
        Ok((rows, None))
    }
}

/// Execute a SELECT statement and materialize every row in cursor order.
///
/// # Errors
/// Returns a precondition error on parameter-arity mismatch, otherwise the
/// driver error.
pub async fn execute_select(
    conn: &Object,
    sql: &str,
    params: &[RowValues],
) -> Result<Vec<Row>, SqlTransactError> {
    let client: &tokio_postgres::Client = conn;
    let stmt = client.prepare(sql).await?;
    check_arity(stmt.params().len(), params.len())?;
    let converted = Params::convert(params);
    let rows = client.query(&stmt, converted.as_refs()).await?;
    query::build_rows(&stmt, &rows)
}

/// Execute one prepared statement once per parameter row.
///
/// # Errors
/// Returns a precondition error on the first arity mismatch, otherwise the
/// driver error.
pub async fn execute_many(
    conn: &Object,
    sql: &str,
    param_rows: &[Vec<RowValues>],
) -> Result<Vec<usize>, SqlTransactError> {
    let client: &tokio_postgres::Client = conn;
    let stmt = client.prepare(sql).await?;
    let mut counts = Vec::with_capacity(param_rows.len());
    for params in param_rows {
        check_arity(stmt.params().len(), params.len())?;
        let converted = Params::convert(params);
        let rows = client.execute(&stmt, converted.as_refs()).await?;
        counts.push(usize::try_from(rows).map_err(|e| {
            SqlTransactError::ExecutionError(format!("invalid rows affected count: {e}"))
        })?);
    }
    Ok(counts)
}

/// Execute a multi-statement script.
///
/// # Errors
/// Returns the driver error if any statement of the script fails.
pub async fn execute_script(conn: &Object, sql: &str) -> Result<(), SqlTransactError> {
    let client: &tokio_postgres::Client = conn;
    client.batch_execute(sql).await?;
    Ok(())
}
