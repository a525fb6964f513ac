// SQLite backend.
//
// - config: pool setup and options
// - params: RowValues -> rusqlite value conversion
// - query: row materialization
//
// Statements run inside the pool's interact closures; transaction control is
// issued as explicit BEGIN/COMMIT/ROLLBACK on the exclusively-owned pooled
// connection.

pub mod config;
pub mod params;
pub mod query;

use std::time::Duration;

use deadpool_sqlite::rusqlite;
use deadpool_sqlite::Object;

use crate::error::SqlTransactError;
use crate::results::Row;
use crate::statement::check_arity;
use crate::types::RowValues;

pub use config::{SqliteOptions, SqliteOptionsBuilder};

/// How long a connection waits on SQLite's write lock before surfacing
/// `SQLITE_BUSY`. Applied per connection when its transaction begins, so
/// concurrent transactions queue instead of failing immediately.
const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

/// `last_insert_rowid` surfaces as a one-column row under this name.
pub const GENERATED_KEY_COLUMN: &str = "rowid";

fn statement_is_insert(sql: &str) -> bool {
    sql.trim_start()
        .get(..6)
        .is_some_and(|prefix| prefix.eq_ignore_ascii_case("insert"))
}

/// Open a transaction on the pooled connection.
///
/// # Errors
/// Returns `SqlTransactError` if the BEGIN cannot be issued.
pub async fn begin(conn: &Object) -> Result<(), SqlTransactError> {
    conn.interact(|conn| {
        conn.busy_timeout(BUSY_TIMEOUT)
            .map_err(SqlTransactError::SqliteError)?;
        conn.execute_batch("BEGIN")
            .map_err(SqlTransactError::SqliteError)
    })
    .await?
}

/// Commit the open transaction.
///
/// # Errors
/// Returns `SqlTransactError` if the COMMIT fails.
pub async fn commit(conn: &Object) -> Result<(), SqlTransactError> {
    conn.interact(|conn| {
        conn.execute_batch("COMMIT")
            .map_err(SqlTransactError::SqliteError)
    })
    .await?
}

/// Roll back the open transaction.
///
/// # Errors
/// Returns `SqlTransactError` if the ROLLBACK fails.
pub async fn rollback(conn: &Object) -> Result<(), SqlTransactError> {
    conn.interact(|conn| {
        conn.execute_batch("ROLLBACK")
            .map_err(SqlTransactError::SqliteError)
    })
    .await?
}

/// Execute a DML statement.
///
/// When `want_keys` is set and an INSERT changed at least one row, the
/// connection's `last_insert_rowid` is surfaced as a synthetic
/// [`GENERATED_KEY_COLUMN`] row.
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
    let sql = sql.to_owned();
    let values = params::convert(params);
    conn.interact(move |conn| {
        let mut stmt = conn.prepare(&sql)?;
        check_arity(stmt.parameter_count(), values.len())?;
        let rows = stmt.execute(rusqlite::params_from_iter(values.iter()))?;
        let key = if want_keys && rows > 0 && statement_is_insert(&sql) {
            Some(Row::generated_key(
                GENERATED_KEY_COLUMN,
                RowValues::Int(conn.last_insert_rowid()),
            ))
        } else {
            None
        };
        Ok((rows, key))
    })
    .await?
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
    let sql = sql.to_owned();
    let values = params::convert(params);
    conn.interact(move |conn| {
        let mut stmt = conn.prepare(&sql)?;
        check_arity(stmt.parameter_count(), values.len())?;
        query::build_rows(&mut stmt, &values)
    })
    .await?
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
    let sql = sql.to_owned();
    let value_rows: Vec<Vec<rusqlite::types::Value>> =
        param_rows.iter().map(|row| params::convert(row)).collect();
    conn.interact(move |conn| {
        let mut stmt = conn.prepare(&sql)?;
        let mut counts = Vec::with_capacity(value_rows.len());
        for values in &value_rows {
            check_arity(stmt.parameter_count(), values.len())?;
            counts.push(stmt.execute(rusqlite::params_from_iter(values.iter()))?);
        }
        Ok(counts)
    })
    .await?
}

/// Execute a multi-statement script.
///
/// # Errors
/// Returns the driver error if any statement of the script fails.
pub async fn execute_script(conn: &Object, sql: &str) -> Result<(), SqlTransactError> {
    let sql = sql.to_owned();
    conn.interact(move |conn| {
        conn.execute_batch(&sql)
            .map_err(SqlTransactError::SqliteError)
    })
    .await?
}
