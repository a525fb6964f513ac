use crate::error::SqlTransactError;
use crate::results::Row;
use crate::types::RowValues;

/// A parameterized SQL statement declared by the caller: the SQL text plus
/// its ordered positional values.
///
/// A `Statement` is immutable once handed to the transaction builder and is
/// constructed fresh per invocation; nothing is cached between calls.
///
/// ```rust
/// use sql_transact::prelude::*;
///
/// let stmt = Statement::new("INSERT INTO person (name, age) VALUES (?1, ?2)")
///     .bind("zeon")
///     .bind(20_i64);
/// # let _ = stmt;
/// ```
#[derive(Debug, Clone)]
pub struct Statement {
    sql: String,
    values: Vec<RowValues>,
}

impl Statement {
    /// Create a statement with no bound values.
    pub fn new(sql: impl Into<String>) -> Self {
        Self {
            sql: sql.into(),
            values: Vec::new(),
        }
    }

    /// Append one positional value, preserving declaration order.
    #[must_use]
    pub fn bind(mut self, value: impl Into<RowValues>) -> Self {
        self.values.push(value.into());
        self
    }

    /// Append a sequence of positional values.
    #[must_use]
    pub fn bind_all(mut self, values: impl IntoIterator<Item = RowValues>) -> Self {
        self.values.extend(values);
        self
    }

    /// The SQL text.
    #[must_use]
    pub fn sql(&self) -> &str {
        &self.sql
    }

    /// The bound values in declaration order.
    #[must_use]
    pub fn values(&self) -> &[RowValues] {
        &self.values
    }
}

impl From<&str> for Statement {
    fn from(sql: &str) -> Self {
        Statement::new(sql)
    }
}

impl From<String> for Statement {
    fn from(sql: String) -> Self {
        Statement::new(sql)
    }
}

/// Caller-supplied conversion from one result row to a typed value.
///
/// Implemented for any `Fn(&Row) -> Result<T, SqlTransactError>`, so plain
/// closures and free functions work directly:
///
/// ```rust
/// use sql_transact::prelude::*;
///
/// fn age(row: &Row) -> Result<i64, SqlTransactError> {
///     row.try_get("age")?
///         .as_int()
///         .copied()
///         .ok_or_else(|| SqlTransactError::MappingError("age is not an integer".into()))
/// }
/// # let _ = age;
/// ```
///
/// A mapper error is treated as a statement failure: the transaction aborts
/// and rolls back.
pub trait RowMapper<T> {
    fn map_row(&self, row: &Row) -> Result<T, SqlTransactError>;
}

impl<T, F> RowMapper<T> for F
where
    F: Fn(&Row) -> Result<T, SqlTransactError>,
{
    fn map_row(&self, row: &Row) -> Result<T, SqlTransactError> {
        self(row)
    }
}

/// Positional-binding precondition: a statement may only execute when the
/// declared value count matches the driver-reported placeholder count.
pub(crate) fn check_arity(expected: usize, provided: usize) -> Result<(), SqlTransactError> {
    if expected == provided {
        Ok(())
    } else {
        Err(SqlTransactError::ParameterMismatch { expected, provided })
    }
}
