use thiserror::Error;

#[cfg(feature = "sqlite")]
use deadpool_sqlite::rusqlite;

/// Unified error type for every failure the transaction layer can surface.
///
/// Driver and pool errors pass through transparently; the remaining variants
/// cover the crate's own failure taxonomy: precondition failures detected
/// before a statement reaches the database (`ParameterMismatch`), row-mapper
/// failures (`MappingError`), and configuration/connection/execution problems.
#[derive(Debug, Error)]
pub enum SqlTransactError {
    #[cfg(feature = "postgres")]
    #[error(transparent)]
    PostgresError(#[from] tokio_postgres::Error),

    #[cfg(feature = "sqlite")]
    #[error(transparent)]
    SqliteError(#[from] rusqlite::Error),

    #[cfg(feature = "postgres")]
    #[error(transparent)]
    PoolErrorPostgres(#[from] deadpool_postgres::PoolError),

    #[cfg(feature = "sqlite")]
    #[error(transparent)]
    PoolErrorSqlite(#[from] deadpool_sqlite::PoolError),

    #[error("configuration error: {0}")]
    ConfigError(String),

    #[error("connection error: {0}")]
    ConnectionError(String),

    /// The declared value list does not match the statement's placeholder
    /// count. Raised before the statement is sent to the database.
    #[error("parameter count mismatch: statement expects {expected}, {provided} provided")]
    ParameterMismatch { expected: usize, provided: usize },

    #[error("row mapping error: {0}")]
    MappingError(String),

    #[error("SQL execution error: {0}")]
    ExecutionError(String),
}
