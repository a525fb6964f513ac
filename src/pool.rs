use async_trait::async_trait;

use crate::config::DbConfig;
use crate::error::SqlTransactError;
use crate::results::Row;
use crate::types::{DatabaseType, RowValues};

#[cfg(feature = "postgres")]
use crate::postgres;
#[cfg(feature = "sqlite")]
use crate::sqlite;

/// Connection pool for one of the supported database engines.
#[derive(Debug, Clone)]
pub enum BackendPool {
    /// PostgreSQL connection pool
    #[cfg(feature = "postgres")]
    Postgres(deadpool_postgres::Pool),
    /// SQLite connection pool
    #[cfg(feature = "sqlite")]
    Sqlite(deadpool_sqlite::Pool),
}

/// A connection pool together with the per-pool execution policy every
/// transaction built from it inherits.
///
/// This is the only resource shared between concurrent transactions; each
/// transaction checks out its own connection and owns it exclusively until
/// finalize returns it.
#[derive(Debug, Clone)]
pub struct TransactPool {
    pub(crate) pool: BackendPool,
    pub(crate) db_type: DatabaseType,
    pub(crate) generated_key_support: bool,
}

impl TransactPool {
    /// Build a pool from an explicit configuration value.
    ///
    /// # Errors
    /// Returns `SqlTransactError::ConfigError` for invalid or unsupported
    /// configurations, `SqlTransactError::ConnectionError` if pool creation
    /// fails.
    pub async fn from_config(config: DbConfig) -> Result<Self, SqlTransactError> {
        config.validate()?;
        match &config.database_type {
            #[cfg(feature = "postgres")]
            DatabaseType::Postgres => Self::new_postgres(&config),
            #[cfg(feature = "sqlite")]
            DatabaseType::Sqlite => {
                Self::new_sqlite(
                    sqlite::SqliteOptions::new(config.database_url.clone())
                        .with_generated_key_support(config.generated_key_support),
                )
                .await
            }
            #[allow(unreachable_patterns)]
            other => Err(SqlTransactError::ConfigError(format!(
                "crate built without support for {other:?}"
            ))),
        }
    }

    #[must_use]
    pub fn database_type(&self) -> &DatabaseType {
        &self.db_type
    }

    /// Whether mutating statements executed through this pool request
    /// database-generated keys.
    #[must_use]
    pub fn generated_key_support(&self) -> bool {
        self.generated_key_support
    }

    /// Check out one connection for exclusive use.
    ///
    /// # Errors
    /// Returns a pool error if the pool is exhausted or the backend rejects
    /// the connection.
    pub async fn get_connection(&self) -> Result<BackendConnection, SqlTransactError> {
        match &self.pool {
            #[cfg(feature = "postgres")]
            BackendPool::Postgres(pool) => {
                let conn = pool
                    .get()
                    .await
                    .map_err(SqlTransactError::PoolErrorPostgres)?;
                Ok(BackendConnection::Postgres(conn))
            }
            #[cfg(feature = "sqlite")]
            BackendPool::Sqlite(pool) => {
                let conn = pool.get().await.map_err(SqlTransactError::PoolErrorSqlite)?;
                Ok(BackendConnection::Sqlite(conn))
            }
        }
    }
}

/// One checked-out database connection, exclusively owned by a single
/// transaction builder for its whole life. Dropping it returns the
/// underlying connection to its pool.
#[derive(Debug)]
pub enum BackendConnection {
    #[cfg(feature = "postgres")]
    Postgres(deadpool_postgres::Object),
    #[cfg(feature = "sqlite")]
    Sqlite(deadpool_sqlite::Object),
}

impl BackendConnection {
    /// Suspend auto-commit by opening an explicit transaction.
    ///
    /// # Errors
    /// Returns the driver error if the BEGIN cannot be issued.
    pub(crate) async fn begin(&self) -> Result<(), SqlTransactError> {
        match self {
            #[cfg(feature = "postgres")]
            BackendConnection::Postgres(conn) => postgres::begin(conn).await,
            #[cfg(feature = "sqlite")]
            BackendConnection::Sqlite(conn) => sqlite::begin(conn).await,
        }
    }

    /// Commit the open transaction.
    ///
    /// # Errors
    /// Returns the driver error if the COMMIT fails.
    pub(crate) async fn commit(&self) -> Result<(), SqlTransactError> {
        match self {
            #[cfg(feature = "postgres")]
            BackendConnection::Postgres(conn) => postgres::commit(conn).await,
            #[cfg(feature = "sqlite")]
            BackendConnection::Sqlite(conn) => sqlite::commit(conn).await,
        }
    }

    /// Roll back the open transaction.
    ///
    /// # Errors
    /// Returns the driver error if the ROLLBACK fails.
    pub(crate) async fn rollback(&self) -> Result<(), SqlTransactError> {
        match self {
            #[cfg(feature = "postgres")]
            BackendConnection::Postgres(conn) => postgres::rollback(conn).await,
            #[cfg(feature = "sqlite")]
            BackendConnection::Sqlite(conn) => sqlite::rollback(conn).await,
        }
    }
}

/// Statement execution over one exclusively-owned connection, dispatched to
/// the backend modules.
///
/// Every method validates positional-parameter arity against the driver's
/// placeholder count before executing.
#[async_trait]
pub trait StatementExecutor {
    /// Execute a single DML statement. Returns the affected row count and,
    /// when `want_keys` is set and the backend produced one, the
    /// generated-key row.
    async fn execute_dml(
        &self,
        sql: &str,
        params: &[RowValues],
        want_keys: bool,
    ) -> Result<(usize, Option<Row>), SqlTransactError>;

    /// Execute a single SELECT statement and materialize every row in cursor
    /// order.
    async fn execute_select(
        &self,
        sql: &str,
        params: &[RowValues],
    ) -> Result<Vec<Row>, SqlTransactError>;

    /// Execute a prepared DML statement once per parameter row, returning the
    /// affected count for each execution in order.
    async fn execute_many(
        &self,
        sql: &str,
        param_rows: &[Vec<RowValues>],
    ) -> Result<Vec<usize>, SqlTransactError>;

    /// Execute a multi-statement script with no parameters.
    async fn execute_script(&self, sql: &str) -> Result<(), SqlTransactError>;
}

#[async_trait]
impl StatementExecutor for BackendConnection {
    async fn execute_dml(
        &self,
        sql: &str,
        params: &[RowValues],
        want_keys: bool,
    ) -> Result<(usize, Option<Row>), SqlTransactError> {
        match self {
            #[cfg(feature = "postgres")]
            BackendConnection::Postgres(conn) => {
                postgres::execute_dml(conn, sql, params, want_keys).await
            }
            #[cfg(feature = "sqlite")]
            BackendConnection::Sqlite(conn) => {
                sqlite::execute_dml(conn, sql, params, want_keys).await
            }
        }
    }

    async fn execute_select(
        &self,
        sql: &str,
        params: &[RowValues],
    ) -> Result<Vec<Row>, SqlTransactError> {
        match self {
            #[cfg(feature = "postgres")]
            BackendConnection::Postgres(conn) => postgres::execute_select(conn, sql, params).await,
            #[cfg(feature = "sqlite")]
            BackendConnection::Sqlite(conn) => sqlite::execute_select(conn, sql, params).await,
        }
    }

    async fn execute_many(
        &self,
        sql: &str,
        param_rows: &[Vec<RowValues>],
    ) -> Result<Vec<usize>, SqlTransactError> {
        match self {
            #[cfg(feature = "postgres")]
            BackendConnection::Postgres(conn) => postgres::execute_many(conn, sql, param_rows).await,
            #[cfg(feature = "sqlite")]
            BackendConnection::Sqlite(conn) => sqlite::execute_many(conn, sql, param_rows).await,
        }
    }

    async fn execute_script(&self, sql: &str) -> Result<(), SqlTransactError> {
        match self {
            #[cfg(feature = "postgres")]
            BackendConnection::Postgres(conn) => postgres::execute_script(conn, sql).await,
            #[cfg(feature = "sqlite")]
            BackendConnection::Sqlite(conn) => sqlite::execute_script(conn, sql).await,
        }
    }
}
