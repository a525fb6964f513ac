use deadpool_sqlite::{Config as DeadpoolSqliteConfig, Runtime};

use crate::error::SqlTransactError;
use crate::pool::{BackendPool, TransactPool};
use crate::types::DatabaseType;

/// Options for configuring a SQLite pool.
#[derive(Debug, Clone)]
pub struct SqliteOptions {
    pub db_path: String,
    pub generated_key_support: bool,
    pub max_connections: Option<usize>,
}

impl SqliteOptions {
    #[must_use]
    pub fn new(db_path: impl Into<String>) -> Self {
        Self {
            db_path: db_path.into(),
            generated_key_support: true,
            max_connections: None,
        }
    }

    #[must_use]
    pub fn with_generated_key_support(mut self, enabled: bool) -> Self {
        self.generated_key_support = enabled;
        self
    }

    #[must_use]
    pub fn with_max_connections(mut self, max: usize) -> Self {
        self.max_connections = Some(max);
        self
    }
}

/// Fluent builder for SQLite options.
#[derive(Debug, Clone)]
pub struct SqliteOptionsBuilder {
    opts: SqliteOptions,
}

impl SqliteOptionsBuilder {
    #[must_use]
    pub fn new(db_path: impl Into<String>) -> Self {
        Self {
            opts: SqliteOptions::new(db_path),
        }
    }

    #[must_use]
    pub fn generated_key_support(mut self, enabled: bool) -> Self {
        self.opts.generated_key_support = enabled;
        self
    }

    #[must_use]
    pub fn max_connections(mut self, max: usize) -> Self {
        self.opts.max_connections = Some(max);
        self
    }

    #[must_use]
    pub fn finish(self) -> SqliteOptions {
        self.opts
    }

    /// Build a [`TransactPool`] for SQLite.
    ///
    /// # Errors
    /// Returns `SqlTransactError` if pool creation or the initial pragma
    /// setup fails.
    pub async fn build(self) -> Result<TransactPool, SqlTransactError> {
        TransactPool::new_sqlite(self.finish()).await
    }
}

impl TransactPool {
    #[must_use]
    pub fn sqlite_builder(db_path: impl Into<String>) -> SqliteOptionsBuilder {
        SqliteOptionsBuilder::new(db_path)
    }

    /// Asynchronous initializer for a SQLite-backed [`TransactPool`].
    ///
    /// # Errors
    /// Returns `SqlTransactError::ConnectionError` if pool creation or the
    /// initial pragma setup fails.
    pub async fn new_sqlite(opts: SqliteOptions) -> Result<Self, SqlTransactError> {
        let mut cfg = DeadpoolSqliteConfig::new(opts.db_path.clone());
        if let Some(max) = opts.max_connections {
            cfg.pool = Some(deadpool::managed::PoolConfig::new(max));
        }

        let pool = cfg.create_pool(Runtime::Tokio1).map_err(|e| {
            SqlTransactError::ConnectionError(format!("failed to create SQLite pool: {e}"))
        })?;

        // WAL keeps readers and the single writer from blocking each other.
        {
            let conn = pool.get().await.map_err(SqlTransactError::PoolErrorSqlite)?;
            conn.interact(|conn| {
                conn.execute_batch("PRAGMA journal_mode = WAL;")
                    .map_err(SqlTransactError::SqliteError)
            })
            .await??;
        }

        Ok(TransactPool {
            pool: BackendPool::Sqlite(pool),
            db_type: DatabaseType::Sqlite,
            generated_key_support: opts.generated_key_support,
        })
    }
}

/// Convert `InteractError` to a more specific `SqlTransactError`
impl From<deadpool_sqlite::InteractError> for SqlTransactError {
    fn from(err: deadpool_sqlite::InteractError) -> Self {
        SqlTransactError::ConnectionError(format!("SQLite interact error: {err}"))
    }
}
