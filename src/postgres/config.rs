use deadpool_postgres::{Manager, ManagerConfig, Pool, RecyclingMethod};
use tokio_postgres::NoTls;

use crate::config::DbConfig;
use crate::error::SqlTransactError;
use crate::pool::{BackendPool, TransactPool};
use crate::types::DatabaseType;

const DEFAULT_POOL_SIZE: usize = 16;

impl TransactPool {
    /// Initializer for a Postgres-backed [`TransactPool`].
    ///
    /// `database_url` must be a connection string `tokio_postgres`
    /// understands; explicit `database_user`/`database_password` fields
    /// override whatever the url carries.
    ///
    /// # Errors
    /// Returns `SqlTransactError::ConfigError` if the url does not parse or
    /// required fields are missing, `SqlTransactError::ConnectionError` if
    /// pool creation fails.
    pub fn new_postgres(config: &DbConfig) -> Result<Self, SqlTransactError> {
        config.validate()?;

        let mut pg_config: tokio_postgres::Config =
            config.database_url.parse().map_err(|e| {
                SqlTransactError::ConfigError(format!("invalid postgres url: {e}"))
            })?;
        if let Some(user) = &config.database_user {
            pg_config.user(user);
        }
        if let Some(password) = &config.database_password {
            pg_config.password(password);
        }
        if pg_config.get_user().is_none() {
            return Err(SqlTransactError::ConfigError("user is required".to_string()));
        }
        if pg_config.get_dbname().is_none() {
            return Err(SqlTransactError::ConfigError(
                "dbname is required".to_string(),
            ));
        }

        let manager = Manager::from_config(
            pg_config,
            NoTls,
            ManagerConfig {
                recycling_method: RecyclingMethod::Fast,
            },
        );
        let pool = Pool::builder(manager)
            .max_size(DEFAULT_POOL_SIZE)
            .build()
            .map_err(|e| {
                SqlTransactError::ConnectionError(format!("failed to create Postgres pool: {e}"))
            })?;

        Ok(TransactPool {
            pool: BackendPool::Postgres(pool),
            db_type: DatabaseType::Postgres,
            generated_key_support: config.generated_key_support,
        })
    }
}
