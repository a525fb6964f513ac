use std::fs::File;
use std::io::BufReader;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::SqlTransactError;
use crate::types::DatabaseType;

fn default_generated_key_support() -> bool {
    true
}

/// Explicit database configuration, constructed once and passed by value into
/// pool construction. There is no process-wide configuration state.
///
/// For Postgres, `database_url` is a connection string understood by
/// `tokio_postgres` (user/password fields override the url when set). For
/// SQLite it is the database file path.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DbConfig {
    pub database_type: DatabaseType,
    pub database_url: String,
    #[serde(default)]
    pub database_user: Option<String>,
    #[serde(default)]
    pub database_password: Option<String>,
    /// Whether mutating statements request database-generated keys. Read once
    /// per pool; every transaction builder created from the pool inherits it.
    #[serde(default = "default_generated_key_support")]
    pub generated_key_support: bool,
}

impl DbConfig {
    pub fn new(database_type: DatabaseType, database_url: impl Into<String>) -> Self {
        Self {
            database_type,
            database_url: database_url.into(),
            database_user: None,
            database_password: None,
            generated_key_support: true,
        }
    }

    #[must_use]
    pub fn with_user(mut self, user: impl Into<String>) -> Self {
        self.database_user = Some(user.into());
        self
    }

    #[must_use]
    pub fn with_password(mut self, password: impl Into<String>) -> Self {
        self.database_password = Some(password.into());
        self
    }

    #[must_use]
    pub fn with_generated_key_support(mut self, enabled: bool) -> Self {
        self.generated_key_support = enabled;
        self
    }

    /// Load a configuration from a JSON file.
    ///
    /// # Errors
    /// Returns `SqlTransactError::ConfigError` if the file cannot be read or
    /// does not parse as a configuration document.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, SqlTransactError> {
        let path = path.as_ref();
        let file = File::open(path).map_err(|e| {
            SqlTransactError::ConfigError(format!("cannot open {}: {e}", path.display()))
        })?;
        let config: DbConfig = serde_json::from_reader(BufReader::new(file)).map_err(|e| {
            SqlTransactError::ConfigError(format!("cannot parse {}: {e}", path.display()))
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Validate that the required fields are present.
    ///
    /// # Errors
    /// Returns `SqlTransactError::ConfigError` naming the first missing field.
    pub fn validate(&self) -> Result<(), SqlTransactError> {
        if self.database_url.trim().is_empty() {
            return Err(SqlTransactError::ConfigError(
                "database_url is required".to_string(),
            ));
        }
        Ok(())
    }
}
