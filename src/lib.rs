//! Transaction-scoped SQL execution with ordered results.
//!
//! A caller declares a sequence of parameterized statements against one
//! borrowed connection; they commit together on success, roll back together
//! on any failure, and each statement's result is collected in declaration
//! order:
//!
//! ```rust,no_run
//! use sql_transact::prelude::*;
//!
//! # async fn demo() -> Result<(), SqlTransactError> {
//! let pool = TransactPool::sqlite_builder("people.db").build().await?;
//!
//! let results = run_transaction(&pool, |tx| {
//!     Box::pin(async move {
//!         tx.insert(
//!             Statement::new("INSERT INTO person (name, age) VALUES (?1, ?2)")
//!                 .bind("zeon")
//!                 .bind(20_i64),
//!         )
//!         .await?;
//!         tx.query(
//!             Statement::new("SELECT id, name, age FROM person WHERE name = ?1").bind("zeon"),
//!             |row: &Row| {
//!                 row.try_get("age")?.as_int().copied().ok_or_else(|| {
//!                     SqlTransactError::MappingError("age is not an integer".into())
//!                 })
//!             },
//!         )
//!         .await?;
//!         Ok(())
//!     })
//! })
//! .await?;
//!
//! assert_eq!(results.rows_mutated(0), Some(1));
//! assert_eq!(results.single::<i64>(1), Some(&20));
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod error;
pub mod pool;
pub mod prelude;
pub mod results;
pub mod statement;
pub mod transaction;
pub mod types;

#[cfg(feature = "postgres")]
pub mod postgres;
#[cfg(feature = "sqlite")]
pub mod sqlite;

pub use config::DbConfig;
pub use error::SqlTransactError;
pub use pool::{BackendConnection, BackendPool, StatementExecutor, TransactPool};
pub use results::{BatchResult, Columns, ExecResult, Row, StatementOutcome, TxResults};
pub use statement::{RowMapper, Statement};
pub use transaction::{
    run_transaction, run_transaction_async, TransactionBuilder, TransactionResult,
};
pub use types::{DatabaseType, RowValues};
