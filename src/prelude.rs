//! Convenient imports for common functionality.
//!
//! This module re-exports the types and functions most callers need to
//! declare and run transactions.

pub use crate::config::DbConfig;
pub use crate::error::SqlTransactError;
pub use crate::pool::{BackendConnection, StatementExecutor, TransactPool};
pub use crate::results::{BatchResult, ExecResult, Row, StatementOutcome, TxResults};
pub use crate::statement::{RowMapper, Statement};
pub use crate::transaction::{
    run_transaction, run_transaction_async, TransactionBuilder, TransactionResult,
};
pub use crate::types::{DatabaseType, RowValues};

#[cfg(feature = "sqlite")]
pub use crate::sqlite::{SqliteOptions, SqliteOptionsBuilder};
