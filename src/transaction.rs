//! The transaction builder and its entry points.
//!
//! A [`TransactionBuilder`] owns one pooled connection for the duration of a
//! logical unit of work, executes the caller's statements against it in
//! declaration order, accumulates one [`StatementOutcome`] per statement, and
//! finalizes with exactly one of COMMIT or ROLLBACK before handing the
//! connection back to the pool.

use futures_util::future::BoxFuture;
use std::mem;
use std::sync::Arc;
use tokio::task::JoinHandle;
use tracing::{debug, trace, warn};

use crate::error::SqlTransactError;
use crate::pool::{BackendConnection, StatementExecutor, TransactPool};
use crate::results::{BatchResult, ExecResult, Mapped, Row, StatementOutcome, TxResults};
use crate::statement::{RowMapper, Statement};
use crate::types::RowValues;

/// Outcome of a whole transaction: the ordered per-statement results on
/// commit, or the first failure's cause on rollback.
pub type TransactionResult = Result<TxResults, SqlTransactError>;

/// The caller-declared transaction block: a closure over the builder that
/// issues statements and returns `Ok(())` to commit.
///
/// Written as `|tx| Box::pin(async move { ... })`.
pub type TransactionBlock<'a> =
    BoxFuture<'a, Result<(), SqlTransactError>>;

#[derive(Debug)]
struct StatementLog {
    sql: String,
    rows_mutated: Option<usize>,
}

/// Sequences statement executions against one exclusively-owned connection
/// and accumulates their results in invocation order.
///
/// The builder is poisoned by the first statement failure: every later
/// operation fails fast and [`commit`](Self::commit) rolls back instead, so a
/// partially-failed transaction can never be partially applied even if the
/// caller discards a statement error. Finalization consumes the builder,
/// which makes a double commit or a commit-after-rollback unrepresentable.
pub struct TransactionBuilder {
    conn: Option<BackendConnection>,
    generated_key_support: bool,
    outcomes: Vec<StatementOutcome>,
    log: Vec<StatementLog>,
    poisoned: bool,
}

impl TransactionBuilder {
    /// Open a transaction on the given connection, suspending auto-commit
    /// until finalize.
    ///
    /// # Errors
    /// Returns the driver error if the transaction cannot be started.
    pub async fn begin(
        conn: BackendConnection,
        generated_key_support: bool,
    ) -> Result<Self, SqlTransactError> {
        conn.begin().await?;
        Ok(Self {
            conn: Some(conn),
            generated_key_support,
            outcomes: Vec::new(),
            log: Vec::new(),
            poisoned: false,
        })
    }

    fn conn(&self) -> Result<&BackendConnection, SqlTransactError> {
        if self.poisoned {
            return Err(SqlTransactError::ExecutionError(
                "transaction poisoned by an earlier statement failure".into(),
            ));
        }
        self.conn.as_ref().ok_or_else(|| {
            SqlTransactError::ExecutionError("transaction already finalized".into())
        })
    }

    /// Run a fallible step, poisoning the builder on failure so no further
    /// statement can execute and commit is refused.
    fn guard<T>(&mut self, result: Result<T, SqlTransactError>) -> Result<T, SqlTransactError> {
        if result.is_err() {
            self.poisoned = true;
        }
        result
    }

    async fn dml(
        &mut self,
        stmt: &Statement,
    ) -> Result<(usize, Option<Row>), SqlTransactError> {
        let want_keys = self.generated_key_support;
        let result = self
            .conn()?
            .execute_dml(stmt.sql(), stmt.values(), want_keys)
            .await;
        let (rows, key) = self.guard(result)?;
        self.log.push(StatementLog {
            sql: stmt.sql().to_owned(),
            rows_mutated: Some(rows),
        });
        Ok((rows, key))
    }

    async fn select(&mut self, stmt: &Statement) -> Result<Vec<Row>, SqlTransactError> {
        let result = self.conn()?.execute_select(stmt.sql(), stmt.values()).await;
        let rows = self.guard(result)?;
        self.log.push(StatementLog {
            sql: stmt.sql().to_owned(),
            rows_mutated: None,
        });
        Ok(rows)
    }

    /// Execute a mutating statement and record its affected row count.
    ///
    /// A statement with zero placeholders and zero bound values doubles as a
    /// raw exec.
    ///
    /// # Errors
    /// Returns a precondition error on parameter-arity mismatch, otherwise
    /// the driver's execution error.
    pub async fn exec(
        &mut self,
        stmt: impl Into<Statement>,
    ) -> Result<ExecResult, SqlTransactError> {
        let stmt = stmt.into();
        let (rows_mutated, _key) = self.dml(&stmt).await?;
        self.outcomes.push(StatementOutcome::Exec {
            rows_mutated,
            transformed: None,
        });
        Ok(ExecResult {
            rows_mutated,
            transformed: None,
        })
    }

    /// Alias of [`exec`](Self::exec) for readability at call sites.
    pub async fn insert(
        &mut self,
        stmt: impl Into<Statement>,
    ) -> Result<ExecResult, SqlTransactError> {
        self.exec(stmt).await
    }

    /// Alias of [`exec`](Self::exec) for readability at call sites.
    pub async fn update(
        &mut self,
        stmt: impl Into<Statement>,
    ) -> Result<ExecResult, SqlTransactError> {
        self.exec(stmt).await
    }

    /// Alias of [`exec`](Self::exec) for readability at call sites.
    pub async fn delete(
        &mut self,
        stmt: impl Into<Statement>,
    ) -> Result<ExecResult, SqlTransactError> {
        self.exec(stmt).await
    }

    /// Execute a mutating statement and transform its generated-key row with
    /// `mapper`.
    ///
    /// `transformed` is populated only when the pool enables generated-key
    /// support and the database produced a key row (SQLite: the
    /// `last_insert_rowid` of an INSERT, surfaced as a one-column `rowid`
    /// row; Postgres: the first row of a `RETURNING` clause). The mapped
    /// value is also stored in the ordered result list, hence the `Clone`
    /// bound.
    ///
    /// # Errors
    /// Returns a precondition error on parameter-arity mismatch, the driver's
    /// execution error, or the mapper's mapping error.
    pub async fn exec_with_key<T, M>(
        &mut self,
        stmt: impl Into<Statement>,
        mapper: M,
    ) -> Result<ExecResult<T>, SqlTransactError>
    where
        T: Clone + Send + 'static,
        M: RowMapper<T>,
    {
        let stmt = stmt.into();
        let (rows_mutated, key) = self.dml(&stmt).await?;
        let transformed = match key {
            Some(row) => {
                let mapped = mapper.map_row(&row);
                Some(self.guard(mapped)?)
            }
            None => None,
        };
        self.outcomes.push(StatementOutcome::Exec {
            rows_mutated,
            transformed: transformed.clone().map(|t| Box::new(t) as Mapped),
        });
        Ok(ExecResult {
            rows_mutated,
            transformed,
        })
    }

    /// Alias of [`exec_with_key`](Self::exec_with_key).
    pub async fn insert_with_key<T, M>(
        &mut self,
        stmt: impl Into<Statement>,
        mapper: M,
    ) -> Result<ExecResult<T>, SqlTransactError>
    where
        T: Clone + Send + 'static,
        M: RowMapper<T>,
    {
        self.exec_with_key(stmt, mapper).await
    }

    /// Alias of [`exec_with_key`](Self::exec_with_key).
    pub async fn update_with_key<T, M>(
        &mut self,
        stmt: impl Into<Statement>,
        mapper: M,
    ) -> Result<ExecResult<T>, SqlTransactError>
    where
        T: Clone + Send + 'static,
        M: RowMapper<T>,
    {
        self.exec_with_key(stmt, mapper).await
    }

    /// Alias of [`exec_with_key`](Self::exec_with_key).
    pub async fn delete_with_key<T, M>(
        &mut self,
        stmt: impl Into<Statement>,
        mapper: M,
    ) -> Result<ExecResult<T>, SqlTransactError>
    where
        T: Clone + Send + 'static,
        M: RowMapper<T>,
    {
        self.exec_with_key(stmt, mapper).await
    }

    /// Execute a statement expected to return at most one meaningful row and
    /// map that row.
    ///
    /// Returns `Ok(None)` for an empty cursor; extra rows beyond the first
    /// are ignored.
    ///
    /// # Errors
    /// Returns a precondition error on parameter-arity mismatch, the driver's
    /// execution error, or the mapper's mapping error.
    pub async fn query<T, M>(
        &mut self,
        stmt: impl Into<Statement>,
        mapper: M,
    ) -> Result<Option<T>, SqlTransactError>
    where
        T: Clone + Send + 'static,
        M: RowMapper<T>,
    {
        let stmt = stmt.into();
        let rows = self.select(&stmt).await?;
        if rows.len() > 1 {
            trace!(sql = stmt.sql(), rows = rows.len(), "query returned more than one row; first wins");
        }
        let mapped = match rows.first() {
            Some(row) => {
                let value = mapper.map_row(row);
                Some(self.guard(value)?)
            }
            None => None,
        };
        self.outcomes.push(StatementOutcome::Single(
            mapped.clone().map(|t| Box::new(t) as Mapped),
        ));
        Ok(mapped)
    }

    /// Execute a statement and map every row of its cursor, in cursor order.
    ///
    /// An empty cursor yields an empty vec, never an error.
    ///
    /// # Errors
    /// Returns a precondition error on parameter-arity mismatch, the driver's
    /// execution error, or the mapper's mapping error for the first row it
    /// rejects.
    pub async fn query_list<T, M>(
        &mut self,
        stmt: impl Into<Statement>,
        mapper: M,
    ) -> Result<Vec<T>, SqlTransactError>
    where
        T: Clone + Send + 'static,
        M: RowMapper<T>,
    {
        let stmt = stmt.into();
        let rows = self.select(&stmt).await?;
        let mut mapped = Vec::with_capacity(rows.len());
        for row in &rows {
            let value = mapper.map_row(row);
            mapped.push(self.guard(value)?);
        }
        self.outcomes
            .push(StatementOutcome::List(Box::new(mapped.clone()) as Mapped));
        Ok(mapped)
    }

    /// Execute one prepared statement once per parameter row.
    ///
    /// The statement is prepared a single time; each row of `param_rows` is
    /// arity-checked and bound in order.
    ///
    /// # Errors
    /// Returns a precondition error on the first arity mismatch, otherwise
    /// the driver's execution error.
    pub async fn exec_batch(
        &mut self,
        sql: &str,
        param_rows: &[Vec<RowValues>],
    ) -> Result<BatchResult, SqlTransactError> {
        let result = self.conn()?.execute_many(sql, param_rows).await;
        let rows_mutated = self.guard(result)?;
        self.log.push(StatementLog {
            sql: sql.to_owned(),
            rows_mutated: Some(rows_mutated.iter().sum()),
        });
        self.outcomes.push(StatementOutcome::Batch {
            rows_mutated: rows_mutated.clone(),
        });
        Ok(BatchResult { rows_mutated })
    }

    /// Execute a multi-statement script (no parameters) inside the
    /// transaction. Useful for schema setup.
    ///
    /// # Errors
    /// Returns the driver's execution error.
    pub async fn batch(&mut self, sql: &str) -> Result<(), SqlTransactError> {
        let result = self.conn()?.execute_script(sql).await;
        self.guard(result)?;
        self.log.push(StatementLog {
            sql: sql.to_owned(),
            rows_mutated: None,
        });
        self.outcomes.push(StatementOutcome::Exec {
            rows_mutated: 0,
            transformed: None,
        });
        Ok(())
    }

    /// Number of statements executed so far.
    #[must_use]
    pub fn statement_count(&self) -> usize {
        self.outcomes.len()
    }

    /// Report the executed statement set. Observability only; not part of
    /// the correctness contract.
    fn report(&mut self) {
        for entry in self.log.drain(..) {
            match entry.rows_mutated {
                Some(rows) => debug!(sql = %entry.sql, rows_mutated = rows, "statement executed"),
                None => debug!(sql = %entry.sql, "statement executed"),
            }
        }
    }

    /// Commit the transaction, consuming the builder and releasing the
    /// connection back to its pool.
    ///
    /// A poisoned builder rolls back instead and reports the refusal.
    ///
    /// # Errors
    /// Returns the driver error if the commit fails (the transaction is
    /// rolled back in that case) or an execution error for a poisoned
    /// builder.
    pub async fn commit(mut self) -> Result<TxResults, SqlTransactError> {
        let conn = self.conn.take().ok_or_else(|| {
            SqlTransactError::ExecutionError("transaction already finalized".into())
        })?;
        self.report();
        if self.poisoned {
            if let Err(e) = conn.rollback().await {
                warn!(error = %e, "rollback of poisoned transaction failed");
            }
            return Err(SqlTransactError::ExecutionError(
                "commit refused: transaction poisoned by an earlier statement failure; rolled back"
                    .into(),
            ));
        }
        match conn.commit().await {
            Ok(()) => {
                debug!(statements = self.outcomes.len(), "transaction committed");
                Ok(TxResults::new(mem::take(&mut self.outcomes)))
            }
            Err(e) => {
                if let Err(rb) = conn.rollback().await {
                    warn!(error = %rb, "rollback after failed commit also failed");
                }
                Err(e)
            }
        }
    }

    /// Roll back the transaction, consuming the builder and releasing the
    /// connection back to its pool.
    ///
    /// # Errors
    /// Returns the driver error if the rollback itself fails.
    pub async fn rollback(mut self) -> Result<(), SqlTransactError> {
        let conn = self.conn.take().ok_or_else(|| {
            SqlTransactError::ExecutionError("transaction already finalized".into())
        })?;
        self.report();
        let result = conn.rollback().await;
        if result.is_ok() {
            debug!("transaction rolled back");
        }
        result
    }
}

impl Drop for TransactionBuilder {
    fn drop(&mut self) {
        // Normal finalize takes the connection; anything left here was
        // abandoned mid-transaction (early return, panic, task abort).
        if let Some(conn) = self.conn.take() {
            warn!("transaction dropped while running; rolling back");
            if let Ok(handle) = tokio::runtime::Handle::try_current() {
                handle.spawn(async move {
                    if let Err(e) = conn.rollback().await {
                        warn!(error = %e, "rollback on drop failed");
                    }
                });
            }
        }
    }
}

/// Run a transaction block against a connection checked out from `pool`.
///
/// The block's statements execute in declaration order on one connection.
/// When the block returns `Ok(())` the transaction commits and the ordered
/// per-statement results are returned; any failure (statement, mapper,
/// commit) rolls the transaction back and is returned as the `Err` cause,
/// never re-raised: callers inspect the returned [`TransactionResult`]. If
/// the block unwinds instead, the drop guard still rolls the transaction
/// back and releases the connection.
///
/// ```rust,no_run
/// # use sql_transact::prelude::*;
/// # async fn demo(pool: TransactPool) -> TransactionResult {
/// run_transaction(&pool, |tx| {
///     Box::pin(async move {
///         tx.insert(
///             Statement::new("INSERT INTO person (name, age) VALUES (?1, ?2)")
///                 .bind("zeon")
///                 .bind(20_i64),
///         )
///         .await?;
///         Ok(())
///     })
/// })
/// .await
/// # }
/// ```
pub async fn run_transaction<F>(pool: &TransactPool, block: F) -> TransactionResult
where
    F: for<'a> FnOnce(&'a mut TransactionBuilder) -> TransactionBlock<'a>,
{
    let conn = pool.get_connection().await?;
    let mut tx = TransactionBuilder::begin(conn, pool.generated_key_support()).await?;
    match block(&mut tx).await {
        Ok(()) => tx.commit().await,
        Err(cause) => {
            if let Err(e) = tx.rollback().await {
                warn!(error = %e, "rollback failed; returning original cause");
            }
            Err(cause)
        }
    }
}

/// Schedule [`run_transaction`] onto a worker task and return its handle.
///
/// Pure scheduling wrapper: atomicity, ordering, and finalize semantics are
/// unchanged. Each spawned transaction acquires its own connection, so any
/// number may run concurrently. The handle resolves to the
/// [`TransactionResult`]; only scheduling-level failures (cancellation,
/// panic) surface as a `JoinError`.
pub fn run_transaction_async<F>(
    pool: Arc<TransactPool>,
    block: F,
) -> JoinHandle<TransactionResult>
where
    F: for<'a> FnOnce(&'a mut TransactionBuilder) -> TransactionBlock<'a> + Send + 'static,
{
    tokio::spawn(async move { run_transaction(&pool, block).await })
}
