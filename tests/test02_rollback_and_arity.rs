#![cfg(feature = "sqlite")]

use sql_transact::prelude::*;
use tempfile::tempdir;

fn unique_db_path(prefix: &str) -> String {
    let dir = tempdir().expect("tempdir");
    let path = dir.path().join(format!("{prefix}.db"));
    // Leak the tempdir so the file persists for the duration of the test binary.
    std::mem::forget(dir);
    path.to_string_lossy().into_owned()
}

async fn unique_person_pool(prefix: &str) -> Result<TransactPool, SqlTransactError> {
    let pool = TransactPool::sqlite_builder(unique_db_path(prefix))
        .build()
        .await?;
    run_transaction(&pool, |tx| {
        Box::pin(async move {
            tx.batch(
                "CREATE TABLE person (
                     id INTEGER PRIMARY KEY AUTOINCREMENT,
                     name TEXT NOT NULL UNIQUE,
                     age INTEGER NOT NULL
                 );",
            )
            .await?;
            Ok(())
        })
    })
    .await?;
    Ok(pool)
}

async fn count_persons(pool: &TransactPool) -> Result<i64, SqlTransactError> {
    let results = run_transaction(pool, |tx| {
        Box::pin(async move {
            tx.query(
                Statement::new("SELECT COUNT(*) AS cnt FROM person"),
                |row: &Row| {
                    row.try_get("cnt")?.as_int().copied().ok_or_else(|| {
                        SqlTransactError::MappingError("cnt is not an integer".into())
                    })
                },
            )
            .await?;
            Ok(())
        })
    })
    .await?;
    Ok(*results.single::<i64>(0).expect("count"))
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn statement_failure_rolls_back_prior_statements() -> Result<(), Box<dyn std::error::Error>>
{
    let pool = unique_person_pool("atomicity").await?;

    let outcome = run_transaction(&pool, |tx| {
        Box::pin(async move {
            tx.insert(
                Statement::new("INSERT INTO person (name, age) VALUES (?1, ?2)")
                    .bind("alice")
                    .bind(30_i64),
            )
            .await?;
            // Violates the UNIQUE constraint and aborts the transaction.
            tx.insert(
                Statement::new("INSERT INTO person (name, age) VALUES (?1, ?2)")
                    .bind("alice")
                    .bind(31_i64),
            )
            .await?;
            Ok(())
        })
    })
    .await;

    assert!(outcome.is_err());
    // The first insert must not be observable after rollback.
    assert_eq!(count_persons(&pool).await?, 0);
    Ok(())
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn parameter_arity_mismatch_is_a_precondition_error()
-> Result<(), Box<dyn std::error::Error>> {
    let pool = unique_person_pool("arity").await?;

    let outcome = run_transaction(&pool, |tx| {
        Box::pin(async move {
            tx.insert(
                Statement::new("INSERT INTO person (name, age) VALUES (?1, ?2)").bind("bob"),
            )
            .await?;
            Ok(())
        })
    })
    .await;

    match outcome {
        Err(SqlTransactError::ParameterMismatch { expected, provided }) => {
            assert_eq!(expected, 2);
            assert_eq!(provided, 1);
        }
        other => panic!("expected ParameterMismatch, got {other:?}"),
    }
    // Nothing reached the database.
    assert_eq!(count_persons(&pool).await?, 0);
    Ok(())
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn poisoned_builder_refuses_further_statements_and_commit()
-> Result<(), Box<dyn std::error::Error>> {
    let pool = unique_person_pool("poison").await?;

    let outcome = run_transaction(&pool, |tx| {
        Box::pin(async move {
            let bad = tx
                .exec(Statement::new("INSERT INTO missing_table (x) VALUES (?1)").bind(1_i64))
                .await;
            assert!(bad.is_err());
            // Swallowing the error must not allow the transaction to continue.
            let refused = tx
                .insert(
                    Statement::new("INSERT INTO person (name, age) VALUES (?1, ?2)")
                        .bind("carol")
                        .bind(25_i64),
                )
                .await;
            assert!(refused.is_err());
            Ok(())
        })
    })
    .await;

    // Commit is refused and the transaction rolls back.
    assert!(outcome.is_err());
    assert_eq!(count_persons(&pool).await?, 0);
    Ok(())
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn mapper_failure_aborts_the_transaction() -> Result<(), Box<dyn std::error::Error>> {
    let pool = unique_person_pool("mapfail").await?;

    let outcome = run_transaction(&pool, |tx| {
        Box::pin(async move {
            tx.insert(
                Statement::new("INSERT INTO person (name, age) VALUES (?1, ?2)")
                    .bind("dave")
                    .bind(41_i64),
            )
            .await?;
            tx.query(
                Statement::new("SELECT id, name, age FROM person WHERE name = ?1").bind("dave"),
                |row: &Row| {
                    // Asks for a column the statement does not produce.
                    row.try_get("salary")?.as_int().copied().ok_or_else(|| {
                        SqlTransactError::MappingError("salary is not an integer".into())
                    })
                },
            )
            .await?;
            Ok(())
        })
    })
    .await;

    match outcome {
        Err(SqlTransactError::MappingError(msg)) => assert!(msg.contains("salary")),
        other => panic!("expected MappingError, got {other:?}"),
    }
    assert_eq!(count_persons(&pool).await?, 0);
    Ok(())
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn connections_are_released_after_success_and_failure()
-> Result<(), Box<dyn std::error::Error>> {
    let pool = TransactPool::sqlite_builder(unique_db_path("release"))
        .max_connections(2)
        .build()
        .await?;
    run_transaction(&pool, |tx| {
        Box::pin(async move {
            tx.batch("CREATE TABLE t (id INTEGER PRIMARY KEY, val TEXT NOT NULL UNIQUE);")
                .await?;
            Ok(())
        })
    })
    .await?;

    // More transactions than pool slots: leaked connections would wedge this.
    for i in 0..8_i64 {
        let ok = run_transaction(&pool, |tx| {
            Box::pin(async move {
                tx.insert(
                    Statement::new("INSERT INTO t (id, val) VALUES (?1, ?2)")
                        .bind(i)
                        .bind(format!("ok-{i}")),
                )
                .await?;
                Ok(())
            })
        })
        .await;
        assert!(ok.is_ok());

        let err = run_transaction(&pool, |tx| {
            Box::pin(async move {
                // Duplicate primary key forces a failure and a rollback.
                tx.insert(
                    Statement::new("INSERT INTO t (id, val) VALUES (?1, ?2)")
                        .bind(i)
                        .bind(format!("dupe-{i}")),
                )
                .await?;
                Ok(())
            })
        })
        .await;
        assert!(err.is_err());
    }

    // The pool must still hand out a connection afterwards.
    let results = run_transaction(&pool, |tx| {
        Box::pin(async move {
            tx.query(
                Statement::new("SELECT COUNT(*) AS cnt FROM t"),
                |row: &Row| {
                    row.try_get("cnt")?.as_int().copied().ok_or_else(|| {
                        SqlTransactError::MappingError("cnt is not an integer".into())
                    })
                },
            )
            .await?;
            Ok(())
        })
    })
    .await?;
    assert_eq!(results.single::<i64>(0), Some(&8));
    Ok(())
}
