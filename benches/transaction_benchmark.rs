use criterion::{criterion_group, criterion_main, Criterion};
use sql_transact::prelude::*;
use tempfile::tempdir;
use tokio::runtime::Runtime;

fn unique_db_path(prefix: &str) -> String {
    let dir = tempdir().expect("tempdir");
    let path = dir.path().join(format!("{prefix}.db"));
    // Leak the tempdir so the file persists for the duration of the bench run.
    std::mem::forget(dir);
    path.to_string_lossy().into_owned()
}

fn person_row(row: &Row) -> Result<(String, i64), SqlTransactError> {
    Ok((
        row.try_get("name")?
            .as_text()
            .ok_or_else(|| SqlTransactError::MappingError("name is not text".into()))?
            .to_owned(),
        *row.try_get("age")?
            .as_int()
            .ok_or_else(|| SqlTransactError::MappingError("age is not an integer".into()))?,
    ))
}

async fn setup_pool(prefix: &str) -> TransactPool {
    let pool = TransactPool::sqlite_builder(unique_db_path(prefix))
        .build()
        .await
        .expect("pool");
    run_transaction(&pool, |tx| {
        Box::pin(async move {
            tx.batch(
                "CREATE TABLE person (
                     id INTEGER PRIMARY KEY AUTOINCREMENT,
                     name TEXT NOT NULL,
                     age INTEGER NOT NULL
                 );",
            )
            .await?;
            Ok(())
        })
    })
    .await
    .expect("schema");
    pool
}

fn insert_transaction(c: &mut Criterion) {
    let rt = Runtime::new().expect("runtime");
    let pool = rt.block_on(setup_pool("bench_insert"));

    c.bench_function("transaction_insert_one_row", |b| {
        b.to_async(&rt).iter(|| async {
            run_transaction(&pool, |tx| {
                Box::pin(async move {
                    tx.insert(
                        Statement::new("INSERT INTO person (name, age) VALUES (?1, ?2)")
                            .bind("zeon")
                            .bind(20_i64),
                    )
                    .await?;
                    Ok(())
                })
            })
            .await
            .expect("insert tx");
        });
    });
}

fn query_transaction(c: &mut Criterion) {
    let rt = Runtime::new().expect("runtime");
    let pool = rt.block_on(async {
        let pool = setup_pool("bench_query").await;
        run_transaction(&pool, |tx| {
            Box::pin(async move {
                tx.insert(
                    Statement::new("INSERT INTO person (name, age) VALUES (?1, ?2)")
                        .bind("zeon111")
                        .bind(20_i64),
                )
                .await?;
                Ok(())
            })
        })
        .await
        .expect("seed");
        pool
    });

    c.bench_function("transaction_query_one_row", |b| {
        b.to_async(&rt).iter(|| async {
            run_transaction(&pool, |tx| {
                Box::pin(async move {
                    tx.query(
                        Statement::new("SELECT name, age FROM person WHERE name = ?1")
                            .bind("zeon111"),
                        person_row,
                    )
                    .await?;
                    Ok(())
                })
            })
            .await
            .expect("query tx");
        });
    });
}

criterion_group!(benches, insert_transaction, query_transaction);
criterion_main!(benches);
