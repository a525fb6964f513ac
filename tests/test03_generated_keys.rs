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

const SCHEMA: &str = "CREATE TABLE person (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    name TEXT NOT NULL,
    age INTEGER NOT NULL
);";

fn key_of(row: &Row) -> Result<i64, SqlTransactError> {
    row.try_get("rowid")?
        .as_int()
        .copied()
        .ok_or_else(|| SqlTransactError::MappingError("rowid is not an integer".into()))
}

#[derive(Debug, Clone, PartialEq)]
struct Person {
    id: i64,
    name: String,
    age: i64,
}

fn person_row(row: &Row) -> Result<Person, SqlTransactError> {
    Ok(Person {
        id: *row
            .try_get("id")?
            .as_int()
            .ok_or_else(|| SqlTransactError::MappingError("id is not an integer".into()))?,
        name: row
            .try_get("name")?
            .as_text()
            .ok_or_else(|| SqlTransactError::MappingError("name is not text".into()))?
            .to_owned(),
        age: *row
            .try_get("age")?
            .as_int()
            .ok_or_else(|| SqlTransactError::MappingError("age is not an integer".into()))?,
    })
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn insert_with_key_round_trips_the_generated_key()
-> Result<(), Box<dyn std::error::Error>> {
    let pool = TransactPool::sqlite_builder(unique_db_path("keys_on"))
        .generated_key_support(true)
        .build()
        .await?;
    run_transaction(&pool, |tx| {
        Box::pin(async move {
            tx.batch(SCHEMA).await?;
            Ok(())
        })
    })
    .await?;

    let results = run_transaction(&pool, |tx| {
        Box::pin(async move {
            let inserted = tx
                .insert_with_key(
                    Statement::new("INSERT INTO person (name, age) VALUES (?1, ?2)")
                        .bind("zeon")
                        .bind(20_i64),
                    key_of,
                )
                .await?;
            let key = inserted.transformed.ok_or_else(|| {
                SqlTransactError::MappingError("expected a generated key".into())
            })?;
            // The key is usable inside the same transaction.
            tx.query(
                Statement::new("SELECT id, name, age FROM person WHERE id = ?1").bind(key),
                person_row,
            )
            .await?;
            Ok(())
        })
    })
    .await?;

    assert_eq!(results.len(), 2);
    assert_eq!(results.rows_mutated(0), Some(1));
    assert_eq!(results.get(0).unwrap().transformed::<i64>(), Some(&1));
    let person = results.single::<Person>(1).expect("person by key");
    assert_eq!(person.id, 1);
    assert_eq!(person.name, "zeon");
    Ok(())
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn disabled_key_support_yields_no_transformed_value()
-> Result<(), Box<dyn std::error::Error>> {
    let pool = TransactPool::sqlite_builder(unique_db_path("keys_off"))
        .generated_key_support(false)
        .build()
        .await?;
    run_transaction(&pool, |tx| {
        Box::pin(async move {
            tx.batch(SCHEMA).await?;
            Ok(())
        })
    })
    .await?;

    let results = run_transaction(&pool, |tx| {
        Box::pin(async move {
            let inserted = tx
                .insert_with_key(
                    Statement::new("INSERT INTO person (name, age) VALUES (?1, ?2)")
                        .bind("zeon")
                        .bind(20_i64),
                    key_of,
                )
                .await?;
            // Mapper supplied, support disabled: no transformed value.
            assert!(inserted.transformed.is_none());
            Ok(())
        })
    })
    .await?;

    assert_eq!(results.rows_mutated(0), Some(1));
    assert_eq!(results.get(0).unwrap().transformed::<i64>(), None);
    Ok(())
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn update_does_not_surface_a_generated_key() -> Result<(), Box<dyn std::error::Error>> {
    let pool = TransactPool::sqlite_builder(unique_db_path("keys_update"))
        .build()
        .await?;
    run_transaction(&pool, |tx| {
        Box::pin(async move {
            tx.batch(SCHEMA).await?;
            tx.insert(
                Statement::new("INSERT INTO person (name, age) VALUES (?1, ?2)")
                    .bind("zeon")
                    .bind(20_i64),
            )
            .await?;
            Ok(())
        })
    })
    .await?;

    let results = run_transaction(&pool, |tx| {
        Box::pin(async move {
            let updated = tx
                .update_with_key(
                    Statement::new("UPDATE person SET age = ?1 WHERE name = ?2")
                        .bind(21_i64)
                        .bind("zeon"),
                    key_of,
                )
                .await?;
            assert!(updated.transformed.is_none());
            Ok(())
        })
    })
    .await?;

    assert_eq!(results.rows_mutated(0), Some(1));
    Ok(())
}
