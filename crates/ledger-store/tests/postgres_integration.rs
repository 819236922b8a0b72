//! PostgreSQL integration tests
//!
//! These tests share one PostgreSQL container and need a Docker daemon.
//! Run with:
//!
//! ```bash
//! cargo test -p ledger-store --test postgres_integration -- --ignored
//! ```

use std::sync::Arc;

use common::{AssignmentId, IdempotencyKey, UserId};
use ledger_store::{CounterStore, IdempotencyStore, PostgresLedgerStore};
use serial_test::serial;
use sqlx::PgPool;
use testcontainers::{ContainerAsync, runners::AsyncRunner};
use testcontainers_modules::postgres::Postgres;
use tokio::sync::OnceCell;

/// Shared container info - container stays alive for all tests
struct ContainerInfo {
    #[allow(dead_code)] // Container must stay alive for tests
    container: ContainerAsync<Postgres>,
    connection_string: String,
}

static CONTAINER: OnceCell<Arc<ContainerInfo>> = OnceCell::const_new();

async fn get_container_info() -> Arc<ContainerInfo> {
    CONTAINER
        .get_or_init(|| async {
            let container = Postgres::default().start().await.unwrap();

            let host = container.get_host().await.unwrap();
            let port = container.get_host_port_ipv4(5432).await.unwrap();

            let connection_string =
                format!("postgres://postgres:postgres@{}:{}/postgres", host, port);

            let temp_pool = PgPool::connect(&connection_string).await.unwrap();
            sqlx::raw_sql(include_str!(
                "../../../migrations/001_create_ledger_tables.sql"
            ))
            .execute(&temp_pool)
            .await
            .unwrap();
            temp_pool.close().await;

            Arc::new(ContainerInfo {
                container,
                connection_string,
            })
        })
        .await
        .clone()
}

/// Get a fresh store with its own pool and cleared tables
async fn get_test_store() -> PostgresLedgerStore {
    let info = get_container_info().await;

    let pool = sqlx::postgres::PgPoolOptions::new()
        .max_connections(10)
        .connect(&info.connection_string)
        .await
        .unwrap();

    sqlx::query("TRUNCATE TABLE idempotency_records, attempt_counters")
        .execute(&pool)
        .await
        .unwrap();

    PostgresLedgerStore::new(pool)
}

#[tokio::test]
#[serial]
#[ignore = "requires docker"]
async fn test_try_record_and_forget() {
    let store = get_test_store().await;
    let key = IdempotencyKey::new("key-1");

    assert_eq!(store.try_record("reserve", &key, "").await.unwrap(), None);
    assert_eq!(
        store.try_record("reserve", &key, "other").await.unwrap(),
        Some(String::new())
    );
    assert!(store.try_record("create", &key, "x").await.unwrap().is_none());

    assert!(store.forget("reserve", &key).await.unwrap());
    assert!(store.lookup("reserve", &key).await.unwrap().is_none());
    assert_eq!(
        store.lookup("create", &key).await.unwrap(),
        Some("x".to_string())
    );
}

#[tokio::test]
#[serial]
#[ignore = "requires docker"]
async fn test_increment_creates_row_and_respects_bound() {
    let store = get_test_store().await;
    let assignment = AssignmentId::new();
    let user = UserId::new("pg-user");

    assert!(store.get(assignment, &user).await.unwrap().is_none());
    assert_eq!(
        store.increment_if_below(assignment, &user, 2).await.unwrap(),
        Some(1)
    );
    assert_eq!(
        store.increment_if_below(assignment, &user, 2).await.unwrap(),
        Some(2)
    );
    assert_eq!(
        store.increment_if_below(assignment, &user, 2).await.unwrap(),
        None
    );
    assert_eq!(store.get(assignment, &user).await.unwrap().unwrap().used, 2);

    assert_eq!(
        store.decrement_if_positive(assignment, &user).await.unwrap(),
        Some(1)
    );
}

#[tokio::test]
#[serial]
#[ignore = "requires docker"]
async fn test_concurrent_increments_never_exceed_bound() {
    let store = get_test_store().await;
    let assignment = AssignmentId::new();
    let user = UserId::new("racer");

    let mut handles = Vec::new();
    for _ in 0..20 {
        let store = store.clone();
        let user = user.clone();
        handles.push(tokio::spawn(async move {
            store.increment_if_below(assignment, &user, 3).await.unwrap()
        }));
    }

    let mut successes = 0;
    for handle in handles {
        if handle.await.unwrap().is_some() {
            successes += 1;
        }
    }

    assert_eq!(successes, 3);
    assert_eq!(store.get(assignment, &user).await.unwrap().unwrap().used, 3);
}
