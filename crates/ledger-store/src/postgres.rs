use async_trait::async_trait;
use common::{AssignmentId, IdempotencyKey, UserId};
use sqlx::PgPool;

use crate::{AttemptCounter, CounterStore, IdempotencyStore, Result, StoreError};

/// PostgreSQL-backed ledger storage.
///
/// Implements both [`IdempotencyStore`] and [`CounterStore`] over one pool, so
/// applied keys and counters survive restarts and are shared by every
/// instance pointing at the same database.
#[derive(Clone)]
pub struct PostgresLedgerStore {
    pool: PgPool,
}

impl PostgresLedgerStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Connects to `database_url` with a default pool.
    pub async fn connect(database_url: &str) -> Result<Self> {
        let pool = sqlx::postgres::PgPoolOptions::new()
            .max_connections(10)
            .connect(database_url)
            .await?;
        Ok(Self::new(pool))
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Runs the database migrations.
    pub async fn run_migrations(&self) -> Result<()> {
        sqlx::migrate!("../../migrations").run(&self.pool).await?;
        Ok(())
    }
}

fn to_used(value: i32) -> Result<u32> {
    u32::try_from(value).map_err(|_| StoreError::Corrupt(format!("negative counter: {value}")))
}

#[async_trait]
impl IdempotencyStore for PostgresLedgerStore {
    async fn try_record(
        &self,
        scope: &str,
        key: &IdempotencyKey,
        value: &str,
    ) -> Result<Option<String>> {
        // A concurrent forget can remove the conflicting row between the two
        // statements, in which case the insert is simply retried.
        loop {
            let inserted = sqlx::query(
                r#"
                INSERT INTO idempotency_records (scope, key, value)
                VALUES ($1, $2, $3)
                ON CONFLICT (scope, key) DO NOTHING
                "#,
            )
            .bind(scope)
            .bind(key.as_str())
            .bind(value)
            .execute(&self.pool)
            .await?
            .rows_affected();

            if inserted == 1 {
                return Ok(None);
            }

            if let Some(existing) = self.lookup(scope, key).await? {
                return Ok(Some(existing));
            }
            tracing::debug!(scope, %key, "idempotency record vanished, retrying insert");
        }
    }

    async fn lookup(&self, scope: &str, key: &IdempotencyKey) -> Result<Option<String>> {
        let value: Option<String> = sqlx::query_scalar(
            "SELECT value FROM idempotency_records WHERE scope = $1 AND key = $2",
        )
        .bind(scope)
        .bind(key.as_str())
        .fetch_optional(&self.pool)
        .await?;
        Ok(value)
    }

    async fn forget(&self, scope: &str, key: &IdempotencyKey) -> Result<bool> {
        let deleted = sqlx::query("DELETE FROM idempotency_records WHERE scope = $1 AND key = $2")
            .bind(scope)
            .bind(key.as_str())
            .execute(&self.pool)
            .await?
            .rows_affected();
        Ok(deleted > 0)
    }
}

#[async_trait]
impl CounterStore for PostgresLedgerStore {
    async fn get(
        &self,
        assignment_id: AssignmentId,
        user_id: &UserId,
    ) -> Result<Option<AttemptCounter>> {
        let used: Option<i32> = sqlx::query_scalar(
            "SELECT used FROM attempt_counters WHERE assignment_id = $1 AND user_id = $2",
        )
        .bind(assignment_id.as_uuid())
        .bind(user_id.as_str())
        .fetch_optional(&self.pool)
        .await?;

        used.map(|used| {
            Ok(AttemptCounter {
                assignment_id,
                user_id: user_id.clone(),
                used: to_used(used)?,
            })
        })
        .transpose()
    }

    async fn increment_if_below(
        &self,
        assignment_id: AssignmentId,
        user_id: &UserId,
        max: u32,
    ) -> Result<Option<u32>> {
        if max == 0 {
            return Ok(None);
        }
        let max = i32::try_from(max).unwrap_or(i32::MAX);

        // Single statement: the bound is checked against the row as locked by
        // the upsert, not against an earlier read.
        let used: Option<i32> = sqlx::query_scalar(
            r#"
            INSERT INTO attempt_counters (assignment_id, user_id, used)
            VALUES ($1, $2, 1)
            ON CONFLICT (assignment_id, user_id)
            DO UPDATE SET used = attempt_counters.used + 1
            WHERE attempt_counters.used < $3
            RETURNING used
            "#,
        )
        .bind(assignment_id.as_uuid())
        .bind(user_id.as_str())
        .bind(max)
        .fetch_optional(&self.pool)
        .await?;

        used.map(to_used).transpose()
    }

    async fn decrement_if_positive(
        &self,
        assignment_id: AssignmentId,
        user_id: &UserId,
    ) -> Result<Option<u32>> {
        let used: Option<i32> = sqlx::query_scalar(
            r#"
            UPDATE attempt_counters SET used = used - 1
            WHERE assignment_id = $1 AND user_id = $2 AND used > 0
            RETURNING used
            "#,
        )
        .bind(assignment_id.as_uuid())
        .bind(user_id.as_str())
        .fetch_optional(&self.pool)
        .await?;

        used.map(to_used).transpose()
    }
}
