use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use common::{AssignmentId, IdempotencyKey, UserId};
use tokio::sync::RwLock;

use crate::{AttemptCounter, CounterStore, IdempotencyStore, Result};

/// In-memory idempotency store.
///
/// Records live for the lifetime of the process. Use
/// [`PostgresLedgerStore`](crate::PostgresLedgerStore) when keys must survive
/// restarts or be shared between instances.
#[derive(Clone, Default)]
pub struct InMemoryIdempotencyStore {
    records: Arc<RwLock<HashMap<(String, IdempotencyKey), String>>>,
}

impl InMemoryIdempotencyStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the number of recorded keys across all scopes.
    pub async fn len(&self) -> usize {
        self.records.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.records.read().await.is_empty()
    }
}

#[async_trait]
impl IdempotencyStore for InMemoryIdempotencyStore {
    async fn try_record(
        &self,
        scope: &str,
        key: &IdempotencyKey,
        value: &str,
    ) -> Result<Option<String>> {
        let mut records = self.records.write().await;
        let entry = (scope.to_string(), key.clone());
        if let Some(existing) = records.get(&entry) {
            return Ok(Some(existing.clone()));
        }
        records.insert(entry, value.to_string());
        Ok(None)
    }

    async fn lookup(&self, scope: &str, key: &IdempotencyKey) -> Result<Option<String>> {
        let records = self.records.read().await;
        Ok(records.get(&(scope.to_string(), key.clone())).cloned())
    }

    async fn forget(&self, scope: &str, key: &IdempotencyKey) -> Result<bool> {
        let mut records = self.records.write().await;
        Ok(records.remove(&(scope.to_string(), key.clone())).is_some())
    }
}

/// In-memory attempt counter store.
#[derive(Clone, Default)]
pub struct InMemoryCounterStore {
    counters: Arc<RwLock<HashMap<(AssignmentId, UserId), u32>>>,
}

impl InMemoryCounterStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the number of counter rows.
    pub async fn row_count(&self) -> usize {
        self.counters.read().await.len()
    }
}

#[async_trait]
impl CounterStore for InMemoryCounterStore {
    async fn get(
        &self,
        assignment_id: AssignmentId,
        user_id: &UserId,
    ) -> Result<Option<AttemptCounter>> {
        let counters = self.counters.read().await;
        Ok(counters
            .get(&(assignment_id, user_id.clone()))
            .map(|used| AttemptCounter {
                assignment_id,
                user_id: user_id.clone(),
                used: *used,
            }))
    }

    async fn increment_if_below(
        &self,
        assignment_id: AssignmentId,
        user_id: &UserId,
        max: u32,
    ) -> Result<Option<u32>> {
        let mut counters = self.counters.write().await;
        let used = counters.entry((assignment_id, user_id.clone())).or_insert(0);
        if *used >= max {
            return Ok(None);
        }
        *used += 1;
        Ok(Some(*used))
    }

    async fn decrement_if_positive(
        &self,
        assignment_id: AssignmentId,
        user_id: &UserId,
    ) -> Result<Option<u32>> {
        let mut counters = self.counters.write().await;
        match counters.get_mut(&(assignment_id, user_id.clone())) {
            Some(used) if *used > 0 => {
                *used -= 1;
                Ok(Some(*used))
            }
            _ => Ok(None),
        }
    }
}
