use std::sync::Arc;

use async_trait::async_trait;
use common::{AssignmentId, IdempotencyKey, UserId};

use crate::{AttemptCounter, Result};

/// Keyed record of operations that have already been applied.
///
/// Keys are partitioned by `scope` (one scope per logical operation), so the
/// same literal key may be applied independently to different operations.
/// All implementations must be thread-safe and make `try_record` atomic:
/// two concurrent calls with the same scope and key must never both see the
/// key as absent.
#[async_trait]
pub trait IdempotencyStore: Send + Sync {
    /// Records `key -> value` unless the key is already present.
    ///
    /// Returns `None` when this call recorded the key, or the previously
    /// recorded value when the key was already applied.
    async fn try_record(
        &self,
        scope: &str,
        key: &IdempotencyKey,
        value: &str,
    ) -> Result<Option<String>>;

    /// Returns the value recorded for a key, if any.
    async fn lookup(&self, scope: &str, key: &IdempotencyKey) -> Result<Option<String>>;

    /// Removes a key so it may be applied again. Returns true if it was present.
    async fn forget(&self, scope: &str, key: &IdempotencyKey) -> Result<bool>;
}

/// Storage for per-(assignment, user) attempt counters.
///
/// Mutations are conditional and atomic: the bound is re-validated at write
/// time, so concurrent callers can never push `used` past `max` or below 0.
#[async_trait]
pub trait CounterStore: Send + Sync {
    /// Loads the counter row, if it exists.
    async fn get(
        &self,
        assignment_id: AssignmentId,
        user_id: &UserId,
    ) -> Result<Option<AttemptCounter>>;

    /// Increments `used` if it is below `max`, creating the row at 1 if absent.
    ///
    /// Returns the new value, or `None` if the bound was reached.
    async fn increment_if_below(
        &self,
        assignment_id: AssignmentId,
        user_id: &UserId,
        max: u32,
    ) -> Result<Option<u32>>;

    /// Decrements `used` if it is positive. Returns the new value, or `None`
    /// if there was nothing to decrement.
    async fn decrement_if_positive(
        &self,
        assignment_id: AssignmentId,
        user_id: &UserId,
    ) -> Result<Option<u32>>;
}

#[async_trait]
impl<T: IdempotencyStore + ?Sized> IdempotencyStore for Arc<T> {
    async fn try_record(
        &self,
        scope: &str,
        key: &IdempotencyKey,
        value: &str,
    ) -> Result<Option<String>> {
        (**self).try_record(scope, key, value).await
    }

    async fn lookup(&self, scope: &str, key: &IdempotencyKey) -> Result<Option<String>> {
        (**self).lookup(scope, key).await
    }

    async fn forget(&self, scope: &str, key: &IdempotencyKey) -> Result<bool> {
        (**self).forget(scope, key).await
    }
}

#[async_trait]
impl<T: CounterStore + ?Sized> CounterStore for Arc<T> {
    async fn get(
        &self,
        assignment_id: AssignmentId,
        user_id: &UserId,
    ) -> Result<Option<AttemptCounter>> {
        (**self).get(assignment_id, user_id).await
    }

    async fn increment_if_below(
        &self,
        assignment_id: AssignmentId,
        user_id: &UserId,
        max: u32,
    ) -> Result<Option<u32>> {
        (**self).increment_if_below(assignment_id, user_id, max).await
    }

    async fn decrement_if_positive(
        &self,
        assignment_id: AssignmentId,
        user_id: &UserId,
    ) -> Result<Option<u32>> {
        (**self).decrement_if_positive(assignment_id, user_id).await
    }
}
