//! At-most-once execution gate keyed by caller-supplied idempotency keys.

use common::IdempotencyKey;

use crate::{IdempotencyStore, StoreError};

/// Result of trying to apply a key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Application {
    /// The key was unknown and is now recorded; the caller should perform
    /// the operation.
    FirstTime,

    /// The key had already been applied; carries the value recorded with it.
    AlreadyApplied(String),
}

impl Application {
    pub fn is_first_time(&self) -> bool {
        matches!(self, Application::FirstTime)
    }
}

/// Gate guaranteeing one logical application per key within a scope.
///
/// Each owning component creates its own guard with its own scope, so a
/// reservation key and an attempt-creation key never interfere even when the
/// literal value is the same.
#[derive(Debug, Clone)]
pub struct IdempotencyGuard<S> {
    store: S,
    scope: &'static str,
}

impl<S: IdempotencyStore> IdempotencyGuard<S> {
    pub fn new(store: S, scope: &'static str) -> Self {
        Self { store, scope }
    }

    pub fn scope(&self) -> &'static str {
        self.scope
    }

    /// Applies `key` with an empty recorded value.
    pub async fn try_apply(&self, key: &IdempotencyKey) -> Result<Application, StoreError> {
        self.try_apply_with(key, "").await
    }

    /// Applies `key`, recording `value` if this is the first application.
    pub async fn try_apply_with(
        &self,
        key: &IdempotencyKey,
        value: &str,
    ) -> Result<Application, StoreError> {
        Ok(match self.store.try_record(self.scope, key, value).await? {
            None => Application::FirstTime,
            Some(existing) => Application::AlreadyApplied(existing),
        })
    }

    /// Returns the value recorded for `key` if it has been applied.
    pub async fn lookup(&self, key: &IdempotencyKey) -> Result<Option<String>, StoreError> {
        self.store.lookup(self.scope, key).await
    }

    /// Forgets `key` so it can be applied again.
    pub async fn forget(&self, key: &IdempotencyKey) -> Result<bool, StoreError> {
        self.store.forget(self.scope, key).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::InMemoryIdempotencyStore;

    #[tokio::test]
    async fn test_first_application_wins() {
        let guard = IdempotencyGuard::new(InMemoryIdempotencyStore::new(), "reserve");
        let key = IdempotencyKey::new("k");

        assert!(guard.try_apply(&key).await.unwrap().is_first_time());
        assert_eq!(
            guard.try_apply(&key).await.unwrap(),
            Application::AlreadyApplied(String::new())
        );
    }

    #[tokio::test]
    async fn test_recorded_value_is_returned_to_duplicates() {
        let guard = IdempotencyGuard::new(InMemoryIdempotencyStore::new(), "create");
        let key = IdempotencyKey::new("k");

        guard.try_apply_with(&key, "first").await.unwrap();
        assert_eq!(
            guard.try_apply_with(&key, "second").await.unwrap(),
            Application::AlreadyApplied("first".to_string())
        );
        assert_eq!(guard.lookup(&key).await.unwrap().as_deref(), Some("first"));
    }

    #[tokio::test]
    async fn test_guards_with_different_scopes_share_a_store_safely() {
        let store = InMemoryIdempotencyStore::new();
        let reserve = IdempotencyGuard::new(store.clone(), "reserve");
        let create = IdempotencyGuard::new(store, "create");
        let key = IdempotencyKey::new("same-literal");

        assert!(reserve.try_apply(&key).await.unwrap().is_first_time());
        assert!(create.try_apply(&key).await.unwrap().is_first_time());
    }

    #[tokio::test]
    async fn test_forget_reopens_key() {
        let guard = IdempotencyGuard::new(InMemoryIdempotencyStore::new(), "reserve");
        let key = IdempotencyKey::new("k");

        guard.try_apply(&key).await.unwrap();
        assert!(guard.forget(&key).await.unwrap());
        assert!(guard.try_apply(&key).await.unwrap().is_first_time());
    }
}
