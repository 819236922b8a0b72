//! Assignment service providing the ledger-owning API.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use chrono::Utc;
use common::{AssignmentId, IdempotencyKey, UserId};
use ledger_store::{CounterStore, IdempotencyStore};

use crate::assignment::{Assignment, AssignmentCatalog, CreateAssignment};
use crate::eligibility::Eligibility;
use crate::error::{AssignmentError, Result};
use crate::ledger::{ReleaseOutcome, ReservationLedger, ReservationOutcome};

/// Switchable failure injection used to demonstrate saga compensation.
#[derive(Debug, Clone, Default)]
pub struct DemoFlags {
    fail_reserve: Arc<AtomicBool>,
}

impl DemoFlags {
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes every subsequent `reserve` fail until switched off.
    pub fn set_fail_reserve(&self, fail: bool) {
        self.fail_reserve.store(fail, Ordering::SeqCst);
    }

    pub fn fail_reserve(&self) -> bool {
        self.fail_reserve.load(Ordering::SeqCst)
    }
}

/// Service owning assignments and the reservation ledger.
pub struct AssignmentService<I, C> {
    ledger: ReservationLedger<I, C>,
    demo: DemoFlags,
}

impl<I, C> AssignmentService<I, C>
where
    I: IdempotencyStore + 'static,
    C: CounterStore + 'static,
{
    /// Creates a service with an empty catalog.
    pub fn new(idempotency: I, counters: C) -> Self {
        Self {
            ledger: ReservationLedger::new(AssignmentCatalog::new(), idempotency, counters),
            demo: DemoFlags::new(),
        }
    }

    pub fn ledger(&self) -> &ReservationLedger<I, C> {
        &self.ledger
    }

    pub fn demo_flags(&self) -> &DemoFlags {
        &self.demo
    }

    /// Creates and stores a new assignment.
    #[tracing::instrument(skip(self))]
    pub async fn create_assignment(&self, cmd: CreateAssignment) -> Result<Assignment> {
        let assignment = cmd.into_assignment(Utc::now())?;
        self.ledger.catalog().insert(assignment.clone()).await;
        tracing::info!(assignment_id = %assignment.id, "assignment created");
        Ok(assignment)
    }

    /// Loads an assignment by ID.
    pub async fn get_assignment(&self, id: AssignmentId) -> Result<Assignment> {
        self.ledger
            .catalog()
            .get(id)
            .await
            .ok_or(AssignmentError::NotFound(id))
    }

    /// Evaluates whether `user_id` may reserve an attempt right now.
    #[tracing::instrument(skip(self))]
    pub async fn check_eligibility(
        &self,
        assignment_id: AssignmentId,
        user_id: &UserId,
    ) -> Result<Eligibility> {
        let eligibility = self
            .ledger
            .check_eligibility(assignment_id, user_id, Utc::now())
            .await?;
        tracing::info!(reason = eligibility.reason(), "eligibility evaluated");
        Ok(eligibility)
    }

    /// Reserves one attempt for `key`. Idempotent per key.
    pub async fn reserve(
        &self,
        assignment_id: AssignmentId,
        user_id: &UserId,
        key: &IdempotencyKey,
    ) -> Result<ReservationOutcome> {
        if self.demo.fail_reserve() {
            tracing::warn!(%assignment_id, %user_id, "reserve failure injected");
            return Err(AssignmentError::FaultInjected(
                "reserve failure injected".to_string(),
            ));
        }
        self.ledger
            .reserve(assignment_id, user_id, key, Utc::now())
            .await
    }

    /// Releases the reservation made under `key`, if any.
    pub async fn release(
        &self,
        assignment_id: AssignmentId,
        user_id: &UserId,
        key: &IdempotencyKey,
    ) -> Result<ReleaseOutcome> {
        self.ledger.release(assignment_id, user_id, key).await
    }

    /// Returns how many attempts the user has left.
    pub async fn remaining_attempts(
        &self,
        assignment_id: AssignmentId,
        user_id: &UserId,
    ) -> Result<u32> {
        let assignment = self.get_assignment(assignment_id).await?;
        let used = self.ledger.used(assignment_id, user_id).await?;
        Ok(assignment.max_attempts.saturating_sub(used))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ledger_store::{InMemoryCounterStore, InMemoryIdempotencyStore};

    fn service() -> AssignmentService<InMemoryIdempotencyStore, InMemoryCounterStore> {
        AssignmentService::new(InMemoryIdempotencyStore::new(), InMemoryCounterStore::new())
    }

    #[tokio::test]
    async fn test_remaining_attempts_counts_down() {
        let service = service();
        let assignment = service
            .create_assignment(CreateAssignment::new(1, 2))
            .await
            .unwrap();
        let user = UserId::new("u");

        assert_eq!(
            service.remaining_attempts(assignment.id, &user).await.unwrap(),
            2
        );
        service
            .reserve(assignment.id, &user, &IdempotencyKey::new("k"))
            .await
            .unwrap();
        assert_eq!(
            service.remaining_attempts(assignment.id, &user).await.unwrap(),
            1
        );
    }

    #[tokio::test]
    async fn test_remaining_attempts_unknown_assignment() {
        let result = service()
            .remaining_attempts(AssignmentId::new(), &UserId::new("u"))
            .await;
        assert!(matches!(result, Err(AssignmentError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_fault_flag_blocks_reserve_without_mutation() {
        let service = service();
        let assignment = service
            .create_assignment(CreateAssignment::new(1, 1))
            .await
            .unwrap();
        let user = UserId::new("u");
        let key = IdempotencyKey::new("k");

        service.demo_flags().set_fail_reserve(true);
        let result = service.reserve(assignment.id, &user, &key).await;
        assert!(matches!(result, Err(AssignmentError::FaultInjected(_))));
        assert_eq!(service.ledger().used(assignment.id, &user).await.unwrap(), 0);

        service.demo_flags().set_fail_reserve(false);
        let outcome = service.reserve(assignment.id, &user, &key).await.unwrap();
        assert_eq!(outcome, ReservationOutcome::Reserved { used: 1 });
    }

    #[tokio::test]
    async fn test_get_assignment() {
        let service = service();
        let created = service
            .create_assignment(CreateAssignment::new(7, 3))
            .await
            .unwrap();

        let loaded = service.get_assignment(created.id).await.unwrap();
        assert_eq!(loaded, created);
    }
}
