//! Idempotent reservation ledger.

use std::collections::HashMap;
use std::sync::{Arc, Mutex as StdMutex, MutexGuard, PoisonError};

use chrono::{DateTime, Utc};
use common::{AssignmentId, IdempotencyKey, UserId};
use ledger_store::{Application, CounterStore, IdempotencyGuard, IdempotencyStore};
use tokio::sync::{Mutex, OwnedMutexGuard};
use tracing::Instrument;

use crate::assignment::{Assignment, AssignmentCatalog};
use crate::eligibility::{self, Eligibility, IneligibilityReason};
use crate::error::{AssignmentError, Result};

/// Idempotency scope for reservations.
pub const RESERVATION_SCOPE: &str = "reservation";

/// Successful result of `reserve`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReservationOutcome {
    /// A new attempt was reserved; `used` is the counter after the increment.
    Reserved { used: u32 },

    /// The key was already applied, nothing changed.
    AlreadyApplied,
}

/// Why a release did nothing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReleaseSkipped {
    /// No successful reservation is recorded for this key and pair.
    UnknownKey,

    /// The key is known but the counter is already at zero.
    NothingReserved,
}

/// Result of `release`. Never an error for the caller's purposes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReleaseOutcome {
    /// One unit was returned; `used` is the counter after the decrement.
    Released { used: u32 },

    NoOp(ReleaseSkipped),
}

type PairKey = (AssignmentId, UserId);
type LockTable = HashMap<PairKey, Arc<Mutex<()>>>;

/// Async mutex per (assignment, user) pair.
///
/// Entries live only while some caller holds or waits for the pair.
#[derive(Debug, Clone, Default)]
struct PairLocks {
    locks: Arc<StdMutex<LockTable>>,
}

impl PairLocks {
    fn table(&self) -> MutexGuard<'_, LockTable> {
        self.locks.lock().unwrap_or_else(PoisonError::into_inner)
    }

    async fn acquire(&self, assignment_id: AssignmentId, user_id: &UserId) -> PairGuard {
        let key = (assignment_id, user_id.clone());
        let lock = self.table().entry(key.clone()).or_default().clone();
        let guard = lock.lock_owned().await;
        PairGuard {
            guard: Some(guard),
            key,
            locks: self.clone(),
        }
    }

    #[cfg(test)]
    fn len(&self) -> usize {
        self.table().len()
    }
}

/// Exclusive access to one pair; drops the table entry once nobody else wants it.
struct PairGuard {
    guard: Option<OwnedMutexGuard<()>>,
    key: PairKey,
    locks: PairLocks,
}

impl Drop for PairGuard {
    fn drop(&mut self) {
        self.guard.take();
        let mut table = self.locks.table();
        if table
            .get(&self.key)
            .is_some_and(|lock| Arc::strong_count(lock) == 1)
        {
            table.remove(&self.key);
        }
    }
}

/// Per-(assignment, user) used-attempt counter with idempotent reserve/release.
///
/// The idempotency check, eligibility evaluation and counter update for one
/// pair run inside a per-pair critical section on a spawned task, so a caller
/// that stops waiting (a saga step timeout) never leaves a mutation half done.
/// The counter store re-validates the quota at write time, so concurrent
/// reservations can never push `used` past `max_attempts`.
pub struct ReservationLedger<I, C> {
    core: Arc<LedgerCore<I, C>>,
}

struct LedgerCore<I, C> {
    catalog: AssignmentCatalog,
    counters: C,
    guard: IdempotencyGuard<I>,
    locks: PairLocks,
}

impl<I, C> ReservationLedger<I, C>
where
    I: IdempotencyStore + 'static,
    C: CounterStore + 'static,
{
    pub fn new(catalog: AssignmentCatalog, idempotency: I, counters: C) -> Self {
        Self {
            core: Arc::new(LedgerCore {
                catalog,
                counters,
                guard: IdempotencyGuard::new(idempotency, RESERVATION_SCOPE),
                locks: PairLocks::default(),
            }),
        }
    }

    pub fn catalog(&self) -> &AssignmentCatalog {
        &self.core.catalog
    }

    /// Returns the number of attempts the user has consumed.
    pub async fn used(&self, assignment_id: AssignmentId, user_id: &UserId) -> Result<u32> {
        self.core.used(assignment_id, user_id).await
    }

    /// Evaluates eligibility at `now` without side effects.
    pub async fn check_eligibility(
        &self,
        assignment_id: AssignmentId,
        user_id: &UserId,
        now: DateTime<Utc>,
    ) -> Result<Eligibility> {
        let assignment = self.core.catalog.get(assignment_id).await;
        let used = match assignment {
            Some(_) => self.used(assignment_id, user_id).await?,
            None => 0,
        };
        Ok(eligibility::evaluate(assignment.as_ref(), used, now))
    }

    /// Reserves one attempt for `key`.
    ///
    /// A key already applied to this pair short-circuits to
    /// [`ReservationOutcome::AlreadyApplied`]; a key applied to another pair
    /// is a [`AssignmentError::KeyConflict`]. Otherwise eligibility is
    /// re-evaluated and, if it fails, the counter is left untouched and the
    /// key stays unapplied.
    ///
    /// Runs to completion even if the returned future is dropped.
    #[tracing::instrument(skip_all, fields(%assignment_id, %user_id, %key))]
    pub async fn reserve(
        &self,
        assignment_id: AssignmentId,
        user_id: &UserId,
        key: &IdempotencyKey,
        now: DateTime<Utc>,
    ) -> Result<ReservationOutcome> {
        let core = Arc::clone(&self.core);
        let (user_id, key) = (user_id.clone(), key.clone());
        tokio::spawn(
            async move { core.reserve(assignment_id, &user_id, &key, now).await }
                .in_current_span(),
        )
        .await?
    }

    /// Gives back the attempt reserved under `key`.
    ///
    /// Releases only when the key's reservation is recorded for this pair and
    /// the counter is positive; the key is then forgotten so it can be used
    /// for a future reservation. Every other case is a silent no-op. Like
    /// `reserve`, it runs to completion even if the returned future is dropped.
    #[tracing::instrument(skip_all, fields(%assignment_id, %user_id, %key))]
    pub async fn release(
        &self,
        assignment_id: AssignmentId,
        user_id: &UserId,
        key: &IdempotencyKey,
    ) -> Result<ReleaseOutcome> {
        let core = Arc::clone(&self.core);
        let (user_id, key) = (user_id.clone(), key.clone());
        tokio::spawn(
            async move { core.release(assignment_id, &user_id, &key).await }.in_current_span(),
        )
        .await?
    }
}

impl<I, C> LedgerCore<I, C>
where
    I: IdempotencyStore,
    C: CounterStore,
{
    async fn used(&self, assignment_id: AssignmentId, user_id: &UserId) -> Result<u32> {
        Ok(self
            .counters
            .get(assignment_id, user_id)
            .await?
            .map(|c| c.used)
            .unwrap_or(0))
    }

    async fn reserve(
        &self,
        assignment_id: AssignmentId,
        user_id: &UserId,
        key: &IdempotencyKey,
        now: DateTime<Utc>,
    ) -> Result<ReservationOutcome> {
        let _pair = self.locks.acquire(assignment_id, user_id).await;
        let tag = pair_tag(assignment_id, user_id);

        if let Some(recorded) = self.guard.lookup(key).await? {
            return self.replayed(key, &recorded, &tag);
        }

        let used = match self.increment(assignment_id, user_id, now).await {
            Ok(used) => used,
            Err(e) => {
                tracing::warn!(error = %e, "reservation rejected");
                metrics::counter!("ledger_reservations_total", "outcome" => "rejected")
                    .increment(1);
                return Err(e);
            }
        };

        // The unit is consumed before the key is recorded: a recorded key
        // always has a unit behind it.
        match self.guard.try_apply_with(key, &tag).await {
            Ok(Application::FirstTime) => {
                tracing::info!(used, "reserved attempt");
                metrics::counter!("ledger_reservations_total", "outcome" => "reserved")
                    .increment(1);
                Ok(ReservationOutcome::Reserved { used })
            }
            Ok(Application::AlreadyApplied(recorded)) => {
                self.undo_increment(assignment_id, user_id).await;
                self.replayed(key, &recorded, &tag)
            }
            Err(e) => {
                self.undo_increment(assignment_id, user_id).await;
                Err(e.into())
            }
        }
    }

    /// Outcome for a key that is already recorded.
    fn replayed(
        &self,
        key: &IdempotencyKey,
        recorded: &str,
        tag: &str,
    ) -> Result<ReservationOutcome> {
        if recorded != tag {
            tracing::warn!("idempotency key bound to another pair");
            metrics::counter!("ledger_reservations_total", "outcome" => "key_conflict")
                .increment(1);
            return Err(AssignmentError::KeyConflict(key.clone()));
        }
        tracing::info!("idempotency key already applied, skipping reservation");
        metrics::counter!("ledger_reservations_total", "outcome" => "already_applied")
            .increment(1);
        Ok(ReservationOutcome::AlreadyApplied)
    }

    async fn increment(
        &self,
        assignment_id: AssignmentId,
        user_id: &UserId,
        now: DateTime<Utc>,
    ) -> Result<u32> {
        let assignment: Option<Assignment> = self.catalog.get(assignment_id).await;
        let used = self.used(assignment_id, user_id).await?;

        let assignment = match eligibility::evaluate(assignment.as_ref(), used, now) {
            Eligibility::Ineligible(reason) => return Err(AssignmentError::NotEligible(reason)),
            Eligibility::Eligible => assignment.ok_or(AssignmentError::NotFound(assignment_id))?,
        };

        self.counters
            .increment_if_below(assignment_id, user_id, assignment.max_attempts)
            .await?
            .ok_or(AssignmentError::NotEligible(
                IneligibilityReason::MaxAttemptsReached,
            ))
    }

    async fn undo_increment(&self, assignment_id: AssignmentId, user_id: &UserId) {
        if let Err(e) = self
            .counters
            .decrement_if_positive(assignment_id, user_id)
            .await
        {
            tracing::error!(error = %e, "failed to return unit after unrecorded reservation");
        }
    }

    async fn release(
        &self,
        assignment_id: AssignmentId,
        user_id: &UserId,
        key: &IdempotencyKey,
    ) -> Result<ReleaseOutcome> {
        let _pair = self.locks.acquire(assignment_id, user_id).await;

        let recorded = self.guard.lookup(key).await?;
        if recorded.as_deref() != Some(pair_tag(assignment_id, user_id).as_str()) {
            tracing::warn!("no reservation recorded for key, nothing to release");
            metrics::counter!("ledger_releases_total", "outcome" => "unknown_key").increment(1);
            return Ok(ReleaseOutcome::NoOp(ReleaseSkipped::UnknownKey));
        }

        // Forget first: a key can never give back more than one unit.
        self.guard.forget(key).await?;
        match self
            .counters
            .decrement_if_positive(assignment_id, user_id)
            .await?
        {
            Some(used) => {
                tracing::info!(used, "released attempt");
                metrics::counter!("ledger_releases_total", "outcome" => "released").increment(1);
                Ok(ReleaseOutcome::Released { used })
            }
            None => {
                tracing::warn!("counter already at zero, nothing to release");
                metrics::counter!("ledger_releases_total", "outcome" => "nothing_reserved")
                    .increment(1);
                Ok(ReleaseOutcome::NoOp(ReleaseSkipped::NothingReserved))
            }
        }
    }
}

/// Value recorded with a reservation key, binding it to one pair.
fn pair_tag(assignment_id: AssignmentId, user_id: &UserId) -> String {
    format!("{assignment_id}:{user_id}")
}
