//! Integration tests for eligibility and the reservation ledger.

use std::sync::Arc;

use assignments::{
    AssignmentError, AssignmentService, CreateAssignment, IneligibilityReason, ReleaseOutcome,
    ReleaseSkipped, ReservationOutcome,
};
use chrono::{Duration, Utc};
use common::{IdempotencyKey, UserId};
use ledger_store::{InMemoryCounterStore, InMemoryIdempotencyStore};

type TestService = AssignmentService<InMemoryIdempotencyStore, InMemoryCounterStore>;

fn service() -> TestService {
    AssignmentService::new(InMemoryIdempotencyStore::new(), InMemoryCounterStore::new())
}

#[tokio::test]
async fn test_exactly_max_attempts_reservations_succeed() {
    for max in 1..=4u32 {
        let service = service();
        let assignment = service
            .create_assignment(CreateAssignment::new(1, max))
            .await
            .unwrap();
        let user = UserId::new("student");

        for i in 0..max {
            let outcome = service
                .reserve(assignment.id, &user, &IdempotencyKey::new(format!("k{i}")))
                .await
                .unwrap();
            assert_eq!(outcome, ReservationOutcome::Reserved { used: i + 1 });
        }

        let overflow = service
            .reserve(assignment.id, &user, &IdempotencyKey::new("one-too-many"))
            .await;
        match overflow {
            Err(AssignmentError::NotEligible(reason)) => {
                assert_eq!(reason, IneligibilityReason::MaxAttemptsReached);
                assert_eq!(reason.to_string(), "max attempts reached");
            }
            other => panic!("expected NotEligible, got {other:?}"),
        }
    }
}

#[tokio::test]
async fn test_quota_is_per_user() {
    let service = service();
    let assignment = service
        .create_assignment(CreateAssignment::new(1, 1))
        .await
        .unwrap();

    for user in ["alice", "bob"] {
        let outcome = service
            .reserve(
                assignment.id,
                &UserId::new(user),
                &IdempotencyKey::new(format!("key-{user}")),
            )
            .await
            .unwrap();
        assert_eq!(outcome, ReservationOutcome::Reserved { used: 1 });
    }
}

#[tokio::test]
async fn test_window_eligibility_through_service() {
    let service = service();
    let now = Utc::now();
    let user = UserId::new("u");

    let future = service
        .create_assignment(
            CreateAssignment::new(1, 1).with_window(Some(now + Duration::hours(1)), None),
        )
        .await
        .unwrap();
    let past = service
        .create_assignment(
            CreateAssignment::new(1, 1).with_window(None, Some(now - Duration::hours(1))),
        )
        .await
        .unwrap();
    let open = service
        .create_assignment(CreateAssignment::new(1, 1).with_window(
            Some(now - Duration::hours(1)),
            Some(now + Duration::hours(1)),
        ))
        .await
        .unwrap();

    let e = service.check_eligibility(future.id, &user).await.unwrap();
    assert_eq!(e.reason(), "not yet open");
    let e = service.check_eligibility(past.id, &user).await.unwrap();
    assert_eq!(e.reason(), "closed");
    let e = service.check_eligibility(open.id, &user).await.unwrap();
    assert!(e.is_eligible());

    let reserve_future = service
        .reserve(future.id, &user, &IdempotencyKey::new("a"))
        .await;
    assert!(matches!(
        reserve_future,
        Err(AssignmentError::NotEligible(IneligibilityReason::NotYetOpen))
    ));
    assert_eq!(service.ledger().used(future.id, &user).await.unwrap(), 0);
}

#[tokio::test]
async fn test_release_never_reserved_key_is_silent() {
    let service = service();
    let assignment = service
        .create_assignment(CreateAssignment::new(1, 2))
        .await
        .unwrap();
    let user = UserId::new("u");

    service
        .reserve(assignment.id, &user, &IdempotencyKey::new("real"))
        .await
        .unwrap();
    let outcome = service
        .release(assignment.id, &user, &IdempotencyKey::new("bogus"))
        .await
        .unwrap();

    assert_eq!(outcome, ReleaseOutcome::NoOp(ReleaseSkipped::UnknownKey));
    assert_eq!(service.ledger().used(assignment.id, &user).await.unwrap(), 1);
}

#[tokio::test]
async fn test_concurrent_reservations_never_over_reserve() {
    let service = Arc::new(service());
    let assignment = service
        .create_assignment(CreateAssignment::new(1, 3))
        .await
        .unwrap();
    let user = UserId::new("racer");

    let mut handles = Vec::new();
    for i in 0..25 {
        let service = service.clone();
        let user = user.clone();
        handles.push(tokio::spawn(async move {
            service
                .reserve(assignment.id, &user, &IdempotencyKey::new(format!("k{i}")))
                .await
        }));
    }

    let mut reserved = 0;
    let mut rejected = 0;
    for handle in handles {
        match handle.await.unwrap() {
            Ok(ReservationOutcome::Reserved { .. }) => reserved += 1,
            Ok(ReservationOutcome::AlreadyApplied) => panic!("keys are distinct"),
            Err(AssignmentError::NotEligible(IneligibilityReason::MaxAttemptsReached)) => {
                rejected += 1
            }
            Err(e) => panic!("unexpected error: {e}"),
        }
    }

    assert_eq!(reserved, 3);
    assert_eq!(rejected, 22);
    assert_eq!(service.ledger().used(assignment.id, &user).await.unwrap(), 3);
}

#[tokio::test]
async fn test_concurrent_duplicate_key_reserves_once() {
    let service = Arc::new(service());
    let assignment = service
        .create_assignment(CreateAssignment::new(1, 5))
        .await
        .unwrap();
    let user = UserId::new("retrier");
    let key = IdempotencyKey::new("same");

    let mut handles = Vec::new();
    for _ in 0..10 {
        let service = service.clone();
        let user = user.clone();
        let key = key.clone();
        handles.push(tokio::spawn(async move {
            service.reserve(assignment.id, &user, &key).await.unwrap()
        }));
    }

    let mut fresh = 0;
    for handle in handles {
        if let ReservationOutcome::Reserved { .. } = handle.await.unwrap() {
            fresh += 1;
        }
    }

    assert_eq!(fresh, 1);
    assert_eq!(service.ledger().used(assignment.id, &user).await.unwrap(), 1);
}
