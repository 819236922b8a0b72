//! End-to-end tests of the attempt lifecycle.

use std::sync::Arc;

use attempts::{AnswerInput, AttemptError, AttemptService, AttemptStatus, Score};
use common::{AssignmentId, IdempotencyKey, UserId};
use ledger_store::InMemoryIdempotencyStore;

fn service() -> AttemptService<InMemoryIdempotencyStore> {
    AttemptService::new(InMemoryIdempotencyStore::new())
}

#[tokio::test]
async fn test_full_submission_scores_two_thirds() {
    let service = service();
    let attempt = service
        .create(
            AssignmentId::new(),
            &UserId::new("student"),
            &IdempotencyKey::generate(),
        )
        .await
        .unwrap();

    service
        .submit_answers(
            attempt.id,
            vec![
                AnswerInput::option(1, "correct"),
                AnswerInput::option(2, "wrong"),
                AnswerInput::option(3, "correct"),
            ],
        )
        .await
        .unwrap();

    let score = service.auto_score(attempt.id).await.unwrap();
    assert_eq!(score, Score::from_hundredths(667));
    assert_eq!(score.to_string(), "6.67");

    service.finalize(attempt.id, score).await.unwrap();

    let loaded = service.get_attempt(attempt.id).await.unwrap();
    assert_eq!(loaded.status, AttemptStatus::Submitted);
    assert_eq!(loaded.score, Some(score));
    assert!(loaded.finished_at.is_some());
    assert!(loaded.finished_at.unwrap() >= loaded.started_at);
}

#[tokio::test]
async fn test_resubmitting_a_question_keeps_last_answer() {
    let service = service();
    let attempt = service
        .create(
            AssignmentId::new(),
            &UserId::new("student"),
            &IdempotencyKey::generate(),
        )
        .await
        .unwrap();

    service
        .submit_answers(attempt.id, vec![AnswerInput::option(7, "wrong")])
        .await
        .unwrap();
    service
        .submit_answers(attempt.id, vec![AnswerInput::option(7, "correct")])
        .await
        .unwrap();

    let loaded = service.get_attempt(attempt.id).await.unwrap();
    assert_eq!(loaded.answers.len(), 1);
    assert_eq!(
        loaded.answer(7).unwrap().selected_option.as_deref(),
        Some("correct")
    );
    assert_eq!(
        service.auto_score(attempt.id).await.unwrap().to_string(),
        "10.00"
    );
}

#[tokio::test]
async fn test_cancelled_attempt_rejects_every_operation() {
    let service = service();
    let attempt = service
        .create(
            AssignmentId::new(),
            &UserId::new("student"),
            &IdempotencyKey::generate(),
        )
        .await
        .unwrap();
    service.cancel(attempt.id).await.unwrap();

    let submit = service
        .submit_answers(attempt.id, vec![AnswerInput::option(1, "correct")])
        .await;
    assert!(matches!(
        submit,
        Err(AttemptError::InvalidState {
            status: AttemptStatus::Canceled,
            ..
        })
    ));
    assert!(service.auto_score(attempt.id).await.is_err());
    assert!(service.finalize(attempt.id, Score::ZERO).await.is_err());

    let loaded = service.get_attempt(attempt.id).await.unwrap();
    assert_eq!(loaded.status, AttemptStatus::Canceled);
    assert!(loaded.score.is_none());
}

#[tokio::test]
async fn test_concurrent_creates_with_one_key_yield_one_attempt() {
    let service = Arc::new(service());
    let assignment = AssignmentId::new();
    let user = UserId::new("student");
    let key = IdempotencyKey::new("double-click");

    let mut handles = Vec::new();
    for _ in 0..16 {
        let service = service.clone();
        let user = user.clone();
        let key = key.clone();
        handles.push(tokio::spawn(async move {
            service.create(assignment, &user, &key).await.unwrap()
        }));
    }

    let mut ids = Vec::new();
    for handle in handles {
        ids.push(handle.await.unwrap().id);
    }
    ids.dedup();
    assert_eq!(ids.len(), 1);
}
