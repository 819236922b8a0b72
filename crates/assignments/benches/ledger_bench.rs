//! Benchmarks for eligibility evaluation and reservations.

use assignments::{AssignmentService, CreateAssignment, evaluate};
use chrono::{Duration, Utc};
use common::{IdempotencyKey, UserId};
use criterion::{Criterion, black_box, criterion_group, criterion_main};
use ledger_store::{InMemoryCounterStore, InMemoryIdempotencyStore};
use tokio::runtime::Runtime;

fn bench_evaluate(c: &mut Criterion) {
    let now = Utc::now();
    let assignment = CreateAssignment::new(1, 3)
        .with_window(Some(now - Duration::hours(1)), Some(now + Duration::hours(1)))
        .into_assignment(now)
        .unwrap();

    c.bench_function("evaluate_eligible", |b| {
        b.iter(|| evaluate(black_box(Some(&assignment)), black_box(1), black_box(now)))
    });
}

fn bench_reserve(c: &mut Criterion) {
    let rt = Runtime::new().unwrap();

    c.bench_function("reserve_and_release", |b| {
        let service =
            AssignmentService::new(InMemoryIdempotencyStore::new(), InMemoryCounterStore::new());
        let assignment = rt
            .block_on(service.create_assignment(CreateAssignment::new(1, 1)))
            .unwrap();
        let user = UserId::new("bench");
        let key = IdempotencyKey::new("bench-key");

        b.to_async(&rt).iter(|| async {
            service.reserve(assignment.id, &user, &key).await.unwrap();
            service.release(assignment.id, &user, &key).await.unwrap();
        });
    });
}

criterion_group!(benches, bench_evaluate, bench_reserve);
criterion_main!(benches);
