//! HTTP API server for the quiz attempt services.
//!
//! Exposes the assignment service, the attempt service and the two sagas
//! as REST endpoints, with structured logging (tracing) and Prometheus metrics.

pub mod config;
pub mod error;
pub mod routes;

use std::sync::Arc;

use assignments::AssignmentService;
use attempts::AttemptService;
use axum::Router;
use axum::routing::{get, post};
use ledger_store::{
    CounterStore, IdempotencyStore, InMemoryCounterStore, InMemoryIdempotencyStore,
    PostgresLedgerStore, StoreError,
};
use metrics_exporter_prometheus::PrometheusHandle;
use saga::{
    AssignmentClient, AttemptClient, HttpAssignmentClient, HttpAttemptClient,
    LocalAssignmentClient, LocalAttemptClient, SagaCoordinator,
};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use config::Config;

pub type DynIdempotencyStore = Arc<dyn IdempotencyStore>;
pub type DynCounterStore = Arc<dyn CounterStore>;
pub type Assignments = AssignmentService<DynIdempotencyStore, DynCounterStore>;
pub type Attempts = AttemptService<DynIdempotencyStore>;
pub type Coordinator = SagaCoordinator<Arc<dyn AssignmentClient>, Arc<dyn AttemptClient>>;

/// Where the reservation ledger keeps its keys and counters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LedgerBackend {
    InMemory,
    Postgres,
}

impl LedgerBackend {
    pub fn as_str(&self) -> &'static str {
        match self {
            LedgerBackend::InMemory => "memory",
            LedgerBackend::Postgres => "postgres",
        }
    }
}

/// Shared application state accessible from all handlers.
pub struct AppState {
    pub assignments: Arc<Assignments>,
    pub attempts: Arc<Attempts>,
    pub saga: Coordinator,
    pub ledger: LedgerBackend,
    /// True when the sagas call the services over HTTP.
    pub remote_sagas: bool,
}

/// Creates the Axum application router with all routes and shared state.
pub fn create_app(state: Arc<AppState>, metrics_handle: PrometheusHandle) -> Router {
    let metrics_router = Router::new()
        .route("/metrics", get(routes::metrics::get))
        .with_state(metrics_handle);

    Router::new()
        .route("/health", get(routes::health::check))
        .route("/assignments", post(routes::assignments::create))
        .route("/assignments/{id}", get(routes::assignments::get))
        .route(
            "/assignments/{id}/check-eligibility",
            post(routes::assignments::check_eligibility),
        )
        .route("/assignments/{id}/reserve", post(routes::assignments::reserve))
        .route("/assignments/{id}/release", post(routes::assignments::release))
        .route(
            "/assignments/{id}/remaining-attempts",
            get(routes::assignments::remaining_attempts),
        )
        .route("/attempts", post(routes::attempts::create))
        .route("/attempts/{id}", get(routes::attempts::get))
        .route("/attempts/{id}/cancel", post(routes::attempts::cancel))
        .route("/attempts/{id}/answers", post(routes::attempts::submit_answers))
        .route("/attempts/{id}/autoscore", post(routes::attempts::auto_score))
        .route("/attempts/{id}/finalize", post(routes::attempts::finalize))
        .route("/saga/start-attempt", post(routes::saga::start_attempt))
        .route("/saga/submit-attempt", post(routes::saga::submit_attempt))
        .route("/demo/fail-reserve", get(routes::demo::fail_reserve_status))
        .route("/demo/fail-reserve/on", post(routes::demo::fail_reserve_on))
        .route("/demo/fail-reserve/off", post(routes::demo::fail_reserve_off))
        .with_state(state)
        .merge(metrics_router)
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .layer(TraceLayer::new_for_http())
}

/// Builds the application state over the given ledger stores.
///
/// Attempt-creation keys always live in memory next to the attempts they
/// point at. The sagas call remote services when their URLs are configured
/// and the in-process services otherwise.
pub fn create_state(
    idempotency: DynIdempotencyStore,
    counters: DynCounterStore,
    ledger: LedgerBackend,
    config: &Config,
) -> Arc<AppState> {
    let assignments = Arc::new(AssignmentService::new(idempotency, counters));
    let attempts = Arc::new(AttemptService::new(
        Arc::new(InMemoryIdempotencyStore::new()) as DynIdempotencyStore
    ));

    let assignment_client: Arc<dyn AssignmentClient> = match &config.assignment_service_url {
        Some(url) => {
            tracing::info!(%url, "saga using remote assignment service");
            Arc::new(HttpAssignmentClient::new(url.clone()))
        }
        None => Arc::new(LocalAssignmentClient::new(assignments.clone())),
    };
    let attempt_client: Arc<dyn AttemptClient> = match &config.attempt_service_url {
        Some(url) => {
            tracing::info!(%url, "saga using remote attempt service");
            Arc::new(HttpAttemptClient::new(url.clone()))
        }
        None => Arc::new(LocalAttemptClient::new(attempts.clone())),
    };

    Arc::new(AppState {
        assignments,
        attempts,
        saga: SagaCoordinator::new(assignment_client, attempt_client, config.saga_config()),
        ledger,
        remote_sagas: config.assignment_service_url.is_some()
            || config.attempt_service_url.is_some(),
    })
}

/// Creates the application state with the storage selected by `config`.
///
/// With `DATABASE_URL` set the ledger is stored in PostgreSQL and migrations
/// are run first; otherwise everything is in memory.
pub async fn create_default_state(config: &Config) -> Result<Arc<AppState>, StoreError> {
    match &config.database_url {
        Some(url) => {
            let store = PostgresLedgerStore::connect(url).await?;
            store.run_migrations().await?;
            tracing::info!("using PostgreSQL ledger store");
            let store = Arc::new(store);
            Ok(create_state(
                store.clone(),
                store,
                LedgerBackend::Postgres,
                config,
            ))
        }
        None => {
            tracing::info!("using in-memory ledger store");
            Ok(create_state(
                Arc::new(InMemoryIdempotencyStore::new()),
                Arc::new(InMemoryCounterStore::new()),
                LedgerBackend::InMemory,
                config,
            ))
        }
    }
}
