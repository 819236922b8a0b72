pub mod error;
pub mod guard;
pub mod memory;
pub mod postgres;
pub mod record;
pub mod store;

pub use error::{Result, StoreError};
pub use guard::{Application, IdempotencyGuard};
pub use memory::{InMemoryCounterStore, InMemoryIdempotencyStore};
pub use postgres::PostgresLedgerStore;
pub use record::AttemptCounter;
pub use store::{CounterStore, IdempotencyStore};
