//! Resilience collaborators used around each entity sync.
//!
//! Each one is deliberately small: the orchestrator only depends on the
//! contracts, and entity services compose them in [`crate::service`].

pub mod circuit_breaker;
pub mod health;
pub mod progress;
pub mod retry;
pub mod transaction;
pub mod validation;

pub use circuit_breaker::{BreakerState, CircuitBreaker};
pub use health::{HealthMonitor, HealthSnapshot, HealthStatus};
pub use progress::{Progress, ProgressTracker};
pub use retry::RetryPolicy;
pub use transaction::{SnapshotTransactions, Transaction, TransactionManager};
pub use validation::{IntegrityChecker, RecordValidator, Violation};
