//! Parallel sync orchestration: one task per enabled entity type on a bounded
//! worker pool, with every outcome collected into a single batch report.

mod error;
pub mod orchestrator;
mod signal;
mod telemetry;

pub use error::OrchestratorError;
pub use orchestrator::{pool_size, ParallelSyncOrchestrator, SHUTDOWN_GRACE};
pub use signal::interrupt_token;
pub use telemetry::init_tracing;
pub use tokio_util::sync::CancellationToken;
