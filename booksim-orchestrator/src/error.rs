use thiserror::Error;

use booksim_core::EntityType;

/// Errors raised while assembling an orchestrator. Nothing that happens
/// during a batch surfaces here; see [`booksim_core::ParallelSyncResult`].
#[derive(Debug, Error)]
pub enum OrchestratorError {
    #[error("more than one sync service registered for {0}")]
    DuplicateService(EntityType),
}
