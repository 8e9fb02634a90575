//! Per-batch dedup of named records.
//!
//! A [`SyncSession`] is created by the orchestrator for one batch and handed to
//! every entity task through an `Arc`. Nothing about it is thread-local, so it
//! holds regardless of which worker runs which task.

use std::collections::HashSet;
use std::sync::{Mutex, MutexGuard, PoisonError};

use booksim_core::OperationId;

/// Names already processed during one batch, matched case-insensitively.
#[derive(Debug)]
pub struct SyncSession {
    operation_id: OperationId,
    names: Mutex<HashSet<String>>,
}

impl SyncSession {
    pub fn new(operation_id: OperationId) -> Self {
        Self {
            operation_id,
            names: Mutex::new(HashSet::new()),
        }
    }

    /// The batch this session belongs to.
    pub fn operation_id(&self) -> &OperationId {
        &self.operation_id
    }

    pub fn already_synced(&self, name: &str) -> bool {
        self.names().contains(&normalize(name))
    }

    /// Record `name`; returns `false` if it was already present.
    pub fn mark_synced(&self, name: &str) -> bool {
        self.names().insert(normalize(name))
    }

    pub fn len(&self) -> usize {
        self.names().len()
    }

    pub fn is_empty(&self) -> bool {
        self.names().is_empty()
    }

    pub fn clear(&self) {
        self.names().clear();
    }

    /// End the session. Consumes it so no task can touch it afterwards.
    pub fn release(self) {
        let names = self.names.into_inner().unwrap_or_else(PoisonError::into_inner);
        tracing::debug!(
            operation_id = %self.operation_id,
            tracked = names.len(),
            "sync session released"
        );
    }

    // A panicking task must not wedge the rest of the batch.
    fn names(&self) -> MutexGuard<'_, HashSet<String>> {
        self.names.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

fn normalize(name: &str) -> String {
    name.trim().to_lowercase()
}
