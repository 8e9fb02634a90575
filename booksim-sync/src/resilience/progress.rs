//! Coarse per-operation progress counters.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};

use serde::Serialize;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct Progress {
    pub total: usize,
    pub processed: usize,
    pub failed: usize,
}

#[derive(Debug, Default)]
pub struct ProgressTracker {
    operations: Mutex<HashMap<String, Progress>>,
}

impl ProgressTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn start(&self, operation_id: &str, total: usize) {
        self.operations().insert(
            operation_id.to_string(),
            Progress {
                total,
                ..Progress::default()
            },
        );
    }

    /// Count one processed item; `ok == false` also counts it as failed.
    pub fn advance(&self, operation_id: &str, ok: bool) {
        if let Some(progress) = self.operations().get_mut(operation_id) {
            progress.processed += 1;
            if !ok {
                progress.failed += 1;
            }
        }
    }

    pub fn get(&self, operation_id: &str) -> Option<Progress> {
        self.operations().get(operation_id).copied()
    }

    /// Stop tracking and return the final counters.
    pub fn finish(&self, operation_id: &str) -> Option<Progress> {
        let progress = self.operations().remove(operation_id);
        if let Some(p) = progress {
            tracing::debug!(operation_id, total = p.total, processed = p.processed, failed = p.failed, "progress finished");
        }
        progress
    }

    fn operations(&self) -> MutexGuard<'_, HashMap<String, Progress>> {
        self.operations.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
