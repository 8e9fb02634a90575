//! Pre-sync validation and post-write integrity checks.
//!
//! Both report [`Violation`]s and leave the data untouched; deciding what to
//! do about a violation is the caller's business.

use std::collections::HashSet;
use std::fmt;

use serde::Serialize;

use booksim_core::EntityType;

use crate::error::SyncError;
use crate::record::{ExternalRecord, LocalRecord};
use crate::store::RecordStore;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Violation {
    pub rule: &'static str,
    /// Position in the fetched batch, when the violation is about one record.
    pub index: Option<usize>,
    pub record_id: Option<String>,
    pub message: String,
}

impl fmt::Display for Violation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.record_id {
            Some(id) => write!(f, "[{}] '{}': {}", self.rule, id, self.message),
            None => write!(f, "[{}] {}", self.rule, self.message),
        }
    }
}

/// Checks on freshly fetched external records.
#[derive(Debug, Clone, Copy, Default)]
pub struct RecordValidator;

impl RecordValidator {
    pub fn validate_fetched(&self, entity: EntityType, records: &[ExternalRecord]) -> Vec<Violation> {
        let mut seen = HashSet::new();
        let mut violations = Vec::new();
        for (index, record) in records.iter().enumerate() {
            if record.id.trim().is_empty() {
                violations.push(Violation {
                    rule: "missing-id",
                    index: Some(index),
                    record_id: None,
                    message: format!("{entity} record at position {index} has no id"),
                });
            } else if !seen.insert(record.id.as_str()) {
                violations.push(Violation {
                    rule: "duplicate-id",
                    index: Some(index),
                    record_id: Some(record.id.clone()),
                    message: "id appears more than once in the fetched batch".to_string(),
                });
            }
        }
        violations
    }
}

/// Compares what the store holds with what was just written.
#[derive(Debug, Clone, Copy, Default)]
pub struct IntegrityChecker;

impl IntegrityChecker {
    pub fn check_persisted(
        &self,
        entity: EntityType,
        expected: &[LocalRecord],
        store: &dyn RecordStore,
    ) -> Result<Vec<Violation>, SyncError> {
        let stored = store.load(entity)?;
        let mut violations = Vec::new();
        if stored.len() != expected.len() {
            violations.push(Violation {
                rule: "count-mismatch",
                index: None,
                record_id: None,
                message: format!("expected {} {entity} records, store has {}", expected.len(), stored.len()),
            });
        }
        let stored_ids: HashSet<&str> = stored.iter().map(|r| r.id.as_str()).collect();
        for record in expected {
            if !stored_ids.contains(record.id.as_str()) {
                violations.push(Violation {
                    rule: "missing-record",
                    index: None,
                    record_id: Some(record.id.clone()),
                    message: "written record not found in store".to_string(),
                });
            }
        }
        Ok(violations)
    }
}
