//! External → local record mapping seam.

use std::collections::BTreeMap;

use thiserror::Error;

use booksim_core::EntityType;

use crate::record::{ExternalRecord, LocalRecord};
use crate::support::{AsText, FieldText, SyncSession};

/// A single record that could not be mapped. Counted, never fatal.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("record '{record_id}': {message}")]
pub struct MappingError {
    pub record_id: String,
    pub message: String,
}

impl MappingError {
    pub fn new(record_id: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            record_id: record_id.into(),
            message: message.into(),
        }
    }
}

pub trait RecordMapper: Send + Sync {
    /// Map one record. `Ok(None)` means the record was already handled in
    /// this batch and is skipped.
    fn map(
        &self,
        entity: EntityType,
        record: &ExternalRecord,
        session: &SyncSession,
    ) -> Result<Option<LocalRecord>, MappingError>;
}

/// Keeps the record id, a display name taken from one property, and every
/// other property that reads as text.
#[derive(Debug, Clone)]
pub struct NamedRecordMapper {
    name_field: String,
}

impl Default for NamedRecordMapper {
    fn default() -> Self {
        Self::new("Name")
    }
}

impl NamedRecordMapper {
    pub fn new(name_field: impl Into<String>) -> Self {
        Self {
            name_field: name_field.into(),
        }
    }
}

impl RecordMapper for NamedRecordMapper {
    fn map(
        &self,
        entity: EntityType,
        record: &ExternalRecord,
        session: &SyncSession,
    ) -> Result<Option<LocalRecord>, MappingError> {
        if record.id.trim().is_empty() {
            return Err(MappingError::new("", "record has no id"));
        }
        let name = record
            .field_text(&self.name_field)
            .ok_or_else(|| MappingError::new(&record.id, format!("no text in '{}'", self.name_field)))?;

        // Names are scoped per entity type: a show and a wrestler may share one.
        if !session.mark_synced(&format!("{entity}:{name}")) {
            tracing::debug!(entity = %entity, name = %name, "already synced in this batch");
            return Ok(None);
        }

        let fields: BTreeMap<String, String> = record
            .properties
            .iter()
            .filter(|(key, _)| **key != self.name_field)
            .filter_map(|(key, value)| value.as_text().map(|text| (key.clone(), text)))
            .collect();

        Ok(Some(LocalRecord {
            id: record.id.clone(),
            entity,
            name: Some(name),
            fields,
        }))
    }
}
