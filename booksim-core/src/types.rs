//! Domain types for entity synchronization.
//!
//! [`SyncResult`] is built through [`SyncResult::success`] or
//! [`SyncResult::failure`] only; its fields are private so the
//! success/error-message invariant cannot be broken after construction.

use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

// ---------------------------------------------------------------------------
// Entity types
// ---------------------------------------------------------------------------

/// One of the independently synchronizable booking-simulation categories.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum EntityType {
    Shows,
    Wrestlers,
    Factions,
    Teams,
    Matches,
    Seasons,
    ShowTypes,
    ShowTemplates,
    Injuries,
    Npcs,
}

impl EntityType {
    /// Every entity type, in canonical sync order.
    pub fn all() -> &'static [EntityType] {
        &[
            EntityType::Shows,
            EntityType::Wrestlers,
            EntityType::Factions,
            EntityType::Teams,
            EntityType::Matches,
            EntityType::Seasons,
            EntityType::ShowTypes,
            EntityType::ShowTemplates,
            EntityType::Injuries,
            EntityType::Npcs,
        ]
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            EntityType::Shows => "shows",
            EntityType::Wrestlers => "wrestlers",
            EntityType::Factions => "factions",
            EntityType::Teams => "teams",
            EntityType::Matches => "matches",
            EntityType::Seasons => "seasons",
            EntityType::ShowTypes => "show-types",
            EntityType::ShowTemplates => "show-templates",
            EntityType::Injuries => "injuries",
            EntityType::Npcs => "npcs",
        }
    }
}

impl fmt::Display for EntityType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EntityType {
    type Err = ConfigError;

    /// Accepts kebab-case (`show-types`) and snake_case (`show_types`), any case.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_ascii_lowercase().replace('_', "-");
        EntityType::all()
            .iter()
            .copied()
            .find(|entity| entity.as_str() == normalized)
            .ok_or_else(|| ConfigError::UnknownEntity(s.to_string()))
    }
}

// ---------------------------------------------------------------------------
// Operation ids
// ---------------------------------------------------------------------------

/// Correlation id threaded through a batch and its per-entity sub-operations.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct OperationId(pub String);

impl OperationId {
    /// A fresh random id for a batch started without one.
    pub fn generate() -> Self {
        Self(format!("sync-{}", uuid::Uuid::new_v4().simple()))
    }

    /// The sub-operation id for one entity: `{base}-{entity}`.
    pub fn for_entity(&self, entity: EntityType) -> Self {
        Self(format!("{}-{}", self.0, entity))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for OperationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl From<String> for OperationId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for OperationId {
    fn from(s: &str) -> Self {
        Self(s.to_owned())
    }
}

// ---------------------------------------------------------------------------
// SyncResult
// ---------------------------------------------------------------------------

/// Outcome reported by one entity sync service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SyncResult {
    success: bool,
    entity_type: EntityType,
    synced_count: usize,
    error_count: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    error_message: Option<String>,
}

impl SyncResult {
    /// A completed sync. `error_count` counts records that failed individually
    /// without failing the entity as a whole.
    pub fn success(entity_type: EntityType, synced_count: usize, error_count: usize) -> Self {
        Self {
            success: true,
            entity_type,
            synced_count,
            error_count,
            error_message: None,
        }
    }

    /// A failed sync; both counts are zero.
    pub fn failure(entity_type: EntityType, error_message: impl Into<String>) -> Self {
        Self {
            success: false,
            entity_type,
            synced_count: 0,
            error_count: 0,
            error_message: Some(error_message.into()),
        }
    }

    pub fn is_success(&self) -> bool {
        self.success
    }

    pub fn entity_type(&self) -> EntityType {
        self.entity_type
    }

    pub fn synced_count(&self) -> usize {
        self.synced_count
    }

    pub fn error_count(&self) -> usize {
        self.error_count
    }

    pub fn error_message(&self) -> Option<&str> {
        self.error_message.as_deref()
    }
}

// ---------------------------------------------------------------------------
// EntitySyncResult
// ---------------------------------------------------------------------------

/// One entity's entry in a batch report.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EntitySyncResult {
    pub entity_type: EntityType,
    pub result: SyncResult,
    pub duration_ms: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
}

impl EntitySyncResult {
    pub fn new(entity_type: EntityType, result: SyncResult, duration: Duration) -> Self {
        let error_message = result.error_message().map(str::to_owned);
        Self {
            entity_type,
            result,
            duration_ms: duration_millis(duration),
            error_message,
        }
    }

    /// Shorthand for an entry whose sync never produced a result of its own.
    pub fn failed(entity_type: EntityType, message: impl Into<String>, duration: Duration) -> Self {
        Self::new(entity_type, SyncResult::failure(entity_type, message), duration)
    }

    pub fn is_success(&self) -> bool {
        self.result.is_success()
    }
}

// ---------------------------------------------------------------------------
// ParallelSyncResult
// ---------------------------------------------------------------------------

/// Report for one orchestrator batch.
///
/// `success` describes the orchestration machinery only. A batch where some
/// entities failed still reports `success == true`; use
/// [`ParallelSyncResult::failed_count`] to find those.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ParallelSyncResult {
    pub operation_id: OperationId,
    pub started_at: DateTime<Utc>,
    pub results: Vec<EntitySyncResult>,
    pub total_duration_ms: u64,
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
}

impl ParallelSyncResult {
    /// The batch ran to completion (individual entities may still have failed).
    pub fn completed(
        operation_id: OperationId,
        started_at: DateTime<Utc>,
        results: Vec<EntitySyncResult>,
        total: Duration,
    ) -> Self {
        Self {
            operation_id,
            started_at,
            results,
            total_duration_ms: duration_millis(total),
            success: true,
            error_message: None,
        }
    }

    /// The orchestration machinery itself failed.
    pub fn aborted(
        operation_id: OperationId,
        started_at: DateTime<Utc>,
        error_message: impl Into<String>,
        total: Duration,
    ) -> Self {
        Self {
            operation_id,
            started_at,
            results: Vec::new(),
            total_duration_ms: duration_millis(total),
            success: false,
            error_message: Some(error_message.into()),
        }
    }

    pub fn successful_count(&self) -> usize {
        self.results.iter().filter(|r| r.is_success()).count()
    }

    pub fn failed_count(&self) -> usize {
        self.results.iter().filter(|r| !r.is_success()).count()
    }

    /// Sum of records synced across every successful entity.
    pub fn total_synced(&self) -> usize {
        self.results.iter().map(|r| r.result.synced_count()).sum()
    }

    pub fn result_for(&self, entity: EntityType) -> Option<&EntitySyncResult> {
        self.results.iter().find(|r| r.entity_type == entity)
    }
}

fn duration_millis(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
