//! Entity sync contract and its generic implementation.
//!
//! ## `RecordSyncService::sync` flow
//!
//! 1. Credential gate → abort without any external call when unavailable.
//! 2. Circuit breaker gate on the external source.
//! 3. Fetch with retry; feed the outcome to breaker and health monitor.
//! 4. Validate fetched records; rejected records count as errors.
//! 5. Map each record (per-record failures count as errors, batch dedup via
//!    the session).
//! 6. Inside a per-entity transaction: replace stored records, check
//!    integrity, then commit. Any failure rolls back.

use std::collections::HashSet;
use std::sync::Arc;

use async_trait::async_trait;

use booksim_core::{EntityType, OperationId, SyncConfig, SyncResult};

use crate::error::SyncError;
use crate::mapper::RecordMapper;
use crate::record::LocalRecord;
use crate::resilience::{
    CircuitBreaker, HealthMonitor, IntegrityChecker, ProgressTracker, RecordValidator, RetryPolicy,
    TransactionManager,
};
use crate::source::ExternalSource;
use crate::store::RecordStore;
use crate::support::{CredentialGate, EnvCredential, SyncSession};

/// Circuit-breaker key for the external system of record.
pub const SOURCE_BREAKER_KEY: &str = "external-source";

/// What one entity task receives from the orchestrator.
#[derive(Debug, Clone)]
pub struct SyncContext {
    /// Sub-operation id, `{batch}-{entity}`.
    pub operation_id: OperationId,
    /// The batch's dedup session, shared by every task of the batch.
    pub session: Arc<SyncSession>,
}

impl SyncContext {
    pub fn new(operation_id: OperationId, session: Arc<SyncSession>) -> Self {
        Self {
            operation_id,
            session,
        }
    }
}

/// One per entity type. Errors are converted to failed results by the
/// orchestrator, so implementations are free to use `?`.
#[async_trait]
pub trait EntitySyncService: Send + Sync {
    fn entity_type(&self) -> EntityType;

    async fn sync(&self, ctx: &SyncContext) -> Result<SyncResult, SyncError>;
}

/// Collaborators shared by every [`RecordSyncService`] of a process.
pub struct SyncCollaborators {
    pub credentials: Arc<dyn CredentialGate>,
    pub retry: RetryPolicy,
    pub breaker: Arc<CircuitBreaker>,
    pub health: Arc<HealthMonitor>,
    pub progress: Arc<ProgressTracker>,
    pub validator: RecordValidator,
    pub integrity: IntegrityChecker,
}

impl SyncCollaborators {
    pub fn from_config(config: &SyncConfig) -> Self {
        Self {
            credentials: Arc::new(EnvCredential::new(config.credential_env.clone())),
            retry: RetryPolicy::from_config(&config.retry),
            breaker: Arc::new(CircuitBreaker::from_config(&config.circuit_breaker)),
            health: Arc::new(HealthMonitor::new()),
            progress: Arc::new(ProgressTracker::new()),
            validator: RecordValidator,
            integrity: IntegrityChecker,
        }
    }

    pub fn with_credentials(mut self, credentials: Arc<dyn CredentialGate>) -> Self {
        self.credentials = credentials;
        self
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }
}

/// Fetch, validate, map and persist records of one entity type.
pub struct RecordSyncService {
    entity: EntityType,
    source: Arc<dyn ExternalSource>,
    store: Arc<dyn RecordStore>,
    mapper: Arc<dyn RecordMapper>,
    transactions: Arc<dyn TransactionManager>,
    collaborators: Arc<SyncCollaborators>,
}

impl RecordSyncService {
    pub fn new(
        entity: EntityType,
        source: Arc<dyn ExternalSource>,
        store: Arc<dyn RecordStore>,
        mapper: Arc<dyn RecordMapper>,
        transactions: Arc<dyn TransactionManager>,
        collaborators: Arc<SyncCollaborators>,
    ) -> Self {
        Self {
            entity,
            source,
            store,
            mapper,
            transactions,
            collaborators,
        }
    }

    /// One service per entity type, all sharing the same seams.
    pub fn for_all(
        source: Arc<dyn ExternalSource>,
        store: Arc<dyn RecordStore>,
        mapper: Arc<dyn RecordMapper>,
        transactions: Arc<dyn TransactionManager>,
        collaborators: Arc<SyncCollaborators>,
    ) -> Vec<Arc<dyn EntitySyncService>> {
        EntityType::all()
            .iter()
            .map(|entity| {
                Arc::new(Self::new(
                    *entity,
                    Arc::clone(&source),
                    Arc::clone(&store),
                    Arc::clone(&mapper),
                    Arc::clone(&transactions),
                    Arc::clone(&collaborators),
                )) as Arc<dyn EntitySyncService>
            })
            .collect()
    }

    fn persist(&self, records: &[LocalRecord]) -> Result<(), SyncError> {
        let outcome = self.store.replace_all(self.entity, records)?;
        tracing::debug!(entity = %self.entity, ?outcome, "store updated");

        let violations = self
            .collaborators
            .integrity
            .check_persisted(self.entity, records, self.store.as_ref())?;
        if !violations.is_empty() {
            return Err(SyncError::Integrity {
                entity: self.entity,
                violations,
            });
        }
        Ok(())
    }
}

#[async_trait]
impl EntitySyncService for RecordSyncService {
    fn entity_type(&self) -> EntityType {
        self.entity
    }

    async fn sync(&self, ctx: &SyncContext) -> Result<SyncResult, SyncError> {
        let entity = self.entity;
        let op = ctx.operation_id.as_str();
        let c = &self.collaborators;

        if !c.credentials.has_external_credential(entity) {
            tracing::warn!(entity = %entity, operation_id = op, "external credential unavailable, skipping");
            return Err(SyncError::CredentialUnavailable { entity });
        }
        if !c.breaker.allow(SOURCE_BREAKER_KEY) {
            return Err(SyncError::CircuitOpen {
                key: SOURCE_BREAKER_KEY.to_string(),
            });
        }

        let source = Arc::clone(&self.source);
        let fetched = c
            .retry
            .run(op, || {
                let source = Arc::clone(&source);
                async move { source.query(entity).await }
            })
            .await;
        let records = match fetched {
            Ok(records) => {
                c.breaker.record_success(SOURCE_BREAKER_KEY);
                c.health.record_up();
                records
            }
            Err(err) => {
                c.breaker.record_failure(SOURCE_BREAKER_KEY);
                c.health.record_down(err.to_string());
                return Err(err);
            }
        };

        if records.is_empty() {
            // An empty fetch never wipes the local store.
            tracing::info!(entity = %entity, operation_id = op, "nothing fetched");
            return Ok(SyncResult::success(entity, 0, 0));
        }

        let violations = c.validator.validate_fetched(entity, &records);
        for violation in &violations {
            tracing::warn!(entity = %entity, %violation, "record rejected");
        }
        let rejected: HashSet<usize> = violations.iter().filter_map(|v| v.index).collect();

        c.progress.start(op, records.len());
        let mut mapped = Vec::with_capacity(records.len());
        let mut errors = 0usize;
        for (index, record) in records.iter().enumerate() {
            if rejected.contains(&index) {
                errors += 1;
                c.progress.advance(op, false);
                continue;
            }
            match self.mapper.map(entity, record, &ctx.session) {
                Ok(Some(local)) => {
                    mapped.push(local);
                    c.progress.advance(op, true);
                }
                Ok(None) => c.progress.advance(op, true),
                Err(err) => {
                    tracing::warn!(entity = %entity, error = %err, "record mapping failed");
                    errors += 1;
                    c.progress.advance(op, false);
                }
            }
        }

        let tx = match self.transactions.begin(entity, op) {
            Ok(tx) => tx,
            Err(err) => {
                c.progress.finish(op);
                return Err(err);
            }
        };
        if let Err(err) = self.persist(&mapped) {
            if let Err(rollback_err) = self.transactions.rollback(tx) {
                tracing::error!(entity = %entity, error = %rollback_err, "rollback failed");
            }
            c.progress.finish(op);
            return Err(err);
        }
        self.transactions.commit(tx)?;
        c.progress.finish(op);

        tracing::info!(entity = %entity, operation_id = op, synced = mapped.len(), errors, "entity sync complete");
        Ok(SyncResult::success(entity, mapped.len(), errors))
    }
}
