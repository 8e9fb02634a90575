//! Parallel sync orchestrator.
//!
//! ## `execute_parallel_sync` lifecycle
//!
//! 1. Resolve the batch operation id (caller-supplied or freshly generated).
//! 2. Build a dedicated multi-thread runtime with `pool_size` workers; a
//!    semaphore with the same number of permits bounds concurrent syncs.
//! 3. Spawn exactly one task per enabled entity type into a `JoinSet`,
//!    remembering which entity each task id belongs to.
//! 4. Each task waits for a permit, then runs its sync under the entity
//!    deadline. A breached deadline drops the sync future on the spot.
//! 5. Collect completions in the order they finish. Panics, timeouts and
//!    interruption all become failed results for the owning entity.
//! 6. Clear and release the batch session, then shut the runtime down with a
//!    30s grace period.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tokio::sync::Semaphore;
use tokio::task::{self, JoinError, JoinSet};
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::Instrument;

use booksim_core::{
    EntitySyncResult, EntityType, OperationId, ParallelSyncResult, SyncConfig, SyncResult,
};
use booksim_sync::{EntitySyncService, SyncContext, SyncSession};

use crate::error::OrchestratorError;

/// How long the worker pool may take to wind down after collection before
/// its remaining tasks are dropped.
pub const SHUTDOWN_GRACE: Duration = Duration::from_secs(30);

/// `max(1, min(enabled, max_threads))`
pub fn pool_size(enabled: usize, max_threads: usize) -> usize {
    enabled.min(max_threads).max(1)
}

pub struct ParallelSyncOrchestrator {
    services: HashMap<EntityType, Arc<dyn EntitySyncService>>,
    enabled: Vec<EntityType>,
    max_threads: usize,
    entity_timeout: Duration,
}

impl ParallelSyncOrchestrator {
    /// Services for disabled entity types are accepted and never run.
    pub fn new(
        config: &SyncConfig,
        services: Vec<Arc<dyn EntitySyncService>>,
    ) -> Result<Self, OrchestratorError> {
        let mut by_type = HashMap::with_capacity(services.len());
        for service in services {
            let entity = service.entity_type();
            if by_type.insert(entity, service).is_some() {
                return Err(OrchestratorError::DuplicateService(entity));
            }
        }
        Ok(Self {
            services: by_type,
            enabled: config.enabled_entities(),
            max_threads: config.max_threads,
            entity_timeout: config.entity_timeout(),
        })
    }

    pub fn enabled_entities(&self) -> &[EntityType] {
        &self.enabled
    }

    pub fn pool_size(&self) -> usize {
        pool_size(self.enabled.len(), self.max_threads)
    }

    /// Run one batch to completion, blocking the calling thread.
    ///
    /// Inside an async runtime this refuses to run and returns an aborted
    /// report; use [`run_batch`](Self::run_batch) there.
    pub fn execute_parallel_sync(&self, base_operation_id: Option<&str>) -> ParallelSyncResult {
        self.execute_parallel_sync_with_cancel(base_operation_id, &CancellationToken::new())
    }

    /// [`execute_parallel_sync`](Self::execute_parallel_sync) that stops
    /// waiting once `cancel` fires. Outstanding tasks are aborted and
    /// reported as failed; the token stays cancelled.
    pub fn execute_parallel_sync_with_cancel(
        &self,
        base_operation_id: Option<&str>,
        cancel: &CancellationToken,
    ) -> ParallelSyncResult {
        let operation_id = base_operation_id
            .map(OperationId::from)
            .unwrap_or_else(OperationId::generate);
        let started_at = Utc::now();
        let clock = std::time::Instant::now();
        let workers = self.pool_size();

        tracing::info!(
            operation_id = %operation_id,
            entities = self.enabled.len(),
            workers,
            "starting parallel sync"
        );

        if tokio::runtime::Handle::try_current().is_ok() {
            tracing::error!(operation_id = %operation_id, "blocking sync entry point called inside an async runtime");
            return ParallelSyncResult::aborted(
                operation_id,
                started_at,
                "cannot run a blocking sync batch from inside an async runtime; use run_batch",
                clock.elapsed(),
            );
        }

        let runtime = match tokio::runtime::Builder::new_multi_thread()
            .worker_threads(workers)
            .thread_name("booksim-sync-worker")
            .enable_all()
            .build()
        {
            Ok(runtime) => runtime,
            Err(err) => {
                tracing::error!(operation_id = %operation_id, error = %err, "failed to build worker pool");
                return ParallelSyncResult::aborted(
                    operation_id,
                    started_at,
                    format!("failed to build worker pool: {err}"),
                    clock.elapsed(),
                );
            }
        };

        let results = runtime.block_on(self.run_batch(&operation_id, cancel.clone()));
        runtime.shutdown_timeout(SHUTDOWN_GRACE);

        let report = ParallelSyncResult::completed(operation_id, started_at, results, clock.elapsed());
        tracing::info!(
            operation_id = %report.operation_id,
            successful = report.successful_count(),
            failed = report.failed_count(),
            total_ms = report.total_duration_ms,
            "parallel sync complete"
        );
        report
    }

    /// Fan out one task per enabled entity type and collect every outcome.
    ///
    /// Returns exactly one result per enabled type, in completion order.
    pub async fn run_batch(
        &self,
        operation_id: &OperationId,
        cancel: CancellationToken,
    ) -> Vec<EntitySyncResult> {
        let session = Arc::new(SyncSession::new(operation_id.clone()));
        let permits = Arc::new(Semaphore::new(self.pool_size()));
        let mut tasks = JoinSet::new();
        let mut owners: HashMap<task::Id, (EntityType, Instant)> = HashMap::new();
        let mut results = Vec::with_capacity(self.enabled.len());

        for &entity in &self.enabled {
            let Some(service) = self.services.get(&entity) else {
                tracing::warn!(entity = %entity, "entity enabled but no sync service registered");
                results.push(EntitySyncResult::failed(
                    entity,
                    "no sync service registered",
                    Duration::ZERO,
                ));
                continue;
            };

            let ctx = SyncContext::new(operation_id.for_entity(entity), Arc::clone(&session));
            let span = tracing::info_span!(
                "entity_sync",
                entity = %entity,
                operation_id = %ctx.operation_id
            );
            let handle = tasks.spawn(
                run_entity(
                    entity,
                    Arc::clone(service),
                    ctx,
                    Arc::clone(&permits),
                    self.entity_timeout,
                )
                .instrument(span),
            );
            owners.insert(handle.id(), (entity, Instant::now()));
        }

        loop {
            tokio::select! {
                biased;
                _ = cancel.cancelled() => {
                    tracing::warn!(
                        operation_id = %operation_id,
                        outstanding = tasks.len(),
                        "parallel sync interrupted, aborting outstanding tasks"
                    );
                    tasks.abort_all();
                    while let Some(joined) = tasks.join_next_with_id().await {
                        results.extend(attribute(joined, &mut owners));
                    }
                    break;
                }
                joined = tasks.join_next_with_id() => {
                    let Some(joined) = joined else { break };
                    results.extend(attribute(joined, &mut owners));
                }
            }
        }

        // Every spawned task has been joined above; anything left is a task
        // whose id went missing, which still owes its entity a result.
        for (_, (entity, spawned)) in owners.drain() {
            tracing::error!(entity = %entity, "sync task lost without a result");
            results.push(EntitySyncResult::failed(entity, "sync task lost", spawned.elapsed()));
        }

        session.clear();
        match Arc::try_unwrap(session) {
            Ok(session) => session.release(),
            Err(_) => tracing::debug!(operation_id = %operation_id, "session still shared at batch end"),
        }

        results
    }
}

/// Body of one entity task: wait for a pool slot, then sync under the
/// deadline. Never fails; every outcome becomes a result.
async fn run_entity(
    entity: EntityType,
    service: Arc<dyn EntitySyncService>,
    ctx: SyncContext,
    permits: Arc<Semaphore>,
    deadline: Duration,
) -> EntitySyncResult {
    let _permit = match permits.acquire_owned().await {
        Ok(permit) => permit,
        Err(_) => return EntitySyncResult::failed(entity, "worker pool closed", Duration::ZERO),
    };

    let started = Instant::now();
    let outcome = tokio::time::timeout(deadline, service.sync(&ctx)).await;
    let elapsed = started.elapsed();

    let result = match outcome {
        Ok(Ok(result)) => {
            tracing::info!(
                synced = result.synced_count(),
                errors = result.error_count(),
                duration_ms = elapsed.as_millis() as u64,
                "entity sync finished"
            );
            result
        }
        Ok(Err(err)) => {
            tracing::error!(error = %err, "entity sync failed");
            SyncResult::failure(entity, err.to_string())
        }
        Err(_) => {
            tracing::error!(timeout_secs = deadline.as_secs(), "entity sync timed out");
            SyncResult::failure(entity, format!("timed out after {}s", deadline.as_secs()))
        }
    };
    EntitySyncResult::new(entity, result, elapsed)
}

/// Turn one join outcome into the owning entity's result.
fn attribute(
    joined: Result<(task::Id, EntitySyncResult), JoinError>,
    owners: &mut HashMap<task::Id, (EntityType, Instant)>,
) -> Option<EntitySyncResult> {
    match joined {
        Ok((id, result)) => {
            owners.remove(&id);
            Some(result)
        }
        Err(err) => {
            let (entity, spawned) = owners.remove(&err.id())?;
            let message = if err.is_cancelled() {
                "interrupted before completion".to_string()
            } else {
                format!("sync task panicked: {}", panic_message(err))
            };
            tracing::error!(entity = %entity, error = %message, "entity sync did not complete");
            Some(EntitySyncResult::failed(entity, message, spawned.elapsed()))
        }
    }
}

fn panic_message(err: JoinError) -> String {
    match err.try_into_panic() {
        Ok(payload) => payload
            .downcast_ref::<&str>()
            .map(|s| s.to_string())
            .or_else(|| payload.downcast_ref::<String>().cloned())
            .unwrap_or_else(|| "unknown panic payload".to_string()),
        Err(err) => err.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    use async_trait::async_trait;
    use booksim_sync::SyncError;

    enum Outcome {
        Synced(usize),
        Fails(&'static str),
        Panics,
    }

    struct Scripted {
        entity: EntityType,
        delay: Duration,
        outcome: Outcome,
        seen: Mutex<Vec<String>>,
        in_flight: Arc<AtomicUsize>,
        peak: Arc<AtomicUsize>,
    }

    impl Scripted {
        fn new(entity: EntityType, delay_ms: u64, outcome: Outcome) -> Self {
            Self {
                entity,
                delay: Duration::from_millis(delay_ms),
                outcome,
                seen: Mutex::new(Vec::new()),
                in_flight: Arc::new(AtomicUsize::new(0)),
                peak: Arc::new(AtomicUsize::new(0)),
            }
        }

        fn sharing(mut self, in_flight: &Arc<AtomicUsize>, peak: &Arc<AtomicUsize>) -> Self {
            self.in_flight = Arc::clone(in_flight);
            self.peak = Arc::clone(peak);
            self
        }
    }

    #[async_trait]
    impl EntitySyncService for Scripted {
        fn entity_type(&self) -> EntityType {
            self.entity
        }

        async fn sync(&self, ctx: &SyncContext) -> Result<SyncResult, SyncError> {
            self.seen.lock().unwrap().push(ctx.operation_id.to_string());
            let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
            self.peak.fetch_max(now, Ordering::SeqCst);
            tokio::time::sleep(self.delay).await;
            self.in_flight.fetch_sub(1, Ordering::SeqCst);
            match self.outcome {
                Outcome::Synced(n) => Ok(SyncResult::success(self.entity, n, 0)),
                Outcome::Fails(msg) => Err(SyncError::from(msg)),
                Outcome::Panics => panic!("mapper blew up"),
            }
        }
    }

    fn config(only: &[EntityType], max_threads: usize) -> SyncConfig {
        let mut config = SyncConfig::default();
        config.restrict_to(only);
        config.max_threads = max_threads;
        config
    }

    fn orchestrator(config: &SyncConfig, services: Vec<Scripted>) -> ParallelSyncOrchestrator {
        let services = services
            .into_iter()
            .map(|s| Arc::new(s) as Arc<dyn EntitySyncService>)
            .collect();
        ParallelSyncOrchestrator::new(config, services).unwrap()
    }

    fn op() -> OperationId {
        OperationId::from("sync-test")
    }

    #[test]
    fn pool_size_is_bounded() {
        assert_eq!(pool_size(10, 4), 4);
        assert_eq!(pool_size(2, 4), 2);
        assert_eq!(pool_size(0, 4), 1);
        assert_eq!(pool_size(3, 0), 1);
    }

    #[test]
    fn duplicate_service_is_rejected() {
        let services: Vec<Arc<dyn EntitySyncService>> = vec![
            Arc::new(Scripted::new(EntityType::Shows, 0, Outcome::Synced(1))),
            Arc::new(Scripted::new(EntityType::Shows, 0, Outcome::Synced(1))),
        ];
        let err = ParallelSyncOrchestrator::new(&SyncConfig::default(), services)
            .err()
            .unwrap();
        assert!(matches!(err, OrchestratorError::DuplicateService(EntityType::Shows)));
    }

    #[tokio::test(start_paused = true)]
    async fn wall_clock_tracks_slowest_entity() {
        let cfg = config(&[EntityType::Shows, EntityType::Wrestlers], 4);
        let orch = orchestrator(
            &cfg,
            vec![
                Scripted::new(EntityType::Shows, 50, Outcome::Synced(3)),
                Scripted::new(EntityType::Wrestlers, 80, Outcome::Synced(5)),
            ],
        );

        let started = Instant::now();
        let results = orch.run_batch(&op(), CancellationToken::new()).await;
        let elapsed = started.elapsed();

        assert_eq!(results.len(), 2);
        assert!(results.iter().all(EntitySyncResult::is_success));
        assert!(elapsed >= Duration::from_millis(80), "{elapsed:?}");
        assert!(elapsed < Duration::from_millis(130), "{elapsed:?}");
        // Completion order: the faster entity is reported first.
        assert_eq!(results[0].entity_type, EntityType::Shows);
    }

    #[tokio::test(start_paused = true)]
    async fn one_failure_does_not_affect_others() {
        let cfg = config(&[EntityType::Shows, EntityType::Wrestlers], 4);
        let orch = orchestrator(
            &cfg,
            vec![
                Scripted::new(EntityType::Shows, 10, Outcome::Synced(2)),
                Scripted::new(EntityType::Wrestlers, 10, Outcome::Fails("db down")),
            ],
        );

        let results = orch.run_batch(&op(), CancellationToken::new()).await;
        let shows = results.iter().find(|r| r.entity_type == EntityType::Shows).unwrap();
        let wrestlers = results.iter().find(|r| r.entity_type == EntityType::Wrestlers).unwrap();

        assert!(shows.is_success());
        assert_eq!(shows.result.synced_count(), 2);
        assert_eq!(
            wrestlers.result,
            SyncResult::failure(EntityType::Wrestlers, "db down")
        );
        assert_eq!(wrestlers.error_message.as_deref(), Some("db down"));
    }

    #[tokio::test(start_paused = true)]
    async fn panic_is_attributed_to_its_entity() {
        let cfg = config(&[EntityType::Teams, EntityType::Npcs], 2);
        let orch = orchestrator(
            &cfg,
            vec![
                Scripted::new(EntityType::Teams, 5, Outcome::Panics),
                Scripted::new(EntityType::Npcs, 5, Outcome::Synced(1)),
            ],
        );

        let results = orch.run_batch(&op(), CancellationToken::new()).await;
        assert_eq!(results.len(), 2);
        let teams = results.iter().find(|r| r.entity_type == EntityType::Teams).unwrap();
        assert!(!teams.is_success());
        assert!(teams.error_message.as_deref().unwrap().contains("mapper blew up"));
    }

    #[tokio::test(start_paused = true)]
    async fn deadline_cancels_slow_entity_only() {
        let mut cfg = config(&[EntityType::Seasons, EntityType::Injuries], 4);
        cfg.entity_timeout_secs = 1;
        let orch = orchestrator(
            &cfg,
            vec![
                Scripted::new(EntityType::Seasons, 5_000, Outcome::Synced(1)),
                Scripted::new(EntityType::Injuries, 10, Outcome::Synced(1)),
            ],
        );

        let started = Instant::now();
        let results = orch.run_batch(&op(), CancellationToken::new()).await;
        assert!(started.elapsed() < Duration::from_secs(2), "slow task must be cut at its deadline");

        let seasons = results.iter().find(|r| r.entity_type == EntityType::Seasons).unwrap();
        assert!(!seasons.is_success());
        assert!(seasons.error_message.as_deref().unwrap().contains("timed out"));
        assert!(results
            .iter()
            .find(|r| r.entity_type == EntityType::Injuries)
            .unwrap()
            .is_success());
    }

    #[tokio::test(start_paused = true)]
    async fn concurrency_never_exceeds_pool() {
        let in_flight = Arc::new(AtomicUsize::new(0));
        let peak = Arc::new(AtomicUsize::new(0));
        let all = EntityType::all();
        let cfg = config(all, 3);
        let services = all
            .iter()
            .map(|e| Scripted::new(*e, 20, Outcome::Synced(1)).sharing(&in_flight, &peak))
            .collect();
        let orch = orchestrator(&cfg, services);

        let results = orch.run_batch(&op(), CancellationToken::new()).await;
        assert_eq!(results.len(), all.len());
        assert_eq!(orch.pool_size(), 3);
        let peak = peak.load(Ordering::SeqCst);
        assert!((1..=3).contains(&peak), "peak concurrency {peak}");
    }

    #[tokio::test(start_paused = true)]
    async fn enabled_entity_without_service_is_reported_failed() {
        let cfg = config(&[EntityType::Shows, EntityType::Factions], 4);
        let orch = orchestrator(
            &cfg,
            vec![
                Scripted::new(EntityType::Shows, 1, Outcome::Synced(1)),
                Scripted::new(EntityType::Matches, 1, Outcome::Synced(1)),
            ],
        );

        let results = orch.run_batch(&op(), CancellationToken::new()).await;
        assert_eq!(results.len(), 2, "disabled matches service must not run");
        let factions = results.iter().find(|r| r.entity_type == EntityType::Factions).unwrap();
        assert_eq!(
            factions.error_message.as_deref(),
            Some("no sync service registered")
        );
    }

    #[tokio::test(start_paused = true)]
    async fn interruption_fails_outstanding_and_keeps_token_set() {
        let cfg = config(&[EntityType::Shows, EntityType::Wrestlers], 4);
        let orch = orchestrator(
            &cfg,
            vec![
                Scripted::new(EntityType::Shows, 50, Outcome::Synced(1)),
                Scripted::new(EntityType::Wrestlers, 10_000, Outcome::Synced(1)),
            ],
        );
        let cancel = CancellationToken::new();
        let trigger = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(100)).await;
            trigger.cancel();
        });

        let results = orch.run_batch(&op(), cancel.clone()).await;
        assert_eq!(results.len(), 2);
        assert!(results[0].is_success());
        assert_eq!(results[1].entity_type, EntityType::Wrestlers);
        assert_eq!(
            results[1].error_message.as_deref(),
            Some("interrupted before completion")
        );
        assert!(cancel.is_cancelled());
    }

    #[tokio::test]
    async fn blocking_entry_point_inside_runtime_aborts() {
        let cfg = config(&[EntityType::Shows], 1);
        let service = Arc::new(Scripted::new(EntityType::Shows, 0, Outcome::Synced(1)));
        let orch = ParallelSyncOrchestrator::new(
            &cfg,
            vec![Arc::clone(&service) as Arc<dyn EntitySyncService>],
        )
        .unwrap();

        let report = orch.execute_parallel_sync(Some("nested"));
        assert!(!report.success);
        assert!(report.results.is_empty());
        assert!(report.error_message.as_deref().unwrap().contains("async runtime"));
        assert!(service.seen.lock().unwrap().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn sub_operation_ids_carry_entity_suffix() {
        let cfg = config(&[EntityType::ShowTypes], 1);
        let service = Arc::new(Scripted::new(EntityType::ShowTypes, 0, Outcome::Synced(0)));
        let orch = ParallelSyncOrchestrator::new(
            &cfg,
            vec![Arc::clone(&service) as Arc<dyn EntitySyncService>],
        )
        .unwrap();

        orch.run_batch(&OperationId::from("batch-7"), CancellationToken::new()).await;
        assert_eq!(*service.seen.lock().unwrap(), vec!["batch-7-show-types".to_string()]);
    }
}
