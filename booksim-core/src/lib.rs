//! booksim core library: entity types, sync result values, configuration.
//!
//! Public API surface:
//! - [`types`]: entity types, operation ids, per-entity and batch results
//! - [`config`]: YAML-backed [`SyncConfig`]
//! - [`error`]: [`ConfigError`]

pub mod config;
pub mod error;
pub mod types;

pub use config::{BackupConfig, CircuitBreakerConfig, RetryConfig, SyncConfig};
pub use error::ConfigError;
pub use types::{EntitySyncResult, EntityType, OperationId, ParallelSyncResult, SyncResult};
