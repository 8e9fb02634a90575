//! # booksim-sync
//!
//! Everything one entity sync needs, short of orchestration:
//!
//! - [`support`]: per-batch session dedup, backup rotation, the credential
//!   gate and shape-tolerant text extraction
//! - [`record`]: external record shapes and the local record
//! - [`source`], [`store`], [`mapper`]: the fetch / persist / map seams
//! - [`resilience`]: retry, circuit breaker, health, progress, validation,
//!   per-entity transactions
//! - [`service`]: the [`EntitySyncService`] contract and
//!   [`RecordSyncService`], its generic implementation

pub mod error;
pub mod mapper;
pub mod record;
pub mod resilience;
pub mod service;
pub mod source;
pub mod store;
pub mod support;

pub use error::SyncError;
pub use mapper::{MappingError, NamedRecordMapper, RecordMapper};
pub use record::{ExternalRecord, LocalRecord, Property, PropertyValue};
pub use service::{
    EntitySyncService, RecordSyncService, SyncCollaborators, SyncContext, SOURCE_BREAKER_KEY,
};
pub use source::{ExternalSource, JsonDirSource};
pub use store::{JsonFileStore, RecordStore, StoreOutcome};
pub use support::{AsText, BackupRotation, CredentialGate, EnvCredential, FieldText, SyncSession};
