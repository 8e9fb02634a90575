//! Commit/rollback boundary for one entity type's sync.
//!
//! There is no batch-wide transaction: every entity commits or rolls back on
//! its own.

use std::io;
use std::path::PathBuf;

use booksim_core::EntityType;

use crate::error::{io_err, SyncError};
use crate::store::JsonFileStore;

/// An open per-entity transaction. Consumed by commit or rollback.
#[derive(Debug)]
#[must_use = "a transaction must be committed or rolled back"]
pub struct Transaction {
    pub entity: EntityType,
    pub operation_id: String,
    path: PathBuf,
    snapshot: Option<Vec<u8>>,
}

pub trait TransactionManager: Send + Sync {
    fn begin(&self, entity: EntityType, operation_id: &str) -> Result<Transaction, SyncError>;
    fn commit(&self, tx: Transaction) -> Result<(), SyncError>;
    fn rollback(&self, tx: Transaction) -> Result<(), SyncError>;
}

/// Transactions over a [`JsonFileStore`] directory: `begin` snapshots the
/// entity's file in memory, `rollback` puts it back (or removes a file that
/// did not exist before).
#[derive(Debug, Clone)]
pub struct SnapshotTransactions {
    data_dir: PathBuf,
}

impl SnapshotTransactions {
    pub fn new(data_dir: impl Into<PathBuf>) -> Self {
        Self {
            data_dir: data_dir.into(),
        }
    }
}

impl TransactionManager for SnapshotTransactions {
    fn begin(&self, entity: EntityType, operation_id: &str) -> Result<Transaction, SyncError> {
        let path = self.data_dir.join(JsonFileStore::file_name(entity));
        let snapshot = match std::fs::read(&path) {
            Ok(bytes) => Some(bytes),
            Err(err) if err.kind() == io::ErrorKind::NotFound => None,
            Err(err) => return Err(io_err(&path, err)),
        };
        tracing::debug!(entity = %entity, operation_id, "transaction started");
        Ok(Transaction {
            entity,
            operation_id: operation_id.to_string(),
            path,
            snapshot,
        })
    }

    fn commit(&self, tx: Transaction) -> Result<(), SyncError> {
        tracing::debug!(entity = %tx.entity, operation_id = %tx.operation_id, "transaction committed");
        Ok(())
    }

    fn rollback(&self, tx: Transaction) -> Result<(), SyncError> {
        match &tx.snapshot {
            Some(bytes) => {
                let tmp = tx.path.with_extension("json.rollback");
                std::fs::write(&tmp, bytes).map_err(|e| io_err(&tmp, e))?;
                if let Err(e) = std::fs::rename(&tmp, &tx.path) {
                    let _ = std::fs::remove_file(&tmp);
                    return Err(io_err(&tx.path, e));
                }
            }
            None => match std::fs::remove_file(&tx.path) {
                Ok(()) => {}
                Err(err) if err.kind() == io::ErrorKind::NotFound => {}
                Err(err) => return Err(io_err(&tx.path, err)),
            },
        }
        tracing::warn!(entity = %tx.entity, operation_id = %tx.operation_id, "transaction rolled back");
        Ok(())
    }
}
