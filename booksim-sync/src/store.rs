//! Local record store.
//!
//! ## `JsonFileStore::replace_all` write protocol
//!
//! 1. Serialize the entity's records (pretty JSON, trailing newline).
//! 2. SHA-256 the payload and compare with the file on disk → skip if identical.
//! 3. Back up the current file through [`BackupRotation`].
//! 4. Write to `<entity>.json.tmp`.
//! 5. Rename to `<entity>.json` (atomic on POSIX).
//!
//! Each entity type owns one file, so concurrent syncs of different types
//! never write the same path.

use std::io;
use std::path::{Path, PathBuf};

use sha2::{Digest, Sha256};

use booksim_core::EntityType;

use crate::error::{io_err, SyncError};
use crate::record::LocalRecord;
use crate::support::BackupRotation;

/// Where mapped records end up.
pub trait RecordStore: Send + Sync {
    /// Replace every stored record of `entity` with `records`.
    fn replace_all(&self, entity: EntityType, records: &[LocalRecord]) -> Result<StoreOutcome, SyncError>;

    /// Currently stored records of `entity`; empty if none were ever written.
    fn load(&self, entity: EntityType) -> Result<Vec<LocalRecord>, SyncError>;
}

/// Outcome of one [`RecordStore::replace_all`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreOutcome {
    /// File was written; `backup` is the copy taken of the previous version.
    Written {
        path: PathBuf,
        backup: Option<PathBuf>,
    },
    /// Content identical to what is already stored.
    Unchanged { path: PathBuf },
}

#[derive(Debug, Clone)]
pub struct JsonFileStore {
    data_dir: PathBuf,
    backups: BackupRotation,
}

impl JsonFileStore {
    pub fn new(data_dir: impl Into<PathBuf>, backups: BackupRotation) -> Self {
        Self {
            data_dir: data_dir.into(),
            backups,
        }
    }

    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    pub fn file_name(entity: EntityType) -> String {
        format!("{entity}.json")
    }

    pub fn path_for(&self, entity: EntityType) -> PathBuf {
        self.data_dir.join(Self::file_name(entity))
    }
}

impl RecordStore for JsonFileStore {
    fn replace_all(&self, entity: EntityType, records: &[LocalRecord]) -> Result<StoreOutcome, SyncError> {
        let path = self.path_for(entity);
        let mut payload = serde_json::to_string_pretty(records)?;
        payload.push('\n');

        if let Some(existing) = read_digest(&path)? {
            if existing == digest(payload.as_bytes()) {
                tracing::debug!(entity = %entity, path = %path.display(), "unchanged");
                return Ok(StoreOutcome::Unchanged { path });
            }
        }

        std::fs::create_dir_all(&self.data_dir).map_err(|e| io_err(&self.data_dir, e))?;
        let backup = self.backups.backup(&Self::file_name(entity))?;

        let tmp = path.with_extension("json.tmp");
        std::fs::write(&tmp, &payload).map_err(|e| io_err(&tmp, e))?;
        if let Err(e) = std::fs::rename(&tmp, &path) {
            let _ = std::fs::remove_file(&tmp);
            return Err(io_err(&path, e));
        }

        tracing::info!(entity = %entity, path = %path.display(), records = records.len(), "wrote");
        Ok(StoreOutcome::Written { path, backup })
    }

    fn load(&self, entity: EntityType) -> Result<Vec<LocalRecord>, SyncError> {
        let path = self.path_for(entity);
        let contents = match std::fs::read_to_string(&path) {
            Ok(contents) => contents,
            Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(err) => return Err(io_err(&path, err)),
        };
        serde_json::from_str(&contents).map_err(|source| SyncError::Parse { path, source })
    }
}

fn digest(bytes: &[u8]) -> String {
    let mut h = Sha256::new();
    h.update(bytes);
    hex::encode(h.finalize())
}

fn read_digest(path: &Path) -> Result<Option<String>, SyncError> {
    match std::fs::read(path) {
        Ok(bytes) => Ok(Some(digest(&bytes))),
        Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(None),
        Err(err) => Err(io_err(path, err)),
    }
}
