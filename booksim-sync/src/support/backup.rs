//! Backup-before-overwrite with count-based retention.
//!
//! Before a store file is replaced, a copy is taken into the backup directory:
//!
//! ```text
//! <source_dir>/shows.json  →  <backup_dir>/shows_20261016_142501.json
//! ```
//!
//! After each copy only the newest `max_files` backups for that base name are
//! kept. Ordering is by filename: `%Y%m%d_%H%M%S` sorts lexicographically in
//! chronological order, so no metadata is consulted.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};

use booksim_core::BackupConfig;

use crate::error::{io_err, SyncError};

/// `yyyyMMdd_HHmmss`
pub const TIMESTAMP_FORMAT: &str = "%Y%m%d_%H%M%S";

const TIMESTAMP_LEN: usize = 15;

#[derive(Debug, Clone)]
pub struct BackupRotation {
    source_dir: PathBuf,
    backup_dir: PathBuf,
    max_files: usize,
}

impl BackupRotation {
    /// A retention of zero is treated as one: the copy just taken is never
    /// pruned away.
    pub fn new(source_dir: impl Into<PathBuf>, backup_dir: impl Into<PathBuf>, max_files: usize) -> Self {
        Self {
            source_dir: source_dir.into(),
            backup_dir: backup_dir.into(),
            max_files: max_files.max(1),
        }
    }

    pub fn from_config(source_dir: impl Into<PathBuf>, config: &BackupConfig) -> Self {
        Self::new(source_dir, config.dir.clone(), config.max_files)
    }

    pub fn backup_dir(&self) -> &Path {
        &self.backup_dir
    }

    pub fn max_files(&self) -> usize {
        self.max_files
    }

    /// Back up `<source_dir>/<file_name>` if it exists.
    ///
    /// Returns the backup path, or `None` when there was nothing to back up.
    pub fn backup(&self, file_name: &str) -> Result<Option<PathBuf>, SyncError> {
        self.backup_at(file_name, Utc::now())
    }

    /// [`backup`](Self::backup) with an explicit timestamp.
    pub fn backup_at(
        &self,
        file_name: &str,
        now: DateTime<Utc>,
    ) -> Result<Option<PathBuf>, SyncError> {
        let source = self.source_dir.join(file_name);
        match fs::metadata(&source) {
            Ok(meta) if meta.is_file() => {}
            Ok(_) => return Ok(None),
            Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(err) => return Err(io_err(&source, err)),
        }

        fs::create_dir_all(&self.backup_dir).map_err(|e| io_err(&self.backup_dir, e))?;

        let base = base_name(file_name);
        let target = self
            .backup_dir
            .join(format!("{base}_{}.json", now.format(TIMESTAMP_FORMAT)));
        fs::copy(&source, &target).map_err(|e| io_err(&target, e))?;

        let pruned = self.prune(&base)?;
        tracing::info!(
            source = %source.display(),
            backup = %target.display(),
            pruned,
            "backup created"
        );
        Ok(Some(target))
    }

    /// Existing backups of `file_name`, oldest first.
    pub fn list_backups(&self, file_name: &str) -> Result<Vec<PathBuf>, SyncError> {
        self.backups_for(&base_name(file_name))
    }

    /// Delete the oldest backups of `base` beyond the retention count.
    fn prune(&self, base: &str) -> Result<usize, SyncError> {
        let backups = self.backups_for(base)?;
        let excess = backups.len().saturating_sub(self.max_files);
        for old in &backups[..excess] {
            match fs::remove_file(old) {
                Ok(()) => tracing::debug!(path = %old.display(), "old backup removed"),
                Err(err) if err.kind() == io::ErrorKind::NotFound => {}
                Err(err) => return Err(io_err(old, err)),
            }
        }
        Ok(excess)
    }

    fn backups_for(&self, base: &str) -> Result<Vec<PathBuf>, SyncError> {
        let entries = match fs::read_dir(&self.backup_dir) {
            Ok(entries) => entries,
            Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(err) => return Err(io_err(&self.backup_dir, err)),
        };

        let mut names = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|e| io_err(&self.backup_dir, e))?;
            let name = entry.file_name().to_string_lossy().into_owned();
            if is_backup_of(&name, base) {
                names.push(name);
            }
        }
        names.sort();
        Ok(names
            .into_iter()
            .map(|name| self.backup_dir.join(name))
            .collect())
    }
}

/// `shows.json` → `shows`
fn base_name(file_name: &str) -> String {
    Path::new(file_name)
        .file_stem()
        .map(|stem| stem.to_string_lossy().into_owned())
        .unwrap_or_else(|| file_name.to_string())
}

/// Matches `{base}_{yyyyMMdd_HHmmss}.json` exactly, so `shows` never claims
/// `show-types_…` or `shows_archive_…` files.
fn is_backup_of(name: &str, base: &str) -> bool {
    let Some(rest) = name
        .strip_prefix(base)
        .and_then(|rest| rest.strip_prefix('_'))
        .and_then(|rest| rest.strip_suffix(".json"))
    else {
        return false;
    };
    rest.len() == TIMESTAMP_LEN
        && rest.char_indices().all(|(i, c)| {
            if i == 8 {
                c == '_'
            } else {
                c.is_ascii_digit()
            }
        })
}
