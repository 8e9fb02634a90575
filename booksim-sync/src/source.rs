//! External source seam.

use std::io;
use std::path::PathBuf;

use async_trait::async_trait;

use booksim_core::EntityType;

use crate::error::{io_err, SyncError};
use crate::record::ExternalRecord;

/// The system of record that entity syncs pull from.
#[async_trait]
pub trait ExternalSource: Send + Sync {
    /// All records of one entity type.
    async fn query(&self, entity: EntityType) -> Result<Vec<ExternalRecord>, SyncError>;
}

/// Source backed by a directory of exports: `<dir>/<entity>.json`, each a
/// JSON array of [`ExternalRecord`]s. A missing export means "no records".
#[derive(Debug, Clone)]
pub struct JsonDirSource {
    dir: PathBuf,
}

impl JsonDirSource {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn path_for(&self, entity: EntityType) -> PathBuf {
        self.dir.join(format!("{entity}.json"))
    }
}

#[async_trait]
impl ExternalSource for JsonDirSource {
    async fn query(&self, entity: EntityType) -> Result<Vec<ExternalRecord>, SyncError> {
        let path = self.path_for(entity);
        let contents = match tokio::fs::read_to_string(&path).await {
            Ok(contents) => contents,
            Err(err) if err.kind() == io::ErrorKind::NotFound => {
                tracing::debug!(entity = %entity, path = %path.display(), "no export for entity");
                return Ok(Vec::new());
            }
            Err(err) => return Err(io_err(&path, err)),
        };
        serde_json::from_str(&contents).map_err(|source| SyncError::Parse { path, source })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn missing_export_is_empty() {
        let dir = TempDir::new().unwrap();
        let source = JsonDirSource::new(dir.path());
        assert!(source.query(EntityType::Seasons).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn reads_records_for_entity() {
        let dir = TempDir::new().unwrap();
        std::fs::write(
            dir.path().join("show-types.json"),
            r#"[{"id": "st-1", "properties": {"Name": "Weekly"}}]"#,
        )
        .unwrap();
        let records = JsonDirSource::new(dir.path())
            .query(EntityType::ShowTypes)
            .await
            .unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].id, "st-1");
    }

    #[tokio::test]
    async fn malformed_export_reports_path() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("npcs.json"), "{not json").unwrap();
        let err = JsonDirSource::new(dir.path())
            .query(EntityType::Npcs)
            .await
            .unwrap_err();
        assert!(matches!(err, SyncError::Parse { .. }));
        assert!(err.to_string().contains("npcs.json"));
    }
}
