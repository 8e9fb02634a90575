//! Error types for booksim-sync.

use std::path::PathBuf;

use thiserror::Error;

use booksim_core::EntityType;

use crate::resilience::validation::Violation;

/// All errors that can arise inside one entity's sync.
#[derive(Debug, Error)]
pub enum SyncError {
    /// An I/O error, with annotated path for context.
    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// JSON (de)serialization error for records or store files.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// JSON error while reading a specific file.
    #[error("failed to parse {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    /// The external API credential is not available; nothing was attempted.
    #[error("external API credential unavailable for {entity}")]
    CredentialUnavailable { entity: EntityType },

    /// The circuit breaker for the dependency is open.
    #[error("circuit open for '{key}'")]
    CircuitOpen { key: String },

    /// The external source failed.
    #[error("external source error: {0}")]
    Source(String),

    /// Any other failure raised by a sync; displayed as the bare message.
    #[error("{0}")]
    Other(String),

    /// Post-write integrity check failed; the entity's transaction was rolled back.
    #[error("integrity check failed for {entity}: {}", summarize(.violations))]
    Integrity {
        entity: EntityType,
        violations: Vec<Violation>,
    },
}

fn summarize(violations: &[Violation]) -> String {
    violations
        .iter()
        .map(|v| v.to_string())
        .collect::<Vec<_>>()
        .join("; ")
}

impl From<String> for SyncError {
    fn from(message: String) -> Self {
        SyncError::Other(message)
    }
}

impl From<&str> for SyncError {
    fn from(message: &str) -> Self {
        SyncError::Other(message.to_string())
    }
}

/// Convenience constructor for [`SyncError::Io`].
pub(crate) fn io_err(path: impl Into<PathBuf>, source: std::io::Error) -> SyncError {
    SyncError::Io {
        path: path.into(),
        source,
    }
}
