//! YAML sync configuration.
//!
//! # Storage layout
//!
//! ```text
//! ~/.booksim/
//!   config.yaml     (optional, defaults apply when absent)
//!   data/           (local JSON store, `data_dir`)
//!   backups/        (timestamped copies, `backup.dir`)
//! ```
//!
//! Like the rest of the workspace, every function touching the home directory
//! has an `_at(home: &Path, …)` form; the no-arg wrappers resolve home through
//! `dirs::home_dir()` and are never used by tests.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{io_err, ConfigError};
use crate::types::EntityType;

pub const DEFAULT_MAX_THREADS: usize = 4;
pub const DEFAULT_ENTITY_TIMEOUT_SECS: u64 = 300;
pub const DEFAULT_BACKUP_MAX_FILES: usize = 10;
pub const DEFAULT_CREDENTIAL_ENV: &str = "BOOKSIM_API_TOKEN";

/// Top-level sync configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SyncConfig {
    /// Per-entity enable flags. Types missing from the map are enabled.
    pub entities: BTreeMap<EntityType, bool>,
    /// Upper bound on the orchestrator's worker pool.
    pub max_threads: usize,
    /// Deadline for a single entity sync, in seconds.
    pub entity_timeout_secs: u64,
    /// Root of the local JSON store. Relative paths resolve under `~/.booksim`.
    pub data_dir: PathBuf,
    /// Environment variable holding the external API credential.
    pub credential_env: String,
    pub backup: BackupConfig,
    pub retry: RetryConfig,
    pub circuit_breaker: CircuitBreakerConfig,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BackupConfig {
    pub dir: PathBuf,
    /// Copies kept per base filename.
    pub max_files: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryConfig {
    pub max_attempts: u32,
    pub initial_backoff_ms: u64,
    pub max_backoff_ms: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CircuitBreakerConfig {
    /// Consecutive failures that open the circuit.
    pub failure_threshold: u32,
    pub cooldown_secs: u64,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            entities: BTreeMap::new(),
            max_threads: DEFAULT_MAX_THREADS,
            entity_timeout_secs: DEFAULT_ENTITY_TIMEOUT_SECS,
            data_dir: PathBuf::new(),
            credential_env: DEFAULT_CREDENTIAL_ENV.to_string(),
            backup: BackupConfig::default(),
            retry: RetryConfig::default(),
            circuit_breaker: CircuitBreakerConfig::default(),
        }
    }
}

impl Default for BackupConfig {
    fn default() -> Self {
        Self {
            dir: PathBuf::new(),
            max_files: DEFAULT_BACKUP_MAX_FILES,
        }
    }
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            initial_backoff_ms: 200,
            max_backoff_ms: 5_000,
        }
    }
}

impl Default for CircuitBreakerConfig {
    fn default() -> Self {
        Self {
            failure_threshold: 5,
            cooldown_secs: 60,
        }
    }
}

impl SyncConfig {
    /// Defaults with every path resolved under `<home>/.booksim`.
    pub fn defaults_at(home: &Path) -> Self {
        let mut config = Self::default();
        config.resolve_paths(home);
        config
    }

    /// Fill empty paths with their defaults and anchor relative ones under
    /// `<home>/.booksim`.
    pub fn resolve_paths(&mut self, home: &Path) {
        let root = config_root(home);
        self.data_dir = resolve_dir(&root, &self.data_dir, "data");
        self.backup.dir = resolve_dir(&root, &self.backup.dir, "backups");
    }

    pub fn is_enabled(&self, entity: EntityType) -> bool {
        self.entities.get(&entity).copied().unwrap_or(true)
    }

    /// Enabled entity types in canonical order.
    pub fn enabled_entities(&self) -> Vec<EntityType> {
        EntityType::all()
            .iter()
            .copied()
            .filter(|entity| self.is_enabled(*entity))
            .collect()
    }

    /// Enable exactly `only`, disabling every other type.
    pub fn restrict_to(&mut self, only: &[EntityType]) {
        self.entities = EntityType::all()
            .iter()
            .map(|entity| (*entity, only.contains(entity)))
            .collect();
    }

    /// Per-entity deadline; never shorter than one second.
    pub fn entity_timeout(&self) -> Duration {
        Duration::from_secs(self.entity_timeout_secs.max(1))
    }
}

fn resolve_dir(root: &Path, configured: &Path, default_name: &str) -> PathBuf {
    if configured.as_os_str().is_empty() {
        root.join(default_name)
    } else if configured.is_relative() {
        root.join(configured)
    } else {
        configured.to_path_buf()
    }
}

// ---------------------------------------------------------------------------
// Paths
// ---------------------------------------------------------------------------

/// `<home>/.booksim`
pub fn config_root(home: &Path) -> PathBuf {
    home.join(".booksim")
}

/// `<home>/.booksim/config.yaml`
pub fn config_path_at(home: &Path) -> PathBuf {
    config_root(home).join("config.yaml")
}

// ---------------------------------------------------------------------------
// Load / save
// ---------------------------------------------------------------------------

/// Load `<home>/.booksim/config.yaml`, falling back to defaults when absent.
///
/// Paths in the returned config are always resolved.
pub fn load_at(home: &Path) -> Result<SyncConfig, ConfigError> {
    let path = config_path_at(home);
    if !path.exists() {
        return Ok(SyncConfig::defaults_at(home));
    }
    let contents = std::fs::read_to_string(&path).map_err(|e| io_err(&path, e))?;
    let mut config: SyncConfig = if contents.trim().is_empty() {
        SyncConfig::default()
    } else {
        serde_yaml::from_str(&contents).map_err(|source| ConfigError::Parse { path, source })?
    };
    config.resolve_paths(home);
    Ok(config)
}

/// `load_at` convenience wrapper.
pub fn load() -> Result<SyncConfig, ConfigError> {
    load_at(&home()?)
}

/// Atomically write `config` to `<home>/.booksim/config.yaml`.
///
/// Write flow: serialize → `config.yaml.tmp` sibling → `rename`.
pub fn save_at(home: &Path, config: &SyncConfig) -> Result<PathBuf, ConfigError> {
    let root = config_root(home);
    std::fs::create_dir_all(&root).map_err(|e| io_err(&root, e))?;

    let path = config_path_at(home);
    let tmp = path.with_extension("yaml.tmp");
    let yaml = serde_yaml::to_string(config)?;
    std::fs::write(&tmp, yaml).map_err(|e| io_err(&tmp, e))?;
    if let Err(e) = std::fs::rename(&tmp, &path) {
        let _ = std::fs::remove_file(&tmp);
        return Err(io_err(&path, e));
    }
    Ok(path)
}

/// `save_at` convenience wrapper.
pub fn save(config: &SyncConfig) -> Result<PathBuf, ConfigError> {
    save_at(&home()?, config)
}

fn home() -> Result<PathBuf, ConfigError> {
    dirs::home_dir().ok_or(ConfigError::HomeNotFound)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn missing_file_yields_resolved_defaults() {
        let home = TempDir::new().unwrap();
        let config = load_at(home.path()).unwrap();
        assert_eq!(config.max_threads, DEFAULT_MAX_THREADS);
        assert_eq!(config.data_dir, home.path().join(".booksim").join("data"));
        assert_eq!(config.backup.dir, home.path().join(".booksim").join("backups"));
        assert_eq!(config.enabled_entities().len(), EntityType::all().len());
    }

    #[test]
    fn unlisted_entities_default_to_enabled() {
        let mut config = SyncConfig::default();
        config.entities.insert(EntityType::Injuries, false);
        assert!(!config.is_enabled(EntityType::Injuries));
        assert!(config.is_enabled(EntityType::Shows));
        assert_eq!(config.enabled_entities().len(), 9);
    }

    #[test]
    fn restrict_to_disables_everything_else() {
        let mut config = SyncConfig::default();
        config.restrict_to(&[EntityType::Wrestlers, EntityType::Shows]);
        assert_eq!(
            config.enabled_entities(),
            vec![EntityType::Shows, EntityType::Wrestlers]
        );
    }

    #[test]
    fn zero_timeout_clamps_to_one_second() {
        let config = SyncConfig {
            entity_timeout_secs: 0,
            ..SyncConfig::default()
        };
        assert_eq!(config.entity_timeout(), Duration::from_secs(1));
    }

    #[test]
    fn relative_paths_resolve_under_config_root() {
        let home = TempDir::new().unwrap();
        let mut config = SyncConfig {
            data_dir: PathBuf::from("store"),
            ..SyncConfig::default()
        };
        config.resolve_paths(home.path());
        assert_eq!(config.data_dir, home.path().join(".booksim").join("store"));
    }
}
