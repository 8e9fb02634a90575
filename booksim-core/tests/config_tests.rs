//! Config load/save integration tests and entity-type parsing cases.

use std::fs;
use std::path::PathBuf;

use assert_fs::prelude::*;
use booksim_core::{config, ConfigError, EntityType, SyncConfig};
use predicates::prelude::predicate;
use rstest::rstest;

// ---------------------------------------------------------------------------
// 1. Entity parsing
// ---------------------------------------------------------------------------

#[rstest]
#[case("shows", EntityType::Shows)]
#[case("WRESTLERS", EntityType::Wrestlers)]
#[case("show-types", EntityType::ShowTypes)]
#[case("show_templates", EntityType::ShowTemplates)]
#[case(" npcs ", EntityType::Npcs)]
fn parses_entity_names(#[case] input: &str, #[case] expected: EntityType) {
    assert_eq!(input.parse::<EntityType>().unwrap(), expected);
}

#[test]
fn unknown_entity_error_names_the_input() {
    let err = "referees".parse::<EntityType>().unwrap_err();
    assert!(matches!(err, ConfigError::UnknownEntity(_)));
    assert!(err.to_string().contains("referees"));
}

// ---------------------------------------------------------------------------
// 2. Load
// ---------------------------------------------------------------------------

#[test]
fn load_partial_yaml_keeps_defaults_for_missing_keys() {
    let home = assert_fs::TempDir::new().expect("tempdir");
    home.child(".booksim/config.yaml")
        .write_str("max_threads: 2\nentities:\n  injuries: false\n  show-types: false\n")
        .expect("write");

    let loaded = config::load_at(home.path()).expect("load");
    assert_eq!(loaded.max_threads, 2);
    assert_eq!(loaded.entity_timeout_secs, 300);
    assert!(!loaded.is_enabled(EntityType::Injuries));
    assert!(!loaded.is_enabled(EntityType::ShowTypes));
    assert_eq!(loaded.enabled_entities().len(), 8);
    assert_eq!(loaded.backup.max_files, 10);
}

#[test]
fn load_empty_file_is_defaults() {
    let home = assert_fs::TempDir::new().expect("tempdir");
    home.child(".booksim/config.yaml").touch().expect("touch");
    let loaded = config::load_at(home.path()).expect("load");
    assert_eq!(loaded, SyncConfig::defaults_at(home.path()));
}

#[test]
fn load_corrupt_yaml_returns_parse_error_with_path() {
    let home = assert_fs::TempDir::new().expect("tempdir");
    home.child(".booksim/config.yaml")
        .write_str("max_threads: [unclosed\n")
        .expect("write");

    let err = config::load_at(home.path()).unwrap_err();
    assert!(matches!(err, ConfigError::Parse { .. }), "got: {err}");
    assert!(err.to_string().contains("config.yaml"));
}

#[test]
fn load_rejects_unknown_entity_keys() {
    let home = assert_fs::TempDir::new().expect("tempdir");
    home.child(".booksim/config.yaml")
        .write_str("entities:\n  referees: true\n")
        .expect("write");
    assert!(matches!(
        config::load_at(home.path()),
        Err(ConfigError::Parse { .. })
    ));
}

// ---------------------------------------------------------------------------
// 3. Save
// ---------------------------------------------------------------------------

#[test]
fn save_then_load_preserves_settings() {
    let home = assert_fs::TempDir::new().expect("tempdir");
    let mut cfg = SyncConfig::defaults_at(home.path());
    cfg.max_threads = 8;
    cfg.backup.max_files = 3;
    cfg.data_dir = PathBuf::from("/srv/booksim/data");
    cfg.restrict_to(&[EntityType::Matches]);

    let path = config::save_at(home.path(), &cfg).expect("save");
    home.child(".booksim/config.yaml")
        .assert(predicate::path::exists());
    assert!(!path.with_extension("yaml.tmp").exists(), "tmp must be renamed away");

    let loaded = config::load_at(home.path()).expect("load");
    assert_eq!(loaded, cfg);
}

#[test]
fn save_creates_config_root() {
    let home = assert_fs::TempDir::new().expect("tempdir");
    config::save_at(home.path(), &SyncConfig::default()).expect("save");
    assert!(fs::metadata(home.path().join(".booksim")).unwrap().is_dir());
}
