use std::fs;
use std::path::Path;
use std::process::Command;

use assert_cmd::prelude::*;
use predicates::str::contains;
use serde_json::Value;
use tempfile::TempDir;

fn booksim_cmd(home: &Path) -> Command {
    let mut cmd = Command::new(assert_cmd::cargo::cargo_bin!("booksim"));
    cmd.env("HOME", home)
        .env("USERPROFILE", home)
        .env("BOOKSIM_API_TOKEN", "test-token")
        .env("NO_COLOR", "1")
        .env_remove("RUST_LOG");
    cmd
}

fn write_export(dir: &Path, entity: &str, body: &str) {
    fs::create_dir_all(dir).expect("create export dir");
    fs::write(dir.join(format!("{entity}.json")), body).expect("write export");
}

const SHOWS: &str = r#"[
  {"id": "s1", "properties": {"Name": {"type": "title", "title": [{"plain_text": "Raw"}]}}},
  {"id": "s2", "properties": {"Name": "SmackDown", "Night": "Friday"}}
]"#;

fn sync_json(home: &Path, args: &[&str]) -> Value {
    let assert = booksim_cmd(home)
        .arg("sync")
        .args(args)
        .arg("--json")
        .assert()
        .success();
    serde_json::from_slice(&assert.get_output().stdout).expect("sync JSON report")
}

#[test]
fn sync_writes_store_and_reports_json() {
    let home = TempDir::new().expect("home");
    let exports = home.path().join("exports");
    write_export(&exports, "shows", SHOWS);

    let report = sync_json(
        home.path(),
        &[
            "--source",
            exports.to_str().unwrap(),
            "--only",
            "shows",
            "--operation-id",
            "cli-batch",
        ],
    );

    assert_eq!(report["success"], Value::Bool(true));
    assert_eq!(report["operation_id"], "cli-batch");
    let results = report["results"].as_array().expect("results array");
    assert_eq!(results.len(), 1);
    assert_eq!(results[0]["entity_type"], "shows");
    assert_eq!(results[0]["result"]["synced_count"], 2);

    let stored = fs::read_to_string(home.path().join(".booksim/data/shows.json")).expect("store");
    assert!(stored.contains("SmackDown"));
    assert!(stored.contains("Friday"));
}

#[test]
fn default_source_is_under_booksim_root() {
    let home = TempDir::new().expect("home");
    write_export(&home.path().join(".booksim/exports"), "npcs", r#"[{"id": "n1", "properties": {"Name": "Heyman"}}]"#);

    let report = sync_json(home.path(), &["--only", "npcs"]);
    assert_eq!(report["results"][0]["result"]["synced_count"], 1);
}

#[test]
fn missing_credential_fails_entities_but_exits_zero() {
    let home = TempDir::new().expect("home");
    let exports = home.path().join("exports");
    write_export(&exports, "shows", SHOWS);

    booksim_cmd(home.path())
        .env_remove("BOOKSIM_API_TOKEN")
        .args(["sync", "--source", exports.to_str().unwrap(), "--only", "shows,teams"])
        .assert()
        .success()
        .stdout(contains("FAILED"))
        .stdout(contains("credential"));

    assert!(!home.path().join(".booksim/data/shows.json").exists());
}

#[test]
fn unknown_entity_is_rejected() {
    let home = TempDir::new().expect("home");
    booksim_cmd(home.path())
        .args(["sync", "--only", "referees"])
        .assert()
        .failure()
        .stderr(contains("referees"));
}

#[test]
fn config_prints_defaults_and_init_writes_file() {
    let home = TempDir::new().expect("home");

    booksim_cmd(home.path())
        .arg("config")
        .assert()
        .success()
        .stdout(contains("max_threads: 4"))
        .stdout(contains("entity_timeout_secs: 300"));

    booksim_cmd(home.path())
        .args(["config", "--init"])
        .assert()
        .success()
        .stdout(contains("config.yaml"));
    assert!(home.path().join(".booksim/config.yaml").exists());
}

#[test]
fn config_file_disables_entities() {
    let home = TempDir::new().expect("home");
    fs::create_dir_all(home.path().join(".booksim")).expect("root");
    let mut yaml = String::from("entities:\n");
    for entity in [
        "shows", "wrestlers", "factions", "teams", "matches", "seasons", "show-types",
        "show-templates", "injuries",
    ] {
        yaml.push_str(&format!("  {entity}: false\n"));
    }
    fs::write(home.path().join(".booksim/config.yaml"), yaml).expect("config");

    let report = sync_json(home.path(), &[]);
    let results = report["results"].as_array().expect("results");
    assert_eq!(results.len(), 1);
    assert_eq!(results[0]["entity_type"], "npcs");
}

#[test]
fn backups_lists_previous_versions() {
    let home = TempDir::new().expect("home");
    let exports = home.path().join("exports");
    let source = exports.to_str().unwrap().to_string();

    write_export(&exports, "shows", SHOWS);
    sync_json(home.path(), &["--source", &source, "--only", "shows"]);

    booksim_cmd(home.path())
        .args(["backups", "shows"])
        .assert()
        .success()
        .stdout(contains("No backups of shows.json"));

    write_export(
        &exports,
        "shows",
        r#"[{"id": "s3", "properties": {"Name": "NXT"}}]"#,
    );
    sync_json(home.path(), &["--source", &source, "--only", "shows"]);

    let assert = booksim_cmd(home.path())
        .args(["backups", "shows.json", "--json"])
        .assert()
        .success();
    let rows: Value = serde_json::from_slice(&assert.get_output().stdout).expect("backups JSON");
    let rows = rows.as_array().expect("rows");
    assert_eq!(rows.len(), 1);
    assert!(rows[0]["file"].as_str().unwrap().starts_with("shows_"));
}
