//! `booksim backups`: retained copies of one store file, newest first.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::NaiveDateTime;
use clap::Args;
use serde::Serialize;
use tabled::{settings::Style, Table, Tabled};

use booksim_core::config;
use booksim_sync::support::backup::TIMESTAMP_FORMAT;
use booksim_sync::BackupRotation;

/// Arguments for `booksim backups`.
#[derive(Args, Debug)]
pub struct BackupsArgs {
    /// Store file (`shows.json`) or entity type (`shows`).
    pub file: String,

    /// Emit machine-readable JSON.
    #[arg(long)]
    pub json: bool,
}

#[derive(Debug, Serialize, Tabled)]
struct BackupRow {
    #[tabled(rename = "backup")]
    file: String,
    #[tabled(rename = "taken at (UTC)")]
    taken_at: String,
    #[tabled(rename = "bytes")]
    bytes: u64,
}

impl BackupsArgs {
    pub fn run(self) -> Result<()> {
        let home: PathBuf = dirs::home_dir().context("could not determine home directory")?;
        let cfg = config::load_at(&home).context("failed to load booksim config")?;

        let file_name = store_file_name(&self.file);
        let rotation = BackupRotation::from_config(cfg.data_dir.clone(), &cfg.backup);
        let mut backups = rotation
            .list_backups(&file_name)
            .with_context(|| format!("failed to list backups of '{file_name}'"))?;
        backups.reverse();

        let rows = backups
            .iter()
            .map(|path| describe(path))
            .collect::<Result<Vec<_>>>()?;

        if self.json {
            println!(
                "{}",
                serde_json::to_string_pretty(&rows).context("failed to serialize backups")?
            );
            return Ok(());
        }

        if rows.is_empty() {
            println!(
                "No backups of {file_name} in {}",
                rotation.backup_dir().display()
            );
            return Ok(());
        }

        println!(
            "{} backups of {file_name} (keeping {})",
            rows.len(),
            rotation.max_files()
        );
        let mut table = Table::new(rows);
        table.with(Style::rounded());
        println!("{table}");
        Ok(())
    }
}

fn store_file_name(arg: &str) -> String {
    let arg = arg.trim();
    if arg.ends_with(".json") {
        arg.to_string()
    } else {
        format!("{arg}.json")
    }
}

fn describe(path: &Path) -> Result<BackupRow> {
    let file = path
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_default();
    let bytes = std::fs::metadata(path)
        .with_context(|| format!("failed to stat {}", path.display()))?
        .len();
    Ok(BackupRow {
        taken_at: taken_at(&file).unwrap_or_else(|| "?".to_string()),
        file,
        bytes,
    })
}

/// `shows_20261016_142501.json` → `2026-10-16 14:25:01`
fn taken_at(file: &str) -> Option<String> {
    let stem = file.strip_suffix(".json")?;
    let stamp = stem.get(stem.len().checked_sub(15)?..)?;
    NaiveDateTime::parse_from_str(stamp, TIMESTAMP_FORMAT)
        .ok()
        .map(|ts| ts.format("%Y-%m-%d %H:%M:%S").to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn entity_names_map_to_store_files() {
        assert_eq!(store_file_name("shows"), "shows.json");
        assert_eq!(store_file_name("show-types.json"), "show-types.json");
    }

    #[test]
    fn timestamp_is_read_from_backup_name() {
        assert_eq!(
            taken_at("shows_20261016_142501.json").as_deref(),
            Some("2026-10-16 14:25:01")
        );
        assert_eq!(taken_at("notes.json"), None);
    }
}
