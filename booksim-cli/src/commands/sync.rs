//! `booksim sync`: one parallel batch from the export directory into the
//! local store.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use clap::Args;
use colored::Colorize;
use tabled::{settings::Style, Table, Tabled};

use booksim_core::{config, EntitySyncResult, EntityType, ParallelSyncResult, SyncConfig};
use booksim_orchestrator::{interrupt_token, ParallelSyncOrchestrator};
use booksim_sync::resilience::SnapshotTransactions;
use booksim_sync::{
    BackupRotation, EntitySyncService, JsonDirSource, JsonFileStore, NamedRecordMapper,
    RecordSyncService, SyncCollaborators,
};

/// Arguments for `booksim sync`.
#[derive(Args, Debug)]
pub struct SyncArgs {
    /// Directory of exported records, one `<entity>.json` per type
    /// [default: ~/.booksim/exports].
    #[arg(long)]
    pub source: Option<PathBuf>,

    /// Correlation id for this batch; generated when omitted.
    #[arg(long)]
    pub operation_id: Option<String>,

    /// Sync only these entity types (comma-separated or repeated).
    #[arg(long, value_delimiter = ',')]
    pub only: Vec<EntityType>,

    /// Emit the batch report as JSON.
    #[arg(long)]
    pub json: bool,
}

impl SyncArgs {
    pub fn run(self) -> Result<()> {
        let home: PathBuf = dirs::home_dir().context("could not determine home directory")?;
        let mut cfg = config::load_at(&home).context("failed to load booksim config")?;
        if !self.only.is_empty() {
            cfg.restrict_to(&self.only);
        }

        let source_dir = self
            .source
            .unwrap_or_else(|| config::config_root(&home).join("exports"));
        let orchestrator = ParallelSyncOrchestrator::new(&cfg, build_services(&cfg, &source_dir))
            .context("failed to assemble sync services")?;

        let report = orchestrator
            .execute_parallel_sync_with_cancel(self.operation_id.as_deref(), &interrupt_token());

        if self.json {
            println!(
                "{}",
                serde_json::to_string_pretty(&report).context("failed to serialize sync report")?
            );
        } else {
            print_table(&report);
        }

        if !report.success {
            bail!(
                "sync batch {} failed: {}",
                report.operation_id,
                report.error_message.as_deref().unwrap_or("unknown error")
            );
        }
        Ok(())
    }
}

fn build_services(cfg: &SyncConfig, source_dir: &Path) -> Vec<Arc<dyn EntitySyncService>> {
    let store = Arc::new(JsonFileStore::new(
        cfg.data_dir.clone(),
        BackupRotation::from_config(cfg.data_dir.clone(), &cfg.backup),
    ));
    RecordSyncService::for_all(
        Arc::new(JsonDirSource::new(source_dir)),
        store,
        Arc::new(NamedRecordMapper::default()),
        Arc::new(SnapshotTransactions::new(cfg.data_dir.clone())),
        Arc::new(SyncCollaborators::from_config(cfg)),
    )
}

#[derive(Tabled)]
struct ResultRow {
    #[tabled(rename = "entity")]
    entity: String,
    #[tabled(rename = "status")]
    status: String,
    #[tabled(rename = "synced")]
    synced: usize,
    #[tabled(rename = "errors")]
    errors: usize,
    #[tabled(rename = "duration")]
    duration: String,
    #[tabled(rename = "detail")]
    detail: String,
}

impl From<&EntitySyncResult> for ResultRow {
    fn from(entry: &EntitySyncResult) -> Self {
        let status = if entry.is_success() {
            "OK".green().bold().to_string()
        } else {
            "FAILED".red().bold().to_string()
        };
        Self {
            entity: entry.entity_type.to_string(),
            status,
            synced: entry.result.synced_count(),
            errors: entry.result.error_count(),
            duration: format!("{} ms", entry.duration_ms),
            detail: entry.error_message.clone().unwrap_or_default(),
        }
    }
}

fn print_table(report: &ParallelSyncResult) {
    println!(
        "booksim v{} | operation {} | {} ok | {} failed | {} records | {} ms",
        env!("CARGO_PKG_VERSION"),
        report.operation_id,
        report.successful_count(),
        report.failed_count(),
        report.total_synced(),
        report.total_duration_ms,
    );

    if report.results.is_empty() {
        match &report.error_message {
            Some(message) => println!("{} {message}", "✗".red().bold()),
            None => println!("No entity types enabled."),
        }
        return;
    }

    let rows: Vec<ResultRow> = report.results.iter().map(ResultRow::from).collect();
    let mut table = Table::new(rows);
    table.with(Style::rounded());
    println!("{table}");
}
