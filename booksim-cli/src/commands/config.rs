//! `booksim config`: show or persist the effective configuration.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;

use booksim_core::config;

/// Arguments for `booksim config`.
#[derive(Args, Debug)]
pub struct ConfigArgs {
    /// Write the effective configuration to `~/.booksim/config.yaml`.
    #[arg(long)]
    pub init: bool,
}

impl ConfigArgs {
    pub fn run(self) -> Result<()> {
        let home: PathBuf = dirs::home_dir().context("could not determine home directory")?;
        let cfg = config::load_at(&home).context("failed to load booksim config")?;

        if self.init {
            let path = config::save_at(&home, &cfg).context("failed to write booksim config")?;
            println!("✓ wrote {}", path.display());
            return Ok(());
        }

        print!(
            "{}",
            serde_yaml::to_string(&cfg).context("failed to serialize config")?
        );
        Ok(())
    }
}
