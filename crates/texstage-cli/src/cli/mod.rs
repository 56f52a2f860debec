//! CLI for texstage.

mod commands;

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use texstage_core::composite::ResizePolicy;
use texstage_core::config::{self, TexstageConfig};

use commands::{run_batch, run_compose, run_get, run_urls};

/// Top-level CLI for texstage.
#[derive(Debug, Parser)]
#[command(name = "texstage")]
#[command(about = "texstage: fetch PBR material maps and pack them into engine textures", long_about = None)]
pub struct Cli {
    /// Config file to use instead of ~/.config/texstage/config.toml.
    #[arg(long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Override the configured resize policy for channels of differing size.
    #[arg(long, global = true, value_enum)]
    pub resize: Option<ResizeArg>,

    #[command(subcommand)]
    pub command: CliCommand,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum ResizeArg {
    Linear,
    Strict,
}

impl From<ResizeArg> for ResizePolicy {
    fn from(r: ResizeArg) -> Self {
        match r {
            ResizeArg::Linear => ResizePolicy::Linear,
            ResizeArg::Strict => ResizePolicy::Strict,
        }
    }
}

#[derive(Debug, Subcommand)]
pub enum CliCommand {
    /// Download one remote asset for a local texture and build its composites.
    Get {
        /// Local texture the composites are for (its file name becomes the label).
        texture: String,
        /// Remote asset id (or display name with --by-name).
        asset: String,
        /// Resolve ASSET as a catalogue display name.
        #[arg(long)]
        by_name: bool,
        /// Output label instead of the texture's file name.
        #[arg(long)]
        label: Option<String>,
    },

    /// Queue every texture's selection from a selection database.
    Batch {
        /// Path to the selection database (db.json).
        db: PathBuf,
        /// Which selection to use per texture.
        #[arg(long, default_value = "A", value_name = "A-D")]
        slot: String,
    },

    /// Rebuild composites from maps already in the staging directory.
    Compose {
        /// Remote asset id whose staged maps to use.
        asset: String,
        /// Output label.
        label: String,
    },

    /// List the download URLs found in an asset's manifest.
    Urls {
        /// Remote asset id.
        asset: String,
        /// Show every URL, not only the required maps.
        #[arg(long)]
        all: bool,
    },
}

fn load_config(cli: &Cli) -> Result<TexstageConfig> {
    let mut cfg = match &cli.config {
        Some(path) => config::load_or_init_at(path)?,
        None => config::load_or_init()?,
    };
    if let Some(resize) = cli.resize {
        cfg.resize = resize.into();
    }
    Ok(cfg)
}

impl CliCommand {
    pub async fn run_from_args() -> Result<()> {
        let cli = Cli::parse();
        let cfg = load_config(&cli)?;
        tracing::debug!("loaded config: {:?}", cfg);

        match cli.command {
            CliCommand::Get {
                texture,
                asset,
                by_name,
                label,
            } => run_get(&cfg, &texture, &asset, by_name, label.as_deref()).await?,
            CliCommand::Batch { db, slot } => run_batch(&cfg, &db, slot.parse()?).await?,
            CliCommand::Compose { asset, label } => run_compose(&cfg, &asset, &label).await?,
            CliCommand::Urls { asset, all } => run_urls(&cfg, &asset, all).await?,
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests;
