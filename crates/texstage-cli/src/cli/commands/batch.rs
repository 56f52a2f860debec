//! `texstage batch <db.json>` – queue one slot of every texture in a selection database.

use anyhow::{Context, Result};
use std::path::Path;
use texstage_core::config::TexstageConfig;
use texstage_core::selection::{build_jobs, AssetCatalog, SelectionDb, Slot};

use super::{connect, run_jobs};

pub async fn run_batch(cfg: &TexstageConfig, db_path: &Path, slot: Slot) -> Result<()> {
    let db = SelectionDb::load(db_path)?;
    let (_, api) = connect(cfg)?;
    let catalog = tokio::task::spawn_blocking(move || api.fetch_catalog())
        .await
        .context("catalogue task join")??;
    let catalog = AssetCatalog::from_node(&catalog);
    tracing::info!(textures = db.textures.len(), assets = catalog.len(), %slot, "building jobs");

    let (jobs, skipped) = build_jobs(&db, &catalog, slot);
    for s in &skipped {
        println!("skipping {}: {}", s.texture, s.reason);
    }
    println!("Queueing {} job(s) from slot {}.", jobs.len(), slot);
    run_jobs(cfg, jobs).await
}
