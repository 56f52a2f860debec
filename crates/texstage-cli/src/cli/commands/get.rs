//! `texstage get <texture> <asset>` – fetch one asset and build its composites.

use anyhow::{Context, Result};
use texstage_core::config::TexstageConfig;
use texstage_core::queue::Job;
use texstage_core::selection::{output_label, AssetCatalog};

use super::{connect, run_jobs};

pub async fn run_get(
    cfg: &TexstageConfig,
    texture: &str,
    asset: &str,
    by_name: bool,
    label: Option<&str>,
) -> Result<()> {
    let asset_id = if by_name {
        let (_, api) = connect(cfg)?;
        let catalog = tokio::task::spawn_blocking(move || api.fetch_catalog())
            .await
            .context("catalogue task join")??;
        AssetCatalog::from_node(&catalog)
            .id_for_name(asset)
            .map(str::to_string)
            .ok_or_else(|| anyhow::anyhow!("no asset named {:?} in the catalogue", asset))?
    } else {
        asset.to_string()
    };
    let label = label
        .map(str::to_string)
        .unwrap_or_else(|| output_label(texture));
    run_jobs(cfg, vec![Job::new(texture, asset_id, label)]).await
}
