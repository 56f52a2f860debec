//! `texstage urls <asset>` – list the download URLs in an asset's manifest.

use anyhow::{Context, Result};
use texstage_core::config::TexstageConfig;
use texstage_core::fetch::ManifestSource;
use texstage_core::manifest::extract_urls;

use super::{connect, runner};

pub async fn run_urls(cfg: &TexstageConfig, asset: &str, all: bool) -> Result<()> {
    let (fetcher, api) = connect(cfg)?;
    let runner = runner(cfg, fetcher, api.clone());
    let asset_id = asset.to_string();
    let manifest = tokio::task::spawn_blocking(move || api.fetch_manifest(&asset_id))
        .await
        .context("manifest task join")??;

    let urls: Vec<String> = if all {
        extract_urls(&manifest).into_iter().collect()
    } else {
        runner.required_urls(&manifest)
    };
    if urls.is_empty() {
        println!("No matching URLs for {}.", asset);
    }
    for url in urls {
        println!("{}", url);
    }
    Ok(())
}
