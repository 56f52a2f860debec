//! `texstage compose <asset> <label>` – rebuild composites from staged maps.

use anyhow::{Context, Result};
use texstage_core::config::TexstageConfig;
use texstage_core::queue::Job;

use super::{connect, runner};

pub async fn run_compose(cfg: &TexstageConfig, asset: &str, label: &str) -> Result<()> {
    let (fetcher, api) = connect(cfg)?;
    let runner = runner(cfg, fetcher, api);
    let job = Job::new(label, asset, label);
    let report = tokio::task::spawn_blocking(move || runner.compose_staged(&job))
        .await
        .context("compose task join")??;

    if report.composites.is_empty() {
        println!("No composites built for {}.", asset);
    }
    for name in &report.composites {
        println!("wrote {}", cfg.output_dir().join(name).display());
    }
    for d in &report.diagnostics {
        println!("  {}", d);
    }
    Ok(())
}
