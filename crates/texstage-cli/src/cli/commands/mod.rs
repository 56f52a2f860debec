//! CLI command handlers. Each command is in its own file.

mod batch;
mod compose;
mod get;
mod printer;
mod urls;

pub use batch::run_batch;
pub use compose::run_compose;
pub use get::run_get;
pub use urls::run_urls;

use anyhow::Result;
use std::sync::Arc;
use texstage_core::config::TexstageConfig;
use texstage_core::fetch::{ApiClient, CurlFetcher, Fetcher, ManifestSource};
use texstage_core::queue::{DownloadQueue, Job, JobRunner, JobState, QueueObserver};

/// Curl fetcher and API client built from the config, sharing one fetcher.
fn connect(cfg: &TexstageConfig) -> Result<(Arc<dyn Fetcher>, Arc<ApiClient>)> {
    let fetcher: Arc<dyn Fetcher> = Arc::new(CurlFetcher::from_config(cfg));
    let api = Arc::new(ApiClient::from_config(cfg, Arc::clone(&fetcher))?);
    Ok((fetcher, api))
}

fn runner(cfg: &TexstageConfig, fetcher: Arc<dyn Fetcher>, api: Arc<ApiClient>) -> JobRunner {
    let manifests: Arc<dyn ManifestSource> = api;
    JobRunner::from_config(cfg, fetcher, manifests)
}

/// Runs `jobs` through a fresh queue, printing progress. Fails if any job failed.
async fn run_jobs(cfg: &TexstageConfig, jobs: Vec<Job>) -> Result<()> {
    if jobs.is_empty() {
        println!("Nothing to do.");
        return Ok(());
    }
    let (fetcher, api) = connect(cfg)?;
    let observer: Arc<dyn QueueObserver> = Arc::new(printer::ProgressPrinter);
    let queue = DownloadQueue::start(runner(cfg, fetcher, api), Some(observer));
    for job in jobs {
        queue.submit(job)?;
    }
    queue.wait_idle().await;
    queue.shutdown().await;

    let history = queue.snapshot().history;
    let failed = history
        .iter()
        .filter(|r| r.state == JobState::Failed)
        .count();
    let partial = history
        .iter()
        .filter(|r| r.report.as_ref().is_some_and(|rep| rep.is_partial()))
        .count();
    println!(
        "{} job(s): {} completed ({} partial), {} failed. Output in {}",
        history.len(),
        history.len() - failed,
        partial,
        failed,
        cfg.output_dir().display()
    );
    if failed > 0 {
        anyhow::bail!("{} job(s) failed", failed);
    }
    Ok(())
}
