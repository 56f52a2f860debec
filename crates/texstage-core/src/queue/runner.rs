//! The per-job procedure: manifest, download, stage, compose.
//!
//! Blocking throughout; the queue worker calls [`JobRunner::run`] from the
//! blocking pool.

use std::sync::Arc;

use super::job::{Job, JobError, JobReport, SkippedDownload};
use crate::composite::{
    asset_prefix, build_composites, locate_source, CompositeOptions, RequiredFileSet, Role,
    SourceSet,
};
use crate::config::TexstageConfig;
use crate::fetch::{Fetcher, ManifestSource};
use crate::manifest::{extract_urls, ManifestNode};
use crate::staging::StagingDir;
use crate::url_model::sanitize_filename;

pub struct JobRunner {
    fetcher: Arc<dyn Fetcher>,
    manifests: Arc<dyn ManifestSource>,
    staging: StagingDir,
    required: RequiredFileSet,
    options: CompositeOptions,
}

impl JobRunner {
    pub fn new(
        fetcher: Arc<dyn Fetcher>,
        manifests: Arc<dyn ManifestSource>,
        staging: StagingDir,
    ) -> Self {
        Self {
            fetcher,
            manifests,
            staging,
            required: RequiredFileSet::default(),
            options: CompositeOptions::default(),
        }
    }

    /// Runner with staging paths, resolution tier and resize policy from `cfg`.
    pub fn from_config(
        cfg: &TexstageConfig,
        fetcher: Arc<dyn Fetcher>,
        manifests: Arc<dyn ManifestSource>,
    ) -> Self {
        Self::new(
            fetcher,
            manifests,
            StagingDir::new(&cfg.staging_dir, cfg.output_dir()),
        )
        .with_required(cfg.required_files())
        .with_options(cfg.composite_options())
    }

    pub fn with_required(mut self, required: RequiredFileSet) -> Self {
        self.required = required;
        self
    }

    pub fn with_options(mut self, options: CompositeOptions) -> Self {
        self.options = options;
        self
    }

    pub fn staging(&self) -> &StagingDir {
        &self.staging
    }

    /// Manifest URLs whose file name matches the required set, in sorted order.
    pub fn required_urls(&self, manifest: &ManifestNode) -> Vec<String> {
        extract_urls(manifest)
            .into_iter()
            .filter(|url| self.required.matches(&sanitize_filename(url)))
            .collect()
    }

    /// Runs one job to its end.
    ///
    /// Only an unavailable manifest or a manifest without any required file is
    /// an error. Everything after that is recorded in the report and the job
    /// still completes. `progress` receives `(files_done, files_total)` after
    /// every download attempt.
    pub fn run(
        &self,
        job: &Job,
        progress: &mut dyn FnMut(usize, usize),
    ) -> Result<JobReport, JobError> {
        let asset_id = job.remote_asset_id.as_str();
        let manifest =
            self.manifests
                .fetch_manifest(asset_id)
                .map_err(|source| JobError::ManifestFetch {
                    asset_id: asset_id.to_string(),
                    source,
                })?;

        let urls = self.required_urls(&manifest);
        if urls.is_empty() {
            return Err(JobError::NoMatchingAssets {
                asset_id: asset_id.to_string(),
            });
        }
        tracing::info!(asset = asset_id, files = urls.len(), "downloading source maps");

        let mut report = JobReport::default();
        if let Err(e) = self.staging.ensure() {
            tracing::warn!("{:#}", e);
            report.diagnostics.push(format!("{:#}", e));
        }

        let total = urls.len();
        progress(0, total);
        for (done, url) in urls.iter().enumerate() {
            self.stage_one(url, &mut report);
            progress(done + 1, total);
        }
        report.staged.sort();
        report.staged.dedup();

        let listing = report.staged.clone();
        self.compose(job, &listing, &mut report);
        Ok(report)
    }

    fn stage_one(&self, url: &str, report: &mut JobReport) {
        let filename = sanitize_filename(url);
        let result = self
            .fetcher
            .fetch_bytes(url)
            .map_err(anyhow::Error::from)
            .and_then(|bytes| self.staging.stage(&filename, &bytes));
        match result {
            Ok(_) => report.staged.push(filename),
            Err(e) => {
                tracing::warn!(url, "skipping download: {:#}", e);
                report.skipped_downloads.push(SkippedDownload {
                    url: url.to_string(),
                    reason: format!("{:#}", e),
                });
            }
        }
    }

    /// Builds and writes the composites for `job` from staged files in `listing`.
    ///
    /// A map that fails to decode counts as absent. Written file names and
    /// every problem go into `report`.
    pub fn compose(&self, job: &Job, listing: &[String], report: &mut JobReport) {
        let prefix = asset_prefix(&job.remote_asset_id);
        let mut sources = SourceSet::default();
        for role in Role::ALL {
            let Some(name) = locate_source(listing, &prefix, role) else {
                tracing::debug!(role = %role, prefix = %prefix, "no staged map");
                continue;
            };
            match self.staging.read_raster(name) {
                Ok(raster) => sources.set(role, raster),
                Err(e) => {
                    tracing::warn!(file = name, "cannot decode {} map: {:#}", role, e);
                    report.diagnostics.push(format!("{} map {}: {:#}", role, name, e));
                }
            }
        }

        let set = build_composites(&job.output_label, &sources, &self.options);
        for skipped in &set.skipped {
            report
                .diagnostics
                .push(format!("{} composite skipped: {}", skipped.kind, skipped.reason));
        }

        let out_dir = self.staging.output_dir().to_path_buf();
        for composite in &set.composites {
            let written = composite
                .to_png()
                .and_then(|png| self.staging.write_file(&out_dir, &composite.file_name, &png));
            match written {
                Ok(path) => {
                    tracing::info!(path = %path.display(), "wrote {} composite", composite.kind);
                    report.composites.push(composite.file_name.clone());
                }
                Err(e) => {
                    tracing::warn!(file = %composite.file_name, "write failed: {:#}", e);
                    report
                        .diagnostics
                        .push(format!("write {}: {:#}", composite.file_name, e));
                }
            }
        }
    }

    /// Rebuilds composites for `job` from whatever is already staged. No network access.
    pub fn compose_staged(&self, job: &Job) -> anyhow::Result<JobReport> {
        let listing = self.staging.list_staged()?;
        let mut report = JobReport::default();
        self.compose(job, &listing, &mut report);
        Ok(report)
    }
}
