//! Job, lifecycle state and per-job outcome types.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::fetch::FetchError;

/// Assigned by the queue on submit, starting at 1.
pub type JobId = u64;

/// A committed pairing of a local texture with a remote asset.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Job {
    /// Local texture the composites are meant for (opaque to the pipeline).
    pub source_asset_ref: String,
    /// Identifier the asset API knows the material by.
    pub remote_asset_id: String,
    /// File stem of the composites.
    pub output_label: String,
}

impl Job {
    pub fn new(
        source_asset_ref: impl Into<String>,
        remote_asset_id: impl Into<String>,
        output_label: impl Into<String>,
    ) -> Self {
        Self {
            source_asset_ref: source_asset_ref.into(),
            remote_asset_id: remote_asset_id.into(),
            output_label: output_label.into(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobState {
    Pending,
    InProgress,
    Completed,
    Failed,
}

impl JobState {
    pub fn as_str(self) -> &'static str {
        match self {
            JobState::Pending => "pending",
            JobState::InProgress => "in-progress",
            JobState::Completed => "completed",
            JobState::Failed => "failed",
        }
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, JobState::Completed | JobState::Failed)
    }
}

/// A download that was skipped. Never fatal to the job.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SkippedDownload {
    pub url: String,
    pub reason: String,
}

/// What a completed job actually produced.
///
/// `Completed` does not mean every composite exists; anything that was
/// skipped along the way is listed here.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct JobReport {
    /// Sanitized file names written to the staging directory.
    pub staged: Vec<String>,
    pub skipped_downloads: Vec<SkippedDownload>,
    /// Composite file names written to the output directory.
    pub composites: Vec<String>,
    /// Decode, composite and write problems.
    pub diagnostics: Vec<String>,
}

impl JobReport {
    pub fn is_partial(&self) -> bool {
        !self.skipped_downloads.is_empty() || !self.diagnostics.is_empty()
    }
}

/// Terminal entry in the queue history.
#[derive(Debug, Clone)]
pub struct JobRecord {
    pub id: JobId,
    pub job: Job,
    pub state: JobState,
    pub report: Option<JobReport>,
    pub error: Option<String>,
}

/// Coarse step counter of the running job.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct JobProgress {
    pub job_id: JobId,
    pub files_done: usize,
    pub files_total: usize,
}

impl JobProgress {
    /// Fraction of files processed in [0.0, 1.0].
    pub fn fraction(&self) -> f64 {
        if self.files_total == 0 {
            return 1.0;
        }
        (self.files_done as f64 / self.files_total as f64).min(1.0)
    }
}

/// Errors that abort a job.
#[derive(Debug, Error)]
pub enum JobError {
    #[error("manifest for {asset_id} unavailable: {source}")]
    ManifestFetch {
        asset_id: String,
        #[source]
        source: FetchError,
    },

    #[error("no matching assets for {asset_id}")]
    NoMatchingAssets { asset_id: String },
}
