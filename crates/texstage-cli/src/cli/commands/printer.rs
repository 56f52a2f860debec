//! Console progress for queued jobs.

use texstage_core::queue::{JobProgress, JobRecord, JobState, QueueCounts, QueueObserver};

#[derive(Debug, Default)]
pub struct ProgressPrinter;

impl QueueObserver for ProgressPrinter {
    fn on_counts(&self, counts: QueueCounts) {
        tracing::debug!(
            pending = counts.pending,
            done = counts.completed,
            failed = counts.failed,
            "queue counts"
        );
    }

    fn on_progress(&self, p: JobProgress) {
        if p.files_total > 0 {
            println!(
                "  job {}: {}/{} files ({:.0}%)",
                p.job_id,
                p.files_done,
                p.files_total,
                p.fraction() * 100.0
            );
        }
    }

    fn on_finished(&self, record: &JobRecord) {
        let job = &record.job;
        match record.state {
            JobState::Completed => {
                let report = record.report.clone().unwrap_or_default();
                println!(
                    "[{}] {} -> {}: {}",
                    record.id,
                    job.remote_asset_id,
                    job.output_label,
                    if report.composites.is_empty() {
                        "no composites".to_string()
                    } else {
                        report.composites.join(", ")
                    }
                );
                for skipped in &report.skipped_downloads {
                    println!("    skipped {}: {}", skipped.url, skipped.reason);
                }
                for d in &report.diagnostics {
                    println!("    {}", d);
                }
            }
            state => println!(
                "[{}] {} -> {}: {} ({})",
                record.id,
                job.remote_asset_id,
                job.output_label,
                state.as_str(),
                record.error.as_deref().unwrap_or("unknown error")
            ),
        }
    }
}
