//! Strictly sequential download queue.
//!
//! One worker task takes jobs in FIFO order and runs each to a terminal state
//! before dequeuing the next, so at most one job is ever in progress.
//! Submissions only touch the pending list under a short lock and may come
//! from any thread while a job runs.

mod job;
mod runner;

pub use job::{
    Job, JobError, JobId, JobProgress, JobRecord, JobReport, JobState, SkippedDownload,
};
pub use runner::JobRunner;

use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard};

use thiserror::Error;
use tokio::sync::{watch, Notify};
use tokio::task::JoinHandle;

/// Job counts after a transition. `completed` counts every terminal job;
/// `failed` is the subset that failed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct QueueCounts {
    pub completed: usize,
    pub failed: usize,
    pub in_progress: usize,
    pub pending: usize,
}

impl QueueCounts {
    pub fn is_idle(&self) -> bool {
        self.in_progress == 0 && self.pending == 0
    }
}

/// Receives queue events. Called from the worker and from submitting threads,
/// never while the queue lock is held.
pub trait QueueObserver: Send + Sync {
    /// After every submit, dequeue and finish, in transition order.
    ///
    /// Deliveries are serialized: a slow `on_counts` holds back the next one.
    /// Must not submit to the same queue.
    fn on_counts(&self, counts: QueueCounts);

    fn on_progress(&self, _progress: JobProgress) {}

    fn on_finished(&self, _record: &JobRecord) {}
}

/// Point-in-time copy of the queue contents.
#[derive(Debug, Clone, Default)]
pub struct QueueSnapshot {
    pub pending: Vec<(JobId, Job)>,
    pub in_progress: Option<(JobId, Job)>,
    /// Terminal jobs in completion order.
    pub history: Vec<JobRecord>,
}

#[derive(Debug, Error, PartialEq, Eq)]
#[error("download queue is shut down")]
pub struct QueueClosed;

#[derive(Default)]
struct QueueState {
    next_id: JobId,
    pending: VecDeque<(JobId, Job)>,
    in_progress: Option<(JobId, Job)>,
    history: Vec<JobRecord>,
    closed: bool,
}

impl QueueState {
    fn counts(&self) -> QueueCounts {
        let failed = self
            .history
            .iter()
            .filter(|r| r.state == JobState::Failed)
            .count();
        QueueCounts {
            completed: self.history.len(),
            failed,
            in_progress: usize::from(self.in_progress.is_some()),
            pending: self.pending.len(),
        }
    }
}

struct Shared {
    state: Mutex<QueueState>,
    /// Held from reading the counts until `on_counts` returns.
    delivery: Mutex<()>,
    wake: Notify,
    counts_tx: watch::Sender<QueueCounts>,
    observer: Option<Arc<dyn QueueObserver>>,
}

impl Shared {
    fn lock(&self) -> MutexGuard<'_, QueueState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Sends fresh counts to the watch and the observer. Both see the same
    /// sequence: counts are read and delivered under the delivery lock, so a
    /// newer value never overtakes an older one.
    fn publish(&self) {
        let _delivery = self.delivery.lock().unwrap_or_else(|e| e.into_inner());
        let counts = {
            let st = self.lock();
            let counts = st.counts();
            self.counts_tx.send_replace(counts);
            counts
        };
        if let Some(obs) = &self.observer {
            obs.on_counts(counts);
        }
    }

    fn progress(&self, progress: JobProgress) {
        tracing::trace!(
            job_id = progress.job_id,
            done = progress.files_done,
            total = progress.files_total,
            "job progress"
        );
        if let Some(obs) = &self.observer {
            obs.on_progress(progress);
        }
    }
}

pub struct DownloadQueue {
    shared: Arc<Shared>,
    counts_rx: watch::Receiver<QueueCounts>,
    worker: Mutex<Option<JoinHandle<()>>>,
}

impl DownloadQueue {
    /// Spawns the worker on the current tokio runtime.
    pub fn start(runner: JobRunner, observer: Option<Arc<dyn QueueObserver>>) -> Self {
        let (counts_tx, counts_rx) = watch::channel(QueueCounts::default());
        let shared = Arc::new(Shared {
            state: Mutex::new(QueueState {
                next_id: 1,
                ..Default::default()
            }),
            delivery: Mutex::new(()),
            wake: Notify::new(),
            counts_tx,
            observer,
        });
        let worker = tokio::spawn(worker_loop(Arc::clone(&shared), Arc::new(runner)));
        Self {
            shared,
            counts_rx,
            worker: Mutex::new(Some(worker)),
        }
    }

    /// Appends `job` to the pending list and wakes the worker.
    pub fn submit(&self, job: Job) -> Result<JobId, QueueClosed> {
        let id = {
            let mut st = self.shared.lock();
            if st.closed {
                return Err(QueueClosed);
            }
            let id = st.next_id;
            st.next_id += 1;
            tracing::debug!(job_id = id, asset = %job.remote_asset_id, label = %job.output_label, "job queued");
            st.pending.push_back((id, job));
            id
        };
        self.shared.publish();
        self.shared.wake.notify_one();
        Ok(id)
    }

    pub fn counts(&self) -> QueueCounts {
        self.shared.lock().counts()
    }

    pub fn snapshot(&self) -> QueueSnapshot {
        let st = self.shared.lock();
        QueueSnapshot {
            pending: st.pending.iter().cloned().collect(),
            in_progress: st.in_progress.clone(),
            history: st.history.clone(),
        }
    }

    /// Terminal record of job `id`, if it has finished.
    pub fn record(&self, id: JobId) -> Option<JobRecord> {
        self.shared.lock().history.iter().find(|r| r.id == id).cloned()
    }

    /// Resolves once nothing is pending or in progress.
    pub async fn wait_idle(&self) {
        let mut rx = self.counts_rx.clone();
        // The sender lives in `shared`, which outlives this borrow.
        let _ = rx.wait_for(QueueCounts::is_idle).await;
    }

    /// Stops accepting jobs, lets the worker drain the pending list and waits for it.
    pub async fn shutdown(&self) {
        self.close();
        let handle = self.worker.lock().unwrap_or_else(|e| e.into_inner()).take();
        if let Some(handle) = handle {
            if let Err(e) = handle.await {
                tracing::error!("queue worker ended abnormally: {}", e);
            }
        }
    }

    fn close(&self) {
        self.shared.lock().closed = true;
        self.shared.wake.notify_one();
    }
}

impl Drop for DownloadQueue {
    fn drop(&mut self) {
        self.close();
    }
}

async fn worker_loop(shared: Arc<Shared>, runner: Arc<JobRunner>) {
    loop {
        let next = {
            let mut st = shared.lock();
            match st.pending.pop_front() {
                Some((id, job)) => {
                    st.in_progress = Some((id, job.clone()));
                    Some((id, job))
                }
                None if st.closed => break,
                None => None,
            }
        };
        let Some((id, job)) = next else {
            // A notify_one issued since the check leaves a permit, so no wakeup is lost.
            shared.wake.notified().await;
            continue;
        };
        shared.publish();
        tracing::info!(job_id = id, asset = %job.remote_asset_id, "job started");

        let outcome = tokio::task::spawn_blocking({
            let runner = Arc::clone(&runner);
            let shared = Arc::clone(&shared);
            let job = job.clone();
            move || {
                runner.run(&job, &mut |files_done: usize, files_total: usize| {
                    shared.progress(JobProgress {
                        job_id: id,
                        files_done,
                        files_total,
                    })
                })
            }
        })
        .await;

        let record = match outcome {
            Ok(Ok(report)) => {
                tracing::info!(
                    job_id = id,
                    composites = report.composites.len(),
                    partial = report.is_partial(),
                    "job completed"
                );
                JobRecord {
                    id,
                    job,
                    state: JobState::Completed,
                    report: Some(report),
                    error: None,
                }
            }
            Ok(Err(e)) => {
                tracing::warn!(job_id = id, "job failed: {}", e);
                JobRecord {
                    id,
                    job,
                    state: JobState::Failed,
                    report: None,
                    error: Some(e.to_string()),
                }
            }
            Err(e) => {
                tracing::error!(job_id = id, "job task aborted: {}", e);
                JobRecord {
                    id,
                    job,
                    state: JobState::Failed,
                    report: None,
                    error: Some(format!("job task aborted: {}", e)),
                }
            }
        };

        {
            let mut st = shared.lock();
            st.in_progress = None;
            st.history.push(record.clone());
        }
        if let Some(obs) = &shared.observer {
            obs.on_finished(&record);
        }
        shared.publish();
    }
    tracing::debug!("queue worker stopped");
}
