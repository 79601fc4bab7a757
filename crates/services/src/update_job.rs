use std::sync::Arc;

use chrono::{DateTime, Utc};
use footy_db::HistoryHandle;
use parking_lot::Mutex;
use serde::Serialize;
use thiserror::Error;
use tokio::task::JoinHandle;
use tracing::{error, info};
use uuid::Uuid;

use crate::updater::{DatasetUpdater, UpdateSummary};

#[derive(Debug, Error)]
pub enum UpdateJobError {
    #[error("an update is already running (run {0})")]
    AlreadyRunning(Uuid),
}

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "result", rename_all = "snake_case")]
pub enum RunResult {
    Succeeded { summary: UpdateSummary },
    Failed { error: String },
}

#[derive(Debug, Clone, Serialize)]
pub struct CompletedRun {
    pub run_id: Uuid,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    #[serde(flatten)]
    pub result: RunResult,
}

#[derive(Debug, Clone, Serialize)]
pub struct RunningJob {
    pub run_id: Uuid,
    pub started_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct JobStatus {
    pub running: Option<RunningJob>,
    pub last_run: Option<CompletedRun>,
}

impl JobStatus {
    pub fn is_running(&self) -> bool {
        self.running.is_some()
    }
}

/// Handle returned by [`UpdateJob::trigger`]. Dropping it detaches the run.
pub struct JobTicket {
    pub run_id: Uuid,
    pub handle: JoinHandle<()>,
}

/// Background dataset update. One run at a time; a successful run swaps the
/// shared history snapshot after the table is on disk.
#[derive(Clone)]
pub struct UpdateJob {
    updater: Arc<DatasetUpdater>,
    history: HistoryHandle,
    status: Arc<Mutex<JobStatus>>,
}

impl UpdateJob {
    pub fn new(updater: Arc<DatasetUpdater>, history: HistoryHandle) -> Self {
        Self {
            updater,
            history,
            status: Arc::new(Mutex::new(JobStatus::default())),
        }
    }

    pub fn status(&self) -> JobStatus {
        self.status.lock().clone()
    }

    /// Must be called from within a tokio runtime.
    pub fn trigger(&self) -> Result<JobTicket, UpdateJobError> {
        let running = {
            let mut status = self.status.lock();
            if let Some(current) = &status.running {
                return Err(UpdateJobError::AlreadyRunning(current.run_id));
            }
            let running = RunningJob {
                run_id: Uuid::new_v4(),
                started_at: Utc::now(),
            };
            status.running = Some(running.clone());
            running
        };

        info!("Dataset update {} started", running.run_id);
        let job = self.clone();
        let run_id = running.run_id;
        let guard = RunGuard {
            status: self.status.clone(),
            running: running.clone(),
        };
        let handle = tokio::spawn(async move {
            job.execute(running).await;
            drop(guard);
        });

        Ok(JobTicket { run_id, handle })
    }

    async fn execute(&self, running: RunningJob) {
        let snapshot = self.history.snapshot();
        let result = match self.updater.run(&snapshot).await {
            Ok(outcome) => {
                if let Some(history) = outcome.history {
                    self.history.replace(history);
                }
                info!(
                    "Dataset update {} finished: {} added, {} total",
                    running.run_id, outcome.summary.added, outcome.summary.total
                );
                RunResult::Succeeded {
                    summary: outcome.summary,
                }
            }
            Err(e) => {
                error!("Dataset update {} failed: {:#}", running.run_id, e);
                RunResult::Failed {
                    error: format!("{:#}", e),
                }
            }
        };

        let mut status = self.status.lock();
        status.running = None;
        status.last_run = Some(CompletedRun {
            run_id: running.run_id,
            started_at: running.started_at,
            finished_at: Utc::now(),
            result,
        });
    }
}

/// Clears the in-progress flag if a run ends without recording a result,
/// e.g. when the task panics or is aborted.
struct RunGuard {
    status: Arc<Mutex<JobStatus>>,
    running: RunningJob,
}

impl Drop for RunGuard {
    fn drop(&mut self) {
        let mut status = self.status.lock();
        let unfinished = status
            .running
            .as_ref()
            .is_some_and(|current| current.run_id == self.running.run_id);
        if unfinished {
            error!("Dataset update {} ended abnormally", self.running.run_id);
            status.running = None;
            status.last_run = Some(CompletedRun {
                run_id: self.running.run_id,
                started_at: self.running.started_at,
                finished_at: Utc::now(),
                result: RunResult::Failed {
                    error: "update task ended abnormally".to_string(),
                },
            });
        }
    }
}
