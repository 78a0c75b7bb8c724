//! Asynchronous job registry backed by a bounded worker pool.
//!
//! Jobs are created in [`JobStatus::Processing`] and transition exactly once to a terminal
//! state. Submitted work runs on the tokio runtime but only `workers` units execute at a time;
//! the rest wait for a free permit. Errors and panics inside the work are
//! captured and recorded as the job's failure.

use std::any::Any;
use std::collections::HashMap;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::{Arc, PoisonError, RwLock};

use futures_util::FutureExt;
use thiserror::Error;
use tokio::sync::Semaphore;
use uuid::Uuid;

/// Current state of a job.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum JobStatus {
    /// Work is queued or running.
    Processing,
    /// Work finished with a result payload.
    Completed {
        /// Result text.
        result: String,
    },
    /// Work failed.
    Failed {
        /// Failure message.
        error: String,
    },
}

impl JobStatus {
    /// Whether the job reached a terminal state.
    pub fn is_terminal(&self) -> bool {
        !matches!(self, Self::Processing)
    }
}

/// Errors returned by [`JobManager`] operations.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum JobError {
    /// The identifier was never issued by [`JobManager::create`].
    #[error("Job not found: {0}")]
    NotFound(String),
    /// The job already completed or failed.
    #[error("Job {0} already finished")]
    AlreadyTerminal(String),
}

/// Registry of jobs plus the worker pool executing them.
#[derive(Clone)]
pub struct JobManager {
    jobs: Arc<RwLock<HashMap<String, JobStatus>>>,
    workers: Arc<Semaphore>,
}

impl JobManager {
    /// Create a manager running at most `workers` jobs concurrently (minimum one).
    pub fn new(workers: usize) -> Self {
        Self {
            jobs: Arc::new(RwLock::new(HashMap::new())),
            workers: Arc::new(Semaphore::new(workers.max(1))),
        }
    }

    /// Register a new job in the processing state and return its identifier.
    pub fn create(&self) -> String {
        let job_id = Uuid::new_v4().to_string();
        self.jobs
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(job_id.clone(), JobStatus::Processing);
        tracing::debug!(job_id = %job_id, "Job created");
        job_id
    }

    /// Schedule `work` for `job_id` on the worker pool.
    ///
    /// Returns immediately. The job completes with the work's output, or fails with its error
    /// or panic message; neither outcome is propagated to the caller.
    pub fn submit<F>(&self, job_id: &str, work: F) -> Result<(), JobError>
    where
        F: Future<Output = anyhow::Result<String>> + Send + 'static,
    {
        if self.status(job_id).is_none() {
            return Err(JobError::NotFound(job_id.to_string()));
        }

        let manager = self.clone();
        let job_id = job_id.to_string();
        tokio::spawn(async move {
            let _permit = match manager.workers.clone().acquire_owned().await {
                Ok(permit) => permit,
                Err(error) => {
                    manager.finish_failed(&job_id, format!("worker pool closed: {error}"));
                    return;
                }
            };

            tracing::info!(job_id = %job_id, "Job started");
            match AssertUnwindSafe(work).catch_unwind().await {
                Ok(Ok(result)) => {
                    if let Err(error) = manager.complete(&job_id, result) {
                        tracing::warn!(%error, "Job result discarded");
                    } else {
                        tracing::info!(job_id = %job_id, "Job completed");
                    }
                }
                Ok(Err(error)) => manager.finish_failed(&job_id, error.to_string()),
                Err(panic) => manager.finish_failed(&job_id, panic_message(panic.as_ref())),
            }
        });
        Ok(())
    }

    /// Current status, or `None` for an identifier that was never issued.
    pub fn status(&self, job_id: &str) -> Option<JobStatus> {
        self.jobs
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(job_id)
            .cloned()
    }

    /// Transition a processing job to completed.
    pub fn complete(&self, job_id: &str, result: String) -> Result<(), JobError> {
        self.transition(job_id, JobStatus::Completed { result })
    }

    /// Transition a processing job to failed.
    pub fn fail(&self, job_id: &str, error: String) -> Result<(), JobError> {
        self.transition(job_id, JobStatus::Failed { error })
    }

    fn transition(&self, job_id: &str, next: JobStatus) -> Result<(), JobError> {
        let mut jobs = self.jobs.write().unwrap_or_else(PoisonError::into_inner);
        match jobs.get_mut(job_id) {
            None => Err(JobError::NotFound(job_id.to_string())),
            Some(status) if status.is_terminal() => {
                Err(JobError::AlreadyTerminal(job_id.to_string()))
            }
            Some(status) => {
                *status = next;
                Ok(())
            }
        }
    }

    fn finish_failed(&self, job_id: &str, error: String) {
        tracing::error!(job_id = %job_id, %error, "Job failed");
        if let Err(error) = self.fail(job_id, error) {
            tracing::warn!(%error, "Job failure discarded");
        }
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(message) = panic.downcast_ref::<&str>() {
        format!("job panicked: {message}")
    } else if let Some(message) = panic.downcast_ref::<String>() {
        format!("job panicked: {message}")
    } else {
        "job panicked".to_string()
    }
}
