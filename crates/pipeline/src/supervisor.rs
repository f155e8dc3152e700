//! Structured supervision of job runs.
//!
//! [`JobSupervisor`] owns every run task through a [`TaskTracker`] and a
//! master [`CancellationToken`]. Each run gets a child token, so a single
//! chat's job can be cancelled on its own while shutdown cancels all of
//! them at once. Starting a job returns a [`JobTicket`] that the caller can
//! await, cancel, or wait on with a timeout; the interaction that started
//! the job never blocks on polling.

use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Duration;

use futures::FutureExt;
use genrelay_core::{ChatId, JobRequest};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;
use uuid::Uuid;

use crate::runner::{JobOutcome, JobRunner};
use crate::session::{SessionError, SessionStore};

/// Owned handle to one running job.
#[derive(Debug)]
pub struct JobTicket {
    pub run_id: Uuid,
    pub chat_id: ChatId,
    cancel: CancellationToken,
    handle: JoinHandle<JobOutcome>,
}

impl JobTicket {
    /// Ask the run to stop at its next await point.
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }

    /// Wait for the run to end.
    pub async fn join(self) -> JobOutcome {
        match self.handle.await {
            Ok(outcome) => outcome,
            Err(e) => {
                tracing::error!(run_id = %self.run_id, error = %e, "Job task did not complete");
                JobOutcome::Crashed
            }
        }
    }

    /// Wait at most `limit` for the run to end. `None` means it is still
    /// running; the ticket stays usable.
    pub async fn join_timeout(&mut self, limit: Duration) -> Option<JobOutcome> {
        match tokio::time::timeout(limit, &mut self.handle).await {
            Ok(Ok(outcome)) => Some(outcome),
            Ok(Err(e)) => {
                tracing::error!(run_id = %self.run_id, error = %e, "Job task did not complete");
                Some(JobOutcome::Crashed)
            }
            Err(_) => None,
        }
    }
}

/// Starts, tracks, and shuts down job runs.
///
/// Cheap to share behind an `Arc` between the front end and `main`.
pub struct JobSupervisor {
    runner: Arc<JobRunner>,
    sessions: SessionStore,
    tracker: TaskTracker,
    /// Master cancellation token, cancelled during shutdown.
    cancel: CancellationToken,
}

impl JobSupervisor {
    pub fn new(runner: Arc<JobRunner>) -> Self {
        let sessions = runner.sessions().clone();
        Self {
            runner,
            sessions,
            tracker: TaskTracker::new(),
            cancel: CancellationToken::new(),
        }
    }

    pub fn sessions(&self) -> &SessionStore {
        &self.sessions
    }

    /// Number of runs that have not finished yet.
    pub fn active_runs(&self) -> usize {
        self.tracker.len()
    }

    /// Spawn a run for `request`.
    ///
    /// Fails with [`SessionError::Busy`] if the chat already has a job in
    /// flight; nothing is spawned in that case.
    pub async fn start_job(
        &self,
        chat_id: ChatId,
        request: JobRequest,
    ) -> Result<JobTicket, SessionError> {
        let run_id = Uuid::new_v4();
        let cancel = self.cancel.child_token();
        self.sessions
            .begin_job(chat_id, run_id, cancel.clone())
            .await?;

        let runner = Arc::clone(&self.runner);
        let run_cancel = cancel.clone();
        let handle = self.tracker.spawn(async move {
            let run = runner.run(chat_id, run_id, request, run_cancel);
            match AssertUnwindSafe(run).catch_unwind().await {
                Ok(outcome) => outcome,
                Err(_) => {
                    tracing::error!(chat_id, run_id = %run_id, "Job run panicked");
                    runner
                        .notify(
                            chat_id,
                            "⚠️ Something went wrong while processing the job. \
                             Please start again with /start.",
                        )
                        .await;
                    runner.sessions().clear_run(chat_id, run_id).await;
                    JobOutcome::Crashed
                }
            }
        });

        tracing::info!(chat_id, run_id = %run_id, "Job run spawned");
        Ok(JobTicket {
            run_id,
            chat_id,
            cancel,
            handle,
        })
    }

    /// Cancel the chat's in-flight job. Returns whether there was one.
    pub async fn cancel_job(&self, chat_id: ChatId) -> bool {
        self.sessions.cancel_in_flight(chat_id).await
    }

    /// Cancel every run and wait up to `grace` for them to wind down.
    ///
    /// Returns `true` if all runs ended within the grace period.
    pub async fn shutdown(&self, grace: Duration) -> bool {
        let active = self.tracker.len();
        tracing::info!(active, "Shutting down job supervisor");
        self.cancel.cancel();
        self.tracker.close();

        let clean = tokio::time::timeout(grace, self.tracker.wait())
            .await
            .is_ok();
        if clean {
            tracing::info!("Job supervisor shut down complete");
        } else {
            tracing::warn!(
                remaining = self.tracker.len(),
                grace_ms = grace.as_millis() as u64,
                "Job runs still active after grace period"
            );
        }
        clean
    }
}
