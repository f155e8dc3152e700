//! Poller: track a submitted job to a terminal state or a deadline.
//!
//! One status request is issued per interval. A failed status request does
//! not abort the loop; it is logged, the next wait backs off, and polling
//! continues until the overall deadline. Only when the deadline passes
//! while the latest check was still failing does the error surface as
//! [`JobError::TransportFailure`]; otherwise the deadline yields
//! [`JobError::Timeout`]. A status request still outstanding at the
//! deadline is abandoned rather than awaited to its own timeout.
//!
//! Time is read from [`tokio::time::Instant`], so tests drive the loop with
//! a paused clock.

use std::sync::Arc;
use std::time::Duration;

use genrelay_core::{JobHandle, JobStatus, OutputRef};
use genrelay_runway::{RunwayApiError, TaskApi};
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

use crate::backoff::{next_delay, BackoffConfig};
use crate::error::JobError;
use crate::status::{self, MissingOutput};

/// Default overall deadline for one job.
pub const DEFAULT_POLL_TIMEOUT: Duration = Duration::from_secs(300);

/// Default wait between status checks.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(3);

/// Default cap for the backoff applied after failed checks.
pub const DEFAULT_MAX_BACKOFF: Duration = Duration::from_secs(30);

/// Polling parameters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PollConfig {
    pub timeout: Duration,
    pub interval: Duration,
    pub max_backoff: Duration,
}

impl Default for PollConfig {
    fn default() -> Self {
        Self {
            timeout: DEFAULT_POLL_TIMEOUT,
            interval: DEFAULT_POLL_INTERVAL,
            max_backoff: DEFAULT_MAX_BACKOFF,
        }
    }
}

/// Repeatedly queries a job's status until it is terminal.
pub struct Poller {
    api: Arc<dyn TaskApi>,
    max_backoff: Duration,
}

impl Poller {
    pub fn new(api: Arc<dyn TaskApi>, max_backoff: Duration) -> Self {
        Self { api, max_backoff }
    }

    /// Poll `handle` every `interval` until it succeeds, fails, or
    /// `timeout` elapses.
    ///
    /// Returns as soon as a terminal status is seen; no further requests
    /// are made afterwards. Cancelling `cancel` stops the loop at the next
    /// await point with [`JobError::Cancelled`].
    pub async fn poll(
        &self,
        handle: &JobHandle,
        timeout: Duration,
        interval: Duration,
        cancel: &CancellationToken,
    ) -> Result<OutputRef, JobError> {
        let job_id = handle.id.as_str();
        let deadline = Instant::now() + timeout;
        let backoff = BackoffConfig::for_interval(interval, self.max_backoff);
        let mut delay = interval;
        let mut last_error: Option<RunwayApiError> = None;
        let mut attempt = 0u32;

        loop {
            attempt += 1;

            // The deadline bounds a hung request too. The check issued at
            // the deadline itself still gets one interval to answer.
            let cutoff = deadline.max(Instant::now() + interval);
            let result = tokio::select! {
                _ = cancel.cancelled() => return Err(cancelled(job_id)),
                result = tokio::time::timeout_at(cutoff, self.api.get_task(job_id)) => result,
            };
            let Ok(result) = result else {
                tracing::warn!(job_id, attempt, "Status check still pending at deadline");
                break;
            };

            match result {
                Ok(payload) => {
                    last_error = None;
                    delay = interval;

                    match status::normalize(&payload) {
                        Ok(JobStatus::Succeeded(output)) => {
                            tracing::info!(
                                job_id,
                                attempt,
                                output = %output.describe(),
                                "Job succeeded"
                            );
                            return Ok(output);
                        }
                        Ok(JobStatus::Failed(reason)) => {
                            tracing::error!(
                                job_id,
                                reason = %reason,
                                payload = %payload,
                                "Job failed on the provider side"
                            );
                            return Err(JobError::Failed {
                                job_id: job_id.to_string(),
                                reason,
                                payload,
                            });
                        }
                        Ok(pending_or_running) => {
                            tracing::info!(
                                job_id,
                                attempt,
                                status = ?pending_or_running,
                                raw_status = status::raw_status(&payload).unwrap_or("<none>"),
                                "Job not finished yet"
                            );
                        }
                        Err(MissingOutput) => {
                            tracing::error!(
                                job_id,
                                payload = %payload,
                                "Job succeeded without a usable output"
                            );
                            return Err(JobError::NoOutput {
                                job_id: job_id.to_string(),
                                payload,
                            });
                        }
                    }
                }
                Err(e) => {
                    delay = next_delay(delay, &backoff);
                    tracing::warn!(
                        job_id,
                        attempt,
                        error = %e,
                        next_delay_ms = delay.as_millis() as u64,
                        "Status check failed, will retry"
                    );
                    last_error = Some(e);
                }
            }

            let now = Instant::now();
            if now >= deadline {
                break;
            }

            // Never sleep past the deadline; the last check happens at it.
            tokio::select! {
                _ = cancel.cancelled() => return Err(cancelled(job_id)),
                _ = tokio::time::sleep(delay.min(deadline - now)) => {}
            }
        }

        match last_error {
            Some(e) => {
                tracing::error!(job_id, attempt, error = %e, "Status checks failing at deadline");
                Err(JobError::TransportFailure {
                    job_id: job_id.to_string(),
                    status: e.status(),
                    detail: e.to_string(),
                })
            }
            None => {
                tracing::warn!(
                    job_id,
                    attempt,
                    timeout_secs = timeout.as_secs(),
                    "Job still running at deadline"
                );
                Err(JobError::Timeout {
                    job_id: job_id.to_string(),
                    waited: timeout,
                })
            }
        }
    }
}

fn cancelled(job_id: &str) -> JobError {
    tracing::info!(job_id, "Polling cancelled");
    JobError::Cancelled {
        job_id: job_id.to_string(),
    }
}
