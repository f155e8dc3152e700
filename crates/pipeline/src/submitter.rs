//! Job submitter: turn a [`JobRequest`] into a provider task.

use std::sync::Arc;

use genrelay_core::{JobHandle, JobRequest};
use genrelay_runway::{build_task, extract_task_id, RunwayApiError, TaskApi};

use crate::error::SubmissionError;

/// Submits generation requests to the provider.
///
/// Submission failures are terminal for the job; nothing is retried here.
pub struct Submitter {
    api: Arc<dyn TaskApi>,
}

impl Submitter {
    pub fn new(api: Arc<dyn TaskApi>) -> Self {
        Self { api }
    }

    /// Create the provider task for `request`, consuming it.
    pub async fn submit(&self, request: JobRequest) -> Result<JobHandle, SubmissionError> {
        let task = build_task(&request);

        let body = self
            .api
            .create_task(task.endpoint, &task.payload)
            .await
            .map_err(|e| match e {
                RunwayApiError::ApiError { status, body } => {
                    tracing::error!(status, body = %body, "Runway rejected task creation");
                    SubmissionError::Rejected { status, body }
                }
                RunwayApiError::Decode(body) => {
                    tracing::error!(body = %body, "Runway task creation returned a non-JSON body");
                    SubmissionError::MissingJobId { body }
                }
                e @ (RunwayApiError::Request(_) | RunwayApiError::InvalidHeader(_)) => {
                    tracing::error!(error = %e, "Runway task creation request failed");
                    SubmissionError::Transport(e.to_string())
                }
            })?;

        let Some(task_id) = extract_task_id(&body) else {
            tracing::error!(response = %body, "No task id in Runway creation response");
            return Err(SubmissionError::MissingJobId {
                body: body.to_string(),
            });
        };

        tracing::info!(
            task_id = %task_id,
            endpoint = task.endpoint,
            "Generation task submitted"
        );
        Ok(JobHandle::new(task_id))
    }
}
