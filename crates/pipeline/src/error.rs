//! Error taxonomy for the job pipeline.
//!
//! Each stage has its own error type. [`PipelineError`] wraps all three so
//! the runner can funnel every terminal outcome through one report path,
//! and knows how to phrase each one for the user without leaking raw
//! provider payloads.

use std::fmt;
use std::time::Duration;

/// Longest provider failure reason echoed back to the user.
const MAX_REASON_CHARS: usize = 200;

// ---------------------------------------------------------------------------
// Stage errors
// ---------------------------------------------------------------------------

/// The job could not be created. Terminal for the current job, not retried.
#[derive(Debug, thiserror::Error)]
pub enum SubmissionError {
    /// The provider answered with a non-2xx status.
    #[error("Provider rejected the job ({status}): {body}")]
    Rejected { status: u16, body: String },

    /// The provider accepted the call but the body carries no job id.
    #[error("Provider response has no job identifier: {body}")]
    MissingJobId { body: String },

    /// The creation request never got an answer.
    #[error("Submission request failed: {0}")]
    Transport(String),
}

/// The job did not reach a usable successful state.
#[derive(Debug, thiserror::Error)]
pub enum JobError {
    /// No terminal status before the deadline. The provider may still
    /// finish the job later; the pipeline does not pick it up again.
    #[error("Job {job_id} did not reach a terminal state within {}s", waited.as_secs())]
    Timeout { job_id: String, waited: Duration },

    /// The provider reported the job as failed.
    #[error("Job {job_id} failed: {reason}")]
    Failed {
        job_id: String,
        reason: String,
        payload: serde_json::Value,
    },

    /// Status checks kept failing until the deadline.
    #[error("Status checks for job {job_id} kept failing: {detail}")]
    TransportFailure {
        job_id: String,
        status: Option<u16>,
        detail: String,
    },

    /// The provider reported success without a usable output reference.
    #[error("Job {job_id} succeeded but returned no usable output")]
    NoOutput {
        job_id: String,
        payload: serde_json::Value,
    },

    /// Polling stopped because the process is shutting down or the user
    /// cancelled.
    #[error("Polling for job {job_id} was cancelled")]
    Cancelled { job_id: String },
}

/// The artifact could not be handed to the notification channel.
#[derive(Debug, thiserror::Error)]
pub enum DeliveryError {
    /// The by-reference path failed; recoverable through the fallback.
    #[error("Primary delivery failed: {0}")]
    PrimaryFailed(String),

    /// Both delivery paths failed.
    #[error("Artifact could not be delivered (primary: {primary}; fallback: {fallback})")]
    Unrecoverable { primary: String, fallback: String },
}

// ---------------------------------------------------------------------------
// PipelineError
// ---------------------------------------------------------------------------

/// Pipeline stage an error originated from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Submission,
    Polling,
    Delivery,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Stage::Submission => "submission",
            Stage::Polling => "polling",
            Stage::Delivery => "delivery",
        })
    }
}

/// Any terminal error of a job run.
#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    #[error(transparent)]
    Submission(#[from] SubmissionError),

    #[error(transparent)]
    Job(#[from] JobError),

    #[error(transparent)]
    Delivery(#[from] DeliveryError),
}

impl PipelineError {
    pub fn stage(&self) -> Stage {
        match self {
            PipelineError::Submission(_) => Stage::Submission,
            PipelineError::Job(_) => Stage::Polling,
            PipelineError::Delivery(_) => Stage::Delivery,
        }
    }

    /// Raw provider payload for operator diagnostics, when there is one.
    pub fn raw_payload(&self) -> Option<String> {
        match self {
            PipelineError::Submission(SubmissionError::Rejected { body, .. })
            | PipelineError::Submission(SubmissionError::MissingJobId { body }) => {
                Some(body.clone())
            }
            PipelineError::Job(JobError::Failed { payload, .. })
            | PipelineError::Job(JobError::NoOutput { payload, .. }) => Some(payload.to_string()),
            _ => None,
        }
    }

    /// Sanitized message naming the failed stage and the reason.
    pub fn user_message(&self) -> String {
        match self {
            PipelineError::Submission(SubmissionError::Rejected { status, .. }) => format!(
                "⚠️ The generation service rejected the request (HTTP {status}). \
                 Check the prompt and parameters, then start again with /start."
            ),
            PipelineError::Submission(SubmissionError::MissingJobId { .. }) => {
                "⚠️ The generation service accepted the request but did not return a job id. \
                 Please try again later."
                    .to_string()
            }
            PipelineError::Submission(SubmissionError::Transport(_)) => {
                "⚠️ Could not reach the generation service to submit the job. \
                 Please try again later."
                    .to_string()
            }
            PipelineError::Job(JobError::Timeout { waited, .. }) => format!(
                "⌛ The job did not finish within {} seconds. It may still complete on the \
                 provider side, but it will not be delivered here. Start a new job with /start.",
                waited.as_secs()
            ),
            PipelineError::Job(JobError::Failed { reason, .. }) => format!(
                "⚠️ The generation service reported a failure: {}",
                truncate(reason, MAX_REASON_CHARS)
            ),
            PipelineError::Job(JobError::TransportFailure { .. }) => {
                "⚠️ Lost contact with the generation service while waiting for the result. \
                 Please try again later."
                    .to_string()
            }
            PipelineError::Job(JobError::NoOutput { .. }) => {
                "⚠️ The job finished but returned no usable output.".to_string()
            }
            PipelineError::Job(JobError::Cancelled { .. }) => {
                "🛑 The job was cancelled before it finished.".to_string()
            }
            PipelineError::Delivery(_) => {
                "⚠️ The result is ready but could not be delivered to this chat.".to_string()
            }
        }
    }
}

fn truncate(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        return text.to_string();
    }
    let mut out: String = text.chars().take(max_chars).collect();
    out.push('…');
    out
}
