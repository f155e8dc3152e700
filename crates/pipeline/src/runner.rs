//! Job runner: submit → poll → deliver for one request.
//!
//! Every exit path of a run ends in [`JobRunner::report_and_reset`] (for
//! errors) or the success branch of [`JobRunner::run`]; both clear the
//! chat's session so the conversation can start over cleanly.

use std::sync::Arc;

use genrelay_core::{ChatId, JobRequest};
use genrelay_runway::TaskApi;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use crate::delivery::{DeliveryManager, MediaFetcher, NotificationChannel};
use crate::error::{JobError, PipelineError};
use crate::poller::{PollConfig, Poller};
use crate::session::SessionStore;
use crate::submitter::Submitter;

/// Placeholder job id for runs cancelled before the provider assigned one.
const UNSUBMITTED: &str = "<unsubmitted>";

/// How a run ended.
#[derive(Debug)]
pub enum JobOutcome {
    /// The artifact reached the chat.
    Delivered { job_id: String },
    /// A stage failed; the user was told why.
    Reported(PipelineError),
    /// The run was cancelled (user request or shutdown).
    Aborted,
    /// The run task panicked; the session was still cleared.
    Crashed,
}

impl JobOutcome {
    pub fn is_delivered(&self) -> bool {
        matches!(self, JobOutcome::Delivered { .. })
    }
}

/// Runs one job end to end.
pub struct JobRunner {
    submitter: Submitter,
    poller: Poller,
    delivery: DeliveryManager,
    channel: Arc<dyn NotificationChannel>,
    sessions: SessionStore,
    poll: PollConfig,
}

impl JobRunner {
    pub fn new(
        api: Arc<dyn TaskApi>,
        channel: Arc<dyn NotificationChannel>,
        fetcher: Arc<dyn MediaFetcher>,
        sessions: SessionStore,
        poll: PollConfig,
    ) -> Self {
        Self {
            submitter: Submitter::new(Arc::clone(&api)),
            poller: Poller::new(api, poll.max_backoff),
            delivery: DeliveryManager::new(Arc::clone(&channel), fetcher),
            channel,
            sessions,
            poll,
        }
    }

    pub fn sessions(&self) -> &SessionStore {
        &self.sessions
    }

    pub fn channel(&self) -> &Arc<dyn NotificationChannel> {
        &self.channel
    }

    /// Run `request` for `chat_id` to a terminal outcome.
    ///
    /// Never returns an error: failures are reported to the chat and
    /// logged, and the session is cleared in every case.
    pub async fn run(
        &self,
        chat_id: ChatId,
        run_id: Uuid,
        request: JobRequest,
        cancel: CancellationToken,
    ) -> JobOutcome {
        tracing::info!(
            chat_id,
            run_id = %run_id,
            mode = ?request.mode(),
            ratio = %request.aspect_ratio(),
            model = request.model_name(),
            "Job run started"
        );

        match self.execute(chat_id, run_id, request, &cancel).await {
            Ok(job_id) => {
                tracing::info!(chat_id, run_id = %run_id, job_id = %job_id, "Job delivered");
                self.sessions.clear_run(chat_id, run_id).await;
                JobOutcome::Delivered { job_id }
            }
            Err(e) => self.report_and_reset(chat_id, run_id, e).await,
        }
    }

    async fn execute(
        &self,
        chat_id: ChatId,
        run_id: Uuid,
        request: JobRequest,
        cancel: &CancellationToken,
    ) -> Result<String, PipelineError> {
        let kind = request.mode().media_kind();

        let handle = tokio::select! {
            _ = cancel.cancelled() => {
                return Err(JobError::Cancelled { job_id: UNSUBMITTED.to_string() }.into());
            }
            result = self.submitter.submit(request) => result?,
        };
        self.sessions.record_job_id(chat_id, run_id, &handle.id).await;
        self.notify(
            chat_id,
            &format!(
                "🚀 Generation started (task {}). This usually takes a few minutes.",
                handle.id
            ),
        )
        .await;

        let output = self
            .poller
            .poll(&handle, self.poll.timeout, self.poll.interval, cancel)
            .await?;

        self.delivery.deliver(chat_id, &output, kind).await?;
        Ok(handle.id)
    }

    /// Log the failure with its raw payload, tell the user, clear the
    /// session.
    pub async fn report_and_reset(
        &self,
        chat_id: ChatId,
        run_id: Uuid,
        error: PipelineError,
    ) -> JobOutcome {
        let stage = error.stage();
        let raw = error.raw_payload();
        let cancelled = matches!(error, PipelineError::Job(JobError::Cancelled { .. }));

        if cancelled {
            tracing::info!(chat_id, run_id = %run_id, stage = %stage, "Job run cancelled");
        } else {
            tracing::error!(
                chat_id,
                run_id = %run_id,
                stage = %stage,
                error = %error,
                raw_payload = raw.as_deref().unwrap_or("<none>"),
                "Job run failed"
            );
        }

        self.notify(chat_id, &error.user_message()).await;
        self.sessions.clear_run(chat_id, run_id).await;

        if cancelled {
            JobOutcome::Aborted
        } else {
            JobOutcome::Reported(error)
        }
    }

    /// Best-effort status message; failures are only logged.
    pub(crate) async fn notify(&self, chat_id: ChatId, text: &str) {
        if let Err(e) = self.channel.send_text(chat_id, text).await {
            tracing::warn!(chat_id, error = %e, "Failed to send status message");
        }
    }
}
