//! Per-conversation session state.
//!
//! Each chat owns one [`ParameterCollector`] and at most one in-flight job.
//! The store is the single place where either is created or cleared, so
//! every job outcome (success or any error) resets through [`SessionStore::clear_run`].

use std::collections::HashMap;
use std::sync::Arc;

use chrono::Utc;
use genrelay_core::{ChatId, GenerationMode, JobRequest, ModelCatalog, Timestamp};
use tokio::sync::RwLock;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use crate::collector::{CollectorAction, CollectorError, CollectorState, ParameterCollector, Step};

/// Bookkeeping for the job currently running for a chat.
#[derive(Debug, Clone)]
pub struct InFlightJob {
    /// Local identity of this run, assigned before submission.
    pub run_id: Uuid,
    /// Provider job id, known once submission succeeded.
    pub job_id: Option<String>,
    pub started_at: Timestamp,
    /// Child of the supervisor's master token.
    pub cancel: CancellationToken,
}

/// Everything the pipeline remembers about one chat.
#[derive(Debug, Clone)]
pub struct SessionState {
    pub collector: ParameterCollector,
    pub in_flight: Option<InFlightJob>,
}

impl SessionState {
    fn new(models: Arc<ModelCatalog>) -> Self {
        Self {
            collector: ParameterCollector::new(models),
            in_flight: None,
        }
    }

    /// Whether the session holds nothing worth keeping.
    pub fn is_idle(&self) -> bool {
        self.in_flight.is_none() && self.collector.is_pristine()
    }
}

/// Read-only view of a session, for handlers and tests.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionSnapshot {
    pub state: CollectorState,
    pub mode: Option<GenerationMode>,
    pub run_id: Option<Uuid>,
    pub job_id: Option<String>,
}

#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    /// A job is already running for this chat.
    #[error("A job is already running for this chat")]
    Busy,

    #[error(transparent)]
    Collector(#[from] CollectorError),
}

impl SessionError {
    /// User-facing guidance for this rejection.
    pub fn guidance(&self) -> String {
        match self {
            SessionError::Busy => {
                "⏳ Your previous request is still being generated. \
                 Wait for it to finish or send /cancel."
                    .to_string()
            }
            SessionError::Collector(e) => e.guidance(),
        }
    }
}

/// Shared, concurrency-safe map of chat sessions.
///
/// Cloning is cheap; all clones see the same sessions.
#[derive(Clone)]
pub struct SessionStore {
    sessions: Arc<RwLock<HashMap<ChatId, SessionState>>>,
    models: Arc<ModelCatalog>,
}

impl SessionStore {
    pub fn new(models: ModelCatalog) -> Self {
        Self {
            sessions: Arc::new(RwLock::new(HashMap::new())),
            models: Arc::new(models),
        }
    }

    pub fn models(&self) -> &ModelCatalog {
        &self.models
    }

    /// Start collecting from scratch, discarding any partial input.
    ///
    /// Rejected with [`SessionError::Busy`] while a job is in flight.
    pub async fn restart(&self, chat_id: ChatId) -> Result<CollectorState, SessionError> {
        let mut sessions = self.sessions.write().await;
        let session = sessions
            .entry(chat_id)
            .or_insert_with(|| SessionState::new(Arc::clone(&self.models)));
        if session.in_flight.is_some() {
            return Err(SessionError::Busy);
        }
        session.collector.reset();
        Ok(session.collector.state())
    }

    /// Feed one user action into the chat's collector.
    pub async fn apply(
        &self,
        chat_id: ChatId,
        action: CollectorAction,
    ) -> Result<Step, SessionError> {
        let mut sessions = self.sessions.write().await;
        let session = sessions
            .entry(chat_id)
            .or_insert_with(|| SessionState::new(Arc::clone(&self.models)));
        if session.in_flight.is_some() {
            return Err(SessionError::Busy);
        }
        Ok(session.collector.apply(action)?)
    }

    /// Build the request from what the collector holds right now.
    pub async fn finish(&self, chat_id: ChatId) -> Result<JobRequest, SessionError> {
        let mut sessions = self.sessions.write().await;
        let session = sessions
            .entry(chat_id)
            .or_insert_with(|| SessionState::new(Arc::clone(&self.models)));
        if session.in_flight.is_some() {
            return Err(SessionError::Busy);
        }
        Ok(session.collector.finish()?)
    }

    /// Mark a job as in flight. Fails if one already is.
    pub async fn begin_job(
        &self,
        chat_id: ChatId,
        run_id: Uuid,
        cancel: CancellationToken,
    ) -> Result<(), SessionError> {
        let mut sessions = self.sessions.write().await;
        let session = sessions
            .entry(chat_id)
            .or_insert_with(|| SessionState::new(Arc::clone(&self.models)));
        if session.in_flight.is_some() {
            return Err(SessionError::Busy);
        }
        session.collector.reset();
        session.in_flight = Some(InFlightJob {
            run_id,
            job_id: None,
            started_at: Utc::now(),
            cancel,
        });
        Ok(())
    }

    /// Attach the provider job id to the run, if `run_id` is still current.
    pub async fn record_job_id(&self, chat_id: ChatId, run_id: Uuid, job_id: &str) {
        let mut sessions = self.sessions.write().await;
        if let Some(job) = sessions
            .get_mut(&chat_id)
            .and_then(|s| s.in_flight.as_mut())
            .filter(|job| job.run_id == run_id)
        {
            job.job_id = Some(job_id.to_string());
        }
    }

    /// Remove all state for a chat.
    pub async fn clear(&self, chat_id: ChatId) {
        if self.sessions.write().await.remove(&chat_id).is_some() {
            tracing::debug!(chat_id, "Session cleared");
        }
    }

    /// Remove the chat's state only if `run_id` is still the in-flight run.
    ///
    /// Returns `false` when a newer run (or nothing) owns the session.
    pub async fn clear_run(&self, chat_id: ChatId, run_id: Uuid) -> bool {
        let mut sessions = self.sessions.write().await;
        let owned = sessions
            .get(&chat_id)
            .and_then(|s| s.in_flight.as_ref())
            .is_some_and(|job| job.run_id == run_id);
        if owned {
            sessions.remove(&chat_id);
            tracing::debug!(chat_id, run_id = %run_id, "Session cleared after run");
        }
        owned
    }

    /// Cancel the chat's in-flight job, if any. Returns whether one was
    /// cancelled.
    pub async fn cancel_in_flight(&self, chat_id: ChatId) -> bool {
        let sessions = self.sessions.read().await;
        match sessions.get(&chat_id).and_then(|s| s.in_flight.as_ref()) {
            Some(job) => {
                job.cancel.cancel();
                tracing::info!(chat_id, run_id = %job.run_id, "In-flight job cancelled");
                true
            }
            None => false,
        }
    }

    /// Whether the chat has no state at all.
    pub async fn is_empty(&self, chat_id: ChatId) -> bool {
        self.sessions
            .read()
            .await
            .get(&chat_id)
            .map_or(true, SessionState::is_idle)
    }

    /// Whether a job is in flight for the chat.
    pub async fn is_busy(&self, chat_id: ChatId) -> bool {
        self.sessions
            .read()
            .await
            .get(&chat_id)
            .is_some_and(|s| s.in_flight.is_some())
    }

    pub async fn snapshot(&self, chat_id: ChatId) -> Option<SessionSnapshot> {
        self.sessions.read().await.get(&chat_id).map(|s| SessionSnapshot {
            state: s.collector.state(),
            mode: s.collector.mode(),
            run_id: s.in_flight.as_ref().map(|j| j.run_id),
            job_id: s.in_flight.as_ref().and_then(|j| j.job_id.clone()),
        })
    }

    /// Number of chats with a job in flight.
    pub async fn in_flight_count(&self) -> usize {
        self.sessions
            .read()
            .await
            .values()
            .filter(|s| s.in_flight.is_some())
            .count()
    }
}
