#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use genrelay_core::{
    AspectRatio, ChatId, ClipDuration, GenerationMode, JobRequest, MediaKind, ReferenceImage,
};
use genrelay_pipeline::{
    ChannelError, FetchError, JobRunner, MediaFetcher, NotificationChannel, PollConfig,
    SessionStore,
};
use genrelay_runway::{RunwayApiError, TaskApi};
use serde_json::{json, Value};

// ---------------------------------------------------------------------------
// Scripted provider
// ---------------------------------------------------------------------------

/// One canned provider answer.
#[derive(Debug, Clone)]
pub enum Reply {
    Json(Value),
    Status(u16),
}

impl Reply {
    fn into_result(self) -> Result<Value, RunwayApiError> {
        match self {
            Reply::Json(v) => Ok(v),
            Reply::Status(status) => Err(RunwayApiError::ApiError {
                status,
                body: format!("{{\"error\":\"scripted {status}\"}}"),
            }),
        }
    }
}

/// [`TaskApi`] stub that plays back scripted replies.
///
/// Status replies are consumed in order; the last one repeats forever.
pub struct ScriptedApi {
    create_reply: Mutex<Reply>,
    status_replies: Mutex<VecDeque<Reply>>,
    pub create_calls: AtomicUsize,
    pub status_calls: AtomicUsize,
    pub created: Mutex<Vec<(String, Value)>>,
}

impl ScriptedApi {
    pub fn new(create_reply: Reply, status_replies: Vec<Reply>) -> Arc<Self> {
        Arc::new(Self {
            create_reply: Mutex::new(create_reply),
            status_replies: Mutex::new(status_replies.into()),
            create_calls: AtomicUsize::new(0),
            status_calls: AtomicUsize::new(0),
            created: Mutex::new(Vec::new()),
        })
    }

    /// Accepts the task as `task-1`, then plays `status_replies`.
    pub fn accepting(status_replies: Vec<Reply>) -> Arc<Self> {
        Self::new(Reply::Json(json!({"id": "task-1"})), status_replies)
    }

    pub fn status_calls(&self) -> usize {
        self.status_calls.load(Ordering::SeqCst)
    }

    pub fn create_calls(&self) -> usize {
        self.create_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl TaskApi for ScriptedApi {
    async fn create_task(&self, endpoint: &str, payload: &Value) -> Result<Value, RunwayApiError> {
        self.create_calls.fetch_add(1, Ordering::SeqCst);
        self.created
            .lock()
            .unwrap()
            .push((endpoint.to_string(), payload.clone()));
        self.create_reply.lock().unwrap().clone().into_result()
    }

    async fn get_task(&self, _task_id: &str) -> Result<Value, RunwayApiError> {
        self.status_calls.fetch_add(1, Ordering::SeqCst);
        let mut replies = self.status_replies.lock().unwrap();
        let reply = if replies.len() > 1 {
            replies.pop_front()
        } else {
            replies.front().cloned()
        };
        reply
            .unwrap_or_else(|| Reply::Json(json!({"status": "RUNNING"})))
            .into_result()
    }
}

pub fn running() -> Reply {
    Reply::Json(json!({"id": "task-1", "status": "RUNNING"}))
}

pub fn succeeded(url: &str) -> Reply {
    Reply::Json(json!({"id": "task-1", "status": "SUCCEEDED", "output": [url]}))
}

pub fn failed(reason: &str) -> Reply {
    Reply::Json(json!({"id": "task-1", "status": "FAILED", "failure": reason}))
}

// ---------------------------------------------------------------------------
// Recording channel
// ---------------------------------------------------------------------------

/// [`NotificationChannel`] stub that records every send.
#[derive(Default)]
pub struct RecordingChannel {
    pub fail_url: AtomicBool,
    pub fail_bytes: AtomicBool,
    pub panic_on_url: AtomicBool,
    pub texts: Mutex<Vec<(ChatId, String)>>,
    pub urls: Mutex<Vec<(ChatId, String)>>,
    pub uploads: Mutex<Vec<(ChatId, String, usize)>>,
}

impl RecordingChannel {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn rejecting_urls() -> Arc<Self> {
        let channel = Self::default();
        channel.fail_url.store(true, Ordering::SeqCst);
        Arc::new(channel)
    }

    pub fn texts(&self) -> Vec<String> {
        self.texts
            .lock()
            .unwrap()
            .iter()
            .map(|(_, t)| t.clone())
            .collect()
    }

    pub fn url_count(&self) -> usize {
        self.urls.lock().unwrap().len()
    }

    pub fn upload_count(&self) -> usize {
        self.uploads.lock().unwrap().len()
    }
}

#[async_trait]
impl NotificationChannel for RecordingChannel {
    async fn send_text(&self, chat_id: ChatId, text: &str) -> Result<(), ChannelError> {
        self.texts.lock().unwrap().push((chat_id, text.to_string()));
        Ok(())
    }

    async fn send_media_url(
        &self,
        chat_id: ChatId,
        url: &str,
        _kind: MediaKind,
        _caption: &str,
    ) -> Result<(), ChannelError> {
        if self.panic_on_url.load(Ordering::SeqCst) {
            panic!("scripted channel panic");
        }
        if self.fail_url.load(Ordering::SeqCst) {
            return Err(ChannelError("file is too big".into()));
        }
        self.urls.lock().unwrap().push((chat_id, url.to_string()));
        Ok(())
    }

    async fn send_media_bytes(
        &self,
        chat_id: ChatId,
        data: Vec<u8>,
        filename: &str,
        _kind: MediaKind,
        _caption: &str,
    ) -> Result<(), ChannelError> {
        if self.fail_bytes.load(Ordering::SeqCst) {
            return Err(ChannelError("upload rejected".into()));
        }
        self.uploads
            .lock()
            .unwrap()
            .push((chat_id, filename.to_string(), data.len()));
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Scripted fetcher
// ---------------------------------------------------------------------------

/// [`MediaFetcher`] stub returning fixed bytes or a fixed HTTP status.
pub struct ScriptedFetcher {
    result: Result<Vec<u8>, u16>,
    pub calls: AtomicUsize,
}

impl ScriptedFetcher {
    pub fn serving(bytes: &[u8]) -> Arc<Self> {
        Arc::new(Self {
            result: Ok(bytes.to_vec()),
            calls: AtomicUsize::new(0),
        })
    }

    pub fn failing(status: u16) -> Arc<Self> {
        Arc::new(Self {
            result: Err(status),
            calls: AtomicUsize::new(0),
        })
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl MediaFetcher for ScriptedFetcher {
    async fn fetch(&self, _url: &str) -> Result<Vec<u8>, FetchError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.result.clone().map_err(FetchError::HttpStatus)
    }
}

// ---------------------------------------------------------------------------
// Builders
// ---------------------------------------------------------------------------

pub const CHAT: ChatId = 42;

/// 9 second deadline, 3 second interval, 30 second backoff cap.
pub fn short_poll() -> PollConfig {
    PollConfig {
        timeout: Duration::from_secs(9),
        interval: Duration::from_secs(3),
        max_backoff: Duration::from_secs(30),
    }
}

pub fn text_to_video() -> JobRequest {
    JobRequest::new(
        GenerationMode::TextToVideo,
        "a cat surfing a wave",
        None,
        Some(ClipDuration::Five),
        AspectRatio::Landscape1280x720,
        "gen4_turbo",
    )
    .unwrap()
}

pub fn image_to_video() -> JobRequest {
    JobRequest::new(
        GenerationMode::ImageToVideo,
        "slow zoom",
        Some(ReferenceImage::new(vec![0xFF, 0xD8, 0xFF, 0xE0], "image/jpeg")),
        Some(ClipDuration::Ten),
        AspectRatio::Portrait720x1280,
        "gen4_turbo",
    )
    .unwrap()
}

pub fn text_to_image() -> JobRequest {
    JobRequest::new(
        GenerationMode::TextToImage,
        "a castle at dusk",
        None,
        None,
        AspectRatio::Square1024x1024,
        "gen4_image",
    )
    .unwrap()
}

pub fn runner(
    api: Arc<ScriptedApi>,
    channel: Arc<RecordingChannel>,
    fetcher: Arc<ScriptedFetcher>,
    sessions: SessionStore,
) -> JobRunner {
    JobRunner::new(api, channel, fetcher, sessions, short_poll())
}
