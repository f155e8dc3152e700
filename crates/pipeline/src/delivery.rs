//! Delivery manager: hand a finished artifact to the notification channel.
//!
//! The primary path passes the URL straight to the channel, which fetches
//! it itself. If the channel rejects that (size, format, transient network
//! trouble), the bytes are downloaded here with a bounded timeout and sent
//! as an attachment. Exactly one successful send happens per artifact.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use genrelay_core::media::{extension_for_mime, mime_for_filename};
use genrelay_core::{ChatId, MediaKind, OutputRef};

use crate::error::DeliveryError;

/// HTTP timeout for the fallback download.
pub const DEFAULT_DOWNLOAD_TIMEOUT: Duration = Duration::from_secs(120);

// ---------------------------------------------------------------------------
// Capabilities
// ---------------------------------------------------------------------------

/// Error reported by a notification channel call.
#[derive(Debug, thiserror::Error)]
#[error("{0}")]
pub struct ChannelError(pub String);

/// Outbound side of the conversational front end.
#[async_trait]
pub trait NotificationChannel: Send + Sync {
    /// Send a plain text message.
    async fn send_text(&self, chat_id: ChatId, text: &str) -> Result<(), ChannelError>;

    /// Send media by reference; the channel fetches the URL itself.
    async fn send_media_url(
        &self,
        chat_id: ChatId,
        url: &str,
        kind: MediaKind,
        caption: &str,
    ) -> Result<(), ChannelError>;

    /// Send media as an attached payload.
    async fn send_media_bytes(
        &self,
        chat_id: ChatId,
        data: Vec<u8>,
        filename: &str,
        kind: MediaKind,
        caption: &str,
    ) -> Result<(), ChannelError>;
}

/// Errors from downloading an artifact for the fallback path.
#[derive(Debug, thiserror::Error)]
pub enum FetchError {
    /// The HTTP request itself failed (network, DNS, timeout, etc.).
    #[error("HTTP request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// The remote server returned a non-2xx status code.
    #[error("Download returned HTTP {0}")]
    HttpStatus(u16),

    /// The download succeeded but contained no data.
    #[error("Download returned an empty body")]
    Empty,
}

/// Downloads raw artifact bytes.
#[async_trait]
pub trait MediaFetcher: Send + Sync {
    async fn fetch(&self, url: &str) -> Result<Vec<u8>, FetchError>;
}

/// [`MediaFetcher`] backed by a [`reqwest::Client`] with a request timeout.
pub struct HttpFetcher {
    client: reqwest::Client,
}

impl HttpFetcher {
    pub fn new(timeout: Duration) -> Self {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .expect("Failed to build reqwest HTTP client");
        Self { client }
    }
}

impl Default for HttpFetcher {
    fn default() -> Self {
        Self::new(DEFAULT_DOWNLOAD_TIMEOUT)
    }
}

#[async_trait]
impl MediaFetcher for HttpFetcher {
    async fn fetch(&self, url: &str) -> Result<Vec<u8>, FetchError> {
        let response = self.client.get(url).send().await?;
        if !response.status().is_success() {
            return Err(FetchError::HttpStatus(response.status().as_u16()));
        }
        let bytes = response.bytes().await?;
        if bytes.is_empty() {
            return Err(FetchError::Empty);
        }
        Ok(bytes.to_vec())
    }
}

// ---------------------------------------------------------------------------
// DeliveryManager
// ---------------------------------------------------------------------------

/// Attachment name for a file downloaded from `url`. Keeps the URL's
/// extension when it matches `kind`, else falls back to the default name.
pub fn upload_filename(url: &str, kind: MediaKind) -> String {
    let path = url.split(['?', '#']).next().unwrap_or(url);
    let name = path.rsplit('/').next().unwrap_or(path);
    let mime = mime_for_filename(name);
    let family = match kind {
        MediaKind::Video => "video/",
        MediaKind::Image => "image/",
    };
    if mime.starts_with(family) {
        format!("result.{}", extension_for_mime(mime))
    } else {
        kind.default_filename().to_string()
    }
}

/// Caption attached to delivered media.
pub fn caption_for(kind: MediaKind) -> &'static str {
    match kind {
        MediaKind::Video => "Done! 🎬",
        MediaKind::Image => "Done! 🖼",
    }
}

/// Delivers artifacts with a by-reference primary path and an upload
/// fallback.
pub struct DeliveryManager {
    channel: Arc<dyn NotificationChannel>,
    fetcher: Arc<dyn MediaFetcher>,
}

impl DeliveryManager {
    pub fn new(channel: Arc<dyn NotificationChannel>, fetcher: Arc<dyn MediaFetcher>) -> Self {
        Self { channel, fetcher }
    }

    /// Deliver `output` to `chat_id`.
    ///
    /// Only [`DeliveryError::Unrecoverable`] is ever returned;
    /// [`DeliveryError::PrimaryFailed`] is consumed by the fallback.
    pub async fn deliver(
        &self,
        chat_id: ChatId,
        output: &OutputRef,
        kind: MediaKind,
    ) -> Result<(), DeliveryError> {
        match output {
            OutputRef::Url(url) => match self.deliver_by_reference(chat_id, url, kind).await {
                Ok(()) => Ok(()),
                Err(DeliveryError::PrimaryFailed(primary)) => {
                    tracing::warn!(
                        chat_id,
                        url = %url,
                        error = %primary,
                        "Sending by URL failed, downloading and uploading instead"
                    );
                    self.deliver_by_upload(chat_id, url, kind)
                        .await
                        .map_err(|fallback| {
                            tracing::error!(
                                chat_id,
                                url = %url,
                                primary = %primary,
                                fallback = %fallback,
                                "Both delivery paths failed"
                            );
                            DeliveryError::Unrecoverable { primary, fallback }
                        })
                }
                Err(other) => Err(other),
            },
            OutputRef::Bytes { data, filename } => self
                .channel
                .send_media_bytes(chat_id, data.clone(), filename, kind, caption_for(kind))
                .await
                .map_err(|e| {
                    tracing::error!(chat_id, filename = %filename, error = %e, "Attachment upload failed");
                    DeliveryError::Unrecoverable {
                        primary: e.to_string(),
                        fallback: "no fallback for in-memory output".to_string(),
                    }
                }),
        }
    }

    async fn deliver_by_reference(
        &self,
        chat_id: ChatId,
        url: &str,
        kind: MediaKind,
    ) -> Result<(), DeliveryError> {
        self.channel
            .send_media_url(chat_id, url, kind, caption_for(kind))
            .await
            .map_err(|e| DeliveryError::PrimaryFailed(e.to_string()))?;
        tracing::info!(chat_id, "Delivered result by URL");
        Ok(())
    }

    /// Fallback: download the bytes and send them as an attachment.
    async fn deliver_by_upload(
        &self,
        chat_id: ChatId,
        url: &str,
        kind: MediaKind,
    ) -> Result<(), String> {
        let data = self
            .fetcher
            .fetch(url)
            .await
            .map_err(|e| format!("download failed: {e}"))?;
        let size = data.len();
        let filename = upload_filename(url, kind);
        self.channel
            .send_media_bytes(chat_id, data, &filename, kind, caption_for(kind))
            .await
            .map_err(|e| format!("upload failed: {e}"))?;
        tracing::info!(chat_id, bytes = size, "Delivered result by upload");
        Ok(())
    }
}
