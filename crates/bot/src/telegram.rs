//! REST client for the Telegram Bot API.
//!
//! Covers the handful of methods the bot uses: long polling for updates,
//! text and keyboard messages, media sends (by URL and by multipart
//! upload), and file downloads. The bot token is part of every URL, so
//! request errors are stripped of their URL before they are surfaced.

use std::time::Duration;

use genrelay_core::media::mime_for_filename;
use genrelay_core::{ChatId, MediaKind};
use reqwest::multipart::{Form, Part};
use serde::de::DeserializeOwned;
use serde_json::{json, Value};

use crate::types::{ApiResponse, File, InlineKeyboardMarkup, Update};

/// Slack on top of the long-poll wait before the HTTP call itself times out.
const LONG_POLL_SLACK: Duration = Duration::from_secs(10);

/// Default timeout for ordinary Bot API calls.
const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(60);

/// Errors from the Telegram API layer.
#[derive(Debug, thiserror::Error)]
pub enum TelegramApiError {
    /// The HTTP request itself failed (network, DNS, TLS, timeout, etc.).
    #[error("HTTP request failed: {0}")]
    Request(reqwest::Error),

    /// Telegram answered with `ok: false`.
    #[error("Telegram API error ({}): {description}", display_code(.code))]
    Api {
        code: Option<i64>,
        description: String,
    },

    /// The call succeeded but carried no result.
    #[error("Telegram {0} returned no result")]
    EmptyResult(&'static str),
}

fn display_code(code: &Option<i64>) -> String {
    code.map_or_else(|| "?".to_string(), |c| c.to_string())
}

impl From<reqwest::Error> for TelegramApiError {
    fn from(e: reqwest::Error) -> Self {
        // The URL embeds the bot token.
        TelegramApiError::Request(e.without_url())
    }
}

/// HTTP client for one bot.
pub struct TelegramApi {
    client: reqwest::Client,
    /// `<base>/bot<token>`
    method_base: String,
    /// `<base>/file/bot<token>`
    file_base: String,
}

impl TelegramApi {
    pub fn new(token: &str, api_base: &str) -> Result<Self, TelegramApiError> {
        let client = reqwest::Client::builder()
            .timeout(DEFAULT_REQUEST_TIMEOUT)
            .build()?;
        Ok(Self::with_client(client, token, api_base))
    }

    /// Create an API client reusing an existing [`reqwest::Client`].
    pub fn with_client(client: reqwest::Client, token: &str, api_base: &str) -> Self {
        let api_base = api_base.trim_end_matches('/');
        Self {
            client,
            method_base: format!("{api_base}/bot{token}"),
            file_base: format!("{api_base}/file/bot{token}"),
        }
    }

    /// Long-poll for updates after `offset`.
    pub async fn get_updates(
        &self,
        offset: i64,
        wait: Duration,
    ) -> Result<Vec<Update>, TelegramApiError> {
        let body = json!({
            "offset": offset,
            "timeout": wait.as_secs(),
            "allowed_updates": ["message", "callback_query"],
        });
        let response = self
            .client
            .post(self.method_url("getUpdates"))
            .timeout(wait + LONG_POLL_SLACK)
            .json(&body)
            .send()
            .await?;
        Self::unwrap_result(response, "getUpdates").await
    }

    pub async fn send_message(
        &self,
        chat_id: ChatId,
        text: &str,
        keyboard: Option<&InlineKeyboardMarkup>,
    ) -> Result<(), TelegramApiError> {
        let mut body = json!({ "chat_id": chat_id, "text": text });
        if let Some(keyboard) = keyboard {
            body["reply_markup"] = serde_json::to_value(keyboard)
                .map_err(|e| TelegramApiError::Api {
                    code: None,
                    description: format!("unserializable keyboard: {e}"),
                })?;
        }
        self.call::<Value>("sendMessage", &body).await.map(drop)
    }

    /// Replace the text of an earlier message and drop its keyboard.
    pub async fn edit_message_text(
        &self,
        chat_id: ChatId,
        message_id: i64,
        text: &str,
    ) -> Result<(), TelegramApiError> {
        let body = json!({ "chat_id": chat_id, "message_id": message_id, "text": text });
        self.call::<Value>("editMessageText", &body).await.map(drop)
    }

    pub async fn answer_callback_query(&self, query_id: &str) -> Result<(), TelegramApiError> {
        let body = json!({ "callback_query_id": query_id });
        self.call::<Value>("answerCallbackQuery", &body)
            .await
            .map(drop)
    }

    /// Send media by URL; Telegram fetches it.
    pub async fn send_media_url(
        &self,
        chat_id: ChatId,
        kind: MediaKind,
        url: &str,
        caption: &str,
    ) -> Result<(), TelegramApiError> {
        let (method, field) = media_method(kind);
        let body = json!({ "chat_id": chat_id, field: url, "caption": caption });
        self.call::<Value>(method, &body).await.map(drop)
    }

    /// Send media as a multipart upload.
    pub async fn send_media_bytes(
        &self,
        chat_id: ChatId,
        kind: MediaKind,
        data: Vec<u8>,
        filename: &str,
        caption: &str,
    ) -> Result<(), TelegramApiError> {
        let (method, field) = media_method(kind);
        let part = Part::bytes(data)
            .file_name(filename.to_string())
            .mime_str(mime_for_filename(filename))?;
        let form = Form::new()
            .text("chat_id", chat_id.to_string())
            .text("caption", caption.to_string())
            .part(field, part);

        let response = self
            .client
            .post(self.method_url(method))
            .multipart(form)
            .send()
            .await?;
        Self::unwrap_result::<Value>(response, method).await.map(drop)
    }

    pub async fn get_file(&self, file_id: &str) -> Result<File, TelegramApiError> {
        self.call("getFile", &json!({ "file_id": file_id })).await
    }

    /// Download a file previously resolved with [`Self::get_file`].
    pub async fn download_file(&self, file_path: &str) -> Result<Vec<u8>, TelegramApiError> {
        let response = self
            .client
            .get(format!("{}/{}", self.file_base, file_path.trim_start_matches('/')))
            .send()
            .await?;
        let status = response.status();
        if !status.is_success() {
            return Err(TelegramApiError::Api {
                code: Some(i64::from(status.as_u16())),
                description: "file download failed".to_string(),
            });
        }
        Ok(response.bytes().await?.to_vec())
    }

    // ---- private helpers ----

    fn method_url(&self, method: &str) -> String {
        format!("{}/{method}", self.method_base)
    }

    async fn call<T: DeserializeOwned>(
        &self,
        method: &'static str,
        body: &Value,
    ) -> Result<T, TelegramApiError> {
        let response = self
            .client
            .post(self.method_url(method))
            .json(body)
            .send()
            .await?;
        Self::unwrap_result(response, method).await
    }

    /// Decode the `{ok, result}` envelope. Telegram reports errors in the
    /// body for non-2xx statuses too, so the status code is not checked
    /// separately.
    async fn unwrap_result<T: DeserializeOwned>(
        response: reqwest::Response,
        method: &'static str,
    ) -> Result<T, TelegramApiError> {
        let envelope: ApiResponse<T> = response.json().await?;
        if !envelope.ok {
            return Err(TelegramApiError::Api {
                code: envelope.error_code,
                description: envelope
                    .description
                    .unwrap_or_else(|| "no description".to_string()),
            });
        }
        envelope.result.ok_or(TelegramApiError::EmptyResult(method))
    }
}

/// Bot API method and form field for sending a kind of media.
pub fn media_method(kind: MediaKind) -> (&'static str, &'static str) {
    match kind {
        MediaKind::Video => ("sendVideo", "video"),
        MediaKind::Image => ("sendPhoto", "photo"),
    }
}
