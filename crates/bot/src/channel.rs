//! [`NotificationChannel`] backed by the Telegram Bot API.

use std::sync::Arc;

use async_trait::async_trait;
use genrelay_core::{ChatId, MediaKind};
use genrelay_pipeline::{ChannelError, NotificationChannel};

use crate::telegram::TelegramApi;

pub struct TelegramChannel {
    api: Arc<TelegramApi>,
}

impl TelegramChannel {
    pub fn new(api: Arc<TelegramApi>) -> Self {
        Self { api }
    }
}

#[async_trait]
impl NotificationChannel for TelegramChannel {
    async fn send_text(&self, chat_id: ChatId, text: &str) -> Result<(), ChannelError> {
        self.api
            .send_message(chat_id, text, None)
            .await
            .map_err(|e| ChannelError(e.to_string()))
    }

    async fn send_media_url(
        &self,
        chat_id: ChatId,
        url: &str,
        kind: MediaKind,
        caption: &str,
    ) -> Result<(), ChannelError> {
        self.api
            .send_media_url(chat_id, kind, url, caption)
            .await
            .map_err(|e| ChannelError(e.to_string()))
    }

    async fn send_media_bytes(
        &self,
        chat_id: ChatId,
        data: Vec<u8>,
        filename: &str,
        kind: MediaKind,
        caption: &str,
    ) -> Result<(), ChannelError> {
        self.api
            .send_media_bytes(chat_id, kind, data, filename, caption)
            .await
            .map_err(|e| ChannelError(e.to_string()))
    }
}
