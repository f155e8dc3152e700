//! Maps classified updates onto the session store and job supervisor.
//!
//! Rejections from the collector or the session (wrong input for the
//! current step, a job already running) are answered with guidance and
//! are not errors here. Errors are reserved for Telegram calls that fail.

use std::sync::Arc;

use anyhow::Context;
use genrelay_core::media::{mime_for_filename, MAX_REFERENCE_IMAGE_BYTES};
use genrelay_core::{ChatId, JobRequest, ReferenceImage};
use genrelay_pipeline::{
    CollectorAction, CollectorError, CollectorState, JobSupervisor, SessionError, SessionStore,
    Step,
};

use crate::incoming::{Command, ImageFile, Incoming};
use crate::keyboards;
use crate::telegram::TelegramApi;
use crate::types::Update;

const HELP_TEXT: &str = "I generate videos and images with Runway.\n\n\
/start - choose parameters for a new job\n\
/generate - submit with the parameters chosen so far\n\
/cancel - cancel the running job or discard the parameters\n\
/help - show this message\n\n\
Pick a mode, duration and aspect ratio with the buttons, then send the prompt. \
For image-to-video, send the photo too (a captioned photo counts as both).";

/// Handles one update at a time for all chats.
#[derive(Clone)]
pub struct BotHandler {
    api: Arc<TelegramApi>,
    sessions: SessionStore,
    supervisor: Arc<JobSupervisor>,
}

impl BotHandler {
    pub fn new(api: Arc<TelegramApi>, supervisor: Arc<JobSupervisor>) -> Self {
        Self {
            api,
            sessions: supervisor.sessions().clone(),
            supervisor,
        }
    }

    pub async fn handle_update(&self, update: Update) -> anyhow::Result<()> {
        let update_id = update.update_id;
        let Some(incoming) = Incoming::from_update(update) else {
            tracing::debug!(update_id, "Ignoring update without a usable payload");
            return Ok(());
        };
        let chat_id = incoming.chat_id();

        match incoming {
            Incoming::Command { command, .. } => self.on_command(chat_id, command).await,
            Incoming::Choice {
                query_id,
                message_id,
                callback,
                ..
            } => {
                if let Err(e) = self.api.answer_callback_query(&query_id).await {
                    tracing::warn!(chat_id, error = %e, "Failed to answer callback query");
                }
                match callback {
                    Some(callback) => {
                        match self.sessions.apply(chat_id, callback.into_action()).await {
                            Ok(step) => {
                                if let Err(e) = self
                                    .api
                                    .edit_message_text(chat_id, message_id, &callback.confirmation())
                                    .await
                                {
                                    tracing::debug!(chat_id, error = %e, "Could not edit choice message");
                                }
                                self.advance(chat_id, step).await
                            }
                            Err(e) => self.reject(chat_id, e).await,
                        }
                    }
                    None => {
                        self.say(chat_id, "That button is no longer valid. Send /start to begin again.")
                            .await
                    }
                }
            }
            Incoming::Text { text, .. } => {
                match self
                    .sessions
                    .apply(chat_id, CollectorAction::SubmitPrompt(text))
                    .await
                {
                    Ok(step) => self.advance(chat_id, step).await,
                    Err(e) => self.reject(chat_id, e).await,
                }
            }
            Incoming::Image { file, caption, .. } => self.on_image(chat_id, file, caption).await,
            Incoming::Unsupported { .. } => {
                self.say(chat_id, "I can only use text prompts and photos. Send /help for usage.")
                    .await
            }
        }
    }

    async fn on_command(&self, chat_id: ChatId, command: Command) -> anyhow::Result<()> {
        tracing::info!(chat_id, ?command, "Command received");
        match command {
            Command::Start => match self.sessions.restart(chat_id).await {
                Ok(state) => self.prompt_for(chat_id, state).await,
                Err(e) => self.reject(chat_id, e).await,
            },
            Command::Cancel => {
                if self.supervisor.cancel_job(chat_id).await {
                    self.say(chat_id, "🛑 Cancelling the running job…").await
                } else {
                    self.sessions.clear(chat_id).await;
                    self.say(chat_id, "Parameters cleared. Send /start to begin again.")
                        .await
                }
            }
            Command::Help => self.say(chat_id, HELP_TEXT).await,
            Command::Generate => match self.sessions.finish(chat_id).await {
                Ok(request) => self.launch(chat_id, request).await,
                Err(e) => self.reject(chat_id, e).await,
            },
            Command::Unknown(name) => {
                self.say(chat_id, &format!("Unknown command /{name}.\n\n{HELP_TEXT}"))
                    .await
            }
        }
    }

    async fn on_image(
        &self,
        chat_id: ChatId,
        file: ImageFile,
        caption: Option<String>,
    ) -> anyhow::Result<()> {
        // Check the step before downloading anything.
        let snapshot = self.sessions.snapshot(chat_id).await;
        if snapshot.as_ref().is_some_and(|s| s.run_id.is_some()) {
            return self.reject(chat_id, SessionError::Busy).await;
        }
        let needs_image = snapshot
            .as_ref()
            .and_then(|s| s.mode)
            .is_some_and(|m| m.needs_reference_image());
        let state = snapshot.map_or(CollectorState::AwaitingMode, |s| s.state);
        let wants_image = match state {
            CollectorState::AwaitingImage => true,
            CollectorState::AwaitingPrompt => {
                needs_image && caption.as_deref().is_some_and(|c| !c.trim().is_empty())
            }
            _ => false,
        };
        if !wants_image {
            let rejection = CollectorError::Unexpected {
                state,
                action: "a photo",
            };
            return self.reject(chat_id, rejection.into()).await;
        }

        if file
            .file_size
            .is_some_and(|size| size > MAX_REFERENCE_IMAGE_BYTES as u64)
        {
            return self
                .say(
                    chat_id,
                    &format!(
                        "That photo is too large; the limit is {} MB.",
                        MAX_REFERENCE_IMAGE_BYTES / (1024 * 1024)
                    ),
                )
                .await;
        }

        let image = match self.download_image(&file).await {
            Ok(image) => image,
            Err(e) => {
                tracing::warn!(chat_id, file_id = %file.file_id, error = %e, "Photo download failed");
                return self
                    .say(chat_id, "Could not download the photo. Please send it again.")
                    .await;
            }
        };
        tracing::info!(chat_id, bytes = image.bytes.len(), "Reference photo received");

        match self
            .sessions
            .apply(chat_id, CollectorAction::AttachImage { image, caption })
            .await
        {
            Ok(step) => self.advance(chat_id, step).await,
            Err(e) => self.reject(chat_id, e).await,
        }
    }

    async fn download_image(&self, file: &ImageFile) -> anyhow::Result<ReferenceImage> {
        let meta = self
            .api
            .get_file(&file.file_id)
            .await
            .context("getFile failed")?;
        let path = meta
            .file_path
            .context("Telegram returned no file path")?;
        let bytes = self
            .api
            .download_file(&path)
            .await
            .context("file download failed")?;
        let content_type = file
            .content_type
            .clone()
            .unwrap_or_else(|| mime_for_filename(&path).to_string());
        Ok(ReferenceImage::new(bytes, content_type))
    }

    async fn advance(&self, chat_id: ChatId, step: Step) -> anyhow::Result<()> {
        match step {
            Step::Awaiting(state) => self.prompt_for(chat_id, state).await,
            Step::Ready(request) => self.launch(chat_id, request).await,
        }
    }

    /// Ask for the input `state` is waiting on, with buttons when the
    /// choice is closed.
    async fn prompt_for(&self, chat_id: ChatId, state: CollectorState) -> anyhow::Result<()> {
        let keyboard = match state {
            CollectorState::AwaitingMode => Some(keyboards::modes()),
            CollectorState::AwaitingDuration => Some(keyboards::durations()),
            CollectorState::AwaitingRatio => self
                .sessions
                .snapshot(chat_id)
                .await
                .and_then(|s| s.mode)
                .map(keyboards::ratios),
            _ => None,
        };
        self.api
            .send_message(chat_id, state.guidance(), keyboard.as_ref())
            .await
            .with_context(|| format!("Failed to prompt chat {chat_id}"))
    }

    async fn launch(&self, chat_id: ChatId, request: JobRequest) -> anyhow::Result<()> {
        // Goes out before the run's own status messages.
        let summary = format!("✅ Request accepted:\n{}", describe(&request));
        if let Err(e) = self.say(chat_id, &summary).await {
            tracing::warn!(chat_id, error = %e, "Failed to send request summary");
        }
        match self.supervisor.start_job(chat_id, request).await {
            Ok(ticket) => {
                tracing::info!(chat_id, run_id = %ticket.run_id, "Job accepted");
                Ok(())
            }
            Err(e) => self.reject(chat_id, e).await,
        }
    }

    async fn reject(&self, chat_id: ChatId, error: SessionError) -> anyhow::Result<()> {
        tracing::debug!(chat_id, error = %error, "Input rejected");
        self.say(chat_id, &error.guidance()).await
    }

    async fn say(&self, chat_id: ChatId, text: &str) -> anyhow::Result<()> {
        self.api
            .send_message(chat_id, text, None)
            .await
            .with_context(|| format!("Failed to message chat {chat_id}"))
    }
}

/// One-line-per-field summary of a request.
pub fn describe(request: &JobRequest) -> String {
    let mut lines = vec![format!("Mode: {}", request.mode().label())];
    if let Some(duration) = request.duration() {
        lines.push(format!("Duration: {} s", duration.seconds()));
    }
    lines.push(format!("Aspect ratio: {}", request.aspect_ratio()));
    lines.push(format!("Prompt: {}", request.prompt_text()));
    if request.reference_image().is_some() {
        lines.push("Reference photo: attached".to_string());
    }
    lines.join("\n")
}

#[cfg(test)]
mod tests {
    use genrelay_core::{AspectRatio, ClipDuration, GenerationMode};

    use super::*;

    #[test]
    fn summary_lists_video_fields() {
        let request = JobRequest::new(
            GenerationMode::ImageToVideo,
            "zoom",
            Some(ReferenceImage::new(vec![1], "image/jpeg")),
            Some(ClipDuration::Ten),
            AspectRatio::Square960x960,
            "gen4_turbo",
        )
        .unwrap();
        let text = describe(&request);
        assert!(text.contains("Duration: 10 s"));
        assert!(text.contains("Aspect ratio: 960:960"));
        assert!(text.contains("Reference photo: attached"));
    }

    #[test]
    fn summary_skips_duration_for_images() {
        let request = JobRequest::new(
            GenerationMode::TextToImage,
            "castle",
            None,
            None,
            AspectRatio::Square1024x1024,
            "gen4_image",
        )
        .unwrap();
        assert!(!describe(&request).contains("Duration"));
    }

    #[test]
    fn help_lists_every_command() {
        for cmd in ["/start", "/generate", "/cancel", "/help"] {
            assert!(HELP_TEXT.contains(cmd));
        }
    }
}
