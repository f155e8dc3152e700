//! Classification of raw updates into the inputs the bot reacts to.

use genrelay_core::ChatId;

use crate::callbacks::Callback;
use crate::types::{Message, Update};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Start,
    Cancel,
    Help,
    /// Build the job from what has been collected so far.
    Generate,
    Unknown(String),
}

impl Command {
    /// Parse `/name[@bot] [args]`. Returns `None` for non-commands.
    pub fn parse(text: &str) -> Option<Self> {
        let word = text.trim().strip_prefix('/')?.split_whitespace().next()?;
        let name = word.split('@').next().unwrap_or(word).to_ascii_lowercase();
        Some(match name.as_str() {
            "start" => Command::Start,
            "cancel" => Command::Cancel,
            "help" => Command::Help,
            "generate" => Command::Generate,
            _ => Command::Unknown(name),
        })
    }
}

/// A Telegram file that should become a reference image.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageFile {
    pub file_id: String,
    pub file_size: Option<u64>,
    /// Declared MIME type, when Telegram reports one.
    pub content_type: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Incoming {
    Command {
        chat_id: ChatId,
        command: Command,
    },
    /// An inline-keyboard button press.
    Choice {
        chat_id: ChatId,
        query_id: String,
        message_id: i64,
        /// `None` when the button data is not understood (e.g. stale).
        callback: Option<Callback>,
    },
    Text {
        chat_id: ChatId,
        text: String,
    },
    Image {
        chat_id: ChatId,
        file: ImageFile,
        caption: Option<String>,
    },
    /// A message the bot has no use for (stickers, voice, non-image files).
    Unsupported {
        chat_id: ChatId,
    },
}

impl Incoming {
    pub fn from_update(update: Update) -> Option<Self> {
        if let Some(query) = update.callback_query {
            let message = query.message?;
            return Some(Incoming::Choice {
                chat_id: message.chat.id,
                query_id: query.id,
                message_id: message.message_id,
                callback: query.data.as_deref().and_then(Callback::parse),
            });
        }
        update.message.map(Self::from_message)
    }

    fn from_message(message: Message) -> Self {
        let chat_id = message.chat.id;

        if let Some(text) = message.text {
            return match Command::parse(&text) {
                Some(command) => Incoming::Command { chat_id, command },
                None => Incoming::Text { chat_id, text },
            };
        }

        let largest = message
            .photo
            .unwrap_or_default()
            .into_iter()
            .max_by_key(|p| u64::from(p.width) * u64::from(p.height));
        if let Some(photo) = largest {
            return Incoming::Image {
                chat_id,
                file: ImageFile {
                    file_id: photo.file_id,
                    file_size: photo.file_size,
                    content_type: None,
                },
                caption: message.caption,
            };
        }

        match message.document {
            Some(doc)
                if doc
                    .mime_type
                    .as_deref()
                    .is_some_and(|m| m.starts_with("image/")) =>
            {
                Incoming::Image {
                    chat_id,
                    file: ImageFile {
                        file_id: doc.file_id,
                        file_size: doc.file_size,
                        content_type: doc.mime_type,
                    },
                    caption: message.caption,
                }
            }
            _ => Incoming::Unsupported { chat_id },
        }
    }

    pub fn chat_id(&self) -> ChatId {
        match self {
            Incoming::Command { chat_id, .. }
            | Incoming::Choice { chat_id, .. }
            | Incoming::Text { chat_id, .. }
            | Incoming::Image { chat_id, .. }
            | Incoming::Unsupported { chat_id } => *chat_id,
        }
    }
}
