//! Telegram front end for the genrelay job pipeline.

pub mod callbacks;
pub mod channel;
pub mod config;
pub mod handlers;
pub mod incoming;
pub mod keyboards;
pub mod telegram;
pub mod types;
pub mod updates;

pub use channel::TelegramChannel;
pub use config::BotConfig;
pub use handlers::BotHandler;
pub use telegram::{TelegramApi, TelegramApiError};
