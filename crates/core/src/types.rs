/// Conversation identifier assigned by the front end (Telegram chat ids are
/// signed 64-bit integers).
pub type ChatId = i64;

/// All timestamps are UTC.
pub type Timestamp = chrono::DateTime<chrono::Utc>;
