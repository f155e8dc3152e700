//! Canonical reference to a generated artifact.

use crate::media::{encode_data_uri, mime_for_filename};

/// Where the generated media lives: a remote locator the channel can fetch
/// itself, or bytes already held in memory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OutputRef {
    Url(String),
    Bytes { data: Vec<u8>, filename: String },
}

impl OutputRef {
    /// Render this reference in the provider's canonical response shape,
    /// `{"output": [<url or data URI>]}`.
    pub fn canonical(&self) -> serde_json::Value {
        let locator = match self {
            OutputRef::Url(url) => url.clone(),
            OutputRef::Bytes { data, filename } => {
                encode_data_uri(data, mime_for_filename(filename))
            }
        };
        serde_json::json!({ "output": [locator] })
    }

    /// Short description safe for logs (never dumps byte payloads).
    pub fn describe(&self) -> String {
        match self {
            OutputRef::Url(url) => url.clone(),
            OutputRef::Bytes { data, filename } => format!("{filename} ({} bytes)", data.len()),
        }
    }
}
