use std::time::Duration;

use genrelay_core::config::{optional, parse_or, required, ConfigError};
use genrelay_core::ModelCatalog;

/// API version sent in the `X-Runway-Version` header when none is configured.
pub const DEFAULT_API_VERSION: &str = "2024-11-06";

/// Base URL of the public Runway API.
pub const DEFAULT_BASE_URL: &str = "https://api.dev.runwayml.com/v1";

const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 60;

/// Connection settings for the generation provider.
#[derive(Clone)]
pub struct RunwayConfig {
    /// Bearer credential.
    pub api_key: String,
    /// Value of the `X-Runway-Version` header.
    pub api_version: String,
    /// Base URL without a trailing slash.
    pub base_url: String,
    /// Timeout applied to every individual HTTP call.
    pub request_timeout: Duration,
    /// Models used per output kind.
    pub models: ModelCatalog,
}

impl std::fmt::Debug for RunwayConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RunwayConfig")
            .field("api_key", &"<redacted>")
            .field("api_version", &self.api_version)
            .field("base_url", &self.base_url)
            .field("request_timeout", &self.request_timeout)
            .field("models", &self.models)
            .finish()
    }
}

impl RunwayConfig {
    /// Load provider settings from an environment-style lookup.
    ///
    /// | Variable                      | Required | Default                           |
    /// |-------------------------------|----------|-----------------------------------|
    /// | `RUNWAY_API_KEY`              | yes*     | --                                |
    /// | `RUNWAYML_API_SECRET`         | yes*     | -- (alias for `RUNWAY_API_KEY`)   |
    /// | `RUNWAY_API_VERSION`          | no       | `2024-11-06`                      |
    /// | `RUNWAY_BASE_URL`             | no       | `https://api.dev.runwayml.com/v1` |
    /// | `RUNWAY_REQUEST_TIMEOUT_SECS` | no       | `60`                              |
    /// | `RUNWAY_VIDEO_MODEL`          | no       | `gen4_turbo`                      |
    /// | `RUNWAY_IMAGE_MODEL`          | no       | `gen4_image`                      |
    pub fn from_lookup<L>(lookup: &L) -> Result<Self, ConfigError>
    where
        L: Fn(&str) -> Option<String>,
    {
        let api_key = match optional(lookup, "RUNWAYML_API_SECRET") {
            Some(secret) if optional(lookup, "RUNWAY_API_KEY").is_none() => secret,
            _ => required(lookup, "RUNWAY_API_KEY")?,
        };

        let base_url = optional(lookup, "RUNWAY_BASE_URL")
            .unwrap_or_else(|| DEFAULT_BASE_URL.to_string())
            .trim_end_matches('/')
            .to_string();

        let defaults = ModelCatalog::default();
        let models = ModelCatalog {
            video_model: optional(lookup, "RUNWAY_VIDEO_MODEL").unwrap_or(defaults.video_model),
            image_model: optional(lookup, "RUNWAY_IMAGE_MODEL").unwrap_or(defaults.image_model),
        };

        Ok(Self {
            api_key,
            api_version: optional(lookup, "RUNWAY_API_VERSION")
                .unwrap_or_else(|| DEFAULT_API_VERSION.to_string()),
            base_url,
            request_timeout: Duration::from_secs(parse_or(
                lookup,
                "RUNWAY_REQUEST_TIMEOUT_SECS",
                DEFAULT_REQUEST_TIMEOUT_SECS,
            )?),
            models,
        })
    }
}
