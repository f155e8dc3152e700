use std::time::Duration;

use genrelay_core::config::{optional, parse_or, required, ConfigError};
use genrelay_pipeline::delivery::DEFAULT_DOWNLOAD_TIMEOUT;
use genrelay_pipeline::PollConfig;
use genrelay_runway::RunwayConfig;

/// Public Telegram Bot API endpoint.
pub const DEFAULT_TELEGRAM_API_BASE: &str = "https://api.telegram.org";

const DEFAULT_LONG_POLL_SECS: u64 = 30;

/// Everything the bot binary needs at startup.
#[derive(Clone)]
pub struct BotConfig {
    pub telegram_token: String,
    /// Telegram API base URL without a trailing slash.
    pub telegram_api_base: String,
    /// Server-side wait of one `getUpdates` long poll.
    pub long_poll_timeout: Duration,
    pub runway: RunwayConfig,
    pub poll: PollConfig,
    /// HTTP timeout for downloading results on the upload fallback path.
    pub download_timeout: Duration,
}

impl std::fmt::Debug for BotConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BotConfig")
            .field("telegram_token", &"<redacted>")
            .field("telegram_api_base", &self.telegram_api_base)
            .field("long_poll_timeout", &self.long_poll_timeout)
            .field("runway", &self.runway)
            .field("poll", &self.poll)
            .field("download_timeout", &self.download_timeout)
            .finish()
    }
}

impl BotConfig {
    /// Load configuration from an environment-style lookup.
    ///
    /// | Variable                     | Required | Default                    |
    /// |------------------------------|----------|----------------------------|
    /// | `TELEGRAM_BOT_TOKEN`         | yes      | --                         |
    /// | `TELEGRAM_API_BASE`          | no       | `https://api.telegram.org` |
    /// | `TELEGRAM_POLL_TIMEOUT_SECS` | no       | `30`                       |
    /// | `POLL_TIMEOUT_SECS`          | no       | `300`                      |
    /// | `POLL_INTERVAL_SECS`         | no       | `3`                        |
    /// | `POLL_MAX_BACKOFF_SECS`      | no       | `30`                       |
    /// | `DOWNLOAD_TIMEOUT_SECS`      | no       | `120`                      |
    ///
    /// Provider variables are documented on [`RunwayConfig::from_lookup`].
    pub fn from_lookup<L>(lookup: &L) -> Result<Self, ConfigError>
    where
        L: Fn(&str) -> Option<String>,
    {
        let telegram_token = required(lookup, "TELEGRAM_BOT_TOKEN")?;
        let runway = RunwayConfig::from_lookup(lookup)?;

        let defaults = PollConfig::default();
        let poll = PollConfig {
            timeout: secs(lookup, "POLL_TIMEOUT_SECS", defaults.timeout)?,
            interval: secs(lookup, "POLL_INTERVAL_SECS", defaults.interval)?,
            max_backoff: secs(lookup, "POLL_MAX_BACKOFF_SECS", defaults.max_backoff)?,
        };
        if poll.interval.is_zero() {
            return Err(ConfigError::Invalid {
                var: "POLL_INTERVAL_SECS",
                value: "0".to_string(),
            });
        }

        Ok(Self {
            telegram_token,
            telegram_api_base: optional(lookup, "TELEGRAM_API_BASE")
                .unwrap_or_else(|| DEFAULT_TELEGRAM_API_BASE.to_string())
                .trim_end_matches('/')
                .to_string(),
            long_poll_timeout: Duration::from_secs(parse_or(
                lookup,
                "TELEGRAM_POLL_TIMEOUT_SECS",
                DEFAULT_LONG_POLL_SECS,
            )?),
            runway,
            poll,
            download_timeout: secs(lookup, "DOWNLOAD_TIMEOUT_SECS", DEFAULT_DOWNLOAD_TIMEOUT)?,
        })
    }
}

fn secs<L>(lookup: &L, name: &'static str, default: Duration) -> Result<Duration, ConfigError>
where
    L: Fn(&str) -> Option<String>,
{
    parse_or(lookup, name, default.as_secs()).map(Duration::from_secs)
}
