//! Helpers for reading configuration from environment-style lookups.
//!
//! Every loader takes a `lookup` closure instead of reading
//! `std::env` directly so configuration parsing can be tested without
//! touching the process environment. Use [`env_lookup`] in binaries.

use std::str::FromStr;

/// Errors raised while loading configuration at startup.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ConfigError {
    /// A required variable is absent or blank.
    #[error("{0} environment variable is required")]
    Missing(&'static str),

    /// A variable is present but cannot be parsed.
    #[error("{var} has an invalid value '{value}'")]
    Invalid { var: &'static str, value: String },
}

/// Lookup that reads the process environment.
pub fn env_lookup(name: &str) -> Option<String> {
    std::env::var(name).ok()
}

/// Read an optional variable, treating blank values as absent.
pub fn optional<L>(lookup: &L, name: &str) -> Option<String>
where
    L: Fn(&str) -> Option<String>,
{
    lookup(name)
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// Read a required variable.
pub fn required<L>(lookup: &L, name: &'static str) -> Result<String, ConfigError>
where
    L: Fn(&str) -> Option<String>,
{
    optional(lookup, name).ok_or(ConfigError::Missing(name))
}

/// Read and parse an optional variable, falling back to `default`.
pub fn parse_or<L, T>(lookup: &L, name: &'static str, default: T) -> Result<T, ConfigError>
where
    L: Fn(&str) -> Option<String>,
    T: FromStr,
{
    match optional(lookup, name) {
        None => Ok(default),
        Some(raw) => raw.parse().map_err(|_| ConfigError::Invalid {
            var: name,
            value: raw,
        }),
    }
}
