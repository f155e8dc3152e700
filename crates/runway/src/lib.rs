//! Runway REST client library.
//!
//! Provides the HTTP transport for task creation and status polling
//! ([`api`]), provider configuration ([`config`]), and the single place
//! where a [`JobRequest`](genrelay_core::JobRequest) is translated into a
//! provider payload ([`payload`]).

pub mod api;
pub mod config;
pub mod payload;

pub use api::{RunwayApi, RunwayApiError, TaskApi};
pub use config::RunwayConfig;
pub use payload::{build_task, extract_task_id, ProviderTask};
