//! Genrelay domain types.
//!
//! Shared by the provider client, the job pipeline, and the front-end
//! shell: generation requests, job handles and statuses, canonical output
//! references, and the media helpers they depend on.

pub mod config;
pub mod error;
pub mod job;
pub mod media;
pub mod output;
pub mod types;

pub use config::ConfigError;
pub use error::CoreError;
pub use job::{
    AspectRatio, ClipDuration, GenerationMode, JobHandle, JobRequest, JobStatus, ModelCatalog,
    ReferenceImage,
};
pub use media::MediaKind;
pub use output::OutputRef;
pub use types::{ChatId, Timestamp};
