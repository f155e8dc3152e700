//! Genrelay job pipeline.
//!
//! Parameter collection, submission, polling, result normalization, and
//! delivery for one generation job per chat, plus the supervisor that runs
//! jobs as owned, cancellable tasks.
//!
//! The provider and the notification channel are reached only through the
//! [`genrelay_runway::TaskApi`], [`NotificationChannel`], and
//! [`MediaFetcher`] traits, so every stage can run against stubs.

pub mod backoff;
pub mod collector;
pub mod delivery;
pub mod error;
pub mod normalizer;
pub mod poller;
pub mod runner;
pub mod session;
pub mod status;
pub mod submitter;
pub mod supervisor;

pub use collector::{CollectorAction, CollectorError, CollectorState, ParameterCollector, Step};
pub use delivery::{
    ChannelError, DeliveryManager, FetchError, HttpFetcher, MediaFetcher, NotificationChannel,
};
pub use error::{DeliveryError, JobError, PipelineError, Stage, SubmissionError};
pub use poller::{PollConfig, Poller};
pub use runner::{JobOutcome, JobRunner};
pub use session::{SessionError, SessionSnapshot, SessionStore};
pub use submitter::Submitter;
pub use supervisor::{JobSupervisor, JobTicket};
