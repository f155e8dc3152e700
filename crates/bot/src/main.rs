//! `genrelay-bot` -- Telegram bot that generates videos and images with
//! Runway.
//!
//! Collects generation parameters through inline keyboards, submits the
//! job, polls it to completion, and delivers the result to the chat.
//! Configuration is read from the environment (a `.env` file is honoured);
//! see [`BotConfig::from_lookup`] and `RunwayConfig::from_lookup` for the
//! variables.

use std::sync::Arc;
use std::time::Duration;

use genrelay_bot::{updates, BotConfig, BotHandler, TelegramApi, TelegramChannel};
use genrelay_core::config::env_lookup;
use genrelay_pipeline::{HttpFetcher, JobRunner, JobSupervisor, SessionStore};
use genrelay_runway::RunwayApi;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// How long running jobs get to wind down on shutdown.
const SHUTDOWN_GRACE: Duration = Duration::from_secs(5);

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                "genrelay_bot=info,genrelay_pipeline=info,genrelay_runway=info".into()
            }),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = BotConfig::from_lookup(&env_lookup).unwrap_or_else(|e| {
        tracing::error!(error = %e, "Invalid configuration");
        std::process::exit(1);
    });

    tracing::info!(
        base_url = %config.runway.base_url,
        api_version = %config.runway.api_version,
        video_model = %config.runway.models.video_model,
        image_model = %config.runway.models.image_model,
        poll_timeout_secs = config.poll.timeout.as_secs(),
        poll_interval_secs = config.poll.interval.as_secs(),
        "Starting genrelay-bot",
    );

    let runway = RunwayApi::new(&config.runway).unwrap_or_else(|e| {
        tracing::error!(error = %e, "Failed to build Runway client");
        std::process::exit(1);
    });
    let telegram = TelegramApi::new(&config.telegram_token, &config.telegram_api_base)
        .unwrap_or_else(|e| {
            tracing::error!(error = %e, "Failed to build Telegram client");
            std::process::exit(1);
        });
    let telegram = Arc::new(telegram);

    let sessions = SessionStore::new(config.runway.models.clone());
    let runner = JobRunner::new(
        Arc::new(runway),
        Arc::new(TelegramChannel::new(Arc::clone(&telegram))),
        Arc::new(HttpFetcher::new(config.download_timeout)),
        sessions,
        config.poll.clone(),
    );
    let supervisor = Arc::new(JobSupervisor::new(Arc::new(runner)));
    let handler = BotHandler::new(Arc::clone(&telegram), Arc::clone(&supervisor));

    let cancel = CancellationToken::new();
    let signal_cancel = cancel.clone();
    tokio::spawn(async move {
        shutdown_signal().await;
        signal_cancel.cancel();
    });

    updates::run(&telegram, &handler, config.long_poll_timeout, cancel).await;

    // --- Post-shutdown cleanup ---
    if !supervisor.shutdown(SHUTDOWN_GRACE).await {
        tracing::warn!("Some jobs were abandoned at shutdown");
    }
    tracing::info!("genrelay-bot stopped");
}

/// Wait for SIGINT (Ctrl-C) or SIGTERM.
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl-C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {
            tracing::info!("Received SIGINT (Ctrl-C), starting graceful shutdown");
        }
        () = terminate => {
            tracing::info!("Received SIGTERM, starting graceful shutdown");
        }
    }
}
