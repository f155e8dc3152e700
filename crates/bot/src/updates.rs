//! Long-polling loop over `getUpdates`.
//!
//! Updates are handled one at a time in arrival order, which keeps each
//! chat's inputs ordered. Handling is quick; generation jobs run on the
//! supervisor, not in this loop.

use std::time::Duration;

use tokio_util::sync::CancellationToken;

use crate::handlers::BotHandler;
use crate::telegram::TelegramApi;

/// Pause after a failed `getUpdates` call.
const RETRY_DELAY: Duration = Duration::from_secs(5);

/// Poll for updates until `cancel` is triggered.
pub async fn run(
    api: &TelegramApi,
    handler: &BotHandler,
    wait: Duration,
    cancel: CancellationToken,
) {
    let mut offset: i64 = 0;
    tracing::info!(wait_secs = wait.as_secs(), "Update loop started");

    loop {
        let result = tokio::select! {
            _ = cancel.cancelled() => break,
            result = api.get_updates(offset, wait) => result,
        };

        match result {
            Ok(updates) => {
                for update in updates {
                    offset = offset.max(update.update_id + 1);
                    let update_id = update.update_id;
                    if let Err(e) = handler.handle_update(update).await {
                        tracing::error!(update_id, error = ?e, "Failed to handle update");
                    }
                }
            }
            Err(e) => {
                tracing::warn!(error = %e, "getUpdates failed, retrying");
                tokio::select! {
                    _ = cancel.cancelled() => break,
                    _ = tokio::time::sleep(RETRY_DELAY) => {}
                }
            }
        }
    }

    tracing::info!("Update loop stopped");
}
