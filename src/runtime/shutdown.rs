use std::time::Duration;

use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;

use crate::periodic::tasks::filter_poll::TaskOutcome;

const FILTER_SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(10);

/// Ordered shutdown:
/// 1. Cancel the polling tasks (they stop scheduling further polls)
/// 2. Wait for in-flight polls and dispatches to drain
/// 3. Abort stragglers only after the drain timeout
pub(super) async fn graceful_shutdown(
    shutdown: CancellationToken,
    mut set: JoinSet<(String, TaskOutcome)>,
) {
    tracing::info!("Shutting down gracefully...");

    shutdown.cancel();

    let drain = async {
        while let Some(result) = set.join_next().await {
            match result {
                Ok((event_name, outcome)) => {
                    tracing::debug!(event = %event_name, ?outcome, "Filter task exited");
                }
                Err(error) => {
                    tracing::error!(error = ?error, "Filter task panicked during shutdown");
                }
            }
        }
    };

    if tokio::time::timeout(FILTER_SHUTDOWN_TIMEOUT, drain)
        .await
        .is_err()
    {
        tracing::warn!(
            timeout_secs = FILTER_SHUTDOWN_TIMEOUT.as_secs(),
            "Shutdown timeout reached, aborting remaining filter tasks"
        );
        set.shutdown().await;
    }

    tracing::info!("Shutdown complete");
}
