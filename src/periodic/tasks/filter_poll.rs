//! Filter polling task: owns one installed event filter for its lifetime.
//!
//! Poll, dispatch every returned entry in order, sleep, repeat. Pipeline
//! failures never reach this loop; an unrecovered source error fails this
//! task only. Cancellation is observed at the sleep point, so an in-flight
//! dispatch always runs to completion before the task exits.

use std::{sync::Arc, time::Duration};

use tokio_util::sync::CancellationToken;

use crate::{
    managers::{
        blockchain::{FilterSource, FilterSpec, error::BlockchainError},
        publisher::Publisher,
    },
    services::event_pipeline::EventPipeline,
};

/// Fixed interval between polls of one filter (1 second).
pub(crate) const POLLING_INTERVAL: Duration = Duration::from_secs(1);

/// Terminal state of a filter polling task.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum TaskOutcome {
    /// Stopped by the shutdown signal.
    Cancelled,
    /// Hit an unrecovered source error; the filter is degraded but
    /// sibling filters keep running.
    Failed,
}

pub(crate) struct FilterPollTask<S, P> {
    source: Arc<S>,
    pipeline: Arc<EventPipeline<P>>,
    spec: FilterSpec,
    poll_interval: Duration,
}

impl<S: FilterSource, P: Publisher> FilterPollTask<S, P> {
    pub(crate) fn new(source: Arc<S>, pipeline: Arc<EventPipeline<P>>, spec: FilterSpec) -> Self {
        Self {
            source,
            pipeline,
            spec,
            poll_interval: POLLING_INTERVAL,
        }
    }

    pub(crate) fn event_name(&self) -> &str {
        &self.spec.event_name
    }

    pub(crate) async fn run(self, shutdown: CancellationToken) -> TaskOutcome {
        tracing::info!(
            event = %self.spec.event_name,
            contract = %self.spec.contract_address,
            arguments = ?self.spec.argument_filters,
            "Starting filter polling task"
        );

        loop {
            if shutdown.is_cancelled() {
                return self.shut_down().await;
            }

            if let Err(error) = self.poll_once().await {
                tracing::error!(
                    event = %self.spec.event_name,
                    error = %error,
                    "Filter polling failed; marking filter degraded"
                );
                return TaskOutcome::Failed;
            }

            tokio::select! {
                _ = tokio::time::sleep(self.poll_interval) => {}
                _ = shutdown.cancelled() => {
                    return self.shut_down().await;
                }
            }
        }
    }

    /// One poll cycle: fetch new entries and dispatch each through the
    /// pipeline, in upstream order, before returning.
    async fn poll_once(&self) -> Result<(), BlockchainError> {
        let entries = self.source.poll(&self.spec).await?;
        if entries.is_empty() {
            return Ok(());
        }

        tracing::debug!(
            event = %self.spec.event_name,
            entry_count = entries.len(),
            "Fetched new log entries"
        );

        for log in &entries {
            self.pipeline.handle(log, &self.spec).await;
        }
        Ok(())
    }

    async fn shut_down(self) -> TaskOutcome {
        tracing::info!(
            event = %self.spec.event_name,
            "Filter polling task shutting down"
        );
        if let Err(error) = self.source.uninstall(&self.spec).await {
            tracing::warn!(
                event = %self.spec.event_name,
                error = %error,
                "Failed to uninstall filter during shutdown"
            );
        }
        TaskOutcome::Cancelled
    }
}
