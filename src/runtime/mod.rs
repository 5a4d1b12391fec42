//! Runs the polling tasks until a shutdown signal arrives, supervising each
//! task's terminal state: a degraded filter is logged and reported without
//! cancelling its siblings.

mod shutdown;

use std::sync::Arc;

use tokio::{select, signal::unix::SignalKind, task::JoinSet};
use tokio_util::sync::CancellationToken;

use crate::{
    managers::{
        blockchain::{FilterSource, FilterSpec},
        publisher::Publisher,
    },
    periodic::{self, tasks::filter_poll::TaskOutcome},
    services::event_pipeline::EventPipeline,
};

pub(crate) async fn run<S, P>(
    source: Arc<S>,
    pipeline: Arc<EventPipeline<P>>,
    specs: Vec<FilterSpec>,
) where
    S: FilterSource + 'static,
    P: Publisher + 'static,
{
    let shutdown = CancellationToken::new();
    let mut set = JoinSet::new();
    periodic::spawn_filter_tasks(&mut set, &source, &pipeline, specs, &shutdown);

    // Wait for shutdown signal (SIGINT or SIGTERM) while supervising tasks
    let ctrl_c = tokio::signal::ctrl_c();
    let mut sigterm = tokio::signal::unix::signal(SignalKind::terminate())
        .expect("Failed to install SIGTERM handler");
    tokio::pin!(ctrl_c);

    loop {
        select! {
            _ = &mut ctrl_c => {
                tracing::info!("Received SIGINT, initiating shutdown...");
                break;
            }
            _ = sigterm.recv() => {
                tracing::info!("Received SIGTERM, initiating shutdown...");
                break;
            }
            joined = set.join_next() => {
                match joined {
                    Some(Ok((event_name, TaskOutcome::Failed))) => {
                        tracing::warn!(
                            event = %event_name,
                            "Filter degraded; remaining filters continue"
                        );
                    }
                    Some(Ok((event_name, TaskOutcome::Cancelled))) => {
                        tracing::debug!(event = %event_name, "Filter task stopped");
                    }
                    Some(Err(error)) => {
                        tracing::error!(error = ?error, "Filter task panicked");
                    }
                    None => {
                        tracing::warn!("All filter tasks have stopped; shutting down");
                        break;
                    }
                }
            }
        }
    }

    shutdown::graceful_shutdown(shutdown, set).await;
}
