pub(crate) mod tasks;

use std::sync::Arc;

use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;

use crate::{
    managers::{
        blockchain::{FilterSource, FilterSpec},
        publisher::Publisher,
    },
    services::event_pipeline::EventPipeline,
};
use tasks::filter_poll::{FilterPollTask, TaskOutcome};

/// Spawn one polling task per compiled filter spec. Each task owns its spec
/// exclusively; the JoinSet ties every task's lifetime to the scheduler
/// rather than to incidental retention.
pub(crate) fn spawn_filter_tasks<S, P>(
    set: &mut JoinSet<(String, TaskOutcome)>,
    source: &Arc<S>,
    pipeline: &Arc<EventPipeline<P>>,
    specs: Vec<FilterSpec>,
    shutdown: &CancellationToken,
) where
    S: FilterSource + 'static,
    P: Publisher + 'static,
{
    for spec in specs {
        let task = FilterPollTask::new(Arc::clone(source), Arc::clone(pipeline), spec);
        let shutdown = shutdown.clone();
        set.spawn(async move {
            let event_name = task.event_name().to_string();
            let outcome = task.run(shutdown).await;
            (event_name, outcome)
        });
    }
}
