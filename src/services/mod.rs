pub(crate) mod event_pipeline;
