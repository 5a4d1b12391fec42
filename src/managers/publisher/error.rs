use thiserror::Error;

#[derive(Error, Debug)]
pub(crate) enum PublisherError {
    #[error("Broker connection failed: {0}")]
    Connection(#[source] lapin::Error),

    #[error("Failed to declare exchange '{exchange}': {source}")]
    ExchangeDeclare {
        exchange: String,
        #[source]
        source: lapin::Error,
    },

    #[error("Failed to publish message on routing key '{routing_key}': {source}")]
    Publish {
        routing_key: String,
        #[source]
        source: lapin::Error,
    },

    #[error("A routing key needs to be set either in config or in publish")]
    MissingRoutingKey,
}
