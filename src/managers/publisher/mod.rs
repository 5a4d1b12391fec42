//! Message broker publisher.
//!
//! Declares the topic exchange at connect time and publishes one message per
//! discovered event. The channel is shared across all polling tasks; lapin
//! channels are safe for concurrent use.

pub(crate) mod error;

use std::future::Future;

use lapin::{
    BasicProperties, Channel, Connection, ConnectionProperties, ExchangeKind,
    options::{BasicPublishOptions, ExchangeDeclareOptions},
    types::FieldTable,
};

use crate::config::BrokerConfig;
use error::PublisherError;

/// Publish seam for the event pipeline. `routing_key = None` falls back to
/// the process-wide configured key. Mocked in pipeline tests.
pub(crate) trait Publisher: Send + Sync {
    fn publish(
        &self,
        payload: &[u8],
        routing_key: Option<&str>,
    ) -> impl Future<Output = Result<(), PublisherError>> + Send;
}

pub(crate) struct RabbitPublisher {
    exchange: String,
    default_routing_key: String,
    channel: Channel,
    // Held so the connection outlives the channel
    _connection: Connection,
}

impl RabbitPublisher {
    /// Connect, open a channel, and declare the topic exchange (durable,
    /// not auto-deleted). Verifies an existing exchange is of the expected
    /// kind, per AMQP declare semantics.
    pub(crate) async fn connect(config: &BrokerConfig) -> Result<Self, PublisherError> {
        let connection = Connection::connect(&config.amqp_uri(), ConnectionProperties::default())
            .await
            .map_err(PublisherError::Connection)?;
        let channel = connection
            .create_channel()
            .await
            .map_err(PublisherError::Connection)?;

        channel
            .exchange_declare(
                &config.exchange,
                ExchangeKind::Topic,
                ExchangeDeclareOptions {
                    durable: true,
                    auto_delete: false,
                    ..ExchangeDeclareOptions::default()
                },
                FieldTable::default(),
            )
            .await
            .map_err(|source| PublisherError::ExchangeDeclare {
                exchange: config.exchange.clone(),
                source,
            })?;

        tracing::info!(
            host = %config.host,
            port = config.port,
            exchange = %config.exchange,
            "Connected to message broker"
        );

        Ok(Self {
            exchange: config.exchange.clone(),
            default_routing_key: config.routing_key.clone(),
            channel,
            _connection: connection,
        })
    }
}

impl Publisher for RabbitPublisher {
    async fn publish(
        &self,
        payload: &[u8],
        routing_key: Option<&str>,
    ) -> Result<(), PublisherError> {
        let routing_key = match routing_key {
            Some(key) => key,
            None if !self.default_routing_key.is_empty() => &self.default_routing_key,
            None => return Err(PublisherError::MissingRoutingKey),
        };

        self.channel
            .basic_publish(
                &self.exchange,
                routing_key,
                BasicPublishOptions::default(),
                payload,
                BasicProperties::default(),
            )
            .await
            .map_err(|source| PublisherError::Publish {
                routing_key: routing_key.to_string(),
                source,
            })?;

        tracing::debug!(
            routing_key,
            payload_bytes = payload.len(),
            "Sent message to exchange"
        );
        Ok(())
    }
}
