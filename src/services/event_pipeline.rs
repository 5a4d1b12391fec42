//! Normalizes discovered log entries and hands them to the publisher.
//!
//! Every failure in here (decode, serialize, publish) is logged with the
//! event context and swallowed: one bad or unpublishable event must never
//! stop the polling of its filter or of any sibling filter.

use std::sync::Arc;

use alloy::rpc::types::Log;
use serde::Serialize;

use crate::{
    config::watchlist::ArgumentFilters,
    managers::{
        blockchain::{
            FilterSpec,
            encoding::{LogDecodeError, normalize_log},
        },
        publisher::{Publisher, error::PublisherError},
    },
};

/// Wire contract: one JSON message per discovered log entry.
#[derive(Debug, Serialize)]
struct PublishEnvelope<'a> {
    event_name: &'a str,
    filter_arguments: &'a ArgumentFilters,
    event_data: serde_json::Value,
}

#[derive(Debug, thiserror::Error)]
enum PipelineError {
    #[error(transparent)]
    Decode(#[from] LogDecodeError),

    #[error("Failed to serialize envelope: {0}")]
    Serialize(#[from] serde_json::Error),

    #[error(transparent)]
    Publish(#[from] PublisherError),
}

pub(crate) struct EventPipeline<P> {
    publisher: Arc<P>,
    routing_key: String,
}

impl<P: Publisher> EventPipeline<P> {
    pub(crate) fn new(publisher: Arc<P>, routing_key: String) -> Self {
        Self {
            publisher,
            routing_key,
        }
    }

    /// Normalize, envelope, and publish one log entry. Infallible from the
    /// caller's perspective; dropped events are logged with their event name
    /// and routing key.
    pub(crate) async fn handle(&self, log: &Log, spec: &FilterSpec) {
        if let Err(error) = self.try_handle(log, spec).await {
            tracing::error!(
                event = %spec.event_name,
                routing_key = %self.routing_key,
                error = %error,
                raw_log = ?log,
                "Dropping event after pipeline failure"
            );
        }
    }

    async fn try_handle(&self, log: &Log, spec: &FilterSpec) -> Result<(), PipelineError> {
        let event_data = normalize_log(&spec.event, log)?;
        let envelope = PublishEnvelope {
            event_name: &spec.event_name,
            filter_arguments: &spec.argument_filters,
            event_data,
        };
        let payload = serde_json::to_vec(&envelope)?;

        self.publisher
            .publish(&payload, Some(&self.routing_key))
            .await?;

        tracing::info!(
            event = %spec.event_name,
            routing_key = %self.routing_key,
            "Published event"
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{
        Mutex,
        atomic::{AtomicBool, Ordering},
    };

    use alloy::{
        json_abi::Event,
        primitives::{Address, B256, LogData, U256},
    };

    use super::*;

    struct RecordingPublisher {
        sent: Mutex<Vec<(Vec<u8>, String)>>,
        fail_next: AtomicBool,
    }

    impl RecordingPublisher {
        fn new() -> Self {
            Self {
                sent: Mutex::new(Vec::new()),
                fail_next: AtomicBool::new(false),
            }
        }
    }

    impl Publisher for RecordingPublisher {
        async fn publish(
            &self,
            payload: &[u8],
            routing_key: Option<&str>,
        ) -> Result<(), PublisherError> {
            if self.fail_next.swap(false, Ordering::SeqCst) {
                return Err(PublisherError::MissingRoutingKey);
            }
            self.sent.lock().unwrap().push((
                payload.to_vec(),
                routing_key.unwrap_or_default().to_string(),
            ));
            Ok(())
        }
    }

    fn transfer_event() -> Event {
        serde_json::from_value(serde_json::json!({
            "type": "event",
            "name": "Transfer",
            "anonymous": false,
            "inputs": [
                {"name": "from", "type": "address", "indexed": true},
                {"name": "to", "type": "address", "indexed": true},
                {"name": "value", "type": "uint256", "indexed": false}
            ]
        }))
        .unwrap()
    }

    fn transfer_spec() -> FilterSpec {
        let event = transfer_event();
        let filters = match serde_json::json!({"fromBlock": "latest"}) {
            serde_json::Value::Object(map) => map,
            _ => unreachable!(),
        };
        FilterSpec {
            contract_address: Address::repeat_byte(0x11),
            event_name: event.name.clone(),
            event,
            argument_filters: filters,
            filter_id: U256::from(1u64),
        }
    }

    fn transfer_log(event: &Event, amount: u64) -> Log {
        Log {
            inner: alloy::primitives::Log {
                address: Address::repeat_byte(0x11),
                data: LogData::new_unchecked(
                    vec![
                        event.selector(),
                        B256::left_padding_from(Address::repeat_byte(0xaa).as_slice()),
                        B256::left_padding_from(Address::repeat_byte(0xbb).as_slice()),
                    ],
                    U256::from(amount).to_be_bytes_vec().into(),
                ),
            },
            block_hash: Some(B256::repeat_byte(0x01)),
            block_number: Some(1),
            block_timestamp: None,
            transaction_hash: Some(B256::repeat_byte(0x02)),
            transaction_index: Some(0),
            log_index: Some(0),
            removed: false,
        }
    }

    #[tokio::test]
    async fn publishes_envelope_with_wire_schema() {
        let publisher = Arc::new(RecordingPublisher::new());
        let pipeline = EventPipeline::new(Arc::clone(&publisher), "events.test".to_string());
        let spec = transfer_spec();

        pipeline.handle(&transfer_log(&spec.event, 1000), &spec).await;

        let sent = publisher.sent.lock().unwrap();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].1, "events.test");

        let message: serde_json::Value = serde_json::from_slice(&sent[0].0).unwrap();
        assert_eq!(message.get("event_name").unwrap(), "Transfer");
        assert_eq!(
            message
                .get("filter_arguments")
                .unwrap()
                .get("fromBlock")
                .unwrap(),
            "latest"
        );
        assert_eq!(
            message
                .get("event_data")
                .unwrap()
                .get("args")
                .unwrap()
                .get("value")
                .unwrap(),
            1000
        );
    }

    #[tokio::test]
    async fn publish_failure_does_not_block_subsequent_events() {
        let publisher = Arc::new(RecordingPublisher::new());
        let pipeline = EventPipeline::new(Arc::clone(&publisher), "events.test".to_string());
        let spec = transfer_spec();

        publisher.fail_next.store(true, Ordering::SeqCst);
        pipeline.handle(&transfer_log(&spec.event, 1), &spec).await;
        pipeline.handle(&transfer_log(&spec.event, 2), &spec).await;

        let sent = publisher.sent.lock().unwrap();
        assert_eq!(sent.len(), 1);
        let message: serde_json::Value = serde_json::from_slice(&sent[0].0).unwrap();
        assert_eq!(
            message
                .get("event_data")
                .unwrap()
                .get("args")
                .unwrap()
                .get("value")
                .unwrap(),
            2
        );
    }

    #[tokio::test]
    async fn undecodable_log_is_dropped_not_published() {
        let publisher = Arc::new(RecordingPublisher::new());
        let pipeline = EventPipeline::new(Arc::clone(&publisher), "events.test".to_string());
        let spec = transfer_spec();

        // Missing indexed topics: decode fails, nothing is published
        let bad_log = Log {
            inner: alloy::primitives::Log {
                address: Address::repeat_byte(0x11),
                data: LogData::new_unchecked(vec![spec.event.selector()], vec![0u8; 32].into()),
            },
            block_hash: None,
            block_number: None,
            block_timestamp: None,
            transaction_hash: None,
            transaction_index: None,
            log_index: None,
            removed: false,
        };
        pipeline.handle(&bad_log, &spec).await;

        assert!(publisher.sent.lock().unwrap().is_empty());
    }
}
