//! rdkafka-backed sink.
//!
//! Event Hubs speaks the Kafka protocol on port 9093, so the same producer
//! serves both a real hub and a local broker.

use crate::descriptor::HubDescriptor;
use crate::error::PublishError;
use crate::sink::{SinkConnector, TelemetrySink};
use async_trait::async_trait;
use rdkafka::producer::{FutureProducer, FutureRecord, Producer};
use rdkafka::ClientConfig;
use std::time::Duration;
use tracing::{debug, info};

/// Default time a single send may wait for delivery.
pub const DEFAULT_SEND_TIMEOUT: Duration = Duration::from_secs(30);

/// Opens a new `FutureProducer` per cycle.
#[derive(Debug, Clone)]
pub struct KafkaConnector {
    descriptor: HubDescriptor,
    send_timeout: Duration,
}

impl KafkaConnector {
    /// Create a connector.
    ///
    /// # Arguments
    ///
    /// * `descriptor` - Endpoint, credentials and entity path
    /// * `send_timeout` - Upper bound on a single delivery
    pub fn new(descriptor: HubDescriptor, send_timeout: Duration) -> Self {
        Self {
            descriptor,
            send_timeout,
        }
    }

    /// Producer configuration: endpoint settings plus delivery bounds.
    ///
    /// Messages go out one at a time, so lingering only adds latency.
    pub fn producer_config(&self) -> ClientConfig {
        let mut config = self.descriptor.client_config();
        config
            .set(
                "message.timeout.ms",
                self.send_timeout.as_millis().to_string(),
            )
            .set("linger.ms", "0")
            .set("client.id", "telemetry-sim");
        config
    }
}

#[async_trait]
impl SinkConnector for KafkaConnector {
    type Sink = KafkaSink;

    async fn open(&self) -> Result<Self::Sink, PublishError> {
        let producer: FutureProducer = self
            .producer_config()
            .create()
            .map_err(PublishError::Kafka)?;

        info!("Opened producer for {}", self.descriptor);

        Ok(KafkaSink {
            producer,
            topic: self.descriptor.topic().to_string(),
            send_timeout: self.send_timeout,
        })
    }

    fn describe(&self) -> String {
        self.descriptor.to_string()
    }
}

/// One producer connection to the hub.
pub struct KafkaSink {
    producer: FutureProducer,
    topic: String,
    send_timeout: Duration,
}

impl KafkaSink {
    pub fn topic(&self) -> &str {
        &self.topic
    }
}

#[async_trait]
impl TelemetrySink for KafkaSink {
    async fn send(&self, payload: &[u8]) -> Result<(), PublishError> {
        let record = FutureRecord::<(), [u8]>::to(&self.topic).payload(payload);

        self.producer
            .send(record, self.send_timeout)
            .await
            .map(|_| ())
            .map_err(|(err, _)| PublishError::Kafka(err))
    }

    async fn close(&self) -> Result<(), PublishError> {
        let producer = self.producer.clone();
        let timeout = self.send_timeout;

        // flush blocks the calling thread until the queue drains
        tokio::task::spawn_blocking(move || producer.flush(timeout))
            .await
            .map_err(|e| PublishError::Close(e.to_string()))?
            .map_err(PublishError::Kafka)?;

        debug!("Flushed producer for topic '{}'", self.topic);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_producer_config_carries_timeout_and_sasl() {
        let descriptor: HubDescriptor = "Endpoint=sb://ns.servicebus.windows.net/;SharedAccessKeyName=send;SharedAccessKey=secret;EntityPath=readings"
            .parse()
            .unwrap();
        let connector = KafkaConnector::new(descriptor, Duration::from_secs(5));
        let config = connector.producer_config();

        assert_eq!(config.get("message.timeout.ms"), Some("5000"));
        assert_eq!(config.get("security.protocol"), Some("SASL_SSL"));
        assert_eq!(config.get("linger.ms"), Some("0"));
        assert!(!connector.describe().contains("secret"));
    }

    #[tokio::test]
    async fn test_open_plaintext_producer_without_broker() {
        // librdkafka connects lazily, so creating the producer needs no broker
        let descriptor: HubDescriptor = "Endpoint=kafka://127.0.0.1:1;EntityPath=readings"
            .parse()
            .unwrap();
        let connector = KafkaConnector::new(descriptor, Duration::from_millis(100));
        let sink = connector.open().await.unwrap();
        assert_eq!(sink.topic(), "readings");
    }
}
