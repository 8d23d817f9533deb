//! Sink trait abstraction.
//!
//! The publisher and supervisor only see these traits, so tests and the
//! `--dry-run` mode can swap the Kafka producer for something local.

use crate::error::PublishError;
use async_trait::async_trait;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tracing::{debug, info};

/// An open connection to the ingestion endpoint.
///
/// `send` must complete (delivered or failed) before the publisher moves on
/// to the next reading.
#[async_trait]
pub trait TelemetrySink: Send + Sync {
    /// Publish one payload.
    async fn send(&self, payload: &[u8]) -> Result<(), PublishError>;

    /// Flush outstanding deliveries and release the connection.
    async fn close(&self) -> Result<(), PublishError>;
}

#[async_trait]
impl<T: TelemetrySink + ?Sized> TelemetrySink for Arc<T> {
    async fn send(&self, payload: &[u8]) -> Result<(), PublishError> {
        (**self).send(payload).await
    }

    async fn close(&self) -> Result<(), PublishError> {
        (**self).close().await
    }
}

/// Opens a fresh sink for each cycle.
#[async_trait]
pub trait SinkConnector: Send + Sync {
    type Sink: TelemetrySink;

    async fn open(&self) -> Result<Self::Sink, PublishError>;

    /// Human-readable target, secrets masked.
    fn describe(&self) -> String;
}

/// Connector for sinks that only log what they would have sent.
#[derive(Debug, Clone, Default)]
pub struct DryRunConnector {
    target: String,
}

impl DryRunConnector {
    pub fn new(target: impl Into<String>) -> Self {
        Self {
            target: target.into(),
        }
    }
}

#[async_trait]
impl SinkConnector for DryRunConnector {
    type Sink = DryRunSink;

    async fn open(&self) -> Result<Self::Sink, PublishError> {
        info!("Dry run: not connecting to {}", self.describe());
        Ok(DryRunSink::default())
    }

    fn describe(&self) -> String {
        if self.target.is_empty() {
            "dry-run sink".to_string()
        } else {
            format!("dry-run sink ({})", self.target)
        }
    }
}

/// Sink that accepts every payload and discards it.
#[derive(Debug, Default)]
pub struct DryRunSink {
    discarded: AtomicU64,
}

impl DryRunSink {
    pub fn discarded(&self) -> u64 {
        self.discarded.load(Ordering::Relaxed)
    }
}

#[async_trait]
impl TelemetrySink for DryRunSink {
    async fn send(&self, payload: &[u8]) -> Result<(), PublishError> {
        self.discarded.fetch_add(1, Ordering::Relaxed);
        debug!("Dry run: discarded {} byte payload", payload.len());
        Ok(())
    }

    async fn close(&self) -> Result<(), PublishError> {
        info!("Dry run: {} payloads discarded", self.discarded());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_dry_run_sink_counts_payloads() {
        let connector = DryRunConnector::new("telemetry");
        let sink = connector.open().await.unwrap();

        sink.send(b"{}").await.unwrap();
        sink.send(b"{}").await.unwrap();
        sink.close().await.unwrap();

        assert_eq!(sink.discarded(), 2);
        assert_eq!(connector.describe(), "dry-run sink (telemetry)");
    }
}
