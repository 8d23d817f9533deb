//! Publishing side of telemetry-sim.
//!
//! This crate drives the generate → serialize → send → sleep loop against a
//! streaming sink and supervises the outer open/run/close cycle. The real sink
//! is an rdkafka producer pointed at an Event Hubs namespace (through its
//! Kafka-compatible endpoint) or at a plain Kafka broker.
//!
//! # Architecture
//!
//! ```text
//!   Supervisor (RestartPolicy)
//!        │  open / close per cycle
//!        ▼
//! ┌─────────────────┐      ┌──────────────────┐
//! │ SinkConnector   │─────▶│  TelemetrySink   │
//! │ (Kafka/DryRun)  │      │  send / close    │
//! └─────────────────┘      └────────▲─────────┘
//!                                   │ payload bytes
//!                          ┌────────┴─────────┐
//!                          │    Publisher     │
//!                          │ ReadingGenerator │
//!                          │ + fixed delay    │
//!                          └────────┬─────────┘
//!                                   ▼
//!                              CycleReport
//! ```
//!
//! # Example
//!
//! ```rust,ignore
//! use std::time::Duration;
//! use telemetry_generator::{ParameterTable, ReadingGenerator};
//! use telemetry_publish_kafka::{HubDescriptor, KafkaConnector, Publisher, RestartPolicy, Supervisor};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let descriptor: HubDescriptor = std::env::var("EVENTHUB_CONNECTION_STRING")?.parse()?;
//!     let connector = KafkaConnector::new(descriptor, Duration::from_secs(30));
//!
//!     let generator = ReadingGenerator::from_entropy(ParameterTable::default())?;
//!     let mut publisher = Publisher::new(generator, Duration::from_millis(2000));
//!
//!     let mut supervisor = Supervisor::new(RestartPolicy::default(), 100);
//!     supervisor.run(&connector, &mut publisher).await?;
//!     Ok(())
//! }
//! ```

pub mod args;
pub mod descriptor;
pub mod error;
pub mod kafka;
pub mod publisher;
pub mod sink;
pub mod supervisor;
pub mod testing;

// Re-exports for convenience
pub use args::PublishArgs;
pub use descriptor::{HubDescriptor, Transport};
pub use error::{PublishError, SupervisorError};
pub use kafka::{KafkaConnector, KafkaSink, DEFAULT_SEND_TIMEOUT};
pub use publisher::{CycleReport, Publisher, SendFailure};
pub use sink::{DryRunConnector, DryRunSink, SinkConnector, TelemetrySink};
pub use supervisor::{RestartPolicy, Supervisor, SupervisorSummary};
