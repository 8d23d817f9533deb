//! telemetry-sim library
//!
//! Fabricates sensor readings for a small fleet of simulated devices and
//! publishes them, one at a time with a fixed delay, to an Event Hub (through
//! its Kafka-compatible endpoint) or a plain Kafka topic. It exists to give
//! downstream ingestion pipelines a reproducible load source.
//!
//! # Crates
//!
//! - `telemetry_generator` - parameter table, readings, JSON wire form
//! - `telemetry_publish_kafka` - sinks, publisher loop, restart supervision
//!
//! # CLI Usage
//!
//! ```bash
//! # Publish 100 readings every 2s, forever
//! EVENTHUB_CONNECTION_STRING="Endpoint=sb://...;EntityPath=telemetry" telemetry-sim
//!
//! # Local broker, deterministic data, three cycles
//! telemetry-sim --connection-string "Endpoint=kafka://localhost:9092;EntityPath=telemetry" \
//!   --seed 42 --max-cycles 3 --delay 250ms
//!
//! # Only log what would be sent
//! telemetry-sim --config telemetry.yaml --dry-run
//! ```

pub mod config;

use anyhow::Context;
use config::{Settings, SinkSettings};
use telemetry_generator::ReadingGenerator;
use telemetry_publish_kafka::{
    DryRunConnector, KafkaConnector, Publisher, SinkConnector, Supervisor, SupervisorSummary,
};

// Re-export the workspace crates for convenience
pub use telemetry_generator as generator;
pub use telemetry_publish_kafka as publish;

/// Run the generator against the sink described by `settings`.
///
/// Returns only when `max_cycles` is set and reached, or when the restart
/// policy gives up.
pub async fn run(settings: Settings) -> anyhow::Result<SupervisorSummary> {
    match &settings.sink {
        SinkSettings::Hub {
            descriptor,
            send_timeout,
        } => {
            let connector = KafkaConnector::new(descriptor.clone(), *send_timeout);
            run_with_connector(&settings, &connector).await
        }
        SinkSettings::DryRun { target } => {
            let connector = DryRunConnector::new(target.clone());
            run_with_connector(&settings, &connector).await
        }
    }
}

/// Run against an arbitrary connector.
pub async fn run_with_connector<C: SinkConnector>(
    settings: &Settings,
    connector: &C,
) -> anyhow::Result<SupervisorSummary> {
    let generator = match settings.seed {
        Some(seed) => ReadingGenerator::seeded(settings.parameters.clone(), seed),
        None => ReadingGenerator::from_entropy(settings.parameters.clone()),
    }
    .context("Failed to build reading generator")?;

    let mut publisher = Publisher::new(generator, settings.delay);
    let mut supervisor = Supervisor::new(settings.restart.clone(), settings.num_msgs)
        .with_max_cycles(settings.max_cycles);
    // A seeded run also replays the same restart delays
    if let Some(seed) = settings.seed {
        supervisor = supervisor.with_jitter_seed(seed);
    }

    let summary = supervisor
        .run(connector, &mut publisher)
        .await
        .context("Publishing stopped")?;

    Ok(summary)
}
