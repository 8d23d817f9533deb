//! Command-line interface for telemetry-sim
//!
//! # Usage Examples
//!
//! ## Event Hubs
//! ```bash
//! export EVENTHUB_CONNECTION_STRING="Endpoint=sb://myhub.servicebus.windows.net/;SharedAccessKeyName=send;SharedAccessKey=...;EntityPath=telemetry"
//! telemetry-sim --num-msgs 100 --delay 2000
//! ```
//!
//! ## Local Kafka, bounded run
//! ```bash
//! telemetry-sim \
//!   --connection-string "Endpoint=kafka://localhost:9092;EntityPath=telemetry" \
//!   --seed 42 --max-cycles 2
//! ```
//!
//! ## Config file
//! ```bash
//! telemetry-sim --config telemetry.yaml
//! ```
//!
//! Log verbosity follows `RUST_LOG` (default `info`).

use clap::Parser;
use std::path::PathBuf;
use telemetry_publish_kafka::PublishArgs;
use telemetry_sim::config::{FileConfig, Settings};
use tracing::info;

#[derive(Parser)]
#[command(name = "telemetry-sim")]
#[command(about = "Publish synthetic sensor readings to an Event Hub or Kafka topic")]
#[command(long_about = None)]
struct Cli {
    /// Path to a YAML config file
    #[arg(long, short = 'c', env = "TELEMETRY_SIM_CONFIG")]
    config: Option<PathBuf>,

    #[command(flatten)]
    publish: PublishArgs,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    if let Err(e) = run().await {
        eprintln!("Error: {e:#}");
        std::process::exit(1);
    }
    Ok(())
}

async fn run() -> anyhow::Result<()> {
    // Initialize tracing
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let cli = Cli::parse();

    let file = match &cli.config {
        Some(path) => FileConfig::from_file(path)?,
        None => FileConfig::default(),
    };
    let settings = Settings::resolve(file, &cli.publish)?;

    let summary = telemetry_sim::run(settings).await?;

    info!(
        "Finished {} cycles ({} failed): {} of {} messages sent",
        summary.cycles_started(),
        summary.cycles_failed,
        summary.messages_succeeded,
        summary.messages_attempted
    );

    Ok(())
}
