//! Error types for the publisher.

use telemetry_generator::GeneratorError;
use thiserror::Error;

/// Errors raised while talking to a sink or building its client.
#[derive(Error, Debug)]
pub enum PublishError {
    #[error("Kafka error: {0}")]
    Kafka(#[from] rdkafka::error::KafkaError),

    #[error("Invalid hub descriptor: {0}")]
    InvalidDescriptor(String),

    #[error("Send failed: {0}")]
    Send(String),

    #[error("Close failed: {0}")]
    Close(String),

    #[error("Generator error: {0}")]
    Generator(#[from] GeneratorError),
}

/// Errors that end a supervised run.
#[derive(Error, Debug)]
pub enum SupervisorError {
    #[error("Invalid restart policy: {0}")]
    InvalidPolicy(String),

    #[error("Giving up after {failures} consecutive cycle failures: {last_error}")]
    RestartLimitExceeded {
        failures: u32,
        #[source]
        last_error: PublishError,
    },
}
