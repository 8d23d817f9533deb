//! Publisher loop.
//!
//! One cycle is `count` iterations of generate → serialize → log → send →
//! sleep against an already open sink. A failed send is logged and counted;
//! it never aborts the cycle and the reading is not retried.

use crate::sink::TelemetrySink;
use chrono::{DateTime, Utc};
use rand::rngs::StdRng;
use rand::Rng;
use std::time::Duration;
use telemetry_generator::ReadingGenerator;
use tokio::time::Instant;
use tracing::{debug, info, warn};

/// Default pause between sends.
pub const DEFAULT_DELAY: Duration = Duration::from_millis(2000);

/// Default number of messages per cycle.
pub const DEFAULT_NUM_MSGS: u64 = 100;

/// A send attempt that did not reach the sink.
#[derive(Debug, Clone)]
pub struct SendFailure {
    /// Zero-based position within the cycle
    pub index: u64,
    /// When the failure was observed
    pub at: DateTime<Utc>,
    /// Error text
    pub error: String,
}

/// Outcome of one publisher cycle.
#[derive(Debug, Clone, Default)]
pub struct CycleReport {
    /// Number of send attempts.
    pub attempted: u64,
    /// Sends the sink accepted.
    pub succeeded: u64,
    /// Sends that failed (including payloads that could not be encoded).
    pub failed: u64,
    /// Details for each failed attempt.
    pub failures: Vec<SendFailure>,
    /// Wall time of the cycle, delays included.
    pub duration: Duration,
}

impl CycleReport {
    /// Fraction of attempts the sink accepted.
    pub fn success_rate(&self) -> f64 {
        if self.attempted > 0 {
            self.succeeded as f64 / self.attempted as f64
        } else {
            0.0
        }
    }

    fn record_failure(&mut self, index: u64, error: String) {
        let at = Utc::now();
        warn!("{} > Send of message {} failed: {}", at.to_rfc3339(), index + 1, error);
        self.failed += 1;
        self.failures.push(SendFailure { index, at, error });
    }
}

/// Drives readings from a generator into a sink at a fixed cadence.
pub struct Publisher<R = StdRng> {
    generator: ReadingGenerator<R>,
    delay: Duration,
}

impl<R: Rng + Send> Publisher<R> {
    /// Create a publisher.
    ///
    /// # Arguments
    ///
    /// * `generator` - Source of readings
    /// * `delay` - Pause after every send attempt
    pub fn new(generator: ReadingGenerator<R>, delay: Duration) -> Self {
        Self { generator, delay }
    }

    pub fn delay(&self) -> Duration {
        self.delay
    }

    pub fn generator(&self) -> &ReadingGenerator<R> {
        &self.generator
    }

    /// Run one cycle of `count` send attempts against `sink`.
    ///
    /// The delay is applied after every attempt, failed or not, and after
    /// the last one, so a cycle always takes at least `count * delay`.
    pub async fn run_cycle<S>(&mut self, sink: &S, count: u64) -> CycleReport
    where
        S: TelemetrySink + ?Sized,
    {
        let start_time = Instant::now();
        let mut report = CycleReport::default();

        for (index, reading) in self.generator.readings(count).enumerate() {
            let index = index as u64;
            report.attempted += 1;

            match reading.to_json_string() {
                Ok(message) => {
                    info!("Sending message: {}", message);
                    match sink.send(message.as_bytes()).await {
                        Ok(()) => report.succeeded += 1,
                        Err(e) => report.record_failure(index, e.to_string()),
                    }
                }
                Err(e) => report.record_failure(index, e.to_string()),
            }

            tokio::time::sleep(self.delay).await;
        }

        report.duration = start_time.elapsed();

        info!("{} messages sent.", count);
        debug!(
            "{} readings generated since start",
            self.generator.produced()
        );
        if report.failed > 0 {
            warn!(
                "{} of {} sends failed this cycle ({:.1}% delivered)",
                report.failed,
                report.attempted,
                report.success_rate() * 100.0
            );
        }

        report
    }
}
