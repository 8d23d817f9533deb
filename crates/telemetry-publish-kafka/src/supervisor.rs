//! Outer open → publish → close loop with a restart policy.
//!
//! Send failures never reach this layer; the publisher absorbs them. What
//! does reach it are failures to open or close the sink. Those back off
//! exponentially (with jitter) and, past `max_consecutive_failures`, end the
//! run with an error so an external process supervisor can take over.

use crate::error::{PublishError, SupervisorError};
use crate::publisher::{CycleReport, Publisher};
use crate::sink::{SinkConnector, TelemetrySink};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::time::Duration;
use tracing::{debug, error, info, warn};

/// Backoff settings for sink open/close failures.
#[derive(Debug, Clone, PartialEq)]
pub struct RestartPolicy {
    /// Delay after the first failure
    pub initial_backoff: Duration,
    /// Ceiling for any single delay
    pub max_backoff: Duration,
    /// Growth factor per consecutive failure
    pub multiplier: f64,
    /// Random spread as a fraction of the delay, in `[0, 1]`
    pub jitter: f64,
    /// Give up after this many consecutive failures (`None` = never)
    pub max_consecutive_failures: Option<u32>,
}

impl Default for RestartPolicy {
    fn default() -> Self {
        Self {
            initial_backoff: Duration::from_secs(1),
            max_backoff: Duration::from_secs(60),
            multiplier: 2.0,
            jitter: 0.2,
            max_consecutive_failures: Some(10),
        }
    }
}

impl RestartPolicy {
    pub fn validate(&self) -> Result<(), SupervisorError> {
        if self.initial_backoff.is_zero() {
            return Err(SupervisorError::InvalidPolicy(
                "initial_backoff must be greater than zero".to_string(),
            ));
        }
        if self.initial_backoff > self.max_backoff {
            return Err(SupervisorError::InvalidPolicy(format!(
                "initial_backoff ({:?}) exceeds max_backoff ({:?})",
                self.initial_backoff, self.max_backoff
            )));
        }
        if !self.multiplier.is_finite() || self.multiplier < 1.0 {
            return Err(SupervisorError::InvalidPolicy(format!(
                "multiplier must be >= 1.0, got {}",
                self.multiplier
            )));
        }
        if !(0.0..=1.0).contains(&self.jitter) {
            return Err(SupervisorError::InvalidPolicy(format!(
                "jitter must be within [0, 1], got {}",
                self.jitter
            )));
        }
        Ok(())
    }

    /// Whether another restart is allowed after `failures` consecutive failures.
    pub fn allows(&self, failures: u32) -> bool {
        self.max_consecutive_failures
            .map_or(true, |max| failures <= max)
    }

    /// Delay before retrying after the `failures`-th consecutive failure,
    /// without jitter.
    pub fn base_backoff(&self, failures: u32) -> Duration {
        let exponent = failures.saturating_sub(1).min(i32::MAX as u32) as i32;
        let secs = self.initial_backoff.as_secs_f64() * self.multiplier.powi(exponent);
        self.cap(secs)
    }

    /// Delay with up to `±jitter` proportional spread, capped at `max_backoff`.
    pub fn backoff<R: Rng>(&self, failures: u32, rng: &mut R) -> Duration {
        let base = self.base_backoff(failures);
        if self.jitter <= 0.0 || base.is_zero() {
            return base;
        }

        let base = base.as_secs_f64();
        let spread = base * self.jitter;
        self.cap(base + rng.gen_range(-spread..=spread))
    }

    // Overflowing or non-finite values saturate at max_backoff
    fn cap(&self, secs: f64) -> Duration {
        Duration::try_from_secs_f64(secs.max(0.0))
            .map_or(self.max_backoff, |delay| delay.min(self.max_backoff))
    }
}

/// Totals over a supervised run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SupervisorSummary {
    /// Cycles that opened, published and closed cleanly.
    pub cycles_completed: u64,
    /// Cycles whose open or close failed.
    pub cycles_failed: u64,
    /// Send attempts across all cycles.
    pub messages_attempted: u64,
    /// Sends the sink accepted across all cycles.
    pub messages_succeeded: u64,
    /// Failed sends across all cycles.
    pub messages_failed: u64,
}

impl SupervisorSummary {
    fn absorb(&mut self, report: &CycleReport) {
        self.messages_attempted += report.attempted;
        self.messages_succeeded += report.succeeded;
        self.messages_failed += report.failed;
    }

    pub fn cycles_started(&self) -> u64 {
        self.cycles_completed + self.cycles_failed
    }
}

/// Runs publisher cycles, reopening the sink each time.
pub struct Supervisor {
    policy: RestartPolicy,
    num_msgs: u64,
    max_cycles: Option<u64>,
    rng: StdRng,
}

impl Supervisor {
    /// Create a supervisor that publishes `num_msgs` per cycle, forever.
    pub fn new(policy: RestartPolicy, num_msgs: u64) -> Self {
        Self {
            policy,
            num_msgs,
            max_cycles: None,
            rng: StdRng::from_entropy(),
        }
    }

    /// Stop after this many completed cycles.
    ///
    /// Failed cycles do not count; they are retried under the restart policy.
    pub fn with_max_cycles(mut self, max_cycles: Option<u64>) -> Self {
        self.max_cycles = max_cycles;
        self
    }

    /// Seed the jitter source.
    pub fn with_jitter_seed(mut self, seed: u64) -> Self {
        self.rng = StdRng::seed_from_u64(seed);
        self
    }

    /// Run cycles until `max_cycles` cycles have completed or the restart
    /// limit is hit.
    ///
    /// Without `max_cycles` this only returns on error.
    pub async fn run<C, R>(
        &mut self,
        connector: &C,
        publisher: &mut Publisher<R>,
    ) -> Result<SupervisorSummary, SupervisorError>
    where
        C: SinkConnector,
        R: Rng + Send,
    {
        self.policy.validate()?;

        let mut summary = SupervisorSummary::default();
        let mut consecutive_failures = 0u32;

        info!(
            "Publishing {} messages per cycle to {} (delay {:?})",
            self.num_msgs,
            connector.describe(),
            publisher.delay()
        );

        loop {
            if let Some(max) = self.max_cycles {
                if summary.cycles_completed >= max {
                    info!(
                        "Stopping after {} completed cycles: {} messages attempted, {} succeeded",
                        summary.cycles_completed,
                        summary.messages_attempted,
                        summary.messages_succeeded
                    );
                    return Ok(summary);
                }
            }

            let cycle = summary.cycles_started() + 1;
            debug!("Starting cycle {}", cycle);

            match self.run_once(connector, publisher, &mut summary).await {
                Ok(()) => {
                    consecutive_failures = 0;
                    summary.cycles_completed += 1;
                }
                Err(err) => {
                    consecutive_failures = consecutive_failures.saturating_add(1);
                    summary.cycles_failed += 1;
                    error!("Cycle {} failed: {}", cycle, err);

                    if !self.policy.allows(consecutive_failures) {
                        return Err(SupervisorError::RestartLimitExceeded {
                            failures: consecutive_failures,
                            last_error: err,
                        });
                    }

                    let delay = self.policy.backoff(consecutive_failures, &mut self.rng);
                    warn!(
                        "Restarting in {:?} (consecutive failure {})",
                        delay, consecutive_failures
                    );
                    tokio::time::sleep(delay).await;
                }
            }
        }
    }

    /// Open a sink, publish one cycle, close the sink.
    ///
    /// Messages published before a failing close still count in `summary`.
    async fn run_once<C, R>(
        &self,
        connector: &C,
        publisher: &mut Publisher<R>,
        summary: &mut SupervisorSummary,
    ) -> Result<(), PublishError>
    where
        C: SinkConnector,
        R: Rng + Send,
    {
        let sink = connector.open().await?;
        let report = publisher.run_cycle(&sink, self.num_msgs).await;
        summary.absorb(&report);
        sink.close().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::ScriptedConnector;
    use telemetry_generator::{ParameterTable, ReadingGenerator};
    use tokio::time::Instant;

    fn publisher(delay: Duration) -> Publisher {
        let generator = ReadingGenerator::seeded(ParameterTable::default(), 42).unwrap();
        Publisher::new(generator, delay)
    }

    fn no_jitter(max_failures: Option<u32>) -> RestartPolicy {
        RestartPolicy {
            initial_backoff: Duration::from_secs(1),
            max_backoff: Duration::from_secs(8),
            multiplier: 2.0,
            jitter: 0.0,
            max_consecutive_failures: max_failures,
        }
    }

    #[test]
    fn test_backoff_doubles_and_caps() {
        let policy = no_jitter(None);
        let secs: Vec<u64> = (1..=6).map(|n| policy.base_backoff(n).as_secs()).collect();
        assert_eq!(secs, vec![1, 2, 4, 8, 8, 8]);
    }

    #[test]
    fn test_backoff_survives_huge_failure_counts() {
        let policy = no_jitter(None);
        assert_eq!(policy.base_backoff(u32::MAX), Duration::from_secs(8));
    }

    #[test]
    fn test_backoff_saturates_at_huge_max_backoff() {
        let policy = RestartPolicy {
            max_backoff: Duration::from_secs(u64::MAX),
            jitter: 0.5,
            ..no_jitter(None)
        };
        assert!(policy.validate().is_ok());

        assert_eq!(policy.base_backoff(1), Duration::from_secs(1));
        assert_eq!(policy.base_backoff(100), policy.max_backoff);

        let mut rng = StdRng::seed_from_u64(3);
        for failures in [1, 64, 100, u32::MAX] {
            assert!(policy.backoff(failures, &mut rng) <= policy.max_backoff);
        }
    }

    #[test]
    fn test_jitter_stays_within_bounds() {
        let policy = RestartPolicy {
            jitter: 0.5,
            ..no_jitter(None)
        };
        let mut rng = StdRng::seed_from_u64(42);

        for _ in 0..500 {
            let delay = policy.backoff(2, &mut rng).as_secs_f64();
            assert!((1.0..=3.0).contains(&delay), "{delay}");
        }
        for _ in 0..500 {
            let delay = policy.backoff(10, &mut rng);
            assert!(delay <= policy.max_backoff);
        }
    }

    #[test]
    fn test_allows_respects_ceiling() {
        let policy = no_jitter(Some(2));
        assert!(policy.allows(1));
        assert!(policy.allows(2));
        assert!(!policy.allows(3));
        assert!(no_jitter(None).allows(u32::MAX));
    }

    #[test]
    fn test_invalid_policies_rejected() {
        let shrinking = RestartPolicy {
            multiplier: 0.5,
            ..RestartPolicy::default()
        };
        assert!(shrinking.validate().is_err());

        let inverted = RestartPolicy {
            initial_backoff: Duration::from_secs(120),
            ..RestartPolicy::default()
        };
        assert!(inverted.validate().is_err());

        let wild = RestartPolicy {
            jitter: 1.5,
            ..RestartPolicy::default()
        };
        assert!(wild.validate().is_err());

        let spinning = RestartPolicy {
            initial_backoff: Duration::ZERO,
            ..RestartPolicy::default()
        };
        assert!(spinning.validate().is_err());

        assert!(RestartPolicy::default().validate().is_ok());
    }

    #[tokio::test(start_paused = true)]
    async fn test_bounded_run_reopens_sink_each_cycle() {
        let connector = ScriptedConnector::new();
        let mut publisher = publisher(Duration::from_millis(10));
        let mut supervisor = Supervisor::new(no_jitter(Some(3)), 4).with_max_cycles(Some(3));

        let summary = supervisor.run(&connector, &mut publisher).await.unwrap();

        assert_eq!(summary.cycles_completed, 3);
        assert_eq!(summary.cycles_failed, 0);
        assert_eq!(summary.messages_attempted, 12);
        assert_eq!(summary.messages_succeeded, 12);
        assert_eq!(connector.open_calls(), 3);

        let sinks = connector.opened();
        assert_eq!(sinks.len(), 3);
        for sink in sinks {
            assert_eq!(sink.send_calls(), 4);
            assert_eq!(sink.close_calls(), 1);
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_open_failures_back_off_then_recover() {
        let connector = ScriptedConnector::new().failing_opens(2);
        let mut publisher = publisher(Duration::from_millis(10));
        let mut supervisor = Supervisor::new(no_jitter(Some(5)), 2).with_max_cycles(Some(1));

        let start = Instant::now();
        let summary = supervisor.run(&connector, &mut publisher).await.unwrap();
        let elapsed = start.elapsed();

        assert_eq!(summary.cycles_failed, 2);
        assert_eq!(summary.cycles_completed, 1);
        assert_eq!(summary.messages_attempted, 2);

        // 1s + 2s of backoff plus two 10ms sends
        let expected = Duration::from_millis(3020);
        assert!(elapsed >= expected, "{elapsed:?}");
        assert!(elapsed < expected + Duration::from_millis(50), "{elapsed:?}");
    }

    #[tokio::test(start_paused = true)]
    async fn test_gives_up_after_ceiling() {
        let connector = ScriptedConnector::new().failing_opens(u32::MAX);
        let mut publisher = publisher(Duration::from_millis(10));
        let mut supervisor = Supervisor::new(no_jitter(Some(2)), 5);

        let err = supervisor.run(&connector, &mut publisher).await.unwrap_err();

        match err {
            SupervisorError::RestartLimitExceeded { failures, .. } => assert_eq!(failures, 3),
            other => panic!("unexpected error: {other}"),
        }
        assert_eq!(connector.open_calls(), 3);
        assert_eq!(publisher.generator().produced(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_close_failures_restart_and_keep_sent_messages() {
        let connector = ScriptedConnector::new().failing_close();
        let mut publisher = publisher(Duration::from_millis(10));
        let mut supervisor = Supervisor::new(no_jitter(Some(1)), 3).with_max_cycles(Some(2));

        let err = supervisor.run(&connector, &mut publisher).await.unwrap_err();

        assert!(matches!(
            err,
            SupervisorError::RestartLimitExceeded { failures: 2, .. }
        ));
        // Both cycles delivered their messages before the close failed
        assert_eq!(publisher.generator().produced(), 6);
        for sink in connector.opened() {
            assert_eq!(sink.payloads().len(), 3);
            assert_eq!(sink.close_calls(), 1);
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_failed_cycles_do_not_satisfy_max_cycles() {
        let connector = ScriptedConnector::new().failing_opens(u32::MAX);
        let mut publisher = publisher(Duration::from_millis(10));
        let policy = RestartPolicy {
            initial_backoff: Duration::from_secs(30),
            max_backoff: Duration::from_secs(60),
            ..no_jitter(Some(1))
        };
        let mut supervisor = Supervisor::new(policy, 5).with_max_cycles(Some(1));

        let start = Instant::now();
        let err = supervisor.run(&connector, &mut publisher).await.unwrap_err();

        assert!(matches!(
            err,
            SupervisorError::RestartLimitExceeded { failures: 2, .. }
        ));
        assert_eq!(connector.open_calls(), 2);
        // One backoff between the two attempts, none after the last
        let elapsed = start.elapsed();
        assert!(elapsed >= Duration::from_secs(30), "{elapsed:?}");
        assert!(elapsed < Duration::from_millis(30_050), "{elapsed:?}");
    }

    #[tokio::test(start_paused = true)]
    async fn test_bounded_run_retries_until_a_cycle_completes() {
        let connector = ScriptedConnector::new().failing_opens(3);
        let mut publisher = publisher(Duration::from_millis(10));
        let mut supervisor = Supervisor::new(no_jitter(None), 1).with_max_cycles(Some(1));

        let summary = supervisor.run(&connector, &mut publisher).await.unwrap();

        assert_eq!(summary.cycles_failed, 3);
        assert_eq!(summary.cycles_completed, 1);
        assert_eq!(summary.cycles_started(), 4);
        assert_eq!(connector.open_calls(), 4);
    }

    #[tokio::test(start_paused = true)]
    async fn test_jitter_seed_makes_restart_timing_repeatable() {
        let policy = RestartPolicy {
            jitter: 0.5,
            ..no_jitter(None)
        };

        let mut elapsed = Vec::new();
        for _ in 0..2 {
            let connector = ScriptedConnector::new().failing_opens(3);
            let mut publisher = publisher(Duration::from_millis(10));
            let mut supervisor = Supervisor::new(policy.clone(), 1)
                .with_max_cycles(Some(1))
                .with_jitter_seed(9);

            let start = Instant::now();
            supervisor.run(&connector, &mut publisher).await.unwrap();
            elapsed.push(start.elapsed());
        }

        assert_eq!(elapsed[0], elapsed[1]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_send_failures_do_not_trigger_restarts() {
        let connector = ScriptedConnector::new().failing_sends();
        let mut publisher = publisher(Duration::from_millis(10));
        let mut supervisor = Supervisor::new(no_jitter(Some(0)), 5).with_max_cycles(Some(2));

        let summary = supervisor.run(&connector, &mut publisher).await.unwrap();

        assert_eq!(summary.cycles_completed, 2);
        assert_eq!(summary.cycles_failed, 0);
        assert_eq!(summary.messages_failed, 10);
        assert_eq!(summary.messages_succeeded, 0);
    }
}
