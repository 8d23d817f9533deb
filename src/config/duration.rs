//! Duration parsing utilities.

use anyhow::Context;
use serde::Deserialize;
use std::time::Duration;

/// Parse a duration string like "1h", "30m", "300s", "250ms" or a bare number.
///
/// Supports:
/// - Bare numbers, multiplied by `bare_unit`: "300"
/// - Milliseconds suffix: "250ms"
/// - Seconds suffix: "300s"
/// - Minutes suffix: "30m"
/// - Hours suffix: "1h"
pub fn parse_duration(s: &str, bare_unit: Duration) -> anyhow::Result<Duration> {
    let s = s.trim();
    if s.is_empty() {
        anyhow::bail!("Empty duration string");
    }

    // "ms" has to be checked before "m" and "s"
    if let Some(num_str) = s.strip_suffix("ms") {
        let millis: u64 = num_str
            .trim()
            .parse()
            .with_context(|| format!("Invalid milliseconds value: {num_str}"))?;
        return Ok(Duration::from_millis(millis));
    }
    if let Some(num_str) = s.strip_suffix('h') {
        let hours: u64 = num_str
            .trim()
            .parse()
            .with_context(|| format!("Invalid hours value: {num_str}"))?;
        let secs = hours
            .checked_mul(3600)
            .with_context(|| format!("Hours value out of range: {num_str}"))?;
        return Ok(Duration::from_secs(secs));
    }
    if let Some(num_str) = s.strip_suffix('m') {
        let minutes: u64 = num_str
            .trim()
            .parse()
            .with_context(|| format!("Invalid minutes value: {num_str}"))?;
        let secs = minutes
            .checked_mul(60)
            .with_context(|| format!("Minutes value out of range: {num_str}"))?;
        return Ok(Duration::from_secs(secs));
    }
    if let Some(num_str) = s.strip_suffix('s') {
        let secs: u64 = num_str
            .trim()
            .parse()
            .with_context(|| format!("Invalid seconds value: {num_str}"))?;
        return Ok(Duration::from_secs(secs));
    }

    let count: u32 = s
        .parse()
        .with_context(|| format!("Invalid duration value: {s}"))?;
    Ok(bare_unit * count)
}

/// Bare numbers are milliseconds (used for the send delay).
pub fn parse_millis(s: &str) -> anyhow::Result<Duration> {
    parse_duration(s, Duration::from_millis(1))
}

/// A duration as written in the YAML config: `2000` or `"2s"`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum DurationValue {
    Number(u32),
    Text(String),
}

impl DurationValue {
    pub fn to_duration(&self, bare_unit: Duration) -> anyhow::Result<Duration> {
        match self {
            DurationValue::Number(n) => Ok(bare_unit * *n),
            DurationValue::Text(s) => parse_duration(s, bare_unit),
        }
    }
}
