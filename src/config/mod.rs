//! Configuration loading.
//!
//! Settings come from three layers, later ones winning: built-in defaults,
//! an optional YAML file, then CLI flags / environment variables.

pub mod duration;

use anyhow::Context;
use duration::{parse_millis, DurationValue};
use serde::Deserialize;
use std::fs;
use std::path::Path;
use std::time::Duration;
use telemetry_generator::ParameterTable;
use telemetry_publish_kafka::publisher::{DEFAULT_DELAY, DEFAULT_NUM_MSGS};
use telemetry_publish_kafka::{HubDescriptor, PublishArgs, RestartPolicy, DEFAULT_SEND_TIMEOUT};

const MILLIS: Duration = Duration::from_millis(1);
const SECS: Duration = Duration::from_secs(1);

/// Contents of the YAML config file. Every section is optional.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FileConfig {
    #[serde(default)]
    pub hub: HubSection,

    /// Device/tag/range table; the built-in table when absent
    #[serde(default)]
    pub parameters: Option<ParameterTable>,

    #[serde(default)]
    pub run: RunSection,

    #[serde(default)]
    pub restart: RestartSection,
}

/// Sink descriptor, either as one connection string or as discrete fields.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct HubSection {
    pub connection_string: Option<String>,
    pub endpoint: Option<String>,
    pub key_name: Option<String>,
    pub key: Option<String>,
    pub entity_path: Option<String>,
    /// Bare numbers are seconds
    pub send_timeout: Option<DurationValue>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RunSection {
    pub num_msgs: Option<u64>,
    /// Bare numbers are milliseconds
    pub delay: Option<DurationValue>,
    pub seed: Option<u64>,
    pub max_cycles: Option<u64>,
}

/// Restart policy overrides; bare numbers are seconds.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RestartSection {
    pub initial_backoff: Option<DurationValue>,
    pub max_backoff: Option<DurationValue>,
    pub multiplier: Option<f64>,
    pub jitter: Option<f64>,
    /// `0` is valid and means "never restart"; omit the key for the default
    pub max_consecutive_failures: Option<u32>,
    /// Retry forever; overrides `max_consecutive_failures`
    #[serde(default)]
    pub unlimited: bool,
}

impl FileConfig {
    /// Load config from a YAML file.
    pub fn from_file<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        Self::from_yaml(&content)
            .with_context(|| format!("Failed to parse config file {}", path.display()))
    }

    /// Parse config from a YAML string.
    pub fn from_yaml(yaml: &str) -> anyhow::Result<Self> {
        // An empty file is a valid, all-defaults config
        if yaml.trim().is_empty() {
            return Ok(Self::default());
        }
        Ok(serde_yaml::from_str(yaml)?)
    }
}

impl HubSection {
    fn descriptor(&self) -> anyhow::Result<Option<HubDescriptor>> {
        if let Some(conn) = &self.connection_string {
            let descriptor = conn
                .parse::<HubDescriptor>()
                .context("Invalid hub.connection_string in config file")?;
            return Ok(Some(descriptor));
        }

        match (&self.endpoint, &self.entity_path) {
            (Some(endpoint), Some(entity_path)) => Ok(Some(
                HubDescriptor::from_parts(
                    endpoint.clone(),
                    self.key_name.clone(),
                    self.key.clone(),
                    entity_path.clone(),
                )
                .context("Invalid hub section in config file")?,
            )),
            (None, None) => Ok(None),
            _ => anyhow::bail!("hub.endpoint and hub.entity_path must be given together"),
        }
    }
}

/// Where payloads go.
#[derive(Debug, Clone)]
pub enum SinkSettings {
    /// Publish through rdkafka
    Hub {
        descriptor: HubDescriptor,
        send_timeout: Duration,
    },
    /// Log payloads only
    DryRun { target: String },
}

/// Fully resolved run settings.
#[derive(Debug, Clone)]
pub struct Settings {
    pub sink: SinkSettings,
    pub parameters: ParameterTable,
    pub num_msgs: u64,
    pub delay: Duration,
    pub seed: Option<u64>,
    pub max_cycles: Option<u64>,
    pub restart: RestartPolicy,
}

impl Settings {
    /// Merge the config file with CLI arguments and validate the result.
    pub fn resolve(file: FileConfig, args: &PublishArgs) -> anyhow::Result<Self> {
        let descriptor = match &args.connection_string {
            Some(conn) => Some(
                conn.parse::<HubDescriptor>()
                    .context("Invalid --connection-string / EVENTHUB_CONNECTION_STRING")?,
            ),
            None => file.hub.descriptor()?,
        };

        let send_timeout = match &file.hub.send_timeout {
            Some(value) => value
                .to_duration(SECS)
                .context("Invalid hub.send_timeout")?,
            None => DEFAULT_SEND_TIMEOUT,
        };

        let sink = if args.dry_run {
            SinkSettings::DryRun {
                target: descriptor.map(|d| d.to_string()).unwrap_or_default(),
            }
        } else {
            let descriptor = descriptor.ok_or_else(|| {
                anyhow::anyhow!(
                    "No hub configured: pass --connection-string, set EVENTHUB_CONNECTION_STRING, \
                     add a hub section to the config file, or use --dry-run"
                )
            })?;
            SinkSettings::Hub {
                descriptor,
                send_timeout,
            }
        };

        let parameters = file.parameters.unwrap_or_default();
        parameters
            .validate()
            .context("Invalid parameters section")?;

        let delay = match (&args.delay, &file.run.delay) {
            (Some(cli), _) => parse_millis(cli).context("Invalid --delay")?,
            (None, Some(value)) => value.to_duration(MILLIS).context("Invalid run.delay")?,
            (None, None) => DEFAULT_DELAY,
        };

        let restart = resolve_restart(&file.restart)?;
        restart
            .validate()
            .context("Invalid restart section")?;

        Ok(Self {
            sink,
            parameters,
            num_msgs: args
                .num_msgs
                .or(file.run.num_msgs)
                .unwrap_or(DEFAULT_NUM_MSGS),
            delay,
            seed: args.seed.or(file.run.seed),
            max_cycles: args.max_cycles.or(file.run.max_cycles),
            restart,
        })
    }
}

fn resolve_restart(section: &RestartSection) -> anyhow::Result<RestartPolicy> {
    let defaults = RestartPolicy::default();

    let initial_backoff = match &section.initial_backoff {
        Some(value) => value
            .to_duration(SECS)
            .context("Invalid restart.initial_backoff")?,
        None => defaults.initial_backoff,
    };
    let max_backoff = match &section.max_backoff {
        Some(value) => value
            .to_duration(SECS)
            .context("Invalid restart.max_backoff")?,
        None => defaults.max_backoff,
    };
    let max_consecutive_failures = if section.unlimited {
        None
    } else {
        section
            .max_consecutive_failures
            .or(defaults.max_consecutive_failures)
    };

    Ok(RestartPolicy {
        initial_backoff,
        max_backoff,
        multiplier: section.multiplier.unwrap_or(defaults.multiplier),
        jitter: section.jitter.unwrap_or(defaults.jitter),
        max_consecutive_failures,
    })
}
