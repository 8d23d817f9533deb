//! CLI argument definitions for the publisher.
//!
//! Every field is optional so values left unset fall through to the config
//! file and then to built-in defaults.

use clap::Args;

/// Sink and cadence arguments.
#[derive(Args, Clone, Debug, Default)]
pub struct PublishArgs {
    /// Event Hubs connection string
    /// (Endpoint=sb://...;SharedAccessKeyName=...;SharedAccessKey=...;EntityPath=...)
    #[arg(long, env = "EVENTHUB_CONNECTION_STRING", hide_env_values = true)]
    pub connection_string: Option<String>,

    /// Messages per publishing cycle [default: 100]
    #[arg(long)]
    pub num_msgs: Option<u64>,

    /// Pause between sends, e.g. "2000", "2000ms", "2s" [default: 2000ms]
    #[arg(long)]
    pub delay: Option<String>,

    /// Random seed for deterministic generation (same seed = same readings)
    #[arg(long)]
    pub seed: Option<u64>,

    /// Stop after this many cycles instead of running forever
    #[arg(long)]
    pub max_cycles: Option<u64>,

    /// Log payloads without connecting to the hub
    #[arg(long)]
    pub dry_run: bool,
}
