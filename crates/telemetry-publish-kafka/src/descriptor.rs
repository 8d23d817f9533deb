//! Sink connection descriptor.
//!
//! An Event Hubs connection string looks like
//! `Endpoint=sb://<ns>.servicebus.windows.net/;SharedAccessKeyName=<name>;SharedAccessKey=<key>;EntityPath=<hub>`.
//! The same shape is accepted for a local Kafka broker, e.g.
//! `Endpoint=kafka://localhost:9092;EntityPath=telemetry`.

use crate::error::PublishError;
use rdkafka::ClientConfig;
use std::fmt;
use std::str::FromStr;

/// Port of the Kafka-compatible endpoint on an Event Hubs namespace.
pub const EVENT_HUBS_KAFKA_PORT: u16 = 9093;

/// How the producer reaches the endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transport {
    /// Event Hubs namespace over SASL_SSL with the connection string as password
    EventHubs,
    /// Plain Kafka brokers, no authentication
    Plaintext,
}

/// Endpoint, credentials and entity path of the ingestion hub.
#[derive(Clone, PartialEq, Eq)]
pub struct HubDescriptor {
    pub endpoint: String,
    pub key_name: Option<String>,
    pub key: Option<String>,
    pub entity_path: String,
}

impl HubDescriptor {
    /// Assemble a descriptor from discrete fields.
    pub fn from_parts(
        endpoint: impl Into<String>,
        key_name: Option<String>,
        key: Option<String>,
        entity_path: impl Into<String>,
    ) -> Result<Self, PublishError> {
        let descriptor = Self {
            endpoint: endpoint.into(),
            key_name,
            key,
            entity_path: entity_path.into(),
        };
        descriptor.validate()?;
        Ok(descriptor)
    }

    fn validate(&self) -> Result<(), PublishError> {
        if self.endpoint.trim().is_empty() {
            return Err(PublishError::InvalidDescriptor(
                "missing Endpoint".to_string(),
            ));
        }
        if self.entity_path.trim().is_empty() {
            return Err(PublishError::InvalidDescriptor(
                "missing EntityPath".to_string(),
            ));
        }
        if self.transport() == Transport::EventHubs
            && (self.key_name.is_none() || self.key.is_none())
        {
            return Err(PublishError::InvalidDescriptor(
                "sb:// endpoints require SharedAccessKeyName and SharedAccessKey".to_string(),
            ));
        }
        Ok(())
    }

    pub fn transport(&self) -> Transport {
        if self.endpoint.starts_with("sb://") {
            Transport::EventHubs
        } else {
            Transport::Plaintext
        }
    }

    /// Topic the producer publishes to.
    pub fn topic(&self) -> &str {
        &self.entity_path
    }

    /// Bootstrap servers derived from the endpoint.
    pub fn bootstrap_servers(&self) -> String {
        match self.transport() {
            Transport::EventHubs => {
                let host = self
                    .endpoint
                    .trim_start_matches("sb://")
                    .trim_end_matches('/');
                if host.contains(':') {
                    host.to_string()
                } else {
                    format!("{host}:{EVENT_HUBS_KAFKA_PORT}")
                }
            }
            Transport::Plaintext => self
                .endpoint
                .trim_start_matches("kafka://")
                .trim_end_matches('/')
                .to_string(),
        }
    }

    /// Rebuild the connection string, secret included.
    pub fn connection_string(&self) -> String {
        let mut parts = vec![format!("Endpoint={}", self.endpoint)];
        if let Some(key_name) = &self.key_name {
            parts.push(format!("SharedAccessKeyName={key_name}"));
        }
        if let Some(key) = &self.key {
            parts.push(format!("SharedAccessKey={key}"));
        }
        parts.push(format!("EntityPath={}", self.entity_path));
        parts.join(";")
    }

    /// Base rdkafka client configuration for this endpoint.
    pub fn client_config(&self) -> ClientConfig {
        let mut config = ClientConfig::new();
        config.set("bootstrap.servers", self.bootstrap_servers());

        if self.transport() == Transport::EventHubs {
            config
                .set("security.protocol", "SASL_SSL")
                .set("sasl.mechanism", "PLAIN")
                .set("sasl.username", "$ConnectionString")
                .set("sasl.password", self.connection_string());
        }

        config
    }
}

impl FromStr for HubDescriptor {
    type Err = PublishError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut endpoint = None;
        let mut key_name = None;
        let mut key = None;
        let mut entity_path = None;

        for part in s.split(';').map(str::trim).filter(|p| !p.is_empty()) {
            // Keys are base64 and may themselves contain '='
            let (name, value) = part.split_once('=').ok_or_else(|| {
                PublishError::InvalidDescriptor(format!("malformed segment '{}'", mask(part)))
            })?;
            let value = value.trim().to_string();

            match name.trim().to_ascii_lowercase().as_str() {
                "endpoint" => endpoint = Some(value),
                "sharedaccesskeyname" => key_name = Some(value),
                "sharedaccesskey" => key = Some(value),
                "entitypath" => entity_path = Some(value),
                other => tracing::debug!("Ignoring connection string segment '{}'", other),
            }
        }

        Self::from_parts(
            endpoint.ok_or_else(|| PublishError::InvalidDescriptor("missing Endpoint".into()))?,
            key_name,
            key,
            entity_path
                .ok_or_else(|| PublishError::InvalidDescriptor("missing EntityPath".into()))?,
        )
    }
}

fn mask(segment: &str) -> String {
    match segment.split_once('=') {
        Some((name, _)) => format!("{name}=***"),
        None => "***".to_string(),
    }
}

impl fmt::Display for HubDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Endpoint={}", self.endpoint)?;
        if let Some(key_name) = &self.key_name {
            write!(f, ";SharedAccessKeyName={key_name}")?;
        }
        if self.key.is_some() {
            write!(f, ";SharedAccessKey=***")?;
        }
        write!(f, ";EntityPath={}", self.entity_path)
    }
}

impl fmt::Debug for HubDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HubDescriptor")
            .field("endpoint", &self.endpoint)
            .field("key_name", &self.key_name)
            .field("key", &self.key.as_ref().map(|_| "***"))
            .field("entity_path", &self.entity_path)
            .finish()
    }
}
