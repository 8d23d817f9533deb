//! Synthetic reading and its JSON wire form.

use crate::generator::GeneratorError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One synthetic sensor observation.
///
/// Serializes to a flat object with exactly the keys `TS`, `Device`, `Tag`
/// and `Value`, in that order. `tag_index` is kept for callers that need to
/// look the range back up and never goes on the wire.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Reading {
    #[serde(rename = "TS")]
    pub timestamp: DateTime<Utc>,

    #[serde(rename = "Device")]
    pub device_id: i64,

    #[serde(rename = "Tag")]
    pub tag: i64,

    #[serde(rename = "Value")]
    pub value: f64,

    #[serde(skip)]
    pub tag_index: usize,
}

impl Reading {
    /// Encode as UTF-8 JSON bytes.
    pub fn to_json_bytes(&self) -> Result<Vec<u8>, GeneratorError> {
        Ok(serde_json::to_vec(self)?)
    }

    /// Encode as a JSON string (used for console output).
    pub fn to_json_string(&self) -> Result<String, GeneratorError> {
        Ok(serde_json::to_string(self)?)
    }
}
