//! Timestamp value generators.

use chrono::{DateTime, Utc};

/// Generate the current UTC timestamp.
///
/// This is NOT deterministic - each call returns the current time.
pub fn generate_timestamp_now() -> DateTime<Utc> {
    Utc::now()
}
