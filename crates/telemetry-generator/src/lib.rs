//! Reading generator for telemetry-sim.
//!
//! This crate provides the `ReadingGenerator` which fabricates synthetic sensor
//! readings from a small `ParameterTable` of devices, tags and value ranges.
//! The generator takes its RNG explicitly, so a seeded `StdRng` reproduces the
//! same device/tag/value sequence across runs.
//!
//! # Architecture
//!
//! ```text
//! ParameterTable (device_ids, tags, min_vals, max_vals)
//!        │
//!        ▼
//! ┌──────────────────┐
//! │ ReadingGenerator │
//! │                  │
//! │  - table         │
//! │  - rng           │
//! │  - produced      │
//! └────────┬─────────┘
//!          │
//!          ▼
//!    Reading { timestamp, device_id, tag_index, tag, value }
//!          │
//!          ▼
//!    {"TS": ..., "Device": ..., "Tag": ..., "Value": ...}
//! ```
//!
//! # Example
//!
//! ```rust
//! use telemetry_generator::{ParameterTable, ReadingGenerator};
//!
//! let mut generator = ReadingGenerator::seeded(ParameterTable::default(), 42).unwrap();
//! let reading = generator.next_reading();
//! let payload = reading.to_json_bytes().unwrap();
//! println!("{}", String::from_utf8_lossy(&payload));
//! ```

pub mod generator;
pub mod generators;
pub mod reading;
pub mod table;

// Re-exports for convenience
pub use generator::{GeneratorError, ReadingGenerator};
pub use reading::Reading;
pub use table::ParameterTable;
