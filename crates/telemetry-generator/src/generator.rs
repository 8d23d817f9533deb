//! Main reading generator.

use crate::generators::choose_index;
use crate::generators::numeric::generate_bounded_value;
use crate::generators::timestamp::generate_timestamp_now;
use crate::reading::Reading;
use crate::table::ParameterTable;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// Error type for generator operations.
#[derive(Debug, thiserror::Error)]
pub enum GeneratorError {
    /// Parameter table violates an invariant
    #[error("Invalid parameter table: {0}")]
    InvalidTable(String),

    /// JSON encoding failed
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Generator that fabricates readings from a parameter table.
///
/// Device and tag are independent draws, so any device may report any tag.
/// The RNG is owned by the generator; pass a seeded `StdRng` for
/// reproducible sequences.
pub struct ReadingGenerator<R = StdRng> {
    /// Validated table readings are drawn from
    table: ParameterTable,
    /// Random source
    rng: R,
    /// Number of readings produced so far
    produced: u64,
}

impl ReadingGenerator<StdRng> {
    /// Create a generator with a deterministic seed.
    pub fn seeded(table: ParameterTable, seed: u64) -> Result<Self, GeneratorError> {
        Self::new(table, StdRng::seed_from_u64(seed))
    }

    /// Create a generator seeded from OS entropy.
    pub fn from_entropy(table: ParameterTable) -> Result<Self, GeneratorError> {
        Self::new(table, StdRng::from_entropy())
    }
}

impl<R: Rng> ReadingGenerator<R> {
    /// Create a generator with an explicit RNG.
    pub fn new(table: ParameterTable, rng: R) -> Result<Self, GeneratorError> {
        table.validate()?;
        Ok(Self {
            table,
            rng,
            produced: 0,
        })
    }

    /// Generate the next reading.
    pub fn next_reading(&mut self) -> Reading {
        let device_idx = choose_index(&mut self.rng, self.table.device_ids.len()).unwrap_or(0);
        let tag_index = choose_index(&mut self.rng, self.table.tags.len()).unwrap_or(0);
        self.build_reading(device_idx, tag_index)
    }

    /// Generate a reading for a fixed tag index, drawing device and value.
    ///
    /// Returns `None` when `tag_index` is outside the table.
    pub fn reading_for_tag(&mut self, tag_index: usize) -> Option<Reading> {
        if tag_index >= self.table.tags.len() {
            return None;
        }
        let device_idx = choose_index(&mut self.rng, self.table.device_ids.len()).unwrap_or(0);
        Some(self.build_reading(device_idx, tag_index))
    }

    fn build_reading(&mut self, device_idx: usize, tag_index: usize) -> Reading {
        let device_id = self.table.device_ids[device_idx];
        let tag = self.table.tags[tag_index];
        let (min, max) = (self.table.min_vals[tag_index], self.table.max_vals[tag_index]);
        let value = generate_bounded_value(&mut self.rng, min, max);

        self.produced += 1;

        Reading {
            timestamp: generate_timestamp_now(),
            device_id,
            tag,
            value,
            tag_index,
        }
    }

    /// Generate `count` readings lazily.
    pub fn readings(&mut self, count: u64) -> ReadingIterator<'_, R> {
        ReadingIterator {
            generator: self,
            remaining: count,
        }
    }

    /// Number of readings produced so far.
    pub fn produced(&self) -> u64 {
        self.produced
    }
}

/// Iterator that lazily generates readings.
pub struct ReadingIterator<'a, R> {
    generator: &'a mut ReadingGenerator<R>,
    remaining: u64,
}

impl<R: Rng> Iterator for ReadingIterator<'_, R> {
    type Item = Reading;

    fn next(&mut self) -> Option<Self::Item> {
        if self.remaining == 0 {
            return None;
        }
        self.remaining -= 1;
        Some(self.generator.next_reading())
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = self.remaining as usize;
        (remaining, Some(remaining))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn decimals_ok(value: f64) -> bool {
        let scaled = value * 100.0;
        (scaled - scaled.round()).abs() < 1e-6
    }

    #[test]
    fn test_range_and_alignment() {
        let table = ParameterTable::default();
        let mut generator = ReadingGenerator::seeded(table.clone(), 42).unwrap();

        for reading in generator.readings(2000) {
            let idx = reading.tag_index;
            assert_eq!(reading.tag, table.tags[idx]);

            let (min, max) = (table.min_vals[idx], table.max_vals[idx]);
            assert!(reading.value >= min, "{} < {min}", reading.value);
            assert!(reading.value < max, "{} >= {max}", reading.value);
            assert!(decimals_ok(reading.value));

            assert!(table.device_ids.contains(&reading.device_id));
        }
    }

    #[test]
    fn test_every_device_and_tag_appears() {
        let table = ParameterTable::default();
        let mut generator = ReadingGenerator::seeded(table.clone(), 1).unwrap();
        let readings: Vec<Reading> = generator.readings(500).collect();

        for device in &table.device_ids {
            assert!(readings.iter().any(|r| r.device_id == *device));
        }
        for tag in &table.tags {
            assert!(readings.iter().any(|r| r.tag == *tag));
        }
    }

    #[test]
    fn test_tag_index_two_maps_to_tag_three() {
        let mut generator = ReadingGenerator::seeded(ParameterTable::default(), 42).unwrap();

        for _ in 0..200 {
            let reading = generator.reading_for_tag(2).unwrap();
            assert_eq!(reading.tag, 3);
            assert!((60.0..65.0).contains(&reading.value));
        }
        assert!(generator.reading_for_tag(5).is_none());
    }

    #[test]
    fn test_deterministic_generation() {
        let mut gen1 = ReadingGenerator::seeded(ParameterTable::default(), 42).unwrap();
        let mut gen2 = ReadingGenerator::seeded(ParameterTable::default(), 42).unwrap();

        for _ in 0..50 {
            let a = gen1.next_reading();
            let b = gen2.next_reading();
            assert_eq!(a.device_id, b.device_id);
            assert_eq!(a.tag, b.tag);
            assert_eq!(a.value, b.value);
        }
    }

    #[test]
    fn test_equal_bounds_yield_the_bound() {
        let table = ParameterTable::new(vec![9], vec![4], vec![12.5], vec![12.5]).unwrap();
        let mut generator = ReadingGenerator::seeded(table, 3).unwrap();

        let reading = generator.next_reading();
        assert_eq!(reading.device_id, 9);
        assert_eq!(reading.tag, 4);
        assert_eq!(reading.value, 12.5);
    }

    #[test]
    fn test_invalid_table_rejected() {
        let table = ParameterTable {
            device_ids: vec![1],
            tags: vec![1, 2],
            min_vals: vec![0.0],
            max_vals: vec![1.0],
        };
        assert!(matches!(
            ReadingGenerator::seeded(table, 42),
            Err(GeneratorError::InvalidTable(_))
        ));
    }

    #[test]
    fn test_produced_counter() {
        let mut generator = ReadingGenerator::seeded(ParameterTable::default(), 42).unwrap();
        assert_eq!(generator.produced(), 0);

        let count = generator.readings(7).count();
        assert_eq!(count, 7);
        assert_eq!(generator.produced(), 7);
    }
}
