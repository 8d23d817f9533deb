//! Device/tag/range parameter table.

use crate::generator::GeneratorError;
use serde::{Deserialize, Serialize};

/// Fixed table the generator draws from.
///
/// `tags`, `min_vals` and `max_vals` are index-aligned: the tag at index `i`
/// reports values in `[min_vals[i], max_vals[i])`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParameterTable {
    /// Device identifiers readings are attributed to
    pub device_ids: Vec<i64>,
    /// Tag (channel) identifiers
    pub tags: Vec<i64>,
    /// Lower bound per tag (inclusive)
    pub min_vals: Vec<f64>,
    /// Upper bound per tag (exclusive unless equal to the lower bound)
    pub max_vals: Vec<f64>,
}

impl Default for ParameterTable {
    fn default() -> Self {
        Self {
            device_ids: vec![1, 2, 3],
            tags: vec![1, 2, 3, 4, 5],
            min_vals: vec![10.0, 30.0, 60.0, 80.0, 100.0],
            max_vals: vec![15.0, 40.0, 65.0, 85.0, 110.0],
        }
    }
}

impl ParameterTable {
    /// Build a validated table.
    pub fn new(
        device_ids: Vec<i64>,
        tags: Vec<i64>,
        min_vals: Vec<f64>,
        max_vals: Vec<f64>,
    ) -> Result<Self, GeneratorError> {
        let table = Self {
            device_ids,
            tags,
            min_vals,
            max_vals,
        };
        table.validate()?;
        Ok(table)
    }

    /// Check the table invariants.
    ///
    /// Tables deserialized from configuration must be validated before they
    /// are handed to a generator.
    pub fn validate(&self) -> Result<(), GeneratorError> {
        if self.device_ids.is_empty() {
            return Err(GeneratorError::InvalidTable(
                "device_ids must not be empty".to_string(),
            ));
        }
        if self.tags.is_empty() {
            return Err(GeneratorError::InvalidTable(
                "tags must not be empty".to_string(),
            ));
        }
        if self.tags.len() != self.min_vals.len() || self.tags.len() != self.max_vals.len() {
            return Err(GeneratorError::InvalidTable(format!(
                "tags, min_vals and max_vals must have the same length (got {}, {}, {})",
                self.tags.len(),
                self.min_vals.len(),
                self.max_vals.len()
            )));
        }

        for (idx, (min, max)) in self.min_vals.iter().zip(&self.max_vals).enumerate() {
            if !min.is_finite() || !max.is_finite() {
                return Err(GeneratorError::InvalidTable(format!(
                    "bounds for tag {} must be finite",
                    self.tags[idx]
                )));
            }
            if min > max {
                return Err(GeneratorError::InvalidTable(format!(
                    "min_vals[{idx}] ({min}) is greater than max_vals[{idx}] ({max})"
                )));
            }
            if !has_at_most_two_decimals(*min) || !has_at_most_two_decimals(*max) {
                return Err(GeneratorError::InvalidTable(format!(
                    "bounds for tag {} must have at most two decimal places",
                    self.tags[idx]
                )));
            }
        }

        Ok(())
    }

    /// Value range for the tag at `tag_index`.
    pub fn range(&self, tag_index: usize) -> Option<(f64, f64)> {
        Some((
            *self.min_vals.get(tag_index)?,
            *self.max_vals.get(tag_index)?,
        ))
    }
}

fn has_at_most_two_decimals(value: f64) -> bool {
    let scaled = value * 100.0;
    (scaled - scaled.round()).abs() < 1e-6
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_table_is_valid() {
        let table = ParameterTable::default();
        assert!(table.validate().is_ok());
        assert_eq!(table.range(2), Some((60.0, 65.0)));
        assert_eq!(table.range(5), None);
    }

    #[test]
    fn test_rejects_misaligned_ranges() {
        let result = ParameterTable::new(vec![1], vec![1, 2], vec![0.0], vec![1.0, 2.0]);
        assert!(matches!(result, Err(GeneratorError::InvalidTable(_))));
    }

    #[test]
    fn test_rejects_inverted_bounds() {
        let result = ParameterTable::new(vec![1], vec![1], vec![5.0], vec![4.0]);
        assert!(matches!(result, Err(GeneratorError::InvalidTable(_))));
    }

    #[test]
    fn test_rejects_empty_devices_and_tags() {
        assert!(ParameterTable::new(vec![], vec![1], vec![0.0], vec![1.0]).is_err());
        assert!(ParameterTable::new(vec![1], vec![], vec![], vec![]).is_err());
    }

    #[test]
    fn test_rejects_sub_hundredth_bounds() {
        let result = ParameterTable::new(vec![1], vec![1], vec![0.001], vec![1.0]);
        assert!(result.is_err());

        let ok = ParameterTable::new(vec![1], vec![1], vec![0.25], vec![1.75]);
        assert!(ok.is_ok());
    }

    #[test]
    fn test_equal_bounds_allowed() {
        assert!(ParameterTable::new(vec![1], vec![7], vec![3.5], vec![3.5]).is_ok());
    }
}
