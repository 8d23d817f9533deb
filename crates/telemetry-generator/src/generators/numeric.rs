//! Numeric value generators.

use rand::Rng;

/// Round to two decimal places, half away from zero.
pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Truncate toward negative infinity at two decimal places.
pub fn floor2(value: f64) -> f64 {
    (value * 100.0).floor() / 100.0
}

/// Draw a value uniformly from `[min, max)` and round it to two decimals.
///
/// Rounding may land exactly on `max`; in that case the raw draw is
/// truncated instead so the result stays below the upper bound. With
/// `min == max` the bound itself is returned.
pub fn generate_bounded_value<R: Rng>(rng: &mut R, min: f64, max: f64) -> f64 {
    if min >= max {
        return min;
    }

    let unit: f64 = rng.gen();
    let raw = min + unit * (max - min);
    let rounded = round2(raw);
    if rounded >= max {
        floor2(raw).max(min)
    } else {
        rounded.max(min)
    }
}
