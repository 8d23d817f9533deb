//! Individual value generators used to assemble a reading.
//!
//! Each generator takes the RNG explicitly so callers control determinism.

pub mod numeric;
pub mod timestamp;

use rand::Rng;

/// Draw a uniformly distributed index into a slice of length `len`.
///
/// Returns `None` for an empty slice.
pub fn choose_index<R: Rng>(rng: &mut R, len: usize) -> Option<usize> {
    if len == 0 {
        None
    } else {
        Some(rng.gen_range(0..len))
    }
}
