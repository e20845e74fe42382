//! Seeded random tensors whose values are exact in a given datatype.

use qsmax_common::FixedPointFormat;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// Uniform random values over the full raw range of `format`.
///
/// The same seed always produces the same tensor.
pub fn gen_dt_tensor(format: FixedPointFormat, shape: &[usize], seed: u64) -> Vec<f32> {
    let len: usize = shape.iter().product();
    let mut rng = StdRng::seed_from_u64(seed);
    let (lo, hi) = (format.min_raw(), format.max_raw());
    (0..len).map(|_| format.dequantize(rng.gen_range(lo..=hi)) as f32).collect()
}
