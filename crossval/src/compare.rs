//! Step-tolerance comparison between kernel output and the oracle.

use crate::{CrossvalError, Result};
use qsmax_common::FixedPointFormat;

/// Tolerance used by the parity grid, in output quantization steps.
pub const DEFAULT_TOLERANCE_STEPS: f64 = 2.0;

/// Absolute difference between two values in units of `format.step()`.
pub fn diff_in_steps(actual: f64, expected: f64, format: FixedPointFormat) -> f64 {
    (actual - expected).abs() / format.step()
}

/// Check every element is within `steps` quantization steps of the oracle.
///
/// The first element outside the tolerance is reported by index.
pub fn compare_within_steps(
    actual: &[f32],
    expected: &[f64],
    format: FixedPointFormat,
    steps: f64,
) -> Result<()> {
    if actual.len() != expected.len() {
        return Err(CrossvalError::LengthMismatch { actual: actual.len(), expected: expected.len() });
    }

    for (index, (&a, &e)) in actual.iter().zip(expected).enumerate() {
        let a = f64::from(a);
        let diff_steps = diff_in_steps(a, e, format);
        // NaN compares false, catch it explicitly
        if diff_steps.is_nan() || diff_steps > steps {
            return Err(CrossvalError::Mismatch { index, actual: a, expected: e, diff_steps, tolerance: steps });
        }
    }

    Ok(())
}
