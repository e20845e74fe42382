//! Parity reports for CI
//!
//! A [`ParityReport`] records how far a kernel run landed from the
//! oracle, in output quantization steps, and serializes to pretty JSON.
//!
//! ```rust,ignore
//! let mut report = ParityReport::new("QuantSoftmax", "cppsim", &config, &[1, 384]);
//! report.set_seed(42);
//! report.record(output.data(), &reference.values)?;
//! report.write_to_file(Path::new("parity.json"))?;
//! ```

use crate::compare::{diff_in_steps, DEFAULT_TOLERANCE_STEPS};
use crate::{CrossvalError, Result};
use qsmax_common::{FixedPointFormat, SoftmaxConfig};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Current report schema.
pub const REPORT_VERSION: u32 = 1;

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct ParityReport {
    pub version: u32,
    pub kernel: String,
    pub mode: String,
    pub input_format: FixedPointFormat,
    pub output_format: FixedPointFormat,
    pub shape: Vec<usize>,
    pub simd: usize,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub seed: Option<u64>,

    pub tolerance_steps: f64,
    pub elements: usize,
    pub mismatches: usize,
    pub max_abs_diff_steps: f64,

    /// First element outside the tolerance (None if all passed)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub first_mismatch: Option<usize>,

    pub passed: bool,
}

impl ParityReport {
    pub fn new(kernel: &str, mode: &str, config: &SoftmaxConfig, shape: &[usize]) -> Self {
        Self {
            version: REPORT_VERSION,
            kernel: kernel.to_string(),
            mode: mode.to_string(),
            input_format: config.input_format(),
            output_format: config.output_format(),
            shape: shape.to_vec(),
            simd: config.simd(),
            seed: None,
            tolerance_steps: DEFAULT_TOLERANCE_STEPS,
            elements: 0,
            mismatches: 0,
            max_abs_diff_steps: 0.0,
            first_mismatch: None,
            passed: false,
        }
    }

    pub fn set_seed(&mut self, seed: u64) {
        self.seed = Some(seed);
    }

    pub fn set_tolerance(&mut self, steps: f64) {
        self.tolerance_steps = steps;
    }

    /// Compare a run against the dequantized oracle and fill in the summary.
    ///
    /// Unlike [`crate::compare_within_steps`] this visits every element,
    /// so the mismatch count and worst difference cover the whole tensor.
    pub fn record(&mut self, actual: &[f32], expected: &[f64]) -> Result<()> {
        if actual.len() != expected.len() {
            return Err(CrossvalError::LengthMismatch { actual: actual.len(), expected: expected.len() });
        }

        self.elements = actual.len();
        self.mismatches = 0;
        self.max_abs_diff_steps = 0.0;
        self.first_mismatch = None;

        for (index, (&a, &e)) in actual.iter().zip(expected).enumerate() {
            let diff = diff_in_steps(f64::from(a), e, self.output_format);
            let diff = if diff.is_nan() { f64::INFINITY } else { diff };
            self.max_abs_diff_steps = self.max_abs_diff_steps.max(diff);
            if diff > self.tolerance_steps {
                self.mismatches += 1;
                self.first_mismatch.get_or_insert(index);
            }
        }

        self.passed = self.mismatches == 0;
        tracing::debug!(
            elements = self.elements,
            mismatches = self.mismatches,
            max_abs_diff_steps = self.max_abs_diff_steps,
            "parity recorded"
        );
        Ok(())
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn write_to_file(&self, path: &Path) -> Result<()> {
        let json = self.to_json()?;
        std::fs::write(path, json)?;
        Ok(())
    }
}
