//! Single-traversal statistics with a rescaled running sum.
//!
//! Whenever a new maximum arrives the partial sum is scaled by
//! `exp(old_max - new_max)`, so one traversal yields the same `(M, S)`
//! as the two-pass kernel up to `f32` rounding. Emission is shared.

use crate::softmax::{emit_probabilities, KernelBehavior, RowStatistics};
use crate::stream::{Chunk, RowBuffer};
use qsmax_common::SoftmaxConfig;

#[derive(Debug, Clone)]
pub struct OnlineSoftmax {
    config: SoftmaxConfig,
}

impl OnlineSoftmax {
    pub const NAME: &'static str = "QuantSoftmaxOnline";

    pub fn new(config: SoftmaxConfig) -> Self {
        Self { config }
    }
}

impl KernelBehavior for OnlineSoftmax {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn config(&self) -> &SoftmaxConfig {
        &self.config
    }

    fn compute_statistics(&self, row: &RowBuffer) -> RowStatistics {
        let (max, sum) = row.values().fold((f32::MIN, 0.0f32), |(m, s), x| {
            if x > m {
                (x, s * (m - x).exp() + 1.0)
            } else {
                (m, s + (x - m).exp())
            }
        });
        RowStatistics { max, sum }
    }

    fn emit(&self, row: &RowBuffer, stats: RowStatistics) -> Vec<Chunk> {
        emit_probabilities(row, stats, self.config.output_format())
    }
}
