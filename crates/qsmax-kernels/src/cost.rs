//! Closed-form cycle and resource estimates.
//!
//! The kernel reads each row twice (statistics, then emission), but the
//! emission pass of row `r` overlaps the statistics pass of row `r + 1`,
//! so a tensor of `R` rows costs `R * folds + folds` cycles plus a fixed
//! pipeline drain.

use crate::stream::row_count;
use qsmax_common::{ConfigError, SoftmaxConfig};
use serde::Serialize;
use std::fmt;

/// Cycles spent flushing the last output chunk.
pub const PIPELINE_DRAIN_CYCLES: u64 = 1;

/// DSP blocks consumed per parallel lane.
pub const DSP_PER_LANE: u64 = 3;

/// Expected cycles for `rows` rows of `folds` chunks each.
pub fn exp_cycles(rows: u64, folds: u64) -> u64 {
    rows * folds + folds + PIPELINE_DRAIN_CYCLES
}

/// Cycles for a single row, `2 * folds + 1`.
pub fn row_cycles(folds: u64) -> u64 {
    exp_cycles(1, folds)
}

pub fn dsp_estimate(simd: usize) -> u64 {
    simd as u64 * DSP_PER_LANE
}

/// Structural estimate for one node over one tensor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CostEstimate {
    pub rows: u64,
    pub row_length: usize,
    pub simd: usize,
    pub folds: usize,
    pub cycles: u64,
    pub dsp: u64,
}

impl CostEstimate {
    /// Estimate for a full input shape whose last dimension is the row.
    pub fn for_shape(config: &SoftmaxConfig, shape: &[usize]) -> Result<Self, ConfigError> {
        config.check_shape(shape)?;
        Ok(Self::for_rows(config, row_count(shape) as u64))
    }

    pub fn for_rows(config: &SoftmaxConfig, rows: u64) -> Self {
        let folds = config.folds();
        Self {
            rows,
            row_length: config.row_length(),
            simd: config.simd(),
            folds,
            cycles: exp_cycles(rows, folds as u64),
            dsp: dsp_estimate(config.simd()),
        }
    }
}

impl fmt::Display for CostEstimate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "rows:       {}", self.rows)?;
        writeln!(f, "row length: {}", self.row_length)?;
        writeln!(f, "simd:       {}", self.simd)?;
        writeln!(f, "folds:      {}", self.folds)?;
        writeln!(f, "cycles:     {}", self.cycles)?;
        write!(f, "dsp:        {}", self.dsp)
    }
}
