//! Kernel configuration

use crate::error::ConfigError;
use crate::fixed_point::FixedPointFormat;
use serde::{Deserialize, Serialize};

/// Immutable configuration of one softmax node.
///
/// Built once when the node is specialized; every backend reads it and
/// none mutates it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SoftmaxConfig {
    row_length: usize,
    simd: usize,
    input_format: FixedPointFormat,
    output_format: FixedPointFormat,
}

impl SoftmaxConfig {
    pub fn new(
        row_length: usize,
        simd: usize,
        input_format: FixedPointFormat,
        output_format: FixedPointFormat,
    ) -> Result<Self, ConfigError> {
        let cfg = Self { row_length, simd, input_format, output_format };
        cfg.validate()?;
        Ok(cfg)
    }

    /// Check the folding constraints.
    ///
    /// Deserialized configurations bypass [`SoftmaxConfig::new`], so
    /// loaders call this explicitly.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.simd == 0 {
            return Err(ConfigError::ZeroSimd);
        }
        if self.row_length == 0 {
            return Err(ConfigError::ZeroRowLength);
        }
        if self.simd > self.row_length {
            return Err(ConfigError::SimdExceedsRow {
                row_length: self.row_length,
                simd: self.simd,
            });
        }
        if self.row_length % self.simd != 0 {
            return Err(ConfigError::NotDivisible {
                row_length: self.row_length,
                simd: self.simd,
            });
        }
        Ok(())
    }

    /// Row length W.
    pub fn row_length(&self) -> usize {
        self.row_length
    }

    /// Lanes per chunk.
    pub fn simd(&self) -> usize {
        self.simd
    }

    /// Chunks per row, `W / SIMD`.
    pub fn folds(&self) -> usize {
        self.row_length / self.simd
    }

    pub fn input_format(&self) -> FixedPointFormat {
        self.input_format
    }

    pub fn output_format(&self) -> FixedPointFormat {
        self.output_format
    }

    /// Check that a full tensor shape ends in this row length.
    pub fn check_shape(&self, shape: &[usize]) -> Result<(), ConfigError> {
        let last = *shape.last().ok_or(ConfigError::EmptyShape)?;
        if last != self.row_length {
            return Err(ConfigError::ShapeMismatch { expected: self.row_length, got: last });
        }
        Ok(())
    }
}
