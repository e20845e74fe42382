//! Cross-validation for the qsmax softmax kernel
//!
//! A double-precision softmax oracle, quantized with the same rounding
//! policy as the kernel, plus step-tolerance comparison and JSON parity
//! reports for CI.

use thiserror::Error;

pub mod compare;
pub mod generate;
pub mod oracle;
pub mod report;

pub use compare::{compare_within_steps, diff_in_steps, DEFAULT_TOLERANCE_STEPS};
pub use generate::gen_dt_tensor;
pub use oracle::{reference_quantized, reference_softmax, reference_tensor, QuantizedReference};
pub use report::ParityReport;

/// Errors that can occur during cross-validation
#[derive(Error, Debug)]
pub enum CrossvalError {
    #[error("length mismatch: actual has {actual} elements, expected {expected}")]
    LengthMismatch { actual: usize, expected: usize },

    #[error(
        "mismatch at index {index}: actual={actual}, expected={expected} ({diff_steps:.3} steps > {tolerance})"
    )]
    Mismatch { index: usize, actual: f64, expected: f64, diff_steps: f64, tolerance: f64 },

    #[error("row length {row_length} does not divide {elements} elements")]
    RaggedInput { elements: usize, row_length: usize },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, CrossvalError>;
