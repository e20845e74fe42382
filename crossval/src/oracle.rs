//! Double-precision softmax reference.

use crate::{CrossvalError, Result};
use qsmax_common::FixedPointFormat;

/// Oracle output for one or more rows in a fixed-point format.
#[derive(Debug, Clone, PartialEq)]
pub struct QuantizedReference {
    pub values: Vec<f64>,
    pub raw: Vec<i64>,
}

/// Softmax in f64 with the row maximum subtracted before exponentiation.
pub fn reference_softmax(row: &[f64]) -> Vec<f64> {
    if row.is_empty() {
        return Vec::new();
    }
    let max = row.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    let exps: Vec<f64> = row.iter().map(|&x| (x - max).exp()).collect();
    let sum: f64 = exps.iter().sum();
    exps.into_iter().map(|e| e / sum).collect()
}

/// Softmax of one row, rounded and saturated into `format`.
pub fn reference_quantized(row: &[f32], format: FixedPointFormat) -> QuantizedReference {
    let wide: Vec<f64> = row.iter().map(|&x| f64::from(x)).collect();
    let raw: Vec<i64> = reference_softmax(&wide).into_iter().map(|p| format.quantize_raw(p)).collect();
    let values = raw.iter().map(|&r| format.dequantize(r)).collect();
    QuantizedReference { values, raw }
}

/// Row-wise [`reference_quantized`] over a flattened tensor.
pub fn reference_tensor(data: &[f32], row_length: usize, format: FixedPointFormat) -> Result<QuantizedReference> {
    if row_length == 0 || data.len() % row_length != 0 {
        return Err(CrossvalError::RaggedInput { elements: data.len(), row_length });
    }
    let mut out = QuantizedReference { values: Vec::with_capacity(data.len()), raw: Vec::with_capacity(data.len()) };
    for row in data.chunks_exact(row_length) {
        let q = reference_quantized(row, format);
        out.values.extend(q.values);
        out.raw.extend(q.raw);
    }
    Ok(out)
}
