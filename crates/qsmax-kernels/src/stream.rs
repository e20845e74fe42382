//! Vector-stream adapter.
//!
//! A row of `W` samples travels as `W / SIMD` chunks of `SIMD` lanes:
//! element `i` sits in chunk `i / SIMD`, lane `i % SIMD`. Packing
//! quantizes each sample into the input format; unpacking is the exact
//! inverse ordering.

use qsmax_common::{ConfigError, FixedPointFormat, KernelError, SoftmaxConfig};

/// One stream element: `SIMD` raw lanes sharing a format.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Chunk {
    format: FixedPointFormat,
    lanes: Vec<i64>,
}

impl Chunk {
    /// Build from raw lanes, saturating each into `format`.
    pub fn from_raw(format: FixedPointFormat, lanes: impl IntoIterator<Item = i64>) -> Self {
        let lanes = lanes.into_iter().map(|r| format.saturate_raw(r as i128)).collect();
        Self { format, lanes }
    }

    /// Quantize real samples into `format`.
    pub fn quantize(format: FixedPointFormat, values: &[f32]) -> Self {
        let lanes = values.iter().map(|&v| format.quantize_raw(v as f64)).collect();
        Self { format, lanes }
    }

    pub fn format(&self) -> FixedPointFormat {
        self.format
    }

    /// Number of lanes.
    pub fn simd(&self) -> usize {
        self.lanes.len()
    }

    pub fn raw(&self) -> &[i64] {
        &self.lanes
    }

    /// Lane values in the kernel's `f32` working type.
    pub fn values(&self) -> impl Iterator<Item = f32> + '_ {
        self.lanes.iter().map(move |&r| self.format.dequantize(r) as f32)
    }
}

/// Split a dense row into chunks, quantizing into the input format.
pub fn pack_row(row: &[f32], config: &SoftmaxConfig) -> Result<Vec<Chunk>, KernelError> {
    if row.len() != config.row_length() {
        return Err(KernelError::RowLength { expected: config.row_length(), got: row.len() });
    }
    Ok(row.chunks_exact(config.simd()).map(|c| Chunk::quantize(config.input_format(), c)).collect())
}

/// Flatten chunks back into dense dequantized samples.
pub fn unpack_row(chunks: &[Chunk]) -> Vec<f32> {
    chunks.iter().flat_map(Chunk::values).collect()
}

/// Flatten chunks back into raw integers.
pub fn unpack_raw(chunks: &[Chunk]) -> Vec<i64> {
    chunks.iter().flat_map(|c| c.raw().iter().copied()).collect()
}

/// The retained chunks of one row.
///
/// Both kernel passes traverse the buffer; every traversal yields the
/// same chunks in the same order.
#[derive(Debug, Clone, Default)]
pub struct RowBuffer {
    chunks: Vec<Chunk>,
}

impl RowBuffer {
    pub fn with_capacity(folds: usize) -> Self {
        Self { chunks: Vec::with_capacity(folds) }
    }

    pub fn from_chunks(chunks: Vec<Chunk>) -> Self {
        Self { chunks }
    }

    pub fn push(&mut self, chunk: Chunk) {
        self.chunks.push(chunk);
    }

    pub fn len(&self) -> usize {
        self.chunks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.chunks.is_empty()
    }

    /// Traverse the retained chunks from the start.
    pub fn replay(&self) -> std::slice::Iter<'_, Chunk> {
        self.chunks.iter()
    }

    /// Every lane value in chunk-then-lane order.
    pub fn values(&self) -> impl Iterator<Item = f32> + '_ {
        self.chunks.iter().flat_map(Chunk::values)
    }

    /// Whether the buffer holds exactly one row for `config`, with the
    /// right lane count in every chunk.
    pub fn check_complete(&self, config: &SoftmaxConfig) -> Result<(), KernelError> {
        if let Some(bad) = self.chunks.iter().find(|c| c.simd() != config.simd()) {
            return Err(KernelError::LaneMismatch { expected: config.simd(), got: bad.simd() });
        }
        if self.chunks.len() != config.folds() {
            return Err(KernelError::TruncatedStream {
                chunks: self.chunks.len(),
                chunks_per_row: config.folds(),
            });
        }
        Ok(())
    }

    pub fn clear(&mut self) {
        self.chunks.clear();
    }
}

/// Input shape as seen by the graph.
pub fn normal_shape(shape: &[usize], config: &SoftmaxConfig) -> Result<Vec<usize>, ConfigError> {
    config.check_shape(shape)?;
    Ok(shape.to_vec())
}

/// Shape with the innermost dimension split into `[W / SIMD, SIMD]`.
pub fn folded_shape(shape: &[usize], config: &SoftmaxConfig) -> Result<Vec<usize>, ConfigError> {
    config.check_shape(shape)?;
    let mut folded = shape[..shape.len() - 1].to_vec();
    folded.push(config.folds());
    folded.push(config.simd());
    Ok(folded)
}

/// Number of independent rows in a tensor of `shape`.
pub fn row_count(shape: &[usize]) -> usize {
    match shape.split_last() {
        Some((_, outer)) => outer.iter().product(),
        None => 0,
    }
}

/// View a dense tensor as consecutive rows.
pub fn split_rows(data: &[f32], row_length: usize) -> Result<std::slice::ChunksExact<'_, f32>, KernelError> {
    if row_length == 0 || data.len() % row_length != 0 {
        return Err(KernelError::RaggedTensor { row_length, got: data.len() });
    }
    Ok(data.chunks_exact(row_length))
}
