//! Two-pass streaming quantized softmax.
//!
//! Per row, over the `W / SIMD` chunks retained in a [`RowBuffer`]:
//!
//! 1. **Statistics.** `M` starts at `f32::MIN` and takes the running max
//!    of every lane. A second traversal of the same chunks accumulates
//!    `S = sum(exp(x - M))`. Both traversals go chunk index, then lane
//!    index, ascending.
//! 2. **Emission.** Each lane becomes `exp(x - M) / S`, quantized into
//!    the output format. One output chunk per input chunk, in order.
//!
//! Accumulators are `f32` to match the floating intermediate of the
//! hardware datapath. No state survives from one row to the next.

use crate::cost::CostEstimate;
use crate::stream::{pack_row, Chunk, RowBuffer};
use qsmax_common::{ConfigError, FixedPointFormat, KernelError, SoftmaxConfig};
use rayon::prelude::*;
use tracing::{debug, trace};

/// Per-row state after the statistics pass.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RowStatistics {
    /// Largest lane value of the row.
    pub max: f32,
    /// `sum(exp(x - max))` over the row.
    pub sum: f32,
}

/// What a softmax kernel does, independent of where it runs.
///
/// Execution backends hold one of these and decide how to realize it.
pub trait KernelBehavior: Send + Sync {
    fn name(&self) -> &str;

    fn config(&self) -> &SoftmaxConfig;

    /// Pass 1 over a complete row.
    fn compute_statistics(&self, row: &RowBuffer) -> RowStatistics;

    /// Pass 2 over the same row.
    fn emit(&self, row: &RowBuffer, stats: RowStatistics) -> Vec<Chunk>;

    fn estimate_cost(&self, shape: &[usize]) -> Result<CostEstimate, ConfigError> {
        CostEstimate::for_shape(self.config(), shape)
    }

    /// Whether a clocked register-transfer realization exists.
    fn supports_cycle_accurate(&self) -> bool {
        false
    }

    /// Both passes over one buffered row.
    fn process_row(&self, row: &RowBuffer) -> Result<Vec<Chunk>, KernelError> {
        row.check_complete(self.config())?;
        let stats = self.compute_statistics(row);
        trace!(max = stats.max, sum = stats.sum, "row statistics");
        Ok(self.emit(row, stats))
    }
}

/// Quantize `exp(x - max) / sum` for every lane of `row` into `format`.
pub fn emit_probabilities(row: &RowBuffer, stats: RowStatistics, format: FixedPointFormat) -> Vec<Chunk> {
    row.replay()
        .map(|chunk| {
            let probs: Vec<f32> = chunk.values().map(|x| (x - stats.max).exp() / stats.sum).collect();
            Chunk::quantize(format, &probs)
        })
        .collect()
}

/// The two-pass kernel.
#[derive(Debug, Clone)]
pub struct StreamingSoftmax {
    config: SoftmaxConfig,
}

impl StreamingSoftmax {
    pub const NAME: &'static str = "QuantSoftmax";

    pub fn new(config: SoftmaxConfig) -> Self {
        Self { config }
    }
}

impl KernelBehavior for StreamingSoftmax {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn config(&self) -> &SoftmaxConfig {
        &self.config
    }

    fn compute_statistics(&self, row: &RowBuffer) -> RowStatistics {
        let mut max = f32::MIN;
        for chunk in row.replay() {
            for x in chunk.values() {
                max = max.max(x);
            }
        }

        let mut sum = 0.0f32;
        for chunk in row.replay() {
            for x in chunk.values() {
                sum += (x - max).exp();
            }
        }

        RowStatistics { max, sum }
    }

    fn emit(&self, row: &RowBuffer, stats: RowStatistics) -> Vec<Chunk> {
        emit_probabilities(row, stats, self.config.output_format())
    }
}

/// Consume a FIFO of chunks holding consecutive rows.
///
/// A trailing partial row is an error, never dropped.
pub fn process_stream<K, I>(kernel: &K, chunks: I) -> Result<Vec<Chunk>, KernelError>
where
    K: KernelBehavior + ?Sized,
    I: IntoIterator<Item = Chunk>,
{
    let folds = kernel.config().folds();
    let mut buffer = RowBuffer::with_capacity(folds);
    let mut output = Vec::new();
    let mut consumed = 0usize;

    for chunk in chunks {
        consumed += 1;
        buffer.push(chunk);
        if buffer.len() == folds {
            output.extend(kernel.process_row(&buffer)?);
            buffer.clear();
        }
    }

    if !buffer.is_empty() {
        return Err(KernelError::TruncatedStream { chunks: consumed, chunks_per_row: folds });
    }
    Ok(output)
}

/// Run a dense tensor through the kernel, one row per rayon task.
///
/// Returns output chunks for all rows in input order.
pub fn process_tensor<K>(kernel: &K, data: &[f32]) -> Result<Vec<Chunk>, KernelError>
where
    K: KernelBehavior + ?Sized,
{
    let config = kernel.config();
    let w = config.row_length();
    if data.len() % w != 0 {
        return Err(KernelError::RaggedTensor { row_length: w, got: data.len() });
    }
    debug!(kernel = kernel.name(), rows = data.len() / w, simd = config.simd(), "processing tensor");

    let rows: Vec<Vec<Chunk>> = data
        .par_chunks_exact(w)
        .map(|row| {
            let buffer = RowBuffer::from_chunks(pack_row(row, config)?);
            kernel.process_row(&buffer)
        })
        .collect::<Result<_, _>>()?;

    Ok(rows.into_iter().flatten().collect())
}
