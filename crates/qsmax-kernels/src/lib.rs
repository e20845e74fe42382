//! Streaming quantized softmax kernel
//!
//! The kernel computes a numerically stable softmax over rows that
//! arrive as fixed-size parallel chunks and quantizes the result into a
//! fixed-point output format. See [`softmax`] for the algorithm.

pub mod cost;
pub mod online;
pub mod packing;
pub mod softmax;
pub mod stream;

pub use cost::{dsp_estimate, exp_cycles, row_cycles, CostEstimate, PIPELINE_DRAIN_CYCLES};
pub use online::OnlineSoftmax;
pub use packing::{axi_aligned, instream_width, outstream_width, pack_chunk, unpack_chunk, PackedWord};
pub use softmax::{process_stream, process_tensor, KernelBehavior, RowStatistics, StreamingSoftmax};
pub use stream::{
    folded_shape, normal_shape, pack_row, row_count, split_rows, unpack_raw, unpack_row, Chunk,
    RowBuffer,
};
