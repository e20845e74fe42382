//! The softmax operator node.

use crate::artifact::NodeConfig;
use crate::backend::{backend_for, ExecutionBackend, ExecutionOutput};
use qsmax_common::{ConfigError, ExecMode, Result, SoftmaxConfig, ToolchainConfig};
use qsmax_kernels::{
    axi_aligned, folded_shape, instream_width, outstream_width, CostEstimate, KernelBehavior,
    StreamingSoftmax,
};
use qsmax_npy::ArrayF32;
use tracing::info;

/// A configured softmax node: a kernel plus the tensor shape it sees.
///
/// Configuration is fixed at construction; backends only read it.
pub struct QuantSoftmaxNode {
    name: String,
    ifm_dim: Vec<usize>,
    kernel: Box<dyn KernelBehavior>,
}

impl QuantSoftmaxNode {
    /// Node running the two-pass kernel.
    pub fn new(name: impl Into<String>, ifm_dim: Vec<usize>, config: SoftmaxConfig) -> std::result::Result<Self, ConfigError> {
        Self::with_kernel(name, ifm_dim, Box::new(StreamingSoftmax::new(config)))
    }

    pub fn with_kernel(
        name: impl Into<String>,
        ifm_dim: Vec<usize>,
        kernel: Box<dyn KernelBehavior>,
    ) -> std::result::Result<Self, ConfigError> {
        kernel.config().validate()?;
        kernel.config().check_shape(&ifm_dim)?;
        Ok(Self { name: name.into(), ifm_dim, kernel })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn kernel(&self) -> &dyn KernelBehavior {
        self.kernel.as_ref()
    }

    pub fn config(&self) -> &SoftmaxConfig {
        self.kernel.config()
    }

    pub fn normal_input_shape(&self) -> &[usize] {
        &self.ifm_dim
    }

    pub fn normal_output_shape(&self) -> &[usize] {
        &self.ifm_dim
    }

    pub fn folded_input_shape(&self) -> Vec<usize> {
        // Shape was checked against the config at construction.
        folded_shape(&self.ifm_dim, self.config()).unwrap_or_else(|_| self.ifm_dim.clone())
    }

    pub fn folded_output_shape(&self) -> Vec<usize> {
        self.folded_input_shape()
    }

    /// Input port width in bits, byte aligned.
    pub fn instream_width(&self) -> usize {
        axi_aligned(instream_width(self.config()))
    }

    /// Output port width in bits, byte aligned.
    pub fn outstream_width(&self) -> usize {
        axi_aligned(outstream_width(self.config()))
    }

    pub fn estimate(&self) -> Result<CostEstimate> {
        Ok(self.kernel.estimate_cost(&self.ifm_dim)?)
    }

    pub fn exp_cycles(&self) -> Result<u64> {
        Ok(self.estimate()?.cycles)
    }

    pub fn dsp_estimation(&self) -> Result<u64> {
        Ok(self.estimate()?.dsp)
    }

    /// What the node model is specialized with.
    pub fn node_config(&self) -> NodeConfig {
        let cfg = self.config();
        NodeConfig {
            name: self.name.clone(),
            kernel: self.kernel.name().to_string(),
            simd: cfg.simd(),
            row_length: cfg.row_length(),
            input_format: cfg.input_format(),
            output_format: cfg.output_format(),
            ifm_dim: self.ifm_dim.clone(),
        }
    }

    /// Check an input tensor against the node shape.
    pub fn check_input(&self, input: &ArrayF32) -> Result<()> {
        if input.shape() != self.ifm_dim.as_slice() {
            return Err(qsmax_common::ExecutionError::InputShape {
                expected: self.ifm_dim.clone(),
                got: input.shape().to_vec(),
            }
            .into());
        }
        Ok(())
    }

    /// Prepare and run on the given backend.
    pub fn execute_with(&self, backend: &mut dyn ExecutionBackend, input: &ArrayF32) -> Result<ExecutionOutput> {
        info!(node = %self.name, mode = %backend.mode(), "executing node");
        backend.prepare(self)?;
        backend.execute(self, input)
    }

    /// Select the backend for `mode`, prepare it and run.
    pub fn execute(&self, mode: ExecMode, toolchain: &ToolchainConfig, input: &ArrayF32) -> Result<ExecutionOutput> {
        let mut backend = backend_for(mode, toolchain);
        self.execute_with(backend.as_mut(), input)
    }
}

impl std::fmt::Debug for QuantSoftmaxNode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("QuantSoftmaxNode")
            .field("name", &self.name)
            .field("kernel", &self.kernel.name())
            .field("ifm_dim", &self.ifm_dim)
            .field("config", self.config())
            .finish()
    }
}
