//! Execution backends
//!
//! A node runs on exactly one backend, chosen by [`ExecMode`]. Backends
//! are strategies over the node's [`KernelBehavior`](qsmax_kernels::KernelBehavior):
//! they decide where the kernel runs, never what it computes.

mod compiled;
mod cycle;
mod estimate;

pub use compiled::CompiledNumericBackend;
pub use cycle::{drive_simulation, CycleAccurateBackend, RtlSimulator, SimulationRun};
pub use estimate::EstimateBackend;

use crate::node::QuantSoftmaxNode;
use qsmax_common::{ExecMode, Result, ToolchainConfig};
use qsmax_kernels::CostEstimate;
use qsmax_npy::ArrayF32;

/// What a backend hands back.
#[derive(Debug, Clone, PartialEq)]
pub enum ExecutionOutput {
    /// Full output tensor in the node's normal shape.
    Tensor(ArrayF32),
    /// The simulation stopped before every output arrived.
    Truncated { data: Vec<f32>, expected: usize },
    /// No execution took place.
    Estimate(CostEstimate),
}

impl ExecutionOutput {
    pub fn into_tensor(self) -> Option<ArrayF32> {
        match self {
            Self::Tensor(t) => Some(t),
            _ => None,
        }
    }
}

pub trait ExecutionBackend {
    fn mode(&self) -> ExecMode;

    /// Generate and build whatever the backend needs for `node`.
    fn prepare(&mut self, node: &QuantSoftmaxNode) -> Result<()>;

    fn execute(&mut self, node: &QuantSoftmaxNode, input: &ArrayF32) -> Result<ExecutionOutput>;
}

/// Backend for a resolved mode.
pub fn backend_for(mode: ExecMode, toolchain: &ToolchainConfig) -> Box<dyn ExecutionBackend> {
    match mode {
        ExecMode::CompiledNumeric => Box::new(CompiledNumericBackend::new(toolchain.clone())),
        ExecMode::CycleAccurate => Box::new(CycleAccurateBackend::new(toolchain.drain_margin)),
        ExecMode::Estimate => Box::new(EstimateBackend),
    }
}

/// Backend for a mode name; unknown names are
/// [`QsmaxError::UnsupportedExecMode`](qsmax_common::QsmaxError::UnsupportedExecMode).
pub fn select_backend(mode: &str, toolchain: &ToolchainConfig) -> Result<Box<dyn ExecutionBackend>> {
    let mode: ExecMode = mode.parse()?;
    Ok(backend_for(mode, toolchain))
}

#[cfg(test)]
mod tests {
    use super::*;
    use qsmax_common::QsmaxError;

    #[test]
    fn selects_by_name() {
        let tc = ToolchainConfig::default();
        assert_eq!(select_backend("cppsim", &tc).unwrap().mode(), ExecMode::CompiledNumeric);
        assert_eq!(select_backend("rtlsim", &tc).unwrap().mode(), ExecMode::CycleAccurate);
        assert_eq!(select_backend("estimate", &tc).unwrap().mode(), ExecMode::Estimate);
    }

    #[test]
    fn unknown_mode_names_the_value() {
        let err = select_backend("hwemu", &ToolchainConfig::default()).err().unwrap();
        assert!(matches!(err, QsmaxError::UnsupportedExecMode(ref m) if m == "hwemu"));
    }
}
