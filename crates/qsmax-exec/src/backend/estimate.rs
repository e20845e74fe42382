use super::{ExecutionBackend, ExecutionOutput};
use crate::node::QuantSoftmaxNode;
use qsmax_common::{ExecMode, Result};
use qsmax_npy::ArrayF32;
use tracing::debug;

/// Closed-form cycle and DSP figures; nothing runs.
#[derive(Debug, Default, Clone, Copy)]
pub struct EstimateBackend;

impl ExecutionBackend for EstimateBackend {
    fn mode(&self) -> ExecMode {
        ExecMode::Estimate
    }

    fn prepare(&mut self, _node: &QuantSoftmaxNode) -> Result<()> {
        Ok(())
    }

    fn execute(&mut self, node: &QuantSoftmaxNode, _input: &ArrayF32) -> Result<ExecutionOutput> {
        let estimate = node.estimate()?;
        debug!(cycles = estimate.cycles, dsp = estimate.dsp, "estimated node cost");
        Ok(ExecutionOutput::Estimate(estimate))
    }
}
