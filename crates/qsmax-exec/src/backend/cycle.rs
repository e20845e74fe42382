//! Clocked register-transfer simulation.
//!
//! Inputs and outputs cross the simulator boundary only between clock
//! toggles. The harness grants `cost_cycles + drain_margin` toggles; a
//! design that has not produced every output by then yields a truncated
//! result rather than an error.

use super::{ExecutionBackend, ExecutionOutput};
use crate::node::QuantSoftmaxNode;
use qsmax_common::{BuildError, ExecMode, QsmaxError, Result};
use qsmax_kernels::{pack_chunk, pack_row, split_rows, unpack_chunk, unpack_row, PackedWord};
use qsmax_npy::ArrayF32;
use tracing::{debug, warn};

/// A compiled simulation object with one input and one output stream.
pub trait RtlSimulator: Send {
    fn reset(&mut self);

    fn toggle_clk(&mut self);

    /// Present a word on the input port; `true` if it was accepted.
    fn offer_input(&mut self, word: &PackedWord) -> bool;

    /// Pop a word from the output port if one is valid.
    fn take_output(&mut self) -> Option<PackedWord>;
}

/// Result of one bounded drive.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SimulationRun {
    pub outputs: Vec<PackedWord>,
    pub cycles: u64,
}

/// Reset, then clock inputs in until `expected` outputs arrive or the
/// budget runs out.
pub fn drive_simulation(
    sim: &mut dyn RtlSimulator,
    inputs: &[PackedWord],
    expected: usize,
    budget: u64,
) -> SimulationRun {
    sim.reset();
    sim.toggle_clk();

    let mut next = 0;
    let mut outputs = Vec::with_capacity(expected);
    let mut cycles = 0;
    while cycles < budget && outputs.len() < expected {
        if next < inputs.len() && sim.offer_input(&inputs[next]) {
            next += 1;
        }
        sim.toggle_clk();
        cycles += 1;
        while let Some(word) = sim.take_output() {
            outputs.push(word);
        }
    }

    if outputs.len() < expected {
        warn!(got = outputs.len(), expected, budget, "simulation budget exhausted before all outputs");
    }
    SimulationRun { outputs, cycles }
}

pub struct CycleAccurateBackend {
    drain_margin: u64,
    simulator: Option<Box<dyn RtlSimulator>>,
}

impl CycleAccurateBackend {
    pub fn new(drain_margin: u64) -> Self {
        Self { drain_margin, simulator: None }
    }

    /// Attach a compiled simulation object.
    pub fn with_simulator(mut self, simulator: Box<dyn RtlSimulator>) -> Self {
        self.simulator = Some(simulator);
        self
    }

    fn require_support(&self, node: &QuantSoftmaxNode) -> Result<()> {
        if !node.kernel().supports_cycle_accurate() {
            return Err(QsmaxError::UnsupportedBackend {
                kernel: node.kernel().name().to_string(),
                backend: ExecMode::CycleAccurate.to_string(),
            });
        }
        Ok(())
    }
}

impl ExecutionBackend for CycleAccurateBackend {
    fn mode(&self) -> ExecMode {
        ExecMode::CycleAccurate
    }

    fn prepare(&mut self, node: &QuantSoftmaxNode) -> Result<()> {
        self.require_support(node)?;
        if self.simulator.is_none() {
            return Err(BuildError::NotPrepared.into());
        }
        Ok(())
    }

    fn execute(&mut self, node: &QuantSoftmaxNode, input: &ArrayF32) -> Result<ExecutionOutput> {
        self.require_support(node)?;
        node.check_input(input)?;
        let sim = self.simulator.as_deref_mut().ok_or(BuildError::NotPrepared)?;

        let config = node.config();
        let mut words = Vec::new();
        for row in split_rows(input.data(), config.row_length())? {
            words.extend(pack_row(row, config)?.iter().map(pack_chunk));
        }

        let budget = node.exp_cycles()? + self.drain_margin;
        let run = drive_simulation(sim, &words, words.len(), budget);
        debug!(cycles = run.cycles, outputs = run.outputs.len(), "simulation finished");

        let chunks: Vec<_> = run
            .outputs
            .iter()
            .map(|w| unpack_chunk(w, config.output_format(), config.simd()))
            .collect();
        let mut data = unpack_row(&chunks);
        let expected = input.len();
        data.truncate(expected);
        if data.len() < expected {
            return Ok(ExecutionOutput::Truncated { data, expected });
        }
        Ok(ExecutionOutput::Tensor(ArrayF32::new(node.normal_output_shape().to_vec(), data)?))
    }
}
