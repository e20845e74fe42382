//! Cycle-accurate backend: fail-fast for the softmax kernel, and the
//! drive loop against a delay-line simulator.

use qsmax_common::{
    ExecMode, FixedPointFormat, QsmaxError, SoftmaxConfig, ToolchainConfig,
};
use qsmax_exec::{
    drive_simulation, CycleAccurateBackend, ExecutionBackend, ExecutionOutput, QuantSoftmaxNode,
    RtlSimulator,
};
use qsmax_kernels::{Chunk, KernelBehavior, PackedWord, RowBuffer, RowStatistics};
use qsmax_npy::ArrayF32;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

// ── test doubles ──────────────────────────────────────────────────────────

/// Words reappear on the output port `latency` toggles after acceptance.
struct DelayLine {
    latency: u64,
    now: u64,
    pending: Option<PackedWord>,
    in_flight: VecDeque<(u64, PackedWord)>,
    ready: VecDeque<PackedWord>,
    calls: Arc<AtomicUsize>,
}

impl DelayLine {
    fn new(latency: u64) -> Self {
        Self::counting(latency, Arc::new(AtomicUsize::new(0)))
    }

    fn counting(latency: u64, calls: Arc<AtomicUsize>) -> Self {
        Self { latency, now: 0, pending: None, in_flight: VecDeque::new(), ready: VecDeque::new(), calls }
    }
}

impl RtlSimulator for DelayLine {
    fn reset(&mut self) {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.now = 0;
        self.pending = None;
        self.in_flight.clear();
        self.ready.clear();
    }

    fn toggle_clk(&mut self) {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.now += 1;
        if let Some(word) = self.pending.take() {
            self.in_flight.push_back((self.now + self.latency, word));
        }
        while self.in_flight.front().is_some_and(|(at, _)| *at <= self.now) {
            if let Some((_, word)) = self.in_flight.pop_front() {
                self.ready.push_back(word);
            }
        }
    }

    fn offer_input(&mut self, word: &PackedWord) -> bool {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.pending.is_some() {
            return false;
        }
        self.pending = Some(word.clone());
        true
    }

    fn take_output(&mut self) -> Option<PackedWord> {
        self.ready.pop_front()
    }
}

/// Identity kernel with a register-transfer realization.
struct PassThrough {
    config: SoftmaxConfig,
}

impl KernelBehavior for PassThrough {
    fn name(&self) -> &str {
        "PassThrough"
    }

    fn config(&self) -> &SoftmaxConfig {
        &self.config
    }

    fn compute_statistics(&self, _row: &RowBuffer) -> RowStatistics {
        RowStatistics { max: 0.0, sum: 1.0 }
    }

    fn emit(&self, row: &RowBuffer, _stats: RowStatistics) -> Vec<Chunk> {
        row.replay().cloned().collect()
    }

    fn supports_cycle_accurate(&self) -> bool {
        true
    }
}

fn int8() -> FixedPointFormat {
    FixedPointFormat::int(8).unwrap()
}

fn pass_through_node() -> QuantSoftmaxNode {
    let config = SoftmaxConfig::new(8, 2, int8(), int8()).unwrap();
    QuantSoftmaxNode::with_kernel("PassThrough_0", vec![2, 8], Box::new(PassThrough { config })).unwrap()
}

fn ramp() -> ArrayF32 {
    ArrayF32::new(vec![2, 8], (0..16).map(|i| i as f32 - 8.0).collect()).unwrap()
}

// ── softmax is not supported ──────────────────────────────────────────────

#[test]
fn softmax_rtlsim_fails_fast_without_touching_files() {
    let tmp = tempfile::tempdir().unwrap();
    let tc = ToolchainConfig { work_root: tmp.path().join("work"), ..ToolchainConfig::default() };
    let cfg = SoftmaxConfig::new(384, 1, int8(), FixedPointFormat::probability(8, true).unwrap()).unwrap();
    let node = QuantSoftmaxNode::new("QuantSoftmax_0", vec![1, 384], cfg).unwrap();
    let input = ArrayF32::new(vec![1, 384], vec![0.0; 384]).unwrap();

    let err = node.execute(ExecMode::CycleAccurate, &tc, &input).unwrap_err();
    match err {
        QsmaxError::UnsupportedBackend { kernel, backend } => {
            assert_eq!(kernel, "QuantSoftmax");
            assert_eq!(backend, "rtlsim");
        }
        other => panic!("expected UnsupportedBackend, got {other:?}"),
    }
    assert!(!tmp.path().join("work").exists());
}

#[test]
fn softmax_rtlsim_never_drives_the_simulator() {
    let calls = Arc::new(AtomicUsize::new(0));
    let mut backend = CycleAccurateBackend::new(16).with_simulator(Box::new(DelayLine::counting(1, calls.clone())));
    let cfg = SoftmaxConfig::new(384, 1, int8(), FixedPointFormat::probability(8, true).unwrap()).unwrap();
    let node = QuantSoftmaxNode::new("QuantSoftmax_0", vec![1, 384], cfg).unwrap();

    assert!(matches!(backend.prepare(&node), Err(QsmaxError::UnsupportedBackend { .. })));
    let input = ArrayF32::new(vec![1, 384], vec![0.0; 384]).unwrap();
    assert!(matches!(backend.execute(&node, &input), Err(QsmaxError::UnsupportedBackend { .. })));
    assert_eq!(calls.load(Ordering::SeqCst), 0);
}

// ── drive loop ────────────────────────────────────────────────────────────

#[test]
fn supported_kernel_round_trips_through_simulator() {
    let node = pass_through_node();
    let mut backend = CycleAccurateBackend::new(8).with_simulator(Box::new(DelayLine::new(3)));
    let out = node.execute_with(&mut backend, &ramp()).unwrap();
    assert_eq!(out, ExecutionOutput::Tensor(ramp()));
}

#[test]
fn under_driven_simulation_truncates() {
    let node = pass_through_node();
    // 13-cycle cost budget, no margin, 10-cycle latency
    let mut backend = CycleAccurateBackend::new(0).with_simulator(Box::new(DelayLine::new(10)));
    match node.execute_with(&mut backend, &ramp()).unwrap() {
        ExecutionOutput::Truncated { data, expected } => {
            assert_eq!(expected, 16);
            assert!(data.len() < expected);
            assert_eq!(data, ramp().data()[..data.len()].to_vec());
        }
        other => panic!("expected truncated output, got {other:?}"),
    }
}

#[test]
fn drive_stops_at_budget() {
    let words: Vec<PackedWord> = (0..8).map(|_| PackedWord::zeroed(16)).collect();
    let mut sim = DelayLine::new(0);
    let run = drive_simulation(&mut sim, &words, 8, 5);
    assert_eq!(run.cycles, 5);
    assert_eq!(run.outputs.len(), 5);
}

#[test]
fn drive_stops_once_all_outputs_arrive() {
    let words: Vec<PackedWord> = (0..4).map(|_| PackedWord::zeroed(16)).collect();
    let mut sim = DelayLine::new(2);
    let run = drive_simulation(&mut sim, &words, 4, 1_000);
    assert_eq!(run.outputs.len(), 4);
    assert!(run.cycles < 10, "ran {} cycles", run.cycles);
}

#[test]
fn missing_simulator_is_not_prepared() {
    let mut backend = CycleAccurateBackend::new(0);
    let err = backend.prepare(&pass_through_node()).unwrap_err();
    assert!(matches!(err, QsmaxError::Build(qsmax_common::BuildError::NotPrepared)));
}
