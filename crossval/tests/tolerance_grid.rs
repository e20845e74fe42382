//! Kernel output against the f64 oracle over the parity grid.

use proptest::prelude::*;
use qsmax_common::{FixedPointFormat, SoftmaxConfig};
use qsmax_crossval::{
    compare_within_steps, gen_dt_tensor, reference_quantized, reference_tensor, ParityReport,
    DEFAULT_TOLERANCE_STEPS,
};
use qsmax_kernels::{process_tensor, unpack_raw, unpack_row, OnlineSoftmax, StreamingSoftmax};

const ROWS: usize = 3;

fn input_formats() -> Vec<FixedPointFormat> {
    ["INT8", "INT9", "INT16"].iter().map(|n| n.parse().unwrap()).collect()
}

fn output_formats() -> Vec<FixedPointFormat> {
    [8, 16].iter().map(|&bits| FixedPointFormat::probability(bits, true).unwrap()).collect()
}

fn grid() -> impl Iterator<Item = SoftmaxConfig> {
    let mut configs = Vec::new();
    for row_length in [384, 1536] {
        for simd in (1..=4).filter(|s| row_length % s == 0) {
            for idt in input_formats() {
                for odt in output_formats() {
                    configs.push(SoftmaxConfig::new(row_length, simd, idt, odt).unwrap());
                }
            }
        }
    }
    configs.into_iter()
}

#[test]
fn streaming_kernel_matches_oracle_within_two_steps() {
    for (seed, cfg) in grid().enumerate() {
        let shape = [ROWS, cfg.row_length()];
        let input = gen_dt_tensor(cfg.input_format(), &shape, seed as u64);
        let kernel = StreamingSoftmax::new(cfg);

        let output = unpack_row(&process_tensor(&kernel, &input).unwrap());
        let reference = reference_tensor(&input, cfg.row_length(), cfg.output_format()).unwrap();

        compare_within_steps(&output, &reference.values, cfg.output_format(), DEFAULT_TOLERANCE_STEPS)
            .unwrap_or_else(|e| panic!("{cfg:?}: {e}"));
    }
}

#[test]
fn parity_report_passes_for_grid_corner() {
    let cfg = SoftmaxConfig::new(
        1536,
        3,
        "INT16".parse().unwrap(),
        FixedPointFormat::probability(16, true).unwrap(),
    )
    .unwrap();
    let shape = [2, 1536];
    let input = gen_dt_tensor(cfg.input_format(), &shape, 42);
    let output = unpack_row(&process_tensor(&StreamingSoftmax::new(cfg), &input).unwrap());
    let reference = reference_tensor(&input, 1536, cfg.output_format()).unwrap();

    let mut report = ParityReport::new(StreamingSoftmax::NAME, "in-process", &cfg, &shape);
    report.set_seed(42);
    report.record(&output, &reference.values).unwrap();
    assert!(report.passed, "{}", report.to_json().unwrap());
    assert_eq!(report.elements, 3072);
}

#[test]
fn online_kernel_matches_oracle_within_two_steps() {
    let cfg = SoftmaxConfig::new(
        384,
        4,
        "INT9".parse().unwrap(),
        FixedPointFormat::probability(16, true).unwrap(),
    )
    .unwrap();
    let input = gen_dt_tensor(cfg.input_format(), &[ROWS, 384], 11);
    let output = unpack_row(&process_tensor(&OnlineSoftmax::new(cfg), &input).unwrap());
    let reference = reference_tensor(&input, 384, cfg.output_format()).unwrap();
    compare_within_steps(&output, &reference.values, cfg.output_format(), DEFAULT_TOLERANCE_STEPS).unwrap();
}

#[test]
fn small_integer_rows_agree_on_raw_values() {
    // Spread wide enough that every probability is far from a rounding edge
    let cfg = SoftmaxConfig::new(4, 2, "INT8".parse().unwrap(), FixedPointFormat::probability(8, true).unwrap())
        .unwrap();
    let row = [0.0, 0.0, -100.0, -100.0];
    let raw = unpack_raw(&process_tensor(&StreamingSoftmax::new(cfg), &row).unwrap());
    assert_eq!(raw, reference_quantized(&row, cfg.output_format()).raw);
    assert_eq!(raw, vec![64, 64, 0, 0]);
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn random_rows_stay_within_tolerance(
        simd in 1usize..=4,
        folds in 1usize..=16,
        seed in any::<u64>(),
        wide_output in any::<bool>(),
    ) {
        let idt: FixedPointFormat = "INT8".parse().unwrap();
        let odt = FixedPointFormat::probability(if wide_output { 16 } else { 8 }, true).unwrap();
        let cfg = SoftmaxConfig::new(simd * folds, simd, idt, odt).unwrap();
        let input = gen_dt_tensor(idt, &[2, simd * folds], seed);

        let output = unpack_row(&process_tensor(&StreamingSoftmax::new(cfg), &input).unwrap());
        let reference = reference_tensor(&input, simd * folds, odt).unwrap();
        prop_assert!(compare_within_steps(&output, &reference.values, odt, DEFAULT_TOLERANCE_STEPS).is_ok());
    }
}
