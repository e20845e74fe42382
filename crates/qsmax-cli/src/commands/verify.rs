//! Generate a random input, execute the node and check it against the oracle

use super::NodeArgs;
use crate::exit::{EXIT_PARITY_FAIL, EXIT_SUCCESS};
use crate::parse::{parse_exec_mode, parse_shape};
use anyhow::{Context, Result};
use clap::Args;
use console::style;
use qsmax_common::{ExecMode, ToolchainConfig};
use qsmax_crossval::{gen_dt_tensor, reference_tensor, ParityReport, DEFAULT_TOLERANCE_STEPS};
use qsmax_exec::ExecutionOutput;
use qsmax_npy::ArrayF32;
use std::path::PathBuf;
use tracing::{info, warn};

#[derive(Args, Debug)]
pub struct VerifyCommand {
    /// Input shape, e.g. 2,384
    #[arg(long, value_parser = parse_shape)]
    pub shape: std::vec::Vec<usize>,

    #[command(flatten)]
    pub node: NodeArgs,

    /// Seed for the random input
    #[arg(long, default_value_t = 0)]
    pub seed: u64,

    /// Execution backend (cppsim, rtlsim); defaults to the config
    #[arg(long, value_parser = parse_exec_mode)]
    pub mode: Option<ExecMode>,

    /// Allowed difference in output quantization steps
    #[arg(long, default_value_t = DEFAULT_TOLERANCE_STEPS)]
    pub tolerance: f64,

    /// Print the parity report as JSON
    #[arg(long, default_value_t = false)]
    pub json: bool,

    /// Also write the parity report to this file
    #[arg(long, value_name = "PATH")]
    pub report: Option<PathBuf>,
}

impl VerifyCommand {
    pub fn execute(&self, toolchain: &ToolchainConfig) -> Result<i32> {
        let node = self.node.build(&self.shape)?;
        let mode = self.mode.unwrap_or(toolchain.exec_mode);
        let config = *node.config();

        let data = gen_dt_tensor(config.input_format(), &self.shape, self.seed);
        let input = ArrayF32::new(self.shape.clone(), data)?;
        let reference = reference_tensor(input.data(), config.row_length(), config.output_format())?;

        let mut report = ParityReport::new(node.kernel().name(), mode.name(), &config, &self.shape);
        report.set_seed(self.seed);
        report.set_tolerance(self.tolerance);

        let output = node
            .execute(mode, toolchain, &input)
            .with_context(|| format!("failed to execute {} in {mode} mode", node.name()))?;
        match output {
            ExecutionOutput::Tensor(tensor) => report.record(tensor.data(), &reference.values)?,
            ExecutionOutput::Truncated { data, expected } => {
                warn!(got = data.len(), expected, "output truncated, comparing the prefix");
                report.record(&data, &reference.values[..data.len()])?;
                report.elements = expected;
                report.passed = false;
            }
            ExecutionOutput::Estimate(_) => anyhow::bail!("{mode} mode produces no output to verify"),
        }

        if let Some(path) = &self.report {
            report.write_to_file(path).with_context(|| format!("failed to write {}", path.display()))?;
            info!(path = %path.display(), "parity report written");
        }

        if self.json {
            println!("{}", report.to_json()?);
        } else {
            let verdict = if report.passed { style("PASS").green() } else { style("FAIL").red() };
            println!(
                "{verdict} {} elements, {} mismatches, max diff {:.3} steps (tolerance {})",
                report.elements, report.mismatches, report.max_abs_diff_steps, report.tolerance_steps
            );
        }

        Ok(if report.passed { EXIT_SUCCESS } else { EXIT_PARITY_FAIL })
    }
}
