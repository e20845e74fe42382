//! Run a softmax node on an input array

use super::NodeArgs;
use crate::exit::EXIT_SUCCESS;
use crate::parse::parse_exec_mode;
use anyhow::{Context, Result};
use clap::Args;
use console::style;
use qsmax_common::{ExecMode, ToolchainConfig};
use qsmax_exec::ExecutionOutput;
use qsmax_npy::{read_npy, write_npy};
use std::path::PathBuf;
use tracing::info;

#[derive(Args, Debug)]
pub struct RunCommand {
    /// Input array (.npy), last dimension is the softmax row
    #[arg(long, value_name = "NPY")]
    pub input: PathBuf,

    /// Where to write the output array (not needed for estimate)
    #[arg(long, value_name = "NPY")]
    pub output: Option<PathBuf>,

    /// Execution backend (cppsim, rtlsim, estimate); defaults to the config
    #[arg(long, value_parser = parse_exec_mode)]
    pub mode: Option<ExecMode>,

    #[command(flatten)]
    pub node: NodeArgs,
}

impl RunCommand {
    pub fn execute(&self, toolchain: &ToolchainConfig) -> Result<i32> {
        let input = read_npy(&self.input).with_context(|| format!("failed to read {}", self.input.display()))?;
        let node = self.node.build(input.shape())?;
        let mode = self.mode.unwrap_or(toolchain.exec_mode);

        let output = node
            .execute(mode, toolchain, &input)
            .with_context(|| format!("failed to execute {} in {mode} mode", node.name()))?;

        match output {
            ExecutionOutput::Tensor(tensor) => {
                let path = self.output.as_ref().context("--output is required for an executing mode")?;
                write_npy(path, &tensor).with_context(|| format!("failed to write {}", path.display()))?;
                info!(path = %path.display(), elements = tensor.len(), "output written");
                println!("{} {} -> {}", style("✓").green(), node.name(), path.display());
            }
            ExecutionOutput::Estimate(estimate) => println!("{estimate}"),
            ExecutionOutput::Truncated { data, expected } => {
                anyhow::bail!("simulation stopped after {} of {expected} outputs", data.len());
            }
        }
        Ok(EXIT_SUCCESS)
    }
}
