//! CLI command implementations

pub mod config;
pub mod estimate;
pub mod run;
pub mod verify;

pub use config::ConfigAction;
pub use estimate::EstimateCommand;
pub use run::RunCommand;
pub use verify::VerifyCommand;

use crate::parse::parse_datatype;
use anyhow::{Context, Result};
use clap::Args;
use qsmax_common::{FixedPointFormat, SoftmaxConfig};
use qsmax_exec::artifact::kernel_from_name;
use qsmax_exec::QuantSoftmaxNode;
use qsmax_kernels::StreamingSoftmax;

/// Node options shared by every command that builds a node.
#[derive(Args, Debug, Clone)]
pub struct NodeArgs {
    /// Elements processed in parallel per chunk
    #[arg(long, default_value_t = 1)]
    pub simd: usize,

    /// Input datatype (INTn, UINTn, FIXED<w,i>, ...)
    #[arg(long, value_name = "DATATYPE", value_parser = parse_datatype, default_value = "INT8")]
    pub idt: FixedPointFormat,

    /// Output datatype
    #[arg(long, value_name = "DATATYPE", value_parser = parse_datatype, default_value = "FIXED<8,1>")]
    pub odt: FixedPointFormat,

    /// Kernel variant (QuantSoftmax, QuantSoftmaxOnline)
    #[arg(long, default_value = StreamingSoftmax::NAME)]
    pub kernel: String,

    /// Node name, used for the code generation directory
    #[arg(long, default_value = "QuantSoftmax_0")]
    pub name: String,
}

impl NodeArgs {
    /// Node for a tensor whose last dimension is the row.
    pub fn build(&self, shape: &[usize]) -> Result<QuantSoftmaxNode> {
        let row_length = shape.last().copied().context("input shape is empty")?;
        let config = SoftmaxConfig::new(row_length, self.simd, self.idt, self.odt)
            .with_context(|| format!("invalid node configuration for shape {shape:?}"))?;
        let kernel = kernel_from_name(&self.kernel, config)
            .with_context(|| format!("unknown kernel '{}'", self.kernel))?;
        Ok(QuantSoftmaxNode::with_kernel(self.name.clone(), shape.to_vec(), kernel)?)
    }
}
