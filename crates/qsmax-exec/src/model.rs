//! The compiled numeric routine behind the `qsmax-node-model` executable.
//!
//! Reads `node_config.toml` and `input_0.npy` from a code generation
//! directory, streams every row through the configured kernel and writes
//! `output.npy` in the folded output shape.

use crate::artifact::{kernel_from_name, NodeConfig, INPUT_FILE, OUTPUT_FILE};
use qsmax_common::{BuildError, ExecutionError, Result};
use qsmax_kernels::{folded_shape, process_tensor, unpack_row};
use qsmax_npy::{read_npy, write_npy, ArrayF32};
use std::path::Path;
use tracing::{debug, info};

pub fn run_node_model(dir: &Path) -> Result<()> {
    let node_config = NodeConfig::load(dir)?;
    let config = node_config.softmax_config()?;
    let kernel = kernel_from_name(&node_config.kernel, config).ok_or_else(|| BuildError::Manifest {
        path: dir.join(crate::artifact::NODE_CONFIG_FILE),
        reason: format!("unknown kernel '{}'", node_config.kernel),
    })?;

    let folded = folded_shape(&node_config.ifm_dim, &config)?;
    let input = read_npy(&dir.join(INPUT_FILE))?;
    if input.shape() != folded.as_slice() {
        return Err(ExecutionError::InputShape { expected: folded, got: input.shape().to_vec() }.into());
    }
    debug!(node = %node_config.name, kernel = kernel.name(), shape = ?folded, "node model input loaded");

    let chunks = process_tensor(kernel.as_ref(), input.data())?;
    let output = ArrayF32::new(folded, unpack_row(&chunks))?;
    write_npy(&dir.join(OUTPUT_FILE), &output)?;

    info!(node = %node_config.name, elements = output.len(), "node model finished");
    Ok(())
}
