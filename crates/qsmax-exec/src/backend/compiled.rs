//! Out-of-process compiled numeric model.
//!
//! `prepare` generates the node configuration, runs the optional build
//! command and records the executable in a build manifest. `execute`
//! refuses to run an executable built for a different configuration,
//! exchanges tensors as `.npy` files in the code generation directory and
//! blocks until the process exits.

use super::{ExecutionBackend, ExecutionOutput};
use crate::artifact::{
    BuildManifest, NodeConfig, DEFAULT_EXECUTABLE, INPUT_FILE, OUTPUT_FILE,
};
use crate::node::QuantSoftmaxNode;
use qsmax_common::{BuildError, ExecMode, ExecutionError, Result, ToolchainConfig};
use qsmax_npy::{read_npy, write_npy, ArrayF32};
use std::path::{Path, PathBuf};
use std::process::Command;
use tracing::{debug, info};

#[derive(Debug, Clone)]
pub struct CompiledNumericBackend {
    toolchain: ToolchainConfig,
}

impl CompiledNumericBackend {
    pub fn new(toolchain: ToolchainConfig) -> Self {
        Self { toolchain }
    }

    pub fn code_gen_dir(&self, node: &QuantSoftmaxNode) -> PathBuf {
        self.toolchain.code_gen_dir(node.name())
    }

    /// Write `node_config.toml` into a fresh code generation directory.
    pub fn generate(&self, node: &QuantSoftmaxNode) -> Result<PathBuf> {
        let dir = self.code_gen_dir(node);
        std::fs::create_dir_all(&dir).map_err(BuildError::Io)?;
        node.node_config().store(&dir)?;
        debug!(dir = %dir.display(), "generated node configuration");
        Ok(dir)
    }

    /// Run the build command and record the executable.
    pub fn build(&self, node: &QuantSoftmaxNode) -> Result<BuildManifest> {
        let dir = self.code_gen_dir(node);
        if !dir.is_dir() {
            return Err(BuildError::NotPrepared.into());
        }
        if let Some((program, args)) = self.toolchain.build_command.split_first() {
            run_build_command(program, args, &dir)?;
        }

        let executable = self
            .toolchain
            .node_model
            .clone()
            .unwrap_or_else(|| dir.join(DEFAULT_EXECUTABLE));
        if !executable.is_file() {
            return Err(BuildError::MissingArtifact { path: executable }.into());
        }

        let manifest = BuildManifest { fingerprint: NodeConfig::load(&dir)?.fingerprint(), executable };
        manifest.store(&dir)?;
        info!(node = node.name(), executable = %manifest.executable.display(), "node model ready");
        Ok(manifest)
    }

    /// Manifest for `node`, checked against its current configuration.
    fn verified_manifest(&self, node: &QuantSoftmaxNode, dir: &Path) -> Result<BuildManifest> {
        let manifest = BuildManifest::load(dir)?;
        let expected = node.node_config().fingerprint();
        if manifest.fingerprint != expected {
            return Err(BuildError::StaleArtifact { expected, found: manifest.fingerprint }.into());
        }
        if !manifest.executable.is_file() {
            return Err(BuildError::MissingArtifact { path: manifest.executable }.into());
        }
        Ok(manifest)
    }
}

fn run_build_command(program: &str, args: &[String], dir: &Path) -> Result<()> {
    let command = std::iter::once(program.to_string())
        .chain(args.iter().cloned())
        .collect::<Vec<_>>()
        .join(" ");
    debug!(%command, "running build command");

    let output = Command::new(program).args(args).current_dir(dir).output().map_err(|e| {
        BuildError::ToolFailed { command: command.clone(), status: "not started".into(), diagnostic: e.to_string() }
    })?;
    if !output.status.success() {
        return Err(BuildError::ToolFailed {
            command,
            status: output.status.to_string(),
            diagnostic: String::from_utf8_lossy(&output.stderr).trim().to_string(),
        }
        .into());
    }
    Ok(())
}

impl ExecutionBackend for CompiledNumericBackend {
    fn mode(&self) -> ExecMode {
        ExecMode::CompiledNumeric
    }

    fn prepare(&mut self, node: &QuantSoftmaxNode) -> Result<()> {
        self.generate(node)?;
        self.build(node)?;
        Ok(())
    }

    fn execute(&mut self, node: &QuantSoftmaxNode, input: &ArrayF32) -> Result<ExecutionOutput> {
        node.check_input(input)?;
        let dir = self.code_gen_dir(node);
        let manifest = self.verified_manifest(node, &dir)?;

        let folded = input.clone().reshape(node.folded_input_shape())?;
        write_npy(&dir.join(INPUT_FILE), &folded)?;
        let output_path = dir.join(OUTPUT_FILE);
        if output_path.exists() {
            std::fs::remove_file(&output_path)?;
        }

        debug!(executable = %manifest.executable.display(), "launching node model");
        let output = Command::new(&manifest.executable)
            .arg(&dir)
            .output()
            .map_err(|source| ExecutionError::Spawn { path: manifest.executable.clone(), source })?;
        if !output.status.success() {
            return Err(ExecutionError::NonZeroExit {
                status: output.status.to_string(),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            }
            .into());
        }

        let result = read_npy(&output_path)?;
        let expected = node.normal_output_shape().to_vec();
        if result.len() != expected.iter().product::<usize>() {
            return Err(ExecutionError::OutputShape { expected, got: result.shape().to_vec() }.into());
        }
        Ok(ExecutionOutput::Tensor(result.reshape(expected)?))
    }
}
