//! Locating and loading the toolchain configuration.

use anyhow::{Context, Result};
use qsmax_common::ToolchainConfig;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

pub const DEFAULT_CONFIG_FILE: &str = "qsmax.toml";
pub const NODE_MODEL_BIN: &str = "qsmax-node-model";

/// `--config`, else `QSMAX_CONFIG`, else `./qsmax.toml`.
pub fn config_path(explicit: Option<&Path>) -> PathBuf {
    if let Some(path) = explicit {
        return path.to_path_buf();
    }
    std::env::var_os("QSMAX_CONFIG")
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_FILE))
}

/// Load the configuration once for the whole process.
///
/// An explicitly named file must exist; the default file is optional.
pub fn load_toolchain(explicit: Option<&Path>) -> Result<ToolchainConfig> {
    let path = config_path(explicit);
    let mut config = if path.is_file() {
        ToolchainConfig::load(&path).with_context(|| format!("failed to load {}", path.display()))?
    } else if explicit.is_some() {
        anyhow::bail!("config file not found: {}", path.display());
    } else {
        info!("no {} found, using defaults", path.display());
        ToolchainConfig::from_env().context("invalid QSMAX_* environment override")?
    };

    if config.node_model.is_none() && config.build_command.is_empty() {
        config.node_model = sibling_node_model();
    }
    Ok(config)
}

/// The node model binary installed next to the running executable.
fn sibling_node_model() -> Option<PathBuf> {
    let exe = std::env::current_exe().ok()?;
    let candidate = exe.with_file_name(format!("{NODE_MODEL_BIN}{}", std::env::consts::EXE_SUFFIX));
    if candidate.is_file() {
        debug!(path = %candidate.display(), "using sibling node model");
        Some(candidate)
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    #[test]
    #[serial(qsmax_env)]
    fn explicit_path_wins() {
        assert_eq!(config_path(Some(Path::new("a.toml"))), PathBuf::from("a.toml"));
    }

    #[test]
    fn missing_explicit_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = load_toolchain(Some(&dir.path().join("none.toml"))).unwrap_err();
        assert!(err.to_string().contains("config file not found"));
    }

    #[test]
    #[serial(qsmax_env)]
    fn loads_explicit_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("qsmax.toml");
        std::fs::write(&path, "drain_margin = 64\nnode_model = \"/opt/model\"\n").unwrap();
        let cfg = load_toolchain(Some(&path)).unwrap();
        assert_eq!(cfg.drain_margin, 64);
        assert_eq!(cfg.node_model, Some(PathBuf::from("/opt/model")));
    }
}
