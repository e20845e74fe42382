//! Files shared between the host and the compiled node model.
//!
//! Each node owns a code generation directory holding:
//!
//! | file                  | written by | contents                          |
//! |-----------------------|------------|-----------------------------------|
//! | `node_config.toml`    | prepare    | [`NodeConfig`]                    |
//! | `build_manifest.toml` | build      | [`BuildManifest`]                 |
//! | `input_0.npy`         | execute    | input tensor in folded shape      |
//! | `output.npy`          | node model | output tensor in folded shape     |

use qsmax_common::{BuildError, ConfigError, FixedPointFormat, SoftmaxConfig};
use qsmax_kernels::{KernelBehavior, OnlineSoftmax, StreamingSoftmax};
use serde::{Deserialize, Serialize};
use std::hash::{Hash, Hasher};
use std::path::{Path, PathBuf};

pub const NODE_CONFIG_FILE: &str = "node_config.toml";
pub const BUILD_MANIFEST_FILE: &str = "build_manifest.toml";
pub const INPUT_FILE: &str = "input_0.npy";
pub const OUTPUT_FILE: &str = "output.npy";

/// Executable name looked up in the code generation directory when the
/// toolchain does not name one.
pub const DEFAULT_EXECUTABLE: &str = "node_model";

/// Everything the node model needs to specialize itself.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct NodeConfig {
    pub name: String,
    pub kernel: String,
    pub simd: usize,
    pub row_length: usize,
    pub input_format: FixedPointFormat,
    pub output_format: FixedPointFormat,
    pub ifm_dim: Vec<usize>,
}

impl NodeConfig {
    pub fn softmax_config(&self) -> Result<SoftmaxConfig, ConfigError> {
        let cfg = SoftmaxConfig::new(self.row_length, self.simd, self.input_format, self.output_format)?;
        cfg.check_shape(&self.ifm_dim)?;
        Ok(cfg)
    }

    /// Hash of the generated configuration.
    ///
    /// `DefaultHasher` output may change between Rust releases, so a
    /// manifest written by another toolchain reads as stale and needs a
    /// fresh `prepare`.
    pub fn fingerprint(&self) -> String {
        let mut hasher = std::collections::hash_map::DefaultHasher::new();
        self.hash(&mut hasher);
        format!("{:016x}", hasher.finish())
    }

    pub fn load(dir: &Path) -> Result<Self, BuildError> {
        read_toml(&dir.join(NODE_CONFIG_FILE))
    }

    pub fn store(&self, dir: &Path) -> Result<(), BuildError> {
        write_toml(&dir.join(NODE_CONFIG_FILE), self)
    }
}

/// Record of a successful build.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BuildManifest {
    pub fingerprint: String,
    pub executable: PathBuf,
}

impl BuildManifest {
    pub fn load(dir: &Path) -> Result<Self, BuildError> {
        let path = dir.join(BUILD_MANIFEST_FILE);
        if !path.exists() {
            return Err(BuildError::MissingArtifact { path });
        }
        read_toml(&path)
    }

    pub fn store(&self, dir: &Path) -> Result<(), BuildError> {
        write_toml(&dir.join(BUILD_MANIFEST_FILE), self)
    }
}

/// Instantiate a kernel by the name recorded in a [`NodeConfig`].
pub fn kernel_from_name(name: &str, config: SoftmaxConfig) -> Option<Box<dyn KernelBehavior>> {
    match name {
        StreamingSoftmax::NAME => Some(Box::new(StreamingSoftmax::new(config))),
        OnlineSoftmax::NAME => Some(Box::new(OnlineSoftmax::new(config))),
        _ => None,
    }
}

fn read_toml<T: serde::de::DeserializeOwned>(path: &Path) -> Result<T, BuildError> {
    let text = std::fs::read_to_string(path)?;
    toml::from_str(&text)
        .map_err(|e| BuildError::Manifest { path: path.to_path_buf(), reason: e.to_string() })
}

fn write_toml<T: Serialize>(path: &Path, value: &T) -> Result<(), BuildError> {
    let text = toml::to_string_pretty(value)
        .map_err(|e| BuildError::Manifest { path: path.to_path_buf(), reason: e.to_string() })?;
    std::fs::write(path, text)?;
    Ok(())
}
