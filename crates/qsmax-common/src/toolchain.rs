//! Toolchain configuration for the execution backends.
//!
//! Loads [`ToolchainConfig`] from a TOML file (`qsmax.toml`) with
//! environment variable overrides via `QSMAX_*` prefixed variables. The
//! configuration is resolved once at startup and handed to the backends;
//! nothing below the CLI reads the environment.

use crate::error::QsmaxError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

/// Execution backend selector.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum ExecMode {
    /// Out-of-process compiled numeric model.
    CompiledNumeric,
    /// Clocked register-transfer simulation.
    CycleAccurate,
    /// Closed-form cycle and resource estimate; nothing runs.
    Estimate,
}

impl ExecMode {
    pub const ALL: [ExecMode; 3] = [Self::CompiledNumeric, Self::CycleAccurate, Self::Estimate];

    pub fn name(&self) -> &'static str {
        match self {
            Self::CompiledNumeric => "cppsim",
            Self::CycleAccurate => "rtlsim",
            Self::Estimate => "estimate",
        }
    }
}

impl fmt::Display for ExecMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for ExecMode {
    type Err = QsmaxError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "cppsim" | "compiled" => Ok(Self::CompiledNumeric),
            "rtlsim" | "cycle" => Ok(Self::CycleAccurate),
            "estimate" => Ok(Self::Estimate),
            _ => Err(QsmaxError::UnsupportedExecMode(s.to_string())),
        }
    }
}

impl From<ExecMode> for String {
    fn from(mode: ExecMode) -> Self {
        mode.name().to_string()
    }
}

impl TryFrom<String> for ExecMode {
    type Error = QsmaxError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

/// Log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    Pretty,
    Compact,
    Json,
}

impl FromStr for LogFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "pretty" => Ok(Self::Pretty),
            "compact" => Ok(Self::Compact),
            "json" => Ok(Self::Json),
            other => Err(format!("unknown log format: {other}")),
        }
    }
}

/// Logging section.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Override: `QSMAX_LOG_LEVEL`
    pub level: String,
    pub format: LogFormat,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self { level: "info".to_string(), format: LogFormat::Compact }
    }
}

const LOG_LEVELS: [&str; 5] = ["trace", "debug", "info", "warn", "error"];

/// Paths and knobs for the external tooling behind the backends.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ToolchainConfig {
    /// Directory under which per-node code generation directories live.
    /// Override: `QSMAX_WORK_ROOT`
    pub work_root: PathBuf,

    /// Compiled node-model executable.
    /// Override: `QSMAX_NODE_MODEL`
    pub node_model: Option<PathBuf>,

    /// Command run before the executable is checked (program + args).
    /// Empty means the node model is prebuilt.
    /// Override: `QSMAX_BUILD_COMMAND` (whitespace separated)
    pub build_command: Vec<String>,

    /// Backend used when the caller does not pick one.
    /// Override: `QSMAX_EXEC_MODE`
    pub exec_mode: ExecMode,

    /// Extra clock toggles granted to the cycle simulation after the
    /// cost-model budget.
    /// Override: `QSMAX_DRAIN_MARGIN`
    pub drain_margin: u64,

    pub logging: LoggingConfig,
}

impl Default for ToolchainConfig {
    fn default() -> Self {
        Self {
            work_root: std::env::temp_dir().join("qsmax"),
            node_model: None,
            build_command: Vec::new(),
            exec_mode: ExecMode::CompiledNumeric,
            drain_margin: 16,
            logging: LoggingConfig::default(),
        }
    }
}

/// Errors that can occur when loading or validating a [`ToolchainConfig`].
#[derive(Debug, thiserror::Error)]
pub enum ToolchainConfigError {
    #[error("failed to read config file: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to parse TOML: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("validation failed: {0}")]
    Validation(String),
    #[error("invalid environment override {key}={value}: {reason}")]
    EnvOverride { key: String, value: String, reason: String },
}

impl ToolchainConfig {
    /// Generate a default configuration TOML string.
    pub fn default_toml() -> String {
        toml::to_string_pretty(&Self::default()).unwrap_or_default()
    }

    /// Load from a TOML file, apply environment overrides, validate.
    pub fn load(path: &Path) -> Result<Self, ToolchainConfigError> {
        tracing::debug!(path = %path.display(), "loading toolchain config");
        let contents = std::fs::read_to_string(path)?;
        Self::from_toml(&contents)
    }

    /// Load from a TOML string, apply environment overrides, validate.
    pub fn from_toml(toml_str: &str) -> Result<Self, ToolchainConfigError> {
        let mut cfg: ToolchainConfig = toml::from_str(toml_str)?;
        cfg.apply_env_overrides()?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// Defaults plus environment overrides.
    pub fn from_env() -> Result<Self, ToolchainConfigError> {
        let mut cfg = Self::default();
        cfg.apply_env_overrides()?;
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn validate(&self) -> Result<(), ToolchainConfigError> {
        if self.work_root.as_os_str().is_empty() {
            return Err(ToolchainConfigError::Validation("work_root must not be empty".into()));
        }
        if matches!(&self.node_model, Some(p) if p.as_os_str().is_empty()) {
            return Err(ToolchainConfigError::Validation(
                "node_model must not be an empty path".into(),
            ));
        }
        if self.build_command.first().is_some_and(|p| p.trim().is_empty()) {
            return Err(ToolchainConfigError::Validation(
                "build_command program must not be empty".into(),
            ));
        }
        if !LOG_LEVELS.contains(&self.logging.level.to_lowercase().as_str()) {
            return Err(ToolchainConfigError::Validation(format!(
                "logging.level must be one of {LOG_LEVELS:?}, got {}",
                self.logging.level
            )));
        }
        Ok(())
    }

    /// Apply `QSMAX_*` environment variable overrides.
    pub fn apply_env_overrides(&mut self) -> Result<(), ToolchainConfigError> {
        if let Ok(val) = std::env::var("QSMAX_WORK_ROOT") {
            self.work_root = PathBuf::from(val);
        }

        if let Ok(val) = std::env::var("QSMAX_NODE_MODEL") {
            self.node_model = Some(PathBuf::from(val));
        }

        if let Ok(val) = std::env::var("QSMAX_BUILD_COMMAND") {
            self.build_command = val.split_whitespace().map(str::to_string).collect();
        }

        if let Ok(val) = std::env::var("QSMAX_EXEC_MODE") {
            self.exec_mode =
                val.parse::<ExecMode>().map_err(|e| ToolchainConfigError::EnvOverride {
                    key: "QSMAX_EXEC_MODE".into(),
                    value: val.clone(),
                    reason: e.to_string(),
                })?;
        }

        if let Ok(val) = std::env::var("QSMAX_DRAIN_MARGIN") {
            self.drain_margin =
                val.parse::<u64>().map_err(|e| ToolchainConfigError::EnvOverride {
                    key: "QSMAX_DRAIN_MARGIN".into(),
                    value: val.clone(),
                    reason: e.to_string(),
                })?;
        }

        if let Ok(val) = std::env::var("QSMAX_LOG_LEVEL") {
            self.logging.level = val;
        }

        Ok(())
    }

    /// Code generation directory for a named node.
    pub fn code_gen_dir(&self, node_name: &str) -> PathBuf {
        self.work_root.join(format!("code_gen_cppsim_{node_name}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    const ALL_VARS: [&str; 6] = [
        "QSMAX_WORK_ROOT",
        "QSMAX_NODE_MODEL",
        "QSMAX_BUILD_COMMAND",
        "QSMAX_EXEC_MODE",
        "QSMAX_DRAIN_MARGIN",
        "QSMAX_LOG_LEVEL",
    ];

    fn with_only<F: FnOnce()>(set: &[(&str, &str)], f: F) {
        let vars: Vec<(&str, Option<&str>)> = ALL_VARS
            .iter()
            .map(|k| (*k, set.iter().find(|(name, _)| name == k).map(|(_, v)| *v)))
            .collect();
        temp_env::with_vars(vars, f);
    }

    #[test]
    fn test_default_config_is_valid() {
        assert!(ToolchainConfig::default().validate().is_ok());
    }

    #[test]
    fn test_default_toml_round_trips() {
        let cfg: ToolchainConfig = toml::from_str(&ToolchainConfig::default_toml()).unwrap();
        assert_eq!(cfg, ToolchainConfig::default());
    }

    #[test]
    #[serial(qsmax_env)]
    fn test_from_toml_partial() {
        with_only(&[], || {
            let cfg = ToolchainConfig::from_toml(
                r#"
work_root = "/tmp/qsmax-build"
node_model = "/opt/qsmax/bin/qsmax-node-model"
exec_mode = "estimate"

[logging]
format = "json"
"#,
            )
            .unwrap();
            assert_eq!(cfg.work_root, PathBuf::from("/tmp/qsmax-build"));
            assert_eq!(cfg.exec_mode, ExecMode::Estimate);
            assert_eq!(cfg.logging.format, LogFormat::Json);
            assert_eq!(cfg.logging.level, "info");
            assert_eq!(cfg.drain_margin, 16);
        });
    }

    #[test]
    fn test_unknown_exec_mode_in_toml() {
        let err = toml::from_str::<ToolchainConfig>("exec_mode = \"hwemu\"").unwrap_err();
        assert!(err.to_string().contains("unsupported execution mode: hwemu"), "got: {err}");
    }

    #[test]
    fn test_validation_rejects_bad_log_level() {
        let mut cfg = ToolchainConfig::default();
        cfg.logging.level = "loud".into();
        let err = cfg.validate().unwrap_err();
        assert!(err.to_string().contains("logging.level"));
    }

    #[test]
    fn test_validation_rejects_empty_paths() {
        let mut cfg = ToolchainConfig::default();
        cfg.work_root = PathBuf::new();
        assert!(cfg.validate().is_err());

        let mut cfg = ToolchainConfig::default();
        cfg.node_model = Some(PathBuf::new());
        assert!(cfg.validate().is_err());
    }

    #[test]
    #[serial(qsmax_env)]
    fn test_env_overrides() {
        with_only(
            &[
                ("QSMAX_WORK_ROOT", "/scratch/qsmax"),
                ("QSMAX_NODE_MODEL", "/usr/local/bin/qsmax-node-model"),
                ("QSMAX_BUILD_COMMAND", "cargo build --bin qsmax-node-model"),
                ("QSMAX_EXEC_MODE", "rtlsim"),
                ("QSMAX_DRAIN_MARGIN", "64"),
                ("QSMAX_LOG_LEVEL", "debug"),
            ],
            || {
                let cfg = ToolchainConfig::from_env().unwrap();
                assert_eq!(cfg.work_root, PathBuf::from("/scratch/qsmax"));
                assert_eq!(cfg.node_model, Some(PathBuf::from("/usr/local/bin/qsmax-node-model")));
                assert_eq!(cfg.build_command, ["cargo", "build", "--bin", "qsmax-node-model"]);
                assert_eq!(cfg.exec_mode, ExecMode::CycleAccurate);
                assert_eq!(cfg.drain_margin, 64);
                assert_eq!(cfg.logging.level, "debug");
            },
        );
    }

    #[test]
    #[serial(qsmax_env)]
    fn test_env_override_invalid_mode() {
        with_only(&[("QSMAX_EXEC_MODE", "hwemu")], || match ToolchainConfig::from_env() {
            Err(ToolchainConfigError::EnvOverride { key, value, .. }) => {
                assert_eq!(key, "QSMAX_EXEC_MODE");
                assert_eq!(value, "hwemu");
            }
            other => panic!("expected EnvOverride, got: {other:?}"),
        });
    }

    #[test]
    #[serial(qsmax_env)]
    fn test_env_override_invalid_margin() {
        with_only(&[("QSMAX_DRAIN_MARGIN", "-1")], || {
            let err = ToolchainConfig::from_env().unwrap_err();
            assert!(matches!(err, ToolchainConfigError::EnvOverride { .. }));
        });
    }

    #[test]
    #[serial(qsmax_env)]
    fn test_load_from_tempfile() {
        with_only(&[], || {
            let dir = tempfile::tempdir().unwrap();
            let path = dir.path().join("qsmax.toml");
            std::fs::write(&path, ToolchainConfig::default_toml()).unwrap();
            assert_eq!(ToolchainConfig::load(&path).unwrap(), ToolchainConfig::default());
        });
    }

    #[test]
    fn test_load_nonexistent_file() {
        let result = ToolchainConfig::load(Path::new("/nonexistent/qsmax.toml"));
        assert!(matches!(result, Err(ToolchainConfigError::Io(_))));
    }

    #[test]
    fn test_exec_mode_names_round_trip() {
        for mode in ExecMode::ALL {
            assert_eq!(mode.to_string().parse::<ExecMode>().unwrap(), mode);
        }
        assert_eq!("compiled".parse::<ExecMode>().unwrap(), ExecMode::CompiledNumeric);
    }

    #[test]
    fn test_code_gen_dir_is_per_node() {
        let mut cfg = ToolchainConfig::default();
        cfg.work_root = PathBuf::from("/w");
        assert_eq!(cfg.code_gen_dir("QuantSoftmax_0"), PathBuf::from("/w/code_gen_cppsim_QuantSoftmax_0"));
    }
}
