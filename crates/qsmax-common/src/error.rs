//! Error types for qsmax
//!
//! One enum per concern, composed into [`QsmaxError`]. Verification
//! mismatches against the reference are not represented here; they are
//! reported by the crossval crate.

use std::path::PathBuf;
use thiserror::Error;

/// Main error type for qsmax operations
#[derive(Debug, Error)]
pub enum QsmaxError {
    #[error("format error: {0}")]
    Format(#[from] FormatError),

    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("kernel error: {0}")]
    Kernel(#[from] KernelError),

    #[error("build error: {0}")]
    Build(#[from] BuildError),

    #[error("execution error: {0}")]
    Execution(#[from] ExecutionError),

    #[error("toolchain configuration error: {0}")]
    Toolchain(#[from] crate::toolchain::ToolchainConfigError),

    /// The requested backend exists but cannot realize this kernel.
    #[error("backend '{backend}' is not supported for kernel '{kernel}'")]
    UnsupportedBackend { kernel: String, backend: String },

    #[error("unsupported execution mode: {0}")]
    UnsupportedExecMode(String),

    #[error("array file error: {0}")]
    ArrayFile(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Fixed-point format errors
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum FormatError {
    #[error("bit width must be in 1..={max}, got {got}")]
    InvalidBitWidth { got: u32, max: u32 },

    #[error("fractional bits must be in -{max}..={max}, got {got}")]
    InvalidFractionalBits { got: i32, max: i32 },

    #[error("unknown datatype '{0}'")]
    UnknownDatatype(String),

    #[error("result needs {bits} bits, above the {max}-bit limit")]
    TooWide { bits: u32, max: u32 },
}

/// Kernel configuration errors, raised when a node is configured
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("simd must be at least 1")]
    ZeroSimd,

    #[error("row length must be at least 1")]
    ZeroRowLength,

    #[error("row length {row_length} is not divisible by simd {simd}")]
    NotDivisible { row_length: usize, simd: usize },

    #[error("simd {simd} exceeds row length {row_length}")]
    SimdExceedsRow { row_length: usize, simd: usize },

    #[error("input shape must have at least one dimension")]
    EmptyShape,

    #[error("innermost dimension {got} does not match row length {expected}")]
    ShapeMismatch { expected: usize, got: usize },
}

/// Errors raised while streaming data through the kernel
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum KernelError {
    #[error("stream holds {chunks} chunks, not a whole number of {chunks_per_row}-chunk rows")]
    TruncatedStream { chunks: usize, chunks_per_row: usize },

    #[error("chunk carries {got} lanes, expected {expected}")]
    LaneMismatch { expected: usize, got: usize },

    #[error("tensor holds {got} elements, not a multiple of row length {row_length}")]
    RaggedTensor { row_length: usize, got: usize },

    #[error("row has {got} elements, expected {expected}")]
    RowLength { expected: usize, got: usize },
}

/// Errors from preparing or checking the compiled node model
#[derive(Debug, Error)]
pub enum BuildError {
    #[error("compiled node model not found at {}", path.display())]
    MissingArtifact { path: PathBuf },

    #[error("compiled node model is stale: built for {found}, node is now {expected}")]
    StaleArtifact { expected: String, found: String },

    #[error("build command `{command}` failed ({status}): {diagnostic}")]
    ToolFailed { command: String, status: String, diagnostic: String },

    #[error("code generation directory is not set; prepare the node first")]
    NotPrepared,

    #[error("malformed build manifest {}: {reason}", path.display())]
    Manifest { path: PathBuf, reason: String },

    #[error("I/O error during build: {0}")]
    Io(#[from] std::io::Error),
}

/// Errors from running a prepared backend
#[derive(Debug, Error)]
pub enum ExecutionError {
    #[error("node model exited with {status}: {stderr}")]
    NonZeroExit { status: String, stderr: String },

    #[error("failed to launch {}: {source}", path.display())]
    Spawn {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("input has shape {got:?}, node expects {expected:?}")]
    InputShape { expected: Vec<usize>, got: Vec<usize> },

    #[error("output has shape {got:?}, expected {expected:?}")]
    OutputShape { expected: Vec<usize>, got: Vec<usize> },
}

/// Result type alias for qsmax operations
pub type Result<T> = std::result::Result<T, QsmaxError>;
