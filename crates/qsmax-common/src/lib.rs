//! Common types for the qsmax streaming softmax kernel
//!
//! This crate provides the foundational types shared by the kernel, the
//! execution front-end and the cross-validation harness: fixed-point
//! formats, the immutable kernel configuration, the injected toolchain
//! configuration and the error hierarchy.

pub mod config;
pub mod datatype;
pub mod error;
pub mod fixed_point;
pub mod toolchain;

pub use config::*;
pub use error::*;
pub use fixed_point::{FixedPoint, FixedPointFormat, MAX_BIT_WIDTH, MAX_FRACTIONAL_BITS};
pub use toolchain::{ExecMode, LogFormat, LoggingConfig, ToolchainConfig};
