//! Shared pieces of the qsmax binaries.

pub mod commands;
pub mod exit;
pub mod logging;
pub mod parse;
pub mod toolchain;
