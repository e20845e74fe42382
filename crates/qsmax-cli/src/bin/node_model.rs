//! Compiled numeric node model.
//!
//! Usage: `qsmax-node-model <code_gen_dir>`. Reads `node_config.toml` and
//! `input_0.npy` from the directory and writes `output.npy` beside them.

use qsmax_cli::exit::{EXIT_GENERIC_FAIL, EXIT_SUCCESS};
use qsmax_cli::logging::setup_logging;
use qsmax_common::{LogFormat, LoggingConfig};
use std::path::PathBuf;

fn main() {
    let logging = LoggingConfig { level: "warn".to_string(), format: LogFormat::Compact };
    if let Err(e) = setup_logging(&logging, None, None) {
        eprintln!("{e}");
    }

    let Some(dir) = std::env::args_os().nth(1).map(PathBuf::from) else {
        eprintln!("usage: qsmax-node-model <code_gen_dir>");
        std::process::exit(EXIT_GENERIC_FAIL);
    };

    match qsmax_exec::run_node_model(&dir) {
        Ok(()) => std::process::exit(EXIT_SUCCESS),
        Err(e) => {
            eprintln!("{e}");
            std::process::exit(EXIT_GENERIC_FAIL);
        }
    }
}
