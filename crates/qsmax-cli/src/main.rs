//! qsmax CLI
//!
//! Runs, estimates and verifies the streaming quantized softmax node.

use anyhow::Result;
use clap::{CommandFactory, Parser, Subcommand};
use clap_complete::{generate, Shell};
use qsmax_cli::commands::{ConfigAction, EstimateCommand, RunCommand, VerifyCommand};
use qsmax_cli::exit::{exit_code_for, EXIT_GENERIC_FAIL, EXIT_SUCCESS};
use qsmax_cli::logging::setup_logging;
use qsmax_cli::toolchain::load_toolchain;
use qsmax_common::LogFormat;
use std::io;
use std::path::PathBuf;
use tracing::error;

#[derive(Parser)]
#[command(name = "qsmax")]
#[command(about = "Streaming quantized softmax kernel toolkit")]
#[command(long_about = r#"
Runs a quantized two-pass softmax node on one of three backends and checks
it against a double-precision reference.

Examples:
  # Run on the compiled numeric model
  qsmax run --input x.npy --output y.npy --simd 4 --idt INT8 --odt 'FIXED<8,1>'

  # Cycle and DSP estimate
  qsmax estimate --shape 1,128 --simd 4

  # Parity check against the oracle
  qsmax verify --shape 4,384 --simd 3 --idt INT9 --odt 'FIXED<16,1>' --seed 7
"#)]
#[command(version)]
struct Cli {
    /// Toolchain configuration file
    #[arg(short, long, value_name = "PATH", global = true)]
    config: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, value_name = "LEVEL", global = true)]
    log_level: Option<String>,

    /// Log format (pretty, compact, json)
    #[arg(long, value_name = "FORMAT", global = true)]
    log_format: Option<LogFormat>,

    /// Generate shell completions
    #[arg(long, value_name = "SHELL")]
    completions: Option<Shell>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Execute a node on an input array
    Run(RunCommand),

    /// Print the cycle and DSP estimate for a shape
    Estimate(EstimateCommand),

    /// Compare a backend against the reference oracle
    Verify(VerifyCommand),

    /// Inspect the toolchain configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

fn main() {
    let cli = Cli::parse();

    if let Some(shell) = cli.completions {
        generate_completions(shell);
        return;
    }

    let code = match run(cli) {
        Ok(code) => code,
        Err(e) => {
            error!("Command failed: {}", e);
            for cause in e.chain().skip(1) {
                error!("  Caused by: {}", cause);
            }
            exit_code_for(&e)
        }
    };
    std::process::exit(code);
}

fn run(cli: Cli) -> Result<i32> {
    let toolchain = match load_toolchain(cli.config.as_deref()) {
        Ok(toolchain) => toolchain,
        Err(e) => {
            // No subscriber yet
            eprintln!("error: {e:#}");
            return Ok(EXIT_GENERIC_FAIL);
        }
    };
    setup_logging(&toolchain.logging, cli.log_level.as_deref(), cli.log_format)?;

    match cli.command {
        Some(Commands::Run(cmd)) => cmd.execute(&toolchain),
        Some(Commands::Estimate(cmd)) => cmd.execute(),
        Some(Commands::Verify(cmd)) => cmd.execute(&toolchain),
        Some(Commands::Config { action }) => action.execute(cli.config.as_deref(), &toolchain),
        None => {
            Cli::command().print_help()?;
            Ok(EXIT_SUCCESS)
        }
    }
}

fn generate_completions(shell: Shell) {
    let mut cmd = Cli::command();
    let name = cmd.get_name().to_string();
    generate(shell, &mut cmd, name, &mut io::stdout());
}
