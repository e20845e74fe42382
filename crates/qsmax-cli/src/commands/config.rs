use crate::exit::EXIT_SUCCESS;
use crate::toolchain::config_path;
use anyhow::{Context, Result};
use clap::Subcommand;
use qsmax_common::ToolchainConfig;
use std::path::Path;

#[derive(Subcommand, Debug)]
pub enum ConfigAction {
    /// Show the resolved configuration
    Show,
    /// Show the configuration file path
    Path,
    /// Print a default configuration file
    Default,
}

impl ConfigAction {
    pub fn execute(&self, explicit: Option<&Path>, toolchain: &ToolchainConfig) -> Result<i32> {
        match self {
            Self::Show => {
                let text = toml::to_string_pretty(toolchain).context("failed to serialize configuration")?;
                println!("{text}");
            }
            Self::Path => println!("{}", config_path(explicit).display()),
            Self::Default => println!("{}", ToolchainConfig::default_toml()),
        }
        Ok(EXIT_SUCCESS)
    }
}
