//! Cycle and resource estimate without running anything

use super::NodeArgs;
use crate::exit::EXIT_SUCCESS;
use crate::parse::parse_shape;
use anyhow::{Context, Result};
use clap::Args;

#[derive(Args, Debug)]
pub struct EstimateCommand {
    /// Input shape, e.g. 1,128
    #[arg(long, value_parser = parse_shape)]
    pub shape: std::vec::Vec<usize>,

    #[command(flatten)]
    pub node: NodeArgs,

    /// Print the estimate as JSON
    #[arg(long, default_value_t = false)]
    pub json: bool,
}

impl EstimateCommand {
    pub fn execute(&self) -> Result<i32> {
        let node = self.node.build(&self.shape)?;
        let estimate = node.estimate()?;
        if self.json {
            println!("{}", serde_json::to_string_pretty(&estimate).context("failed to serialize estimate")?);
        } else {
            println!("{estimate}");
        }
        Ok(EXIT_SUCCESS)
    }
}
