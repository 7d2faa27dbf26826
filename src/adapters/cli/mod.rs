//! CLI Adapter
//!
//! Command-line interface for the pairs research pipeline.
//! Uses clap derive macros for argument parsing.

mod commands;

pub use commands::{BacktestCmd, CliApp, Command, ScanCmd, SourceArgs, SynthCmd};

use anyhow::Result;

use crate::config::Config;
use crate::domain::CancellationToken;

/// Execute the CLI command
pub async fn execute(command: Command, config: Config, cancel: CancellationToken) -> Result<()> {
    commands::execute(command, config, cancel).await
}
