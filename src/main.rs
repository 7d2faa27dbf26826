//! pairs-lab - Cointegration Pairs Research CLI

use anyhow::Result;
use clap::Parser;
use tracing_subscriber::{fmt, EnvFilter};

use pairs_lab::adapters::cli::{self, CliApp};
use pairs_lab::domain::CancellationToken;

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if it exists (PAIRS_LAB_DATA, RUST_LOG)
    dotenvy::dotenv().ok();

    let app = CliApp::parse();
    let config = app.command.load_config()?;
    init_logging(app.verbose, app.debug, &config.logging.level)?;

    // Setup Ctrl+C handler
    let cancel = CancellationToken::new();
    let token = cancel.clone();
    tokio::spawn(async move {
        tokio::signal::ctrl_c().await.ok();
        tracing::info!("Shutdown signal received, finishing current pairs");
        token.cancel();
    });

    cli::execute(app.command, config, cancel).await
}

fn init_logging(verbose: bool, debug: bool, default_level: &str) -> Result<()> {
    let filter = if debug {
        EnvFilter::new("debug")
    } else if verbose {
        EnvFilter::new("info")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level))
    };

    fmt().with_env_filter(filter).with_writer(std::io::stderr).init();
    Ok(())
}
