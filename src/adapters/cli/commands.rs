//! CLI Command Handlers
//!
//! Implementation of the `scan`, `backtest` and `synth` commands.

use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

use crate::adapters::json_file::{save_matrix, JsonFileMarketData};
use crate::adapters::synthetic::{SyntheticConfig, SyntheticMarketData};
use crate::application::{Discovery, PairsPipeline, PipelineReport};
use crate::config::{load_config, Config};
use crate::domain::CancellationToken;
use crate::ports::{PriceMatrixProvider, PriceQuery};
use crate::strategy::PipelineConfig;

/// pairs-lab - Cointegration pairs research pipeline
#[derive(Parser, Debug)]
#[command(
    name = "pairs-lab",
    version = env!("CARGO_PKG_VERSION"),
    author = env!("CARGO_PKG_AUTHORS"),
    about = "Cointegration pairs research pipeline",
    long_about = "pairs-lab scans a price panel for cointegrated pairs, fits a mean-reverting \
                  spread model to each, and backtests a z-score entry/exit rule with costs."
)]
pub struct CliApp {
    /// The command to execute
    #[command(subcommand)]
    pub command: Command,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Enable debug logging
    #[arg(long, global = true)]
    pub debug: bool,
}

/// Available commands
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Find cointegrated pairs and rank them by half-life
    Scan(ScanCmd),

    /// Scan, then backtest the ranked pairs
    Backtest(BacktestCmd),

    /// Write a synthetic price panel to a JSON file
    Synth(SynthCmd),
}

impl Command {
    /// Configuration for the command; defaults when no file is given
    pub fn load_config(&self) -> Result<Config> {
        let path = match self {
            Command::Scan(cmd) => cmd.source.config.as_ref(),
            Command::Backtest(cmd) => cmd.source.config.as_ref(),
            Command::Synth(_) => None,
        };
        match path {
            Some(path) => load_config(path)
                .with_context(|| format!("Failed to load configuration from {}", path.display())),
            None => Ok(Config::default()),
        }
    }
}

/// Where prices come from
#[derive(Args, Debug)]
pub struct SourceArgs {
    /// Path to configuration file
    #[arg(short, long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// JSON price file (overrides [data] path)
    #[arg(long, value_name = "FILE")]
    pub data: Option<PathBuf>,

    /// File values are raw prices, not log prices
    #[arg(long)]
    pub raw_prices: bool,

    /// Use the seeded synthetic panel instead of a file
    #[arg(long, conflicts_with = "data")]
    pub synthetic: bool,

    /// Seed for --synthetic
    #[arg(long, value_name = "SEED", default_value = "7")]
    pub seed: u64,

    /// Restrict to these symbols (comma separated)
    #[arg(long, value_name = "SYMBOLS", value_delimiter = ',')]
    pub symbols: Vec<String>,

    /// Print JSON instead of a table
    #[arg(long)]
    pub json: bool,
}

/// Scan for cointegrated pairs
#[derive(Parser, Debug)]
pub struct ScanCmd {
    #[command(flatten)]
    pub source: SourceArgs,

    /// Override significance level
    #[arg(long, value_name = "LEVEL")]
    pub significance: Option<f64>,
}

/// Run the full pipeline
#[derive(Parser, Debug)]
pub struct BacktestCmd {
    #[command(flatten)]
    pub source: SourceArgs,

    /// Override entry z-score threshold
    #[arg(long, value_name = "Z")]
    pub entry_z: Option<f64>,

    /// Override exit z-score threshold
    #[arg(long, value_name = "Z")]
    pub exit_z: Option<f64>,

    /// Override rolling window
    #[arg(long, value_name = "PERIODS")]
    pub window: Option<usize>,

    /// Override cost per unit traded
    #[arg(long, value_name = "RATE")]
    pub cost_rate: Option<f64>,

    /// Backtest only the N fastest mean-reverting pairs
    #[arg(long, value_name = "N")]
    pub max_pairs: Option<usize>,

    /// Export the full report (including series) to JSON
    #[arg(long, value_name = "FILE")]
    pub export_json: Option<PathBuf>,
}

/// Generate synthetic data
#[derive(Parser, Debug)]
pub struct SynthCmd {
    /// Output JSON file
    #[arg(short, long, value_name = "FILE")]
    pub output: PathBuf,

    #[arg(long, value_name = "SEED", default_value = "7")]
    pub seed: u64,

    /// Number of daily observations
    #[arg(long, value_name = "N", default_value = "750")]
    pub observations: usize,

    /// Number of cointegrated pairs
    #[arg(long, value_name = "N", default_value = "2")]
    pub pairs: usize,

    /// Number of independent random walks
    #[arg(long, value_name = "N", default_value = "2")]
    pub independent: usize,
}

/// Execute the CLI command
pub async fn execute(command: Command, config: Config, cancel: CancellationToken) -> Result<()> {
    match command {
        Command::Scan(cmd) => scan_command(cmd, config, cancel).await,
        Command::Backtest(cmd) => backtest_command(cmd, config, cancel).await,
        Command::Synth(cmd) => synth_command(cmd).await,
    }
}

fn build_provider(source: &SourceArgs, config: &Config) -> Result<Box<dyn PriceMatrixProvider>> {
    if source.synthetic {
        let synthetic = SyntheticMarketData::new(SyntheticConfig {
            seed: source.seed,
            ..Default::default()
        })?;
        tracing::info!("Using synthetic panel (seed {})", source.seed);
        return Ok(Box::new(synthetic));
    }

    let path = match source.data.clone().or_else(|| config.data.resolved_path()) {
        Some(path) => path,
        None => bail!("No price data: pass --data, --synthetic, or set [data] path"),
    };
    tracing::info!("Using price file {}", path.display());
    Ok(Box::new(
        JsonFileMarketData::new(path).with_raw_prices(source.raw_prices || config.data.raw_prices),
    ))
}

fn build_query(source: &SourceArgs, config: &Config) -> PriceQuery {
    let mut query = config.data.query();
    if !source.symbols.is_empty() {
        query.symbols = source.symbols.clone();
    }
    query
}

/// Handle scan command
async fn scan_command(cmd: ScanCmd, config: Config, cancel: CancellationToken) -> Result<()> {
    let mut pipeline_config = PipelineConfig::from(&config);
    if let Some(level) = cmd.significance {
        pipeline_config = pipeline_config.with_significance(level);
    }
    pipeline_config
        .validate()
        .context("Invalid pipeline configuration")?;

    let provider = build_provider(&cmd.source, &config)?;
    let matrix = provider
        .fetch_log_prices(&build_query(&cmd.source, &config))
        .await
        .context("Failed to load prices")?;

    let pipeline = PairsPipeline::new(pipeline_config);
    let discovery = tokio::task::spawn_blocking(move || pipeline.discover(&matrix, &cancel))
        .await
        .context("Scan worker failed")??;

    if cmd.source.json {
        println!("{}", serde_json::to_string_pretty(&discovery)?);
    } else {
        print_discovery(&discovery);
    }
    Ok(())
}

/// Handle backtest command
async fn backtest_command(cmd: BacktestCmd, config: Config, cancel: CancellationToken) -> Result<()> {
    let mut pipeline_config = PipelineConfig::from(&config);
    if let Some(z) = cmd.entry_z {
        pipeline_config.signal.entry_z = z;
    }
    if let Some(z) = cmd.exit_z {
        pipeline_config.signal.exit_z = z;
    }
    if let Some(window) = cmd.window {
        pipeline_config = pipeline_config.with_window(window);
    }
    if let Some(rate) = cmd.cost_rate {
        pipeline_config = pipeline_config.with_cost_rate(rate);
    }
    if cmd.max_pairs.is_some() {
        pipeline_config.backtest.max_pairs = cmd.max_pairs;
    }

    let provider = build_provider(&cmd.source, &config)?;
    let query = build_query(&cmd.source, &config);

    let report = PairsPipeline::new(pipeline_config)
        .run_with_provider(provider.as_ref(), &query, &cancel)
        .await
        .context("Pipeline run failed")?;

    if let Some(ref path) = cmd.export_json {
        let json = serde_json::to_string_pretty(&report)?;
        tokio::fs::write(path, json)
            .await
            .with_context(|| format!("Failed to write {}", path.display()))?;
        tracing::info!("Report written to {}", path.display());
    }

    if cmd.source.json {
        println!("{}", serde_json::to_string_pretty(&report.rankings)?);
    } else {
        print_report(&report);
    }
    Ok(())
}

/// Handle synth command
async fn synth_command(cmd: SynthCmd) -> Result<()> {
    let synthetic = SyntheticMarketData::new(SyntheticConfig {
        seed: cmd.seed,
        observations: cmd.observations,
        cointegrated_pairs: cmd.pairs,
        independent: cmd.independent,
        ..Default::default()
    })?;
    let matrix = synthetic.generate()?;
    save_matrix(&cmd.output, &matrix)
        .await
        .with_context(|| format!("Failed to write {}", cmd.output.display()))?;

    println!(
        "Wrote {} symbols x {} observations to {}",
        matrix.symbol_count(),
        matrix.len(),
        cmd.output.display()
    );
    Ok(())
}

fn fmt_opt(value: Option<f64>, precision: usize) -> String {
    value.map_or_else(|| "n/a".to_string(), |v| format!("{:.*}", precision, v))
}

fn print_discovery(discovery: &Discovery) {
    let scan = &discovery.scan;
    println!(
        "Scan: {:?} - {} pairs, {} tested, {} accepted, {} rejected, {} failed{}",
        scan.status,
        scan.pairs_total,
        scan.pairs_tested,
        scan.accepted.len(),
        scan.rejected,
        discovery.failures.len(),
        if discovery.cancelled { " (cancelled)" } else { "" }
    );
    println!();
    println!(
        "{:<20} {:>9} {:>8} {:>8} {:>8} {:>10}",
        "PAIR", "ADF", "P-VALUE", "BETA", "THETA", "HALF-LIFE"
    );
    for c in &discovery.ranked {
        println!(
            "{:<20} {:>9.3} {:>8.4} {:>8.3} {:>8.4} {:>10}",
            c.pair.to_string(),
            c.test_statistic,
            c.p_value,
            c.hedge_ratio,
            c.theta,
            fmt_opt(c.half_life, 1)
        );
    }
    if !discovery.truncated.is_empty() {
        println!("{} more pairs past max_pairs", discovery.truncated.len());
    }
    for c in &discovery.excluded {
        println!("{:<20} excluded: not mean-reverting (theta {:.4})", c.pair.to_string(), c.theta);
    }
    for f in &discovery.failures {
        println!("{:<20} failed at {}: {}", f.pair.to_string(), f.stage, f.error);
    }
}

fn print_report(report: &PipelineReport) {
    println!(
        "Scan: {:?} - {} accepted of {} pairs, {} backtested, {} cut by max_pairs{}",
        report.scan.status,
        report.scan.accepted.len(),
        report.scan.pairs_total,
        report.backtests.len(),
        report.truncated.len(),
        if report.cancelled { " (cancelled)" } else { "" }
    );
    println!();
    println!(
        "{:<20} {:>10} {:>10} {:>10} {:>8} {:>10}",
        "PAIR", "CUM RET", "MEAN", "VOL", "SHARPE", "MAX DD"
    );
    for r in &report.rankings {
        let m = &r.report;
        println!(
            "{:<20} {:>10.4} {:>10.6} {:>10.6} {:>8} {:>10.4}",
            r.pair.to_string(),
            m.cumulative_return,
            m.daily_return,
            m.volatility,
            fmt_opt(m.sharpe_ratio, 2),
            m.max_drawdown
        );
    }
    for f in &report.failures {
        println!("{:<20} failed at {}: {}", f.pair.to_string(), f.stage, f.error);
    }
}
