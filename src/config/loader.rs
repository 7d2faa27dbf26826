//! Configuration Loader
//!
//! Loads and validates pipeline configuration from a TOML file. Every section
//! and every key is optional; missing values take the library defaults.

use chrono::{DateTime, Utc};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::ports::PriceQuery;
use crate::strategy::params::{
    BacktestConfig, ExecutionConfig, ParamError, PerformanceConfig, PipelineConfig, ScanConfig,
    SignalConfig, SpreadConfig,
};

/// Environment variable that overrides `[data] path`
pub const DATA_PATH_ENV: &str = "PAIRS_LAB_DATA";

/// Main configuration structure matching pipeline.toml
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub scan: ScanConfig,
    pub spread: SpreadConfig,
    pub signal: SignalConfig,
    pub backtest: BacktestConfig,
    pub performance: PerformanceConfig,
    pub execution: ExecutionConfig,
    pub data: DataSection,
    pub logging: LoggingSection,
}

/// Price data source section
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct DataSection {
    /// JSON price file; `~` is expanded
    pub path: Option<String>,
    /// File holds raw prices rather than log prices
    pub raw_prices: bool,
    /// Symbols to load, in column order; empty loads every symbol
    pub symbols: Vec<String>,
    pub start: Option<DateTime<Utc>>,
    pub end: Option<DateTime<Utc>>,
}

impl DataSection {
    /// Get data path with environment variable override
    /// Checks PAIRS_LAB_DATA env var first, falls back to config value
    pub fn resolved_path(&self) -> Option<PathBuf> {
        let raw = std::env::var(DATA_PATH_ENV).ok().or_else(|| self.path.clone())?;
        Some(PathBuf::from(shellexpand::tilde(&raw).into_owned()))
    }

    /// Symbol and time filters as a provider query
    pub fn query(&self) -> PriceQuery {
        PriceQuery {
            symbols: self.symbols.clone(),
            start: self.start,
            end: self.end,
        }
    }
}

/// Logging configuration section
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LoggingSection {
    /// Default filter when neither -v nor --debug is given:
    /// "trace", "debug", "info", "warn", "error"
    pub level: String,
}

impl Default for LoggingSection {
    fn default() -> Self {
        Self {
            level: "warn".to_string(),
        }
    }
}

/// Configuration errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    IoError(#[from] std::io::Error),
    #[error("Failed to parse TOML: {0}")]
    ParseError(#[from] toml::de::Error),
    #[error("Validation failed: {0}")]
    ValidationError(#[from] ParamError),
}

/// Load configuration from a TOML file
pub fn load_config<P: AsRef<Path>>(path: P) -> Result<Config, ConfigError> {
    let content = std::fs::read_to_string(path)?;
    let config: Config = toml::from_str(&content)?;
    config.validate()?;
    Ok(config)
}

impl Config {
    /// Validate all pipeline parameters
    pub fn validate(&self) -> Result<(), ConfigError> {
        PipelineConfig::from(self).validate()?;
        Ok(())
    }
}

impl From<&Config> for PipelineConfig {
    fn from(config: &Config) -> Self {
        PipelineConfig {
            scan: config.scan.clone(),
            spread: config.spread.clone(),
            signal: config.signal.clone(),
            backtest: config.backtest.clone(),
            performance: config.performance.clone(),
            execution: config.execution.clone(),
        }
    }
}
