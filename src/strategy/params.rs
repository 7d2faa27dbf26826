//! Pipeline Parameters
//!
//! Configuration structs for the scan, fit, signal and backtest stages.
//! Defaults reproduce the research notebook: 5% significance, 21-day window,
//! enter at |z| > 2, exit at |z| < 0.5, 10 bps per unit traded, 252 days/year.

use serde::{Deserialize, Serialize};

/// Main pipeline configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct PipelineConfig {
    /// Cointegration scan settings
    pub scan: ScanConfig,
    /// Spread construction settings
    pub spread: SpreadConfig,
    /// Z-score signal settings
    pub signal: SignalConfig,
    /// PnL simulation settings
    pub backtest: BacktestConfig,
    /// Metric settings
    pub performance: PerformanceConfig,
    /// Worker settings shared by every per-pair stage
    pub execution: ExecutionConfig,
}

impl PipelineConfig {
    /// Create a new config with custom entry/exit thresholds
    pub fn with_thresholds(mut self, entry_z: f64, exit_z: f64) -> Self {
        self.signal.entry_z = entry_z;
        self.signal.exit_z = exit_z;
        self
    }

    /// Create a new config with custom rolling window
    pub fn with_window(mut self, window: usize) -> Self {
        self.signal.window = window;
        self
    }

    pub fn with_significance(mut self, level: f64) -> Self {
        self.scan.significance_level = level;
        self
    }

    pub fn with_cost_rate(mut self, rate: f64) -> Self {
        self.backtest.cost_rate = rate;
        self
    }

    pub fn with_intercept(mut self, include: bool) -> Self {
        self.spread.include_intercept = include;
        self
    }

    pub fn with_parallel(mut self, parallel: bool) -> Self {
        self.execution.parallel = parallel;
        self
    }

    /// Validate configuration parameters
    pub fn validate(&self) -> Result<(), ParamError> {
        self.scan.validate()?;
        self.signal.validate()?;
        self.backtest.validate()?;
        self.performance.validate()?;
        if self.scan.min_observations <= self.signal.window {
            return Err(ParamError::HistoryShorterThanWindow {
                min_observations: self.scan.min_observations,
                window: self.signal.window,
            });
        }
        Ok(())
    }
}

/// Cointegration scan configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScanConfig {
    /// Accept a pair when its p-value is strictly below this level
    pub significance_level: f64,
    /// Maximum ADF lag order; `None` uses ceil(12 * (n/100)^(1/4))
    pub max_lag: Option<usize>,
    /// Minimum overlapping observations for a pair to be tested
    pub min_observations: usize,
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            significance_level: 0.05,
            max_lag: None,
            min_observations: 60,
        }
    }
}

impl ScanConfig {
    pub fn validate(&self) -> Result<(), ParamError> {
        if !(self.significance_level > 0.0 && self.significance_level < 1.0) {
            return Err(ParamError::InvalidSignificance(self.significance_level));
        }
        if self.min_observations < 10 {
            return Err(ParamError::InvalidMinObservations(self.min_observations));
        }
        Ok(())
    }
}

/// Spread construction configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct SpreadConfig {
    /// Subtract the regression intercept from the spread (off by default)
    pub include_intercept: bool,
}

/// Signal state machine configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SignalConfig {
    /// Rolling window for the spread z-score
    pub window: usize,
    /// Enter when |z| exceeds this
    pub entry_z: f64,
    /// Exit when |z| falls below this
    pub exit_z: f64,
}

impl Default for SignalConfig {
    fn default() -> Self {
        Self {
            window: 21,
            entry_z: 2.0,
            exit_z: 0.5,
        }
    }
}

impl SignalConfig {
    pub fn validate(&self) -> Result<(), ParamError> {
        if self.window < 2 {
            return Err(ParamError::InvalidWindow(self.window));
        }
        if !(self.entry_z > 0.0 && self.entry_z.is_finite()) {
            return Err(ParamError::InvalidEntryThreshold(self.entry_z));
        }
        if !(self.exit_z >= 0.0 && self.exit_z < self.entry_z) {
            return Err(ParamError::InvalidExitThreshold {
                exit_z: self.exit_z,
                entry_z: self.entry_z,
            });
        }
        Ok(())
    }
}

/// PnL simulation configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BacktestConfig {
    /// Cost per unit of position change
    pub cost_rate: f64,
    /// Backtest only the N fastest mean-reverting pairs; `None` = all valid
    pub max_pairs: Option<usize>,
}

impl Default for BacktestConfig {
    fn default() -> Self {
        Self {
            cost_rate: 0.001,
            max_pairs: None,
        }
    }
}

impl BacktestConfig {
    pub fn validate(&self) -> Result<(), ParamError> {
        if !(self.cost_rate >= 0.0 && self.cost_rate.is_finite()) {
            return Err(ParamError::InvalidCostRate(self.cost_rate));
        }
        if self.max_pairs == Some(0) {
            return Err(ParamError::InvalidMaxPairs);
        }
        Ok(())
    }
}

/// Performance metric configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PerformanceConfig {
    /// Periods per year used to annualize the Sharpe ratio
    pub annualization: f64,
}

impl Default for PerformanceConfig {
    fn default() -> Self {
        Self {
            annualization: 252.0,
        }
    }
}

impl PerformanceConfig {
    pub fn validate(&self) -> Result<(), ParamError> {
        if !(self.annualization > 0.0 && self.annualization.is_finite()) {
            return Err(ParamError::InvalidAnnualization(self.annualization));
        }
        Ok(())
    }
}

/// Per-pair worker configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExecutionConfig {
    /// Run scan, fit and backtest pairs on the rayon pool
    pub parallel: bool,
}

impl Default for ExecutionConfig {
    fn default() -> Self {
        Self { parallel: true }
    }
}

/// Configuration validation errors
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ParamError {
    #[error("Invalid significance level: {0} (must be 0 < level < 1)")]
    InvalidSignificance(f64),
    #[error("Invalid min_observations: {0} (minimum 10)")]
    InvalidMinObservations(usize),
    #[error("Invalid rolling window: {0} (minimum 2)")]
    InvalidWindow(usize),
    #[error("Invalid entry threshold: {0} (must be > 0)")]
    InvalidEntryThreshold(f64),
    #[error("Invalid exit threshold: {exit_z} (must be 0 <= exit < entry = {entry_z})")]
    InvalidExitThreshold { exit_z: f64, entry_z: f64 },
    #[error("Invalid cost rate: {0} (must be >= 0)")]
    InvalidCostRate(f64),
    #[error("max_pairs must be at least 1")]
    InvalidMaxPairs,
    #[error("Invalid annualization factor: {0} (must be > 0)")]
    InvalidAnnualization(f64),
    #[error("min_observations ({min_observations}) must exceed the rolling window ({window})")]
    HistoryShorterThanWindow { min_observations: usize, window: usize },
}
