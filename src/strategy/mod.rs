//! Strategy Layer - Cointegration, Spread Modeling and Z-Score Signals
//!
//! Statistical core of the pipeline:
//! - Engle-Granger cointegration scan with MacKinnon p-values
//! - OLS hedge ratio and spread construction
//! - OU (Ornstein-Uhlenbeck) fit of the spread for speed and half-life
//! - Half-life ranking of candidate pairs
//! - Rolling z-score and the entry/exit position state machine

pub mod cointegration;
pub mod ou_process;
pub mod params;
pub mod ranker;
pub mod regression;
pub mod signal;
pub mod spread;
pub mod zscore_gate;

pub use cointegration::{
    adf_test, default_max_lag, engle_granger, mackinnon_critical_values, mackinnon_p_value,
    AdfResult, CointegrationResult, CointegrationScanner, CriticalValues, ScanError, ScanReport,
    ScanStatus,
};
pub use ou_process::{MeanReversionModel, OUParams};
pub use params::{
    BacktestConfig, ExecutionConfig, ParamError, PerformanceConfig, PipelineConfig, ScanConfig,
    SignalConfig, SpreadConfig,
};
pub use ranker::{PairRanker, RankedPairs};
pub use regression::{ols, ones, EstimationError, OlsFit};
pub use signal::{SignalGenerator, SignalSeries};
pub use spread::{compute_spread, SpreadEstimator, SpreadFit};
pub use zscore_gate::{rolling_zscore, ZScoreGate, ZScoreResult};
