//! Backtest Layer - PnL replay and performance metrics
//!
//! - `PnlSimulator`: lagged-execution PnL of a position series on a spread
//! - `PerformanceEvaluator`: Sharpe, drawdown and return summary
//! - `rank_by_sharpe`: orders per-pair reports, undefined Sharpe last

pub mod performance;
pub mod pnl;

pub use performance::{
    cumulative_returns, drawdowns, rank_by_sharpe, EvaluationError, PairReport,
    PerformanceEvaluator, PerformanceReport,
};
pub use pnl::{PnlSeries, PnlSimulator};
