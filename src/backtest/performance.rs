//! Performance Metrics
//!
//! Aggregates a net PnL series (spread log-return units per step) into:
//! - final cumulative return (running sum)
//! - mean return per step and its sample standard deviation
//! - annualized Sharpe ratio, undefined when volatility is zero
//! - maximum drawdown of the cumulative curve (<= 0)

use serde::Serialize;
use std::cmp::Ordering;
use thiserror::Error;

use crate::domain::PairKey;

/// Volatility below this is treated as zero
const MIN_VOLATILITY: f64 = 1e-12;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum EvaluationError {
    #[error("Need at least 2 PnL observations, got {0}")]
    TooFewObservations(usize),
    #[error("Non-finite PnL at index {0}")]
    NonFinite(usize),
}

/// Summary metrics for one PnL series
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PerformanceReport {
    pub cumulative_return: f64,
    /// Mean PnL per step
    pub daily_return: f64,
    /// Sample standard deviation of PnL per step
    pub volatility: f64,
    /// `None` when volatility is zero
    pub sharpe_ratio: Option<f64>,
    /// Most negative drawdown, 0 if the curve never fell below its peak
    pub max_drawdown: f64,
    pub observations: usize,
}

/// Report tagged with its pair
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PairReport {
    pub pair: PairKey,
    pub report: PerformanceReport,
}

/// Running sum
pub fn cumulative_returns(pnl: &[f64]) -> Vec<f64> {
    pnl.iter()
        .scan(0.0, |acc, r| {
            *acc += r;
            Some(*acc)
        })
        .collect()
}

/// Distance of each point below the running peak (values <= 0)
pub fn drawdowns(cumulative: &[f64]) -> Vec<f64> {
    let mut peak = f64::NEG_INFINITY;
    cumulative
        .iter()
        .map(|&c| {
            peak = peak.max(c);
            c - peak
        })
        .collect()
}

#[derive(Debug, Clone, Copy)]
pub struct PerformanceEvaluator {
    annualization: f64,
}

impl Default for PerformanceEvaluator {
    fn default() -> Self {
        Self {
            annualization: 252.0,
        }
    }
}

impl PerformanceEvaluator {
    pub fn new(annualization: f64) -> Self {
        Self { annualization }
    }

    pub fn evaluate(&self, net_pnl: &[f64]) -> Result<PerformanceReport, EvaluationError> {
        let n = net_pnl.len();
        if n < 2 {
            return Err(EvaluationError::TooFewObservations(n));
        }
        if let Some(i) = net_pnl.iter().position(|v| !v.is_finite()) {
            return Err(EvaluationError::NonFinite(i));
        }

        let cumulative = cumulative_returns(net_pnl);
        let max_drawdown = drawdowns(&cumulative)
            .into_iter()
            .fold(0.0_f64, f64::min);

        let mean = net_pnl.iter().sum::<f64>() / n as f64;
        let variance = net_pnl.iter().map(|r| (r - mean).powi(2)).sum::<f64>() / (n - 1) as f64;
        let volatility = variance.sqrt();

        let sharpe_ratio = if volatility < MIN_VOLATILITY {
            None
        } else {
            Some(mean / volatility * self.annualization.sqrt())
        };

        Ok(PerformanceReport {
            cumulative_return: cumulative.last().copied().unwrap_or(0.0),
            daily_return: mean,
            volatility,
            sharpe_ratio,
            max_drawdown,
            observations: n,
        })
    }
}

/// Sort descending by Sharpe; undefined Sharpe last, ties keep input order.
pub fn rank_by_sharpe(mut reports: Vec<PairReport>) -> Vec<PairReport> {
    reports.sort_by(|a, b| match (a.report.sharpe_ratio, b.report.sharpe_ratio) {
        (Some(x), Some(y)) => y.total_cmp(&x),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    });
    reports
}
