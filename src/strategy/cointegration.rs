//! Engle-Granger Cointegration Scan
//!
//! Two-step test for every unordered symbol pair:
//! 1. OLS of leg A on a constant and leg B
//! 2. ADF unit-root test (no deterministic term) on the residuals, lag
//!    order chosen by AIC
//!
//! The residual ADF statistic is mapped to a p-value with MacKinnon's
//! (1994) approximate asymptotic distribution for two variables with a
//! constant. Critical values use MacKinnon (2010) response surfaces.

use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::domain::{
    CancellationToken, PairFailure, PairKey, PipelineStage, PriceMatrix,
};
use crate::strategy::params::{ParamError, ScanConfig};
use crate::strategy::regression::{ols, ones, EstimationError};

/// Above this R² the first-stage regression is treated as an exact fit
const COLLINEAR_R2: f64 = 1.0 - 100.0 * 1.490_116_119_384_765_6e-8;

/// MacKinnon (1994) p-value surface, N = 2, constant term
const TAU_MAX: f64 = 0.92;
const TAU_MIN: f64 = -18.86;
const TAU_STAR: f64 = -2.62;
const TAU_SMALL_P: [f64; 3] = [2.92, 1.5012, 3.9796e-2];
const TAU_LARGE_P: [f64; 4] = [2.1945, 6.4695e-1, -2.9198e-1, -4.2377e-2];

/// MacKinnon (2010) critical value surfaces, N = 2, constant term: 1%, 5%, 10%
const CRIT_SURFACE: [[f64; 3]; 3] = [
    [-3.89644, -10.9519, -33.527],
    [-3.33613, -6.1101, -6.823],
    [-3.04445, -4.2412, -2.720],
];

/// Residual ADF test outcome
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AdfResult {
    /// t-statistic of the lagged level
    pub statistic: f64,
    /// Number of lagged differences in the final regression
    pub used_lag: usize,
    /// Observations in the final regression
    pub nobs: usize,
}

/// Finite-sample critical values of the Engle-Granger statistic
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CriticalValues {
    pub one_pct: f64,
    pub five_pct: f64,
    pub ten_pct: f64,
}

/// Engle-Granger test result for one pair
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CointegrationResult {
    pub pair: PairKey,
    /// Position in enumeration order
    pub scan_index: usize,
    pub statistic: f64,
    pub p_value: f64,
    pub critical_values: CriticalValues,
    pub used_lag: usize,
    pub nobs: usize,
}

/// Default ADF lag cap: ceil(12 * (n / 100)^(1/4))
pub fn default_max_lag(n: usize) -> usize {
    (12.0 * (n as f64 / 100.0).powf(0.25)).ceil() as usize
}

/// Standard normal CDF
fn normal_cdf(z: f64) -> f64 {
    use statrs::function::erf::erf;
    0.5 * (1.0 + erf(z / std::f64::consts::SQRT_2))
}

fn polyval(coefficients: &[f64], x: f64) -> f64 {
    coefficients.iter().rev().fold(0.0, |acc, c| acc * x + c)
}

/// Approximate p-value of an Engle-Granger statistic (two series, constant)
pub fn mackinnon_p_value(statistic: f64) -> f64 {
    if statistic.is_nan() || statistic > TAU_MAX {
        return 1.0;
    }
    if statistic < TAU_MIN {
        return 0.0;
    }
    let poly = if statistic <= TAU_STAR {
        polyval(&TAU_SMALL_P, statistic)
    } else {
        polyval(&TAU_LARGE_P, statistic)
    };
    normal_cdf(poly)
}

/// Critical values for a sample of `nobs` observations
pub fn mackinnon_critical_values(nobs: usize) -> CriticalValues {
    let inv = 1.0 / nobs.max(1) as f64;
    let at = |row: &[f64; 3]| row[0] + row[1] * inv + row[2] * inv * inv;
    CriticalValues {
        one_pct: at(&CRIT_SURFACE[0]),
        five_pct: at(&CRIT_SURFACE[1]),
        ten_pct: at(&CRIT_SURFACE[2]),
    }
}

/// Design for `Δs_t = γ s_{t-1} + Σ δ_i Δs_{t-i}` over rows `first..diffs.len()`
fn adf_regression(
    series: &[f64],
    diffs: &[f64],
    lag: usize,
    first: usize,
) -> Result<crate::strategy::regression::OlsFit, EstimationError> {
    let dependent = &diffs[first..];
    let level: Vec<f64> = (first..diffs.len()).map(|t| series[t]).collect();
    let lagged: Vec<Vec<f64>> = (1..=lag)
        .map(|i| (first..diffs.len()).map(|t| diffs[t - i]).collect())
        .collect();

    let mut columns: Vec<&[f64]> = Vec::with_capacity(lag + 1);
    columns.push(&level);
    columns.extend(lagged.iter().map(|c| c.as_slice()));
    ols(dependent, &columns)
}

/// ADF test without deterministic terms, lag order by AIC.
///
/// All candidate lags are compared on the common sample that the largest
/// lag allows; the winner is refit on its own full sample.
pub fn adf_test(series: &[f64], max_lag: Option<usize>) -> Result<AdfResult, EstimationError> {
    let n = series.len();
    if n < 4 {
        return Err(EstimationError::TooFewObservations {
            observations: n,
            parameters: 1,
        });
    }

    let cap = (n / 2).saturating_sub(1);
    let max_lag = max_lag.unwrap_or_else(|| default_max_lag(n)).min(cap);

    let diffs: Vec<f64> = series.windows(2).map(|w| w[1] - w[0]).collect();

    let mut best: Option<(f64, usize)> = None;
    for lag in 0..=max_lag {
        let fit = adf_regression(series, &diffs, lag, max_lag)?;
        let aic = fit.aic();
        if best.map_or(true, |(b, _)| aic < b) {
            best = Some((aic, lag));
        }
    }
    let used_lag = best.map_or(0, |(_, lag)| lag);

    let fit = adf_regression(series, &diffs, used_lag, used_lag)?;
    Ok(AdfResult {
        statistic: fit.t_value(0),
        used_lag,
        nobs: fit.nobs,
    })
}

/// Engle-Granger statistic, p-value and critical values for `y` against `x`
pub fn engle_granger(
    y: &[f64],
    x: &[f64],
    max_lag: Option<usize>,
) -> Result<(AdfResult, f64, CriticalValues), EstimationError> {
    if y.len() != x.len() {
        return Err(EstimationError::LengthMismatch(y.len(), x.len()));
    }

    let first_stage = ols(y, &[&ones(y.len()), x])?;
    let critical_values = mackinnon_critical_values(y.len().saturating_sub(1));

    if first_stage.r_squared >= COLLINEAR_R2 {
        // Exact linear relation: the residual is (numerically) zero
        let adf = AdfResult {
            statistic: f64::NEG_INFINITY,
            used_lag: 0,
            nobs: y.len(),
        };
        return Ok((adf, 0.0, critical_values));
    }

    let adf = adf_test(&first_stage.residuals, max_lag)?;
    let p_value = mackinnon_p_value(adf.statistic);
    Ok((adf, p_value, critical_values))
}

/// Why a scan could not run at all
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ScanError {
    #[error("Invalid scan configuration: {0}")]
    InvalidConfig(#[from] ParamError),
    #[error("Need at least two symbols to form a pair, got {0}")]
    TooFewSymbols(usize),
    #[error("Price matrix has no observations")]
    EmptyMatrix,
}

/// Summary classification of a finished scan
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ScanStatus {
    /// At least one pair passed the significance filter
    Found,
    /// Every pair was tested and none was cointegrated
    NoneCointegrated,
    /// Every tested pair failed on data or estimation
    AllPairsFailed,
    /// Stopped by the caller before any pair was accepted
    Cancelled,
}

/// Outcome of a scan that ran
#[derive(Debug, Clone, Default)]
pub struct ScanReport {
    /// Accepted pairs, in enumeration order
    pub accepted: Vec<CointegrationResult>,
    /// Tested pairs with p-value >= significance
    pub rejected: usize,
    pub failures: Vec<PairFailure>,
    pub pairs_total: usize,
    pub pairs_tested: usize,
    pub cancelled: bool,
}

impl ScanReport {
    pub fn status(&self) -> ScanStatus {
        if !self.accepted.is_empty() {
            ScanStatus::Found
        } else if self.cancelled {
            ScanStatus::Cancelled
        } else if self.pairs_tested > 0 && self.failures.len() == self.pairs_tested {
            ScanStatus::AllPairsFailed
        } else {
            ScanStatus::NoneCointegrated
        }
    }
}

enum PairOutcome {
    Accepted(CointegrationResult),
    Rejected,
    Failed(PairFailure),
    Skipped,
}

/// Enumerates and tests symbol pairs
#[derive(Debug, Clone)]
pub struct CointegrationScanner {
    config: ScanConfig,
    parallel: bool,
}

impl CointegrationScanner {
    /// Scanner that tests pairs on the rayon pool
    pub fn new(config: ScanConfig) -> Self {
        Self {
            config,
            parallel: true,
        }
    }

    pub fn with_parallel(mut self, parallel: bool) -> Self {
        self.parallel = parallel;
        self
    }

    /// All (i, j) with i < j in column order
    pub fn enumerate_pairs(matrix: &PriceMatrix) -> Vec<PairKey> {
        let symbols = matrix.symbols();
        let mut pairs = Vec::with_capacity(symbols.len() * symbols.len().saturating_sub(1) / 2);
        for i in 0..symbols.len() {
            for j in (i + 1)..symbols.len() {
                pairs.push(PairKey::new(symbols[i].clone(), symbols[j].clone()));
            }
        }
        pairs
    }

    /// Test every pair; failures are recorded, never fatal.
    pub fn scan(
        &self,
        matrix: &PriceMatrix,
        cancel: &CancellationToken,
    ) -> Result<ScanReport, ScanError> {
        self.config.validate()?;
        if matrix.symbol_count() < 2 {
            return Err(ScanError::TooFewSymbols(matrix.symbol_count()));
        }
        if matrix.is_empty() {
            return Err(ScanError::EmptyMatrix);
        }

        let pairs = Self::enumerate_pairs(matrix);
        info!(
            "Scanning {} pairs across {} symbols ({} observations)",
            pairs.len(),
            matrix.symbol_count(),
            matrix.len()
        );

        let run = |(index, pair): (usize, &PairKey)| {
            if cancel.is_cancelled() {
                return PairOutcome::Skipped;
            }
            self.test_pair(matrix, index, pair)
        };

        let outcomes: Vec<PairOutcome> = if self.parallel {
            pairs.par_iter().enumerate().map(run).collect()
        } else {
            pairs.iter().enumerate().map(run).collect()
        };

        let mut report = ScanReport {
            pairs_total: pairs.len(),
            ..Default::default()
        };
        for outcome in outcomes {
            match outcome {
                PairOutcome::Accepted(result) => {
                    report.pairs_tested += 1;
                    report.accepted.push(result);
                }
                PairOutcome::Rejected => {
                    report.pairs_tested += 1;
                    report.rejected += 1;
                }
                PairOutcome::Failed(failure) => {
                    report.pairs_tested += 1;
                    report.failures.push(failure);
                }
                PairOutcome::Skipped => report.cancelled = true,
            }
        }

        info!(
            "Scan done: {} accepted, {} rejected, {} failed{}",
            report.accepted.len(),
            report.rejected,
            report.failures.len(),
            if report.cancelled { " (cancelled)" } else { "" }
        );
        Ok(report)
    }

    fn test_pair(&self, matrix: &PriceMatrix, index: usize, pair: &PairKey) -> PairOutcome {
        let aligned = match matrix.aligned_pair(&pair.a, &pair.b, self.config.min_observations) {
            Ok(aligned) => aligned,
            Err(e) => {
                warn!("Skipping {}: {}", pair, e);
                return PairOutcome::Failed(PairFailure::new(pair.clone(), PipelineStage::Scan, e));
            }
        };

        match engle_granger(&aligned.y, &aligned.x, self.config.max_lag) {
            Ok((adf, p_value, critical_values)) => {
                debug!(
                    pair = %pair,
                    statistic = adf.statistic,
                    p_value,
                    lag = adf.used_lag,
                    "Engle-Granger"
                );
                if p_value < self.config.significance_level {
                    PairOutcome::Accepted(CointegrationResult {
                        pair: pair.clone(),
                        scan_index: index,
                        statistic: adf.statistic,
                        p_value,
                        critical_values,
                        used_lag: adf.used_lag,
                        nobs: adf.nobs,
                    })
                } else {
                    PairOutcome::Rejected
                }
            }
            Err(e) => {
                warn!("Skipping {}: {}", pair, e);
                PairOutcome::Failed(PairFailure::new(pair.clone(), PipelineStage::Scan, e))
            }
        }
    }
}
