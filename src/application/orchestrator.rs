//! Pairs Pipeline Orchestrator
//!
//! Runs the full research pipeline over one price matrix:
//! scan -> spread + OU fit -> rank -> signal -> PnL -> metrics -> report.
//!
//! Per-pair work never aborts the batch. A pair that fails at any stage is
//! recorded with its stage and error and the run continues. Only an invalid
//! configuration, a scan that cannot start, or a provider error fails a run.

use chrono::{DateTime, Utc};
use rayon::prelude::*;
use serde::Serialize;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::backtest::{
    rank_by_sharpe, PairReport, PerformanceEvaluator, PerformanceReport, PnlSeries, PnlSimulator,
};
use crate::domain::{
    CancellationToken, DataError, PairCandidate, PairError, PairFailure, PipelineStage, PriceMatrix,
};
use crate::ports::{PriceMatrixProvider, PriceQuery, ProviderError};
use crate::strategy::cointegration::{
    CointegrationResult, CointegrationScanner, ScanError, ScanStatus,
};
use crate::strategy::ou_process::MeanReversionModel;
use crate::strategy::params::{ParamError, PipelineConfig};
use crate::strategy::ranker::PairRanker;
use crate::strategy::signal::{SignalGenerator, SignalSeries};
use crate::strategy::spread::{compute_spread, SpreadEstimator};

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("Configuration error: {0}")]
    Config(#[from] ParamError),
    #[error("Scan failed to run: {0}")]
    Scan(#[from] ScanError),
    #[error(transparent)]
    Provider(#[from] ProviderError),
    #[error("Pipeline worker failed: {0}")]
    Join(String),
}

/// Scan stage counts
#[derive(Debug, Clone, Serialize)]
pub struct ScanSummary {
    pub status: ScanStatus,
    pub pairs_total: usize,
    pub pairs_tested: usize,
    pub rejected: usize,
    pub accepted: Vec<CointegrationResult>,
}

/// Full backtest of one ranked pair.
///
/// Every series covers the pair's aligned window: element `i` is matrix row
/// `start + i`, dated `timestamps[i]`.
#[derive(Debug, Clone, Serialize)]
pub struct PairBacktest {
    pub candidate: PairCandidate,
    /// Matrix row of the first element
    pub start: usize,
    pub timestamps: Vec<DateTime<Utc>>,
    pub signals: SignalSeries,
    pub pnl: PnlSeries,
    pub report: PerformanceReport,
}

/// Scan, fit and rank results, before any backtest
#[derive(Debug, Clone, Serialize)]
pub struct Discovery {
    pub scan: ScanSummary,
    /// Valid candidates, fastest half-life first
    pub ranked: Vec<PairCandidate>,
    /// Fitted but non-mean-reverting candidates
    pub excluded: Vec<PairCandidate>,
    /// Valid candidates cut by `max_pairs`
    pub truncated: Vec<PairCandidate>,
    pub failures: Vec<PairFailure>,
    pub cancelled: bool,
}

/// Everything a run produced
#[derive(Debug, Clone, Serialize)]
pub struct PipelineReport {
    pub scan: ScanSummary,
    /// Valid candidates, fastest half-life first
    pub ranked: Vec<PairCandidate>,
    /// Fitted but non-mean-reverting candidates
    pub excluded: Vec<PairCandidate>,
    /// Valid candidates cut by `max_pairs`, not backtested
    pub truncated: Vec<PairCandidate>,
    /// Pairs dropped at any stage, in stage then enumeration order
    pub failures: Vec<PairFailure>,
    /// Backtests in half-life rank order
    pub backtests: Vec<PairBacktest>,
    /// Reports ordered by Sharpe ratio, undefined last
    pub rankings: Vec<PairReport>,
    pub cancelled: bool,
}

impl PipelineReport {
    /// Best pair by Sharpe ratio
    pub fn best(&self) -> Option<&PairReport> {
        self.rankings.first()
    }
}

/// Batch pipeline over a price matrix
#[derive(Debug, Clone, Default)]
pub struct PairsPipeline {
    config: PipelineConfig,
}

impl PairsPipeline {
    /// No computation happens until `run`
    pub fn new(config: PipelineConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Fetch through the provider, then run on a blocking worker.
    ///
    /// Provider errors are returned unchanged; there are no retries.
    pub async fn run_with_provider<P>(
        &self,
        provider: &P,
        query: &PriceQuery,
        cancel: &CancellationToken,
    ) -> Result<PipelineReport, PipelineError>
    where
        P: PriceMatrixProvider + ?Sized,
    {
        self.config.validate()?;

        let matrix = provider.fetch_log_prices(query).await?;
        info!(
            "Fetched {} symbols x {} observations",
            matrix.symbol_count(),
            matrix.len()
        );

        let pipeline = self.clone();
        let cancel = cancel.clone();
        tokio::task::spawn_blocking(move || pipeline.run(&matrix, &cancel))
            .await
            .map_err(|e| PipelineError::Join(e.to_string()))?
    }

    /// Scan, fit and rank without backtesting
    pub fn discover(
        &self,
        matrix: &PriceMatrix,
        cancel: &CancellationToken,
    ) -> Result<Discovery, PipelineError> {
        self.config.validate()?;

        let scan = CointegrationScanner::new(self.config.scan.clone())
            .with_parallel(self.config.execution.parallel)
            .scan(matrix, cancel)?;
        let status = scan.status();
        let mut failures = scan.failures;

        // Fit spread and OU parameters for every accepted pair
        let fits: Vec<Result<PairCandidate, PairFailure>> = if self.config.execution.parallel {
            scan.accepted
                .par_iter()
                .map(|r| self.fit_pair(matrix, r))
                .collect()
        } else {
            scan.accepted.iter().map(|r| self.fit_pair(matrix, r)).collect()
        };

        let mut candidates = Vec::with_capacity(fits.len());
        for fit in fits {
            match fit {
                Ok(candidate) => candidates.push(candidate),
                Err(failure) => failures.push(failure),
            }
        }

        let ranked = PairRanker::new(self.config.backtest.max_pairs).rank(candidates);
        info!(
            "{} candidates ranked, {} excluded as non-mean-reverting, {} cut by max_pairs",
            ranked.ranked.len(),
            ranked.excluded.len(),
            ranked.truncated.len()
        );

        Ok(Discovery {
            scan: ScanSummary {
                status,
                pairs_total: scan.pairs_total,
                pairs_tested: scan.pairs_tested,
                rejected: scan.rejected,
                accepted: scan.accepted,
            },
            ranked: ranked.ranked,
            excluded: ranked.excluded,
            truncated: ranked.truncated,
            failures,
            cancelled: scan.cancelled,
        })
    }

    /// Run every stage synchronously
    pub fn run(
        &self,
        matrix: &PriceMatrix,
        cancel: &CancellationToken,
    ) -> Result<PipelineReport, PipelineError> {
        let Discovery {
            scan,
            ranked,
            excluded,
            truncated,
            mut failures,
            mut cancelled,
        } = self.discover(matrix, cancel)?;

        let run_backtest = |candidate: &PairCandidate| {
            if cancel.is_cancelled() {
                return None;
            }
            Some(self.backtest_pair(matrix, candidate))
        };
        let outcomes: Vec<Option<Result<PairBacktest, PairFailure>>> =
            if self.config.execution.parallel {
                ranked.par_iter().map(run_backtest).collect()
            } else {
                ranked.iter().map(run_backtest).collect()
            };

        let mut backtests = Vec::with_capacity(outcomes.len());
        for outcome in outcomes {
            match outcome {
                Some(Ok(backtest)) => backtests.push(backtest),
                Some(Err(failure)) => failures.push(failure),
                None => cancelled = true,
            }
        }

        let rankings = rank_by_sharpe(
            backtests
                .iter()
                .map(|b| PairReport {
                    pair: b.candidate.pair.clone(),
                    report: b.report.clone(),
                })
                .collect(),
        );

        if let Some(best) = rankings.first() {
            info!(
                "Best pair {} (Sharpe {})",
                best.pair,
                best.report
                    .sharpe_ratio
                    .map_or_else(|| "undefined".to_string(), |s| format!("{:.2}", s))
            );
        }

        Ok(PipelineReport {
            scan,
            ranked,
            excluded,
            truncated,
            failures,
            backtests,
            rankings,
            cancelled,
        })
    }

    fn fit_pair(
        &self,
        matrix: &PriceMatrix,
        result: &CointegrationResult,
    ) -> Result<PairCandidate, PairFailure> {
        let pair = &result.pair;
        let fail = |e: PairError| {
            warn!("Fit failed for {}: {}", pair, e);
            PairFailure::new(pair.clone(), PipelineStage::Fit, e)
        };

        let aligned = matrix
            .aligned_pair(&pair.a, &pair.b, self.config.scan.min_observations)
            .map_err(|e| fail(e.into()))?;
        let spread = SpreadEstimator::new(self.config.spread.clone())
            .estimate(&aligned.y, &aligned.x)
            .map_err(|e| fail(e.into()))?;
        let ou = MeanReversionModel::new()
            .fit(&spread.spread)
            .map_err(|e| fail(e.into()))?;

        debug!(
            pair = %pair,
            hedge_ratio = spread.hedge_ratio,
            theta = ou.theta,
            half_life = ?ou.half_life,
            "Fitted spread"
        );

        Ok(PairCandidate {
            pair: pair.clone(),
            scan_index: result.scan_index,
            test_statistic: result.statistic,
            p_value: result.p_value,
            hedge_ratio: spread.hedge_ratio,
            intercept: spread.intercept,
            theta: ou.theta,
            mu: ou.mu,
            sigma: ou.sigma,
            half_life: ou.half_life,
        })
    }

    fn backtest_pair(
        &self,
        matrix: &PriceMatrix,
        candidate: &PairCandidate,
    ) -> Result<PairBacktest, PairFailure> {
        let pair = &candidate.pair;
        let fail = |e: PairError| {
            warn!("Backtest failed for {}: {}", pair, e);
            PairFailure::new(pair.clone(), PipelineStage::Backtest, e)
        };

        let aligned = matrix
            .aligned_pair(&pair.a, &pair.b, self.config.scan.min_observations)
            .map_err(|e| fail(e.into()))?;

        let window = self.config.signal.window;
        if aligned.len() <= window {
            return Err(fail(
                DataError::InsufficientHistory {
                    available: aligned.len(),
                    required: window + 1,
                }
                .into(),
            ));
        }

        // z-scores are shift invariant, so the intercept choice does not matter here
        let spread = compute_spread(&aligned.y, &aligned.x, candidate.hedge_ratio);
        let signals = SignalGenerator::new(self.config.signal.clone()).from_spread(&spread);

        let pnl = PnlSimulator::new(self.config.backtest.cost_rate)
            .simulate(&signals.positions, &aligned.y, &aligned.x, candidate.hedge_ratio)
            .map_err(|e| fail(e.into()))?;

        let report = PerformanceEvaluator::new(self.config.performance.annualization)
            .evaluate(&pnl.net_pnl)
            .map_err(|e| fail(e.into()))?;

        debug!(
            pair = %pair,
            trades = pnl.trade_count(),
            turnover = pnl.turnover(),
            costs = pnl.total_cost(),
            cumulative = report.cumulative_return,
            "Backtested"
        );

        Ok(PairBacktest {
            candidate: candidate.clone(),
            start: aligned.start,
            timestamps: aligned.timestamps,
            signals,
            pnl,
            report,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::synthetic::{SyntheticConfig, SyntheticMarketData};
    use crate::domain::PairKey;
    use crate::ports::MockPriceMatrixProvider;

    fn synthetic_matrix() -> PriceMatrix {
        SyntheticMarketData::new(SyntheticConfig::default())
            .unwrap()
            .generate()
            .unwrap()
    }

    #[test]
    fn test_finds_constructed_pairs() {
        let report = PairsPipeline::default()
            .run(&synthetic_matrix(), &CancellationToken::new())
            .unwrap();

        assert_eq!(report.scan.status, ScanStatus::Found);
        assert_eq!(report.scan.pairs_total, 15);
        let accepted: Vec<&PairKey> = report.scan.accepted.iter().map(|r| &r.pair).collect();
        assert!(accepted.contains(&&PairKey::new("A0", "B0")));
        assert!(accepted.contains(&&PairKey::new("A1", "B1")));

        let a0 = report
            .ranked
            .iter()
            .find(|c| c.pair == PairKey::new("A0", "B0"))
            .unwrap();
        assert!((a0.hedge_ratio - 1.2).abs() < 0.1, "beta = {}", a0.hedge_ratio);
        assert!(a0.is_valid());
        assert!(!report.cancelled);
    }

    #[test]
    fn test_backtests_follow_rank_and_rankings_sorted() {
        let report = PairsPipeline::default()
            .run(&synthetic_matrix(), &CancellationToken::new())
            .unwrap();

        assert_eq!(report.backtests.len(), report.ranked.len());
        for (backtest, candidate) in report.backtests.iter().zip(report.ranked.iter()) {
            assert_eq!(backtest.candidate.pair, candidate.pair);
            assert_eq!(backtest.pnl.len(), backtest.signals.positions.len());
        }

        let sharpes: Vec<f64> = report
            .rankings
            .iter()
            .filter_map(|r| r.report.sharpe_ratio)
            .collect();
        assert!(sharpes.windows(2).all(|w| w[0] >= w[1]));
        assert!(report.best().is_some());
    }

    #[test]
    fn test_backtest_series_map_to_matrix_rows() {
        let full = synthetic_matrix();
        let columns = full
            .symbols()
            .iter()
            .map(|symbol| {
                let mut values = full.column(symbol).unwrap().to_vec();
                if symbol == "A0" {
                    values[..100].iter_mut().for_each(|v| *v = f64::NAN);
                }
                (symbol.clone(), values)
            })
            .collect();
        let matrix = PriceMatrix::new(full.timestamps().to_vec(), columns).unwrap();

        let report = PairsPipeline::default()
            .run(&matrix, &CancellationToken::new())
            .unwrap();

        let late = report
            .backtests
            .iter()
            .find(|b| b.candidate.pair == PairKey::new("A0", "B0"))
            .unwrap();
        assert_eq!(late.start, 100);
        assert_eq!(late.timestamps.len(), 650);
        assert_eq!(late.timestamps[0], matrix.timestamps()[100]);
        assert_eq!(late.timestamps.last(), matrix.timestamps().last());
        assert_eq!(late.pnl.len(), late.timestamps.len());
        assert_eq!(late.signals.z_scores.len(), late.timestamps.len());

        let full_history = report
            .backtests
            .iter()
            .find(|b| b.candidate.pair == PairKey::new("A1", "B1"))
            .unwrap();
        assert_eq!(full_history.start, 0);
        assert_eq!(full_history.timestamps, matrix.timestamps());
    }

    #[test]
    fn test_max_pairs_cut_is_reported() {
        let mut config = PipelineConfig::default();
        config.backtest.max_pairs = Some(1);
        let report = PairsPipeline::new(config)
            .run(&synthetic_matrix(), &CancellationToken::new())
            .unwrap();

        assert_eq!(report.backtests.len(), 1);
        assert!(!report.truncated.is_empty());
        // the cut pairs are slower than the one kept
        let kept = report.ranked[0].half_life.unwrap();
        assert!(report.truncated.iter().all(|c| c.half_life.unwrap() >= kept));
    }

    #[test]
    fn test_discover_matches_run_ranking() {
        let matrix = synthetic_matrix();
        let token = CancellationToken::new();
        let pipeline = PairsPipeline::default();

        let discovery = pipeline.discover(&matrix, &token).unwrap();
        let report = pipeline.run(&matrix, &token).unwrap();
        assert_eq!(discovery.ranked, report.ranked);
        assert_eq!(discovery.scan.pairs_tested, report.scan.pairs_tested);
    }

    #[test]
    fn test_parallel_and_sequential_agree() {
        let matrix = synthetic_matrix();
        let token = CancellationToken::new();
        let parallel = PairsPipeline::new(PipelineConfig::default().with_parallel(true))
            .run(&matrix, &token)
            .unwrap();
        let sequential = PairsPipeline::new(PipelineConfig::default().with_parallel(false))
            .run(&matrix, &token)
            .unwrap();

        assert_eq!(parallel.ranked, sequential.ranked);
        assert_eq!(parallel.rankings, sequential.rankings);
    }

    #[test]
    fn test_invalid_config_rejected_before_work() {
        let config = PipelineConfig::default().with_thresholds(1.0, 2.0);
        let err = PairsPipeline::new(config)
            .run(&synthetic_matrix(), &CancellationToken::new())
            .unwrap_err();
        assert!(matches!(err, PipelineError::Config(ParamError::InvalidExitThreshold { .. })));
    }

    #[test]
    fn test_scan_that_cannot_run_is_an_error() {
        let matrix = synthetic_matrix().select(&["A0".to_string()]).unwrap();
        let err = PairsPipeline::default()
            .run(&matrix, &CancellationToken::new())
            .unwrap_err();
        assert!(matches!(err, PipelineError::Scan(ScanError::TooFewSymbols(1))));
    }

    #[test]
    fn test_cancelled_run_returns_partial_report() {
        let token = CancellationToken::new();
        token.cancel();
        let report = PairsPipeline::default().run(&synthetic_matrix(), &token).unwrap();
        assert!(report.cancelled);
        assert_eq!(report.scan.status, ScanStatus::Cancelled);
        assert!(report.backtests.is_empty());
    }

    #[tokio::test]
    async fn test_provider_error_passes_through() {
        let mut provider = MockPriceMatrixProvider::new();
        provider
            .expect_fetch_log_prices()
            .times(1)
            .returning(|_| Err(ProviderError::Upstream("503 from vendor".to_string())));

        let err = PairsPipeline::default()
            .run_with_provider(&provider, &PriceQuery::all(), &CancellationToken::new())
            .await
            .unwrap_err();

        match err {
            PipelineError::Provider(ProviderError::Upstream(msg)) => {
                assert_eq!(msg, "503 from vendor")
            }
            other => panic!("unexpected error: {}", other),
        }
    }

    #[tokio::test]
    async fn test_run_with_provider_uses_fetched_matrix() {
        let matrix = synthetic_matrix();
        let mut provider = MockPriceMatrixProvider::new();
        provider
            .expect_fetch_log_prices()
            .returning(move |_| Ok(matrix.clone()));

        let report = PairsPipeline::default()
            .run_with_provider(&provider, &PriceQuery::all(), &CancellationToken::new())
            .await
            .unwrap();
        assert_eq!(report.scan.status, ScanStatus::Found);
    }

    #[tokio::test]
    async fn test_provider_not_called_on_bad_config() {
        let mut provider = MockPriceMatrixProvider::new();
        provider.expect_fetch_log_prices().times(0);

        let pipeline = PairsPipeline::new(PipelineConfig::default().with_window(1));
        let err = pipeline
            .run_with_provider(&provider, &PriceQuery::all(), &CancellationToken::new())
            .await
            .unwrap_err();
        assert!(matches!(err, PipelineError::Config(ParamError::InvalidWindow(1))));
    }
}
