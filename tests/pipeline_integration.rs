//! Pipeline Integration Tests
//!
//! End-to-end checks across the public API:
//! 1. Synthetic provider -> PairsPipeline finds the constructed pairs
//! 2. JSON file provider yields the same result as the in-memory panel
//! 3. SpreadEstimator, SignalGenerator, PnlSimulator and PerformanceEvaluator
//!    agree on a hand-checked example
//!
//! All tests are deterministic (seeded data, no network).

use approx::assert_relative_eq;

use pairs_lab::adapters::{save_matrix, JsonFileMarketData, SyntheticConfig, SyntheticMarketData};
use pairs_lab::application::PairsPipeline;
use pairs_lab::backtest::{PerformanceEvaluator, PnlSimulator};
use pairs_lab::domain::{CancellationToken, PairKey, Position};
use pairs_lab::ports::{PriceMatrixProvider, PriceQuery};
use pairs_lab::strategy::{
    PipelineConfig, ScanStatus, SignalConfig, SignalGenerator, SpreadEstimator,
};

// ============================================================================
// Test Fixtures
// ============================================================================

fn synthetic(seed: u64) -> SyntheticMarketData {
    SyntheticMarketData::new(SyntheticConfig {
        seed,
        ..Default::default()
    })
    .unwrap()
}

fn accepted_pairs(report: &pairs_lab::application::PipelineReport) -> Vec<PairKey> {
    report.scan.accepted.iter().map(|r| r.pair.clone()).collect()
}

// ============================================================================
// End-to-end
// ============================================================================

#[tokio::test]
async fn test_synthetic_run_finds_constructed_pairs() {
    let report = PairsPipeline::default()
        .run_with_provider(&synthetic(7), &PriceQuery::all(), &CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(report.scan.status, ScanStatus::Found);
    let accepted = accepted_pairs(&report);
    assert!(accepted.contains(&PairKey::new("A0", "B0")));
    assert!(accepted.contains(&PairKey::new("A1", "B1")));

    // every ranked pair was backtested over the full aligned history
    assert_eq!(report.backtests.len(), report.ranked.len());
    for backtest in &report.backtests {
        assert_eq!(backtest.pnl.len(), 750);
        assert_eq!(backtest.report.observations, 750);
        assert!(backtest.signals.positions[0].is_flat());
    }
    assert_eq!(report.rankings.len(), report.backtests.len());
}

#[test]
fn test_runs_are_deterministic() {
    let matrix = synthetic(11).generate().unwrap();
    let token = CancellationToken::new();
    let first = PairsPipeline::default().run(&matrix, &token).unwrap();
    let second = PairsPipeline::default().run(&matrix, &token).unwrap();

    assert_eq!(first.ranked, second.ranked);
    assert_eq!(first.rankings, second.rankings);
}

#[tokio::test]
async fn test_symbol_query_limits_scan() {
    let query = PriceQuery::all().with_symbols(vec!["A0".to_string(), "B0".to_string()]);
    let report = PairsPipeline::default()
        .run_with_provider(&synthetic(7), &query, &CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(report.scan.pairs_total, 1);
    assert_eq!(accepted_pairs(&report), vec![PairKey::new("A0", "B0")]);
}

#[tokio::test]
async fn test_json_file_matches_in_memory_panel() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("panel.json");
    let matrix = synthetic(3).generate().unwrap();
    save_matrix(&path, &matrix).await.unwrap();

    let loaded = JsonFileMarketData::new(&path)
        .fetch_log_prices(&PriceQuery::all())
        .await
        .unwrap();
    assert_eq!(loaded.symbols(), matrix.symbols());
    assert_eq!(loaded.timestamps(), matrix.timestamps());

    let token = CancellationToken::new();
    let from_file = PairsPipeline::default().run(&loaded, &token).unwrap();
    let in_memory = PairsPipeline::default().run(&matrix, &token).unwrap();
    assert_eq!(accepted_pairs(&from_file), accepted_pairs(&in_memory));
    assert_eq!(from_file.backtests.len(), in_memory.backtests.len());
}

#[test]
fn test_max_pairs_limits_backtests() {
    let matrix = synthetic(7).generate().unwrap();
    let mut config = PipelineConfig::default();
    config.backtest.max_pairs = Some(1);

    let report = PairsPipeline::new(config)
        .run(&matrix, &CancellationToken::new())
        .unwrap();
    assert_eq!(report.ranked.len(), 1);
    assert_eq!(report.backtests.len(), 1);
    assert!(!report.truncated.is_empty());
}

// ============================================================================
// Component agreement
// ============================================================================

#[test]
fn test_simulator_spread_matches_estimator() {
    let matrix = synthetic(5).generate().unwrap();
    let a = matrix.column("A0").unwrap();
    let b = matrix.column("B0").unwrap();

    let fit = SpreadEstimator::default().estimate(a, b).unwrap();
    let signals = SignalGenerator::new(SignalConfig::default()).from_spread(&fit.spread);
    let pnl = PnlSimulator::default()
        .simulate(&signals.positions, a, b, fit.hedge_ratio)
        .unwrap();

    for (s, p) in fit.spread.iter().zip(pnl.spread.iter()) {
        assert_relative_eq!(*s, *p, epsilon = 1e-12);
    }
}

#[test]
fn test_hand_checked_pnl_and_metrics() {
    // beta = 0 makes the spread equal to y
    let y = [1.0, 2.0, 4.0, 3.0];
    let x = [0.0; 4];
    let positions = [Position::Long, Position::Long, Position::Flat, Position::Flat];

    let pnl = PnlSimulator::new(0.01).simulate(&positions, &y, &x, 0.0).unwrap();
    assert_eq!(pnl.effective_position, vec![0.0, 1.0, 1.0, 0.0]);
    assert_eq!(pnl.trades, vec![0.0, 1.0, 0.0, 1.0]);
    assert_eq!(pnl.raw_pnl, vec![0.0, 1.0, 2.0, 0.0]);
    assert_relative_eq!(pnl.net_pnl[1], 0.99, epsilon = 1e-12);
    assert_relative_eq!(pnl.net_pnl[3], -0.01, epsilon = 1e-12);

    let report = PerformanceEvaluator::default().evaluate(&pnl.net_pnl).unwrap();
    assert_relative_eq!(report.cumulative_return, 2.98, epsilon = 1e-12);
    assert_relative_eq!(report.max_drawdown, -0.01, epsilon = 1e-12);
    assert!(report.sharpe_ratio.unwrap() > 0.0);
}
