//! pairs-lab - Cointegration Pairs Research Library
//!
//! Finds cointegrated pairs in a log-price panel, models each spread as an
//! Ornstein-Uhlenbeck process, and backtests a z-score entry/exit rule.
//!
//! # Modules
//!
//! - `domain`: Core types (PriceMatrix, Position, PairCandidate, failures)
//! - `ports`: Trait abstractions (PriceMatrixProvider)
//! - `strategy`: Statistics (Engle-Granger scan, spread, OU fit, ranking, signals)
//! - `backtest`: PnL simulation and performance metrics
//! - `application`: Pipeline orchestrator
//! - `adapters`: External implementations (JSON file, synthetic data, CLI)
//! - `config`: Configuration loading and validation

pub mod adapters;
pub mod application;
pub mod backtest;
pub mod config;
pub mod domain;
pub mod ports;
pub mod strategy;
