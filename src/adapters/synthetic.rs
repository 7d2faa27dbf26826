//! Synthetic Market Data
//!
//! Seeded generator of log-price panels with a known structure:
//! - `B{k}` legs are random walks
//! - `A{k}` legs are `intercept + hedge_ratio * B{k} + OU noise`, so each
//!   (A{k}, B{k}) pair is cointegrated by construction
//! - `R{i}` legs are independent random walks
//!
//! The same seed always yields the same matrix.

use async_trait::async_trait;
use chrono::{DateTime, Duration, TimeZone, Utc};
use rand::distributions::Distribution;
use rand::rngs::StdRng;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};
use statrs::distribution::Normal;

use crate::domain::PriceMatrix;
use crate::ports::{PriceMatrixProvider, PriceQuery, ProviderError};

/// Seeded standard-normal draws
pub struct GaussianSource {
    rng: StdRng,
    normal: Normal,
}

impl GaussianSource {
    pub fn new(seed: u64) -> Result<Self, ProviderError> {
        let normal =
            Normal::new(0.0, 1.0).map_err(|e| ProviderError::InvalidRequest(e.to_string()))?;
        Ok(Self {
            rng: StdRng::seed_from_u64(seed),
            normal,
        })
    }

    /// One N(0, 1) draw
    pub fn draw(&mut self) -> f64 {
        self.normal.sample(&mut self.rng)
    }

    /// `n` draws scaled by `sd`
    pub fn draws(&mut self, n: usize, sd: f64) -> Vec<f64> {
        (0..n).map(|_| sd * self.draw()).collect()
    }

    /// Gaussian random walk starting at `start`
    pub fn random_walk(&mut self, n: usize, start: f64, step_sd: f64) -> Vec<f64> {
        let mut level = start;
        let mut path = Vec::with_capacity(n);
        for i in 0..n {
            if i > 0 {
                level += step_sd * self.draw();
            }
            path.push(level);
        }
        path
    }

    /// Unit-step discrete OU path started at `mu`:
    /// x_t = x_{t-1} + theta * (mu - x_{t-1}) + sigma * eps_t
    pub fn ou_path(&mut self, n: usize, theta: f64, mu: f64, sigma: f64) -> Vec<f64> {
        let mut x = mu;
        let mut path = Vec::with_capacity(n);
        for i in 0..n {
            if i > 0 {
                x += theta * (mu - x) + sigma * self.draw();
            }
            path.push(x);
        }
        path
    }
}

/// Shape of the generated panel
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SyntheticConfig {
    pub seed: u64,
    pub observations: usize,
    /// Number of cointegrated (A, B) pairs
    pub cointegrated_pairs: usize,
    /// Number of independent random-walk symbols
    pub independent: usize,
    pub hedge_ratio: f64,
    pub intercept: f64,
    /// OU reversion speed of the pair spread
    pub spread_theta: f64,
    /// OU noise scale of the pair spread
    pub spread_sigma: f64,
    /// Daily log-price step volatility of the random walks
    pub step_sd: f64,
    /// Starting log price of every walk
    pub start_level: f64,
    pub start_date: DateTime<Utc>,
}

impl Default for SyntheticConfig {
    fn default() -> Self {
        Self {
            seed: 7,
            observations: 750,
            cointegrated_pairs: 2,
            independent: 2,
            hedge_ratio: 1.2,
            intercept: 0.3,
            spread_theta: 0.15,
            spread_sigma: 0.01,
            step_sd: 0.015,
            start_level: 4.0,
            start_date: Utc.with_ymd_and_hms(2020, 1, 1, 0, 0, 0).single().unwrap_or_default(),
        }
    }
}

/// In-process provider backed by the generator
pub struct SyntheticMarketData {
    config: SyntheticConfig,
}

impl SyntheticMarketData {
    pub fn new(config: SyntheticConfig) -> Result<Self, ProviderError> {
        if config.observations < 2 {
            return Err(ProviderError::InvalidRequest(format!(
                "observations must be >= 2, got {}",
                config.observations
            )));
        }
        if config.step_sd <= 0.0 || config.spread_sigma <= 0.0 {
            return Err(ProviderError::InvalidRequest(
                "volatilities must be > 0".to_string(),
            ));
        }
        Ok(Self { config })
    }

    pub fn config(&self) -> &SyntheticConfig {
        &self.config
    }

    /// Generate the full panel
    pub fn generate(&self) -> Result<PriceMatrix, ProviderError> {
        let c = &self.config;
        let mut source = GaussianSource::new(c.seed)?;
        let n = c.observations;

        let timestamps = (0..n)
            .map(|i| c.start_date + Duration::days(i as i64))
            .collect();

        let mut columns = Vec::with_capacity(2 * c.cointegrated_pairs + c.independent);
        for k in 0..c.cointegrated_pairs {
            let base = source.random_walk(n, c.start_level, c.step_sd);
            let noise = source.ou_path(n, c.spread_theta, 0.0, c.spread_sigma);
            let dependent = base
                .iter()
                .zip(noise.iter())
                .map(|(b, e)| c.intercept + c.hedge_ratio * b + e)
                .collect();
            columns.push((format!("A{}", k), dependent));
            columns.push((format!("B{}", k), base));
        }
        for i in 0..c.independent {
            columns.push((format!("R{}", i), source.random_walk(n, c.start_level, c.step_sd)));
        }

        Ok(PriceMatrix::new(timestamps, columns)?)
    }
}

#[async_trait]
impl PriceMatrixProvider for SyntheticMarketData {
    async fn fetch_log_prices(&self, query: &PriceQuery) -> Result<PriceMatrix, ProviderError> {
        let matrix = self.generate()?;
        query.apply(&matrix)
    }
}
