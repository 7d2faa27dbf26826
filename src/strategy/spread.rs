//! Hedge Ratio and Spread Construction
//!
//! OLS of the dependent leg on a constant and the hedge leg:
//! y = alpha + beta * x + e
//!
//! The spread is `y - beta * x` by default. With `include_intercept` the
//! fitted constant is removed as well, which centres the spread near zero
//! without changing its dynamics.

use serde::{Deserialize, Serialize};

use crate::strategy::params::SpreadConfig;
use crate::strategy::regression::{ols, ones, EstimationError};

/// Variance of the hedge leg below which beta is unidentified
const MIN_REGRESSOR_VARIANCE: f64 = 1e-14;

/// Fitted hedge relation and the resulting spread
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpreadFit {
    /// Units of leg B held against one unit of leg A
    pub hedge_ratio: f64,
    pub intercept: f64,
    pub r_squared: f64,
    pub spread: Vec<f64>,
}

/// `y - beta * x`
pub fn compute_spread(y: &[f64], x: &[f64], hedge_ratio: f64) -> Vec<f64> {
    y.iter().zip(x.iter()).map(|(a, b)| a - hedge_ratio * b).collect()
}

#[derive(Debug, Clone, Default)]
pub struct SpreadEstimator {
    config: SpreadConfig,
}

impl SpreadEstimator {
    pub fn new(config: SpreadConfig) -> Self {
        Self { config }
    }

    /// Estimate beta and build the spread for two aligned legs
    pub fn estimate(&self, y: &[f64], x: &[f64]) -> Result<SpreadFit, EstimationError> {
        if y.len() != x.len() {
            return Err(EstimationError::LengthMismatch(y.len(), x.len()));
        }
        if y.len() < 3 {
            return Err(EstimationError::TooFewObservations {
                observations: y.len(),
                parameters: 2,
            });
        }

        let mean = x.iter().sum::<f64>() / x.len() as f64;
        let variance = x.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / x.len() as f64;
        if !variance.is_finite() {
            return Err(EstimationError::NonFinite);
        }
        if variance < MIN_REGRESSOR_VARIANCE {
            return Err(EstimationError::DegenerateRegressor);
        }

        let fit = ols(y, &[&ones(y.len()), x])?;
        let intercept = fit.coefficients[0];
        let hedge_ratio = fit.coefficients[1];

        let mut spread = compute_spread(y, x, hedge_ratio);
        if self.config.include_intercept {
            spread.iter_mut().for_each(|s| *s -= intercept);
        }

        Ok(SpreadFit {
            hedge_ratio,
            intercept,
            r_squared: fit.r_squared,
            spread,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::synthetic::GaussianSource;
    use approx::assert_relative_eq;

    fn noisy_line(seed: u64, n: usize) -> (Vec<f64>, Vec<f64>) {
        let mut source = GaussianSource::new(seed).unwrap();
        let x = source.random_walk(n, 3.0, 0.05);
        let noise = source.draws(n, 0.01);
        let y = x.iter().zip(noise.iter()).map(|(v, e)| 0.4 + 2.0 * v + e).collect();
        (y, x)
    }

    #[test]
    fn test_recovers_hedge_ratio() {
        for n in [100, 2000] {
            let (y, x) = noisy_line(21, n);
            let fit = SpreadEstimator::default().estimate(&y, &x).unwrap();
            assert!((fit.hedge_ratio - 2.0).abs() < 0.05, "n={} beta={}", n, fit.hedge_ratio);
            assert!(fit.r_squared > 0.9);
        }
    }

    #[test]
    fn test_spread_excludes_intercept_by_default() {
        let (y, x) = noisy_line(4, 200);
        let fit = SpreadEstimator::default().estimate(&y, &x).unwrap();
        assert_eq!(fit.spread, compute_spread(&y, &x, fit.hedge_ratio));

        let mean = fit.spread.iter().sum::<f64>() / fit.spread.len() as f64;
        assert_relative_eq!(mean, fit.intercept, epsilon = 1e-9);
    }

    #[test]
    fn test_include_intercept_centres_spread() {
        let (y, x) = noisy_line(4, 200);
        let estimator = SpreadEstimator::new(SpreadConfig {
            include_intercept: true,
        });
        let fit = estimator.estimate(&y, &x).unwrap();
        let mean = fit.spread.iter().sum::<f64>() / fit.spread.len() as f64;
        assert!(mean.abs() < 1e-9);
    }

    #[test]
    fn test_constant_regressor_is_degenerate() {
        let y = vec![1.0, 2.0, 3.0, 4.0];
        let x = vec![5.0; 4];
        let err = SpreadEstimator::default().estimate(&y, &x).unwrap_err();
        assert_eq!(err, EstimationError::DegenerateRegressor);
    }

    #[test]
    fn test_length_mismatch() {
        let err = SpreadEstimator::default()
            .estimate(&[1.0, 2.0, 3.0], &[1.0, 2.0])
            .unwrap_err();
        assert_eq!(err, EstimationError::LengthMismatch(3, 2));
    }
}
