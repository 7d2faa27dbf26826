//! Ornstein-Uhlenbeck Spread Model
//!
//! Fits the discrete OU approximation to a spread series:
//! Δs_t = a * s_{t-1} + b + e_t
//!
//! which maps to dX(t) = theta(mu - X(t))dt + sigma*dW(t) with a unit step:
//! - theta = -a (mean reversion speed per period)
//! - mu = b / theta (equilibrium level)
//! - sigma = standard deviation of e_t
//! - half-life = ln(2) / theta periods
//!
//! A fit with theta <= 0 is kept but flagged: the spread is not
//! mean-reverting and neither `mu` nor the half-life exist.

use serde::{Deserialize, Serialize};

use crate::strategy::regression::{ols, ones, EstimationError};

/// Minimum points for the regression (two differences)
const MIN_POINTS: usize = 3;
/// Minimum variance of the lagged level for valid estimation
const MIN_VARIANCE: f64 = 1e-14;

/// OU parameters estimated from a spread
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct OUParams {
    /// Mean reversion speed per period (higher = faster reversion)
    pub theta: f64,
    /// Long-term equilibrium level; `None` when theta <= 0
    pub mu: Option<f64>,
    /// Residual volatility per period
    pub sigma: f64,
    /// Periods for a deviation to halve; `None` when theta <= 0
    pub half_life: Option<f64>,
}

impl OUParams {
    /// Check if parameters indicate mean-reverting behavior
    pub fn is_valid(&self) -> bool {
        self.theta > 0.0 && self.half_life.is_some()
    }
}

/// Estimates OU parameters by least squares on first differences
#[derive(Debug, Clone, Copy, Default)]
pub struct MeanReversionModel;

impl MeanReversionModel {
    pub fn new() -> Self {
        Self
    }

    /// Fit the spread; errors on fewer than three points or a constant series.
    pub fn fit(&self, spread: &[f64]) -> Result<OUParams, EstimationError> {
        let n = spread.len();
        if n < MIN_POINTS {
            return Err(EstimationError::TooFewObservations {
                observations: n,
                parameters: 2,
            });
        }
        if spread.iter().any(|s| !s.is_finite()) {
            return Err(EstimationError::NonFinite);
        }

        let lagged = &spread[..n - 1];
        let deltas: Vec<f64> = spread.windows(2).map(|w| w[1] - w[0]).collect();

        let mean = lagged.iter().sum::<f64>() / lagged.len() as f64;
        let variance = lagged.iter().map(|s| (s - mean).powi(2)).sum::<f64>() / lagged.len() as f64;
        if variance < MIN_VARIANCE {
            return Err(EstimationError::DegenerateRegressor);
        }

        let fit = ols(&deltas, &[lagged, &ones(lagged.len())])?;
        let slope = fit.coefficients[0];
        let drift = fit.coefficients[1];

        let theta = -slope;
        let sigma = fit.residual_std();
        let (mu, half_life) = if theta > 0.0 {
            (Some(drift / theta), Some(std::f64::consts::LN_2 / theta))
        } else {
            (None, None)
        };

        Ok(OUParams {
            theta,
            mu,
            sigma,
            half_life,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::synthetic::GaussianSource;

    #[test]
    fn test_parameter_recovery() {
        let mut source = GaussianSource::new(2024).unwrap();
        let path = source.ou_path(5000, 0.1, 1.5, 0.05);

        let params = MeanReversionModel::new().fit(&path).unwrap();

        assert!((params.theta - 0.1).abs() < 0.03, "theta = {}", params.theta);
        assert!((params.mu.unwrap() - 1.5).abs() < 0.05, "mu = {:?}", params.mu);
        assert!((params.sigma - 0.05).abs() < 0.005, "sigma = {}", params.sigma);
        assert!(params.is_valid());
    }

    #[test]
    fn test_half_life_matches_theta() {
        let mut source = GaussianSource::new(5).unwrap();
        let path = source.ou_path(1000, 0.2, 0.0, 0.1);
        let params = MeanReversionModel::new().fit(&path).unwrap();
        let half_life = params.half_life.unwrap();
        assert!((half_life - std::f64::consts::LN_2 / params.theta).abs() < 1e-12);
    }

    #[test]
    fn test_trending_spread_is_invalid() {
        // Explosive series: each step grows with the level
        let spread: Vec<f64> = (0..50).map(|i| 1.05_f64.powi(i)).collect();
        let params = MeanReversionModel::new().fit(&spread).unwrap();
        assert!(params.theta <= 0.0);
        assert!(params.mu.is_none());
        assert!(params.half_life.is_none());
        assert!(!params.is_valid());
    }

    #[test]
    fn test_too_few_points() {
        let err = MeanReversionModel::new().fit(&[1.0, 2.0]).unwrap_err();
        assert!(matches!(err, EstimationError::TooFewObservations { .. }));
    }

    #[test]
    fn test_constant_spread() {
        let err = MeanReversionModel::new().fit(&[0.7; 30]).unwrap_err();
        assert_eq!(err, EstimationError::DegenerateRegressor);
    }
}
