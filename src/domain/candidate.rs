//! Pair candidates produced by the scan and fit stages.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Ordered symbol pair. `a` is the dependent leg, `b` the hedge leg.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct PairKey {
    pub a: String,
    pub b: String,
}

impl PairKey {
    pub fn new(a: impl Into<String>, b: impl Into<String>) -> Self {
        Self {
            a: a.into(),
            b: b.into(),
        }
    }
}

impl fmt::Display for PairKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.a, self.b)
    }
}

/// A cointegrated pair with its fitted spread and OU parameters.
///
/// Invalid when theta <= 0: the spread does not mean-revert, so `mu` and
/// `half_life` are undefined.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PairCandidate {
    pub pair: PairKey,
    /// Position of the pair in scan enumeration order
    pub scan_index: usize,
    /// Engle-Granger ADF statistic
    pub test_statistic: f64,
    pub p_value: f64,
    pub hedge_ratio: f64,
    pub intercept: f64,
    pub theta: f64,
    pub mu: Option<f64>,
    pub sigma: f64,
    pub half_life: Option<f64>,
}

impl PairCandidate {
    pub fn is_valid(&self) -> bool {
        self.theta > 0.0 && self.half_life.is_some()
    }
}
