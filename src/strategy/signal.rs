//! Spread Signal State Machine
//!
//! Turns a z-score series into a Long / Short / Flat position series.
//! Transition rules, checked in this order for each step:
//! 1. z < -entry and Flat  => Long
//! 2. z > entry and Flat   => Short
//! 3. |z| < exit           => Flat
//! 4. otherwise            => hold
//!
//! Entries only fire from Flat, so a Long cannot flip straight to Short (or
//! back) without first passing through an exit. An undefined z-score holds
//! the previous state.

use serde::Serialize;

use crate::domain::Position;
use crate::strategy::params::SignalConfig;
use crate::strategy::zscore_gate::rolling_zscore;

/// z-scores and the positions derived from them, index aligned
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SignalSeries {
    pub z_scores: Vec<Option<f64>>,
    pub positions: Vec<Position>,
}

#[derive(Debug, Clone)]
pub struct SignalGenerator {
    config: SignalConfig,
}

impl SignalGenerator {
    pub fn new(config: SignalConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &SignalConfig {
        &self.config
    }

    /// One transition
    pub fn step(&self, prev: Position, z: Option<f64>) -> Position {
        let Some(z) = z else {
            return prev;
        };
        let SignalConfig { entry_z, exit_z, .. } = self.config;

        if z < -entry_z && prev == Position::Flat {
            Position::Long
        } else if z > entry_z && prev == Position::Flat {
            Position::Short
        } else if z.abs() < exit_z {
            Position::Flat
        } else {
            prev
        }
    }

    /// Apply `step` to every z-score, starting from `initial`
    pub fn positions_from(&self, initial: Position, z_scores: &[Option<f64>]) -> Vec<Position> {
        z_scores
            .iter()
            .scan(initial, |state, &z| {
                *state = self.step(*state, z);
                Some(*state)
            })
            .collect()
    }

    /// Position series for a z-score series; the first step is always Flat
    pub fn generate(&self, z_scores: &[Option<f64>]) -> Vec<Position> {
        if z_scores.is_empty() {
            return Vec::new();
        }
        let mut positions = Vec::with_capacity(z_scores.len());
        positions.push(Position::Flat);
        positions.extend(self.positions_from(Position::Flat, &z_scores[1..]));
        positions
    }

    /// Rolling z-score of the spread followed by `generate`
    pub fn from_spread(&self, spread: &[f64]) -> SignalSeries {
        let z_scores = rolling_zscore(spread, self.config.window);
        let positions = self.generate(&z_scores);
        SignalSeries {
            z_scores,
            positions,
        }
    }
}
