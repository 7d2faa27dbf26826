//! Spread PnL Simulation
//!
//! Replays a position series against the spread it was derived from:
//! - spread_t = y_t - beta * x_t, recomputed from the legs
//! - positions execute one step late (yesterday's decision earns today's move)
//! - every unit of position change pays `cost_rate`

use serde::Serialize;

use crate::domain::{DataError, Position};
use crate::strategy::spread::compute_spread;

/// Per-step simulation output, aligned to the input index
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PnlSeries {
    pub spread: Vec<f64>,
    /// spread_t - spread_{t-1}; 0 at the first step
    pub spread_return: Vec<f64>,
    /// Position held over each step (lagged decision)
    pub effective_position: Vec<f64>,
    /// |change in effective position|
    pub trades: Vec<f64>,
    pub costs: Vec<f64>,
    pub raw_pnl: Vec<f64>,
    pub net_pnl: Vec<f64>,
}

impl PnlSeries {
    pub fn len(&self) -> usize {
        self.net_pnl.len()
    }

    pub fn is_empty(&self) -> bool {
        self.net_pnl.is_empty()
    }

    /// Steps with a non-zero position change
    pub fn trade_count(&self) -> usize {
        self.trades.iter().filter(|t| **t > 0.0).count()
    }

    /// Units of position traded over the run
    pub fn turnover(&self) -> f64 {
        self.trades.iter().sum()
    }

    pub fn total_cost(&self) -> f64 {
        self.costs.iter().sum()
    }
}

#[derive(Debug, Clone, Copy)]
pub struct PnlSimulator {
    cost_rate: f64,
}

impl Default for PnlSimulator {
    fn default() -> Self {
        Self { cost_rate: 0.001 }
    }
}

impl PnlSimulator {
    pub fn new(cost_rate: f64) -> Self {
        Self { cost_rate }
    }

    pub fn cost_rate(&self) -> f64 {
        self.cost_rate
    }

    /// Simulate the net PnL of `positions` on the spread of `y` and `x`.
    pub fn simulate(
        &self,
        positions: &[Position],
        y: &[f64],
        x: &[f64],
        hedge_ratio: f64,
    ) -> Result<PnlSeries, DataError> {
        if y.len() != x.len() {
            return Err(DataError::Misaligned {
                left: y.len(),
                right: x.len(),
            });
        }
        if positions.len() != y.len() {
            return Err(DataError::Misaligned {
                left: positions.len(),
                right: y.len(),
            });
        }

        let n = y.len();
        let spread = compute_spread(y, x, hedge_ratio);

        let mut spread_return = Vec::with_capacity(n);
        let mut effective_position: Vec<f64> = Vec::with_capacity(n);
        let mut trades = Vec::with_capacity(n);
        let mut costs = Vec::with_capacity(n);
        let mut raw_pnl = Vec::with_capacity(n);
        let mut net_pnl = Vec::with_capacity(n);

        for t in 0..n {
            let (ret, held, trade) = if t == 0 {
                (0.0, 0.0, 0.0)
            } else {
                let held = positions[t - 1].as_f64();
                let prev_held = effective_position[t - 1];
                (spread[t] - spread[t - 1], held, (held - prev_held).abs())
            };
            let raw = held * ret;
            let cost = trade * self.cost_rate;

            spread_return.push(ret);
            effective_position.push(held);
            trades.push(trade);
            costs.push(cost);
            raw_pnl.push(raw);
            net_pnl.push(raw - cost);
        }

        Ok(PnlSeries {
            spread,
            spread_return,
            effective_position,
            trades,
            costs,
            raw_pnl,
            net_pnl,
        })
    }
}
