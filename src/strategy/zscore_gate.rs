//! Rolling Z-Score
//!
//! Standardizes each spread value against the trailing window that ends at
//! that value:
//!
//! z_t = (s_t - mean(s_{t-W+1..=t})) / std(s_{t-W+1..=t})
//!
//! The standard deviation is the sample one (W - 1 denominator). No value is
//! produced until the window is full, when the window is flat, or when it
//! contains a missing value.

/// Window std below this is treated as zero
const MIN_STD: f64 = 1e-12;

/// Result of z-score calculation
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ZScoreResult {
    /// Current z-score value
    pub z_score: f64,
    /// Rolling mean used in calculation
    pub mean: f64,
    /// Rolling sample standard deviation
    pub std_dev: f64,
    /// Current spread value
    pub current: f64,
}

/// Streaming z-score over a fixed trailing window
#[derive(Debug, Clone)]
pub struct ZScoreGate {
    window: usize,
    buffer: Vec<f64>,
}

impl ZScoreGate {
    pub fn new(window: usize) -> Self {
        Self {
            window,
            buffer: Vec::with_capacity(window),
        }
    }

    /// Push the next spread value and return its z-score if defined
    pub fn update(&mut self, value: f64) -> Option<ZScoreResult> {
        self.buffer.push(value);

        // Keep buffer at window size
        if self.buffer.len() > self.window {
            self.buffer.remove(0);
        }

        self.calculate()
    }

    /// Calculate z-score from current buffer
    pub fn calculate(&self) -> Option<ZScoreResult> {
        if self.window < 2 || self.buffer.len() < self.window {
            return None;
        }
        if self.buffer.iter().any(|v| v.is_nan()) {
            return None;
        }

        let mean = self.rolling_mean();
        let std_dev = self.rolling_std(mean);

        if std_dev.is_nan() || std_dev <= MIN_STD {
            return None;
        }

        let current = *self.buffer.last()?;
        Some(ZScoreResult {
            z_score: (current - mean) / std_dev,
            mean,
            std_dev,
            current,
        })
    }

    fn rolling_mean(&self) -> f64 {
        self.buffer.iter().sum::<f64>() / self.buffer.len() as f64
    }

    fn rolling_std(&self, mean: f64) -> f64 {
        let variance = self
            .buffer
            .iter()
            .map(|v| (v - mean).powi(2))
            .sum::<f64>()
            / (self.buffer.len() - 1) as f64;

        variance.sqrt()
    }
}

/// Z-score of every point of a series; same length as the input
pub fn rolling_zscore(series: &[f64], window: usize) -> Vec<Option<f64>> {
    let mut gate = ZScoreGate::new(window);
    series
        .iter()
        .map(|&v| gate.update(v).map(|r| r.z_score))
        .collect()
}
