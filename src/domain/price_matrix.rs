//! Price Matrix
//!
//! Log-price observations for a set of symbols over a shared, strictly
//! increasing time index. Missing observations are stored as `NaN`.
//!
//! The matrix is immutable once built; every pipeline stage borrows it
//! read-only, so a single instance can be shared across worker threads.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Data-level failures. Scoped to a pair (or to matrix construction),
/// never fatal to a whole scan.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum DataError {
    #[error("Timestamps must be strictly increasing (violation at index {0})")]
    NonIncreasingTimestamps(usize),
    #[error("Duplicate symbol column: {0}")]
    DuplicateSymbol(String),
    #[error("Column {symbol} has {actual} rows, expected {expected}")]
    ColumnLength {
        symbol: String,
        expected: usize,
        actual: usize,
    },
    #[error("Non-positive price {price} for {symbol} at index {index}")]
    NonPositivePrice {
        symbol: String,
        index: usize,
        price: f64,
    },
    #[error("Unknown symbol: {0}")]
    UnknownSymbol(String),
    #[error("Missing value in {symbol} at index {index}")]
    MissingValues { symbol: String, index: usize },
    #[error("Insufficient history: {available} overlapping observations, need {required}")]
    InsufficientHistory { available: usize, required: usize },
    #[error("Misaligned series: {left} vs {right} observations")]
    Misaligned { left: usize, right: usize },
}

/// Log prices per symbol over time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawPriceMatrix", into = "RawPriceMatrix")]
pub struct PriceMatrix {
    timestamps: Vec<DateTime<Utc>>,
    symbols: Vec<String>,
    columns: Vec<Vec<f64>>,
}

/// Serialized form; `null` marks a missing observation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RawPriceMatrix {
    pub timestamps: Vec<DateTime<Utc>>,
    pub columns: Vec<RawColumn>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RawColumn {
    pub symbol: String,
    pub values: Vec<Option<f64>>,
}

impl TryFrom<RawPriceMatrix> for PriceMatrix {
    type Error = DataError;

    fn try_from(raw: RawPriceMatrix) -> Result<Self, Self::Error> {
        let columns = raw
            .columns
            .into_iter()
            .map(|c| {
                let values = c.values.into_iter().map(|v| v.unwrap_or(f64::NAN)).collect();
                (c.symbol, values)
            })
            .collect();
        PriceMatrix::new(raw.timestamps, columns)
    }
}

impl From<PriceMatrix> for RawPriceMatrix {
    fn from(matrix: PriceMatrix) -> Self {
        let columns = matrix
            .symbols
            .into_iter()
            .zip(matrix.columns)
            .map(|(symbol, values)| RawColumn {
                symbol,
                values: values
                    .into_iter()
                    .map(|v| if v.is_nan() { None } else { Some(v) })
                    .collect(),
            })
            .collect();
        RawPriceMatrix {
            timestamps: matrix.timestamps,
            columns,
        }
    }
}

impl PriceMatrix {
    /// Build a matrix from already log-transformed columns.
    pub fn new(
        timestamps: Vec<DateTime<Utc>>,
        columns: Vec<(String, Vec<f64>)>,
    ) -> Result<Self, DataError> {
        if let Some(i) = timestamps.windows(2).position(|w| w[1] <= w[0]) {
            return Err(DataError::NonIncreasingTimestamps(i + 1));
        }

        let mut symbols: Vec<String> = Vec::with_capacity(columns.len());
        let mut data = Vec::with_capacity(columns.len());
        for (symbol, values) in columns {
            if symbols.contains(&symbol) {
                return Err(DataError::DuplicateSymbol(symbol));
            }
            if values.len() != timestamps.len() {
                return Err(DataError::ColumnLength {
                    symbol,
                    expected: timestamps.len(),
                    actual: values.len(),
                });
            }
            symbols.push(symbol);
            data.push(values);
        }

        Ok(Self {
            timestamps,
            symbols,
            columns: data,
        })
    }

    /// Build a matrix from raw prices, taking the natural log of each value.
    pub fn from_prices(
        timestamps: Vec<DateTime<Utc>>,
        columns: Vec<(String, Vec<f64>)>,
    ) -> Result<Self, DataError> {
        let mut logged = Vec::with_capacity(columns.len());
        for (symbol, prices) in columns {
            let mut values = Vec::with_capacity(prices.len());
            for (index, &price) in prices.iter().enumerate() {
                if price.is_nan() {
                    values.push(f64::NAN);
                } else if price <= 0.0 {
                    return Err(DataError::NonPositivePrice {
                        symbol,
                        index,
                        price,
                    });
                } else {
                    values.push(price.ln());
                }
            }
            logged.push((symbol, values));
        }
        Self::new(timestamps, logged)
    }

    pub fn timestamps(&self) -> &[DateTime<Utc>] {
        &self.timestamps
    }

    pub fn symbols(&self) -> &[String] {
        &self.symbols
    }

    /// Number of observations (rows)
    pub fn len(&self) -> usize {
        self.timestamps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.timestamps.is_empty()
    }

    pub fn symbol_count(&self) -> usize {
        self.symbols.len()
    }

    /// Log-price column for a symbol
    pub fn column(&self, symbol: &str) -> Option<&[f64]> {
        self.symbols
            .iter()
            .position(|s| s == symbol)
            .map(|i| self.columns[i].as_slice())
    }

    /// Keep only the given symbols, in the given order.
    pub fn select(&self, symbols: &[String]) -> Result<Self, DataError> {
        let mut columns = Vec::with_capacity(symbols.len());
        for symbol in symbols {
            let column = self
                .column(symbol)
                .ok_or_else(|| DataError::UnknownSymbol(symbol.clone()))?;
            columns.push((symbol.clone(), column.to_vec()));
        }
        Self::new(self.timestamps.clone(), columns)
    }

    /// Restrict to rows with `start <= t <= end` (either bound optional).
    pub fn slice_time(&self, start: Option<DateTime<Utc>>, end: Option<DateTime<Utc>>) -> Self {
        let from = start.map_or(0, |s| self.timestamps.partition_point(|t| *t < s));
        let to = end.map_or(self.len(), |e| self.timestamps.partition_point(|t| *t <= e));
        let to = to.max(from);

        Self {
            timestamps: self.timestamps[from..to].to_vec(),
            symbols: self.symbols.clone(),
            columns: self.columns.iter().map(|c| c[from..to].to_vec()).collect(),
        }
    }

    /// Overlapping window of two columns.
    ///
    /// Leading and trailing missing values are trimmed (a symbol that listed
    /// late or delisted early); a gap inside the window is an error.
    pub fn aligned_pair(
        &self,
        symbol_a: &str,
        symbol_b: &str,
        min_observations: usize,
    ) -> Result<AlignedPair, DataError> {
        let a = self
            .column(symbol_a)
            .ok_or_else(|| DataError::UnknownSymbol(symbol_a.to_string()))?;
        let b = self
            .column(symbol_b)
            .ok_or_else(|| DataError::UnknownSymbol(symbol_b.to_string()))?;

        let present = |i: usize| !a[i].is_nan() && !b[i].is_nan();
        let start = (0..self.len()).find(|&i| present(i));
        let end = (0..self.len()).rev().find(|&i| present(i));

        let (start, end) = match (start, end) {
            (Some(s), Some(e)) => (s, e + 1),
            _ => {
                return Err(DataError::InsufficientHistory {
                    available: 0,
                    required: min_observations,
                })
            }
        };

        for i in start..end {
            if a[i].is_nan() {
                return Err(DataError::MissingValues {
                    symbol: symbol_a.to_string(),
                    index: i,
                });
            }
            if b[i].is_nan() {
                return Err(DataError::MissingValues {
                    symbol: symbol_b.to_string(),
                    index: i,
                });
            }
        }

        let available = end - start;
        if available < min_observations {
            return Err(DataError::InsufficientHistory {
                available,
                required: min_observations,
            });
        }

        Ok(AlignedPair {
            symbol_a: symbol_a.to_string(),
            symbol_b: symbol_b.to_string(),
            start,
            timestamps: self.timestamps[start..end].to_vec(),
            y: a[start..end].to_vec(),
            x: b[start..end].to_vec(),
        })
    }
}

/// Two gap-free legs over their common window.
///
/// `y` is the dependent leg (symbol A), `x` the independent leg (symbol B).
#[derive(Debug, Clone, PartialEq)]
pub struct AlignedPair {
    pub symbol_a: String,
    pub symbol_b: String,
    /// Offset of the first row into the matrix index
    pub start: usize,
    /// Matrix timestamps of the window rows
    pub timestamps: Vec<DateTime<Utc>>,
    pub y: Vec<f64>,
    pub x: Vec<f64>,
}

impl AlignedPair {
    pub fn len(&self) -> usize {
        self.y.len()
    }

    pub fn is_empty(&self) -> bool {
        self.y.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    fn days(n: usize) -> Vec<DateTime<Utc>> {
        let start = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        (0..n).map(|i| start + Duration::days(i as i64)).collect()
    }

    #[test]
    fn test_rejects_non_increasing_timestamps() {
        let mut ts = days(3);
        ts[2] = ts[1];
        let err = PriceMatrix::new(ts, vec![("A".into(), vec![1.0, 2.0, 3.0])]).unwrap_err();
        assert_eq!(err, DataError::NonIncreasingTimestamps(2));
    }

    #[test]
    fn test_rejects_duplicate_symbol() {
        let err = PriceMatrix::new(
            days(2),
            vec![("A".into(), vec![1.0, 2.0]), ("A".into(), vec![1.0, 2.0])],
        )
        .unwrap_err();
        assert_eq!(err, DataError::DuplicateSymbol("A".into()));
    }

    #[test]
    fn test_rejects_short_column() {
        let err = PriceMatrix::new(days(3), vec![("A".into(), vec![1.0])]).unwrap_err();
        assert!(matches!(err, DataError::ColumnLength { expected: 3, actual: 1, .. }));
    }

    #[test]
    fn test_from_prices_takes_log() {
        let m = PriceMatrix::from_prices(days(2), vec![("A".into(), vec![1.0, std::f64::consts::E])])
            .unwrap();
        let col = m.column("A").unwrap();
        assert_eq!(col[0], 0.0);
        assert!((col[1] - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_from_prices_rejects_zero() {
        let err = PriceMatrix::from_prices(days(2), vec![("A".into(), vec![1.0, 0.0])]).unwrap_err();
        assert!(matches!(err, DataError::NonPositivePrice { index: 1, .. }));
    }

    #[test]
    fn test_aligned_pair_trims_edges() {
        let nan = f64::NAN;
        let m = PriceMatrix::new(
            days(6),
            vec![
                ("A".into(), vec![nan, 1.0, 2.0, 3.0, 4.0, 5.0]),
                ("B".into(), vec![1.0, 1.0, 2.0, 3.0, 4.0, nan]),
            ],
        )
        .unwrap();

        let pair = m.aligned_pair("A", "B", 3).unwrap();
        assert_eq!(pair.start, 1);
        assert_eq!(pair.timestamps, days(6)[1..5].to_vec());
        assert_eq!(pair.y, vec![1.0, 2.0, 3.0, 4.0]);
        assert_eq!(pair.x, vec![1.0, 2.0, 3.0, 4.0]);
    }

    #[test]
    fn test_aligned_pair_interior_gap() {
        let m = PriceMatrix::new(
            days(4),
            vec![
                ("A".into(), vec![1.0, f64::NAN, 2.0, 3.0]),
                ("B".into(), vec![1.0, 2.0, 3.0, 4.0]),
            ],
        )
        .unwrap();

        let err = m.aligned_pair("A", "B", 2).unwrap_err();
        assert_eq!(
            err,
            DataError::MissingValues {
                symbol: "A".into(),
                index: 1
            }
        );
    }

    #[test]
    fn test_aligned_pair_insufficient_history() {
        let m = PriceMatrix::new(
            days(3),
            vec![("A".into(), vec![1.0, 2.0, 3.0]), ("B".into(), vec![1.0, 2.0, 3.0])],
        )
        .unwrap();

        let err = m.aligned_pair("A", "B", 10).unwrap_err();
        assert_eq!(
            err,
            DataError::InsufficientHistory {
                available: 3,
                required: 10
            }
        );
    }

    #[test]
    fn test_slice_and_select() {
        let ts = days(5);
        let m = PriceMatrix::new(
            ts.clone(),
            vec![
                ("A".into(), vec![1.0, 2.0, 3.0, 4.0, 5.0]),
                ("B".into(), vec![5.0, 4.0, 3.0, 2.0, 1.0]),
            ],
        )
        .unwrap();

        let sliced = m.slice_time(Some(ts[1]), Some(ts[3]));
        assert_eq!(sliced.len(), 3);
        assert_eq!(sliced.column("A").unwrap(), &[2.0, 3.0, 4.0]);

        let only_b = m.select(&["B".to_string()]).unwrap();
        assert_eq!(only_b.symbols(), &["B".to_string()]);
        assert!(m.select(&["C".to_string()]).is_err());
    }

    #[test]
    fn test_json_roundtrip_keeps_missing() {
        let m = PriceMatrix::new(days(2), vec![("A".into(), vec![1.0, f64::NAN])]).unwrap();
        let json = serde_json::to_string(&m).unwrap();
        assert!(json.contains("null"));
        let back: PriceMatrix = serde_json::from_str(&json).unwrap();
        assert!(back.column("A").unwrap()[1].is_nan());
    }
}
