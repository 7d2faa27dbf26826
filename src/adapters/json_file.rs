//! JSON File Market Data
//!
//! Reads a price panel from a JSON document:
//!
//! ```json
//! {
//!   "timestamps": ["2020-01-01T00:00:00Z", "2020-01-02T00:00:00Z"],
//!   "columns": [
//!     { "symbol": "EWA", "values": [3.01, null] },
//!     { "symbol": "EWC", "values": [3.22, 3.25] }
//!   ]
//! }
//! ```
//!
//! `null` marks a missing observation. Values are log prices unless the
//! provider is built in raw-price mode, in which case they are logged on load.

use async_trait::async_trait;
use std::path::{Path, PathBuf};

use crate::domain::{PriceMatrix, RawPriceMatrix};
use crate::ports::{PriceMatrixProvider, PriceQuery, ProviderError};

#[derive(Debug, Clone)]
pub struct JsonFileMarketData {
    path: PathBuf,
    raw_prices: bool,
}

impl JsonFileMarketData {
    /// Provider for a file of log prices
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            raw_prices: false,
        }
    }

    /// Treat file values as raw prices
    pub fn with_raw_prices(mut self, raw_prices: bool) -> Self {
        self.raw_prices = raw_prices;
        self
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Parse a document held in memory
    pub fn parse(&self, content: &str) -> Result<PriceMatrix, ProviderError> {
        let raw: RawPriceMatrix =
            serde_json::from_str(content).map_err(|e| ProviderError::Parse(e.to_string()))?;

        if !self.raw_prices {
            return Ok(PriceMatrix::try_from(raw)?);
        }

        let columns = raw
            .columns
            .into_iter()
            .map(|c| {
                let values = c.values.into_iter().map(|v| v.unwrap_or(f64::NAN)).collect();
                (c.symbol, values)
            })
            .collect();
        Ok(PriceMatrix::from_prices(raw.timestamps, columns)?)
    }
}

#[async_trait]
impl PriceMatrixProvider for JsonFileMarketData {
    async fn fetch_log_prices(&self, query: &PriceQuery) -> Result<PriceMatrix, ProviderError> {
        tracing::debug!("Reading prices from {}", self.path.display());
        let content = tokio::fs::read_to_string(&self.path).await?;
        let matrix = self.parse(&content)?;
        query.apply(&matrix)
    }
}

/// Write a matrix as log prices in the format `JsonFileMarketData` reads
pub async fn save_matrix(path: &Path, matrix: &PriceMatrix) -> Result<(), ProviderError> {
    let json =
        serde_json::to_string_pretty(matrix).map_err(|e| ProviderError::Parse(e.to_string()))?;
    tokio::fs::write(path, json).await?;
    Ok(())
}
