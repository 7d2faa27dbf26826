use async_trait::async_trait;
use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::domain::PriceMatrix;

/// Errors raised by a price provider. The pipeline passes them through
/// unchanged and never retries.
#[derive(Error, Debug)]
pub enum ProviderError {
    #[error("Failed to read price source: {0}")]
    Io(#[from] std::io::Error),

    #[error("Data parsing error: {0}")]
    Parse(String),

    #[error("Invalid price data: {0}")]
    InvalidData(#[from] crate::domain::DataError),

    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Upstream source error: {0}")]
    Upstream(String),
}

/// Which slice of history to fetch
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PriceQuery {
    /// Symbols to include, in column order; empty means every symbol
    pub symbols: Vec<String>,
    pub start: Option<DateTime<Utc>>,
    pub end: Option<DateTime<Utc>>,
}

impl PriceQuery {
    pub fn all() -> Self {
        Self::default()
    }

    pub fn with_symbols(mut self, symbols: Vec<String>) -> Self {
        self.symbols = symbols;
        self
    }

    pub fn between(mut self, start: DateTime<Utc>, end: DateTime<Utc>) -> Self {
        self.start = Some(start);
        self.end = Some(end);
        self
    }

    /// Apply the symbol and time filters to a full matrix
    pub fn apply(&self, matrix: &PriceMatrix) -> Result<PriceMatrix, ProviderError> {
        let sliced = matrix.slice_time(self.start, self.end);
        if self.symbols.is_empty() {
            Ok(sliced)
        } else {
            Ok(sliced.select(&self.symbols)?)
        }
    }
}

/// Source of log-price history
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait PriceMatrixProvider: Send + Sync {
    /// Fetch log prices for the requested symbols and time range
    async fn fetch_log_prices(&self, query: &PriceQuery) -> Result<PriceMatrix, ProviderError>;
}
