//! Ports Layer - Trait definitions for external dependencies
//!
//! The pipeline core only sees price history through `PriceMatrixProvider`.
//! Retrieval, caching and persistence live behind it in the adapters.

pub mod market_data;

pub use market_data::{PriceMatrixProvider, PriceQuery, ProviderError};

#[cfg(test)]
pub use market_data::MockPriceMatrixProvider;
