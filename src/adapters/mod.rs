//! Adapters Layer - External System Implementations
//!
//! Implementations of the port traits and the outer surface:
//! - JSON file: price panels on disk
//! - Synthetic: seeded cointegrated panels for demos and tests
//! - CLI: Command-line interface handlers

pub mod cli;
pub mod json_file;
pub mod synthetic;

pub use cli::CliApp;
pub use json_file::{save_matrix, JsonFileMarketData};
pub use synthetic::{GaussianSource, SyntheticConfig, SyntheticMarketData};
