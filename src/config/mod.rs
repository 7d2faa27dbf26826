//! Configuration Module
//!
//! Loads and validates pipeline configuration from TOML files.

pub mod loader;

pub use loader::{load_config, Config, ConfigError, DataSection, LoggingSection, DATA_PATH_ENV};
