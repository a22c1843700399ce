//! Run Configuration Module
//!
//! Per-run configuration loaded from TOML: which channel to reconstruct,
//! where the sensor failed, which model families to search and how.
//!
//! ## Loading Order
//!
//! 1. `VOLVE_IMPUTE_CONFIG` environment variable (path to TOML file)
//! 2. `impute_config.toml` in the current working directory
//! 3. Built-in defaults (the Volve production values)
//!
//! ## Usage
//!
//! ```ignore
//! let config = ImputeConfig::load();
//! let report = ImputationPipeline::new(config).run_file(&csv_path)?;
//! ```

mod impute_config;
pub mod defaults;
pub mod validation;

pub use impute_config::*;
