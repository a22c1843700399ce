//! Shared data structures for downhole temperature recovery
//!
//! - `record`: TimeSeriesRecord and timestamp parsing
//! - `matrix`: FeatureMatrix consumed by the estimators
//! - `ml`: ErrorReport, ImputedSeries, ObservedSeries, ComparisonTable

mod matrix;
mod ml;
pub mod record;

pub use matrix::*;
pub use ml::*;
pub use record::{format_timestamp, parse_timestamp, TimeSeriesRecord};
