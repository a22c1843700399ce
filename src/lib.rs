//! volve-impute: Downhole Temperature Recovery
//!
//! Reconstructs a production well's downhole temperature over the window in
//! which its sensor failed, using tree-ensemble regressors trained on the
//! period before the failure.
//!
//! ## Architecture
//!
//! - **Dataset**: time-ordered production records, CSV ingestion, transforms
//! - **Partition**: ground-truth / to-impute split at the sensor cutover
//! - **ML Engine**: CART trees, forests, boosting, randomized k-fold search,
//!   evaluation, imputation and aggregation
//! - **Pipeline**: stage-by-stage orchestration with stage-tagged errors
//! - **Report**: console summary, CSV and JSON export

pub mod config;
pub mod dataset;
pub mod ml_engine;
pub mod partition;
pub mod pipeline;
pub mod report;
pub mod types;

// Re-export run configuration
pub use config::ImputeConfig;

// Re-export commonly used types
pub use dataset::{Dataset, DatasetError};
pub use partition::{Partition, SensorFailurePartitioner};
pub use types::{ComparisonTable, ErrorReport, ImputedSeries, ObservedSeries, TimeSeriesRecord};

// Re-export ML Engine entry points
pub use ml_engine::{Evaluator, FamilyDescriptor, ModelFamily, ModelSearchUnit, ResultAggregator};

// Re-export pipeline
pub use pipeline::{ImputationPipeline, PipelineError, PipelineReport};
