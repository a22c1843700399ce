//! ML Engine for downhole temperature recovery
//!
//! Tree-ensemble regression tuned by randomized k-fold search, used to
//! reconstruct a temperature channel over the window where its sensor failed.
//!
//! ## Key Features
//! - Four registered families: random forest, extra trees, gradient boosting,
//!   AdaBoost.R2, all built on one CART regression tree
//! - Seeded randomized search with k-fold cross-validation (rayon-parallel,
//!   deterministic collection order)
//! - In-sample diagnostics (R², MAE, MSE) and feature importances
//! - Statistical correlation screen (p-value filtering via statrs)
//!
//! ## Architecture
//! - `tree`: CART regression tree (best and random splits)
//! - `forest`: Random forest / extra trees averaging ensembles
//! - `boosting`: Gradient boosting and AdaBoost.R2
//! - `grid`: Parameter grids, sampled parameter sets
//! - `family`: Model families, descriptors, fitted models
//! - `folds`: K-fold row assignment (shuffled or contiguous)
//! - `metrics`: R², MAE, MSE and CV scoring rules
//! - `search`: Model Search Unit
//! - `evaluation`: Evaluation & Imputation Unit
//! - `aggregate`: Result Aggregator
//! - `correlations`: Pearson correlation with p-value testing (statrs)
//! - `seed`: Per-stream seed derivation

pub mod aggregate;
pub mod boosting;
pub mod correlations;
pub mod evaluation;
pub mod family;
pub mod folds;
pub mod forest;
pub mod grid;
pub mod metrics;
pub mod search;
pub mod seed;
pub mod tree;

// Re-export public types
pub use aggregate::{AggregateError, ResultAggregator};
pub use boosting::{AdaBoost, AdaBoostLoss, AdaBoostParams, GradientBoosting, GradientBoostingParams};
pub use correlations::{CorrelationEngine, CorrelationMatrix};
pub use evaluation::{EvaluationError, Evaluator};
pub use family::{FamilyDescriptor, FittedModel, Hyperparameters, ModelFamily, TrainedModel};
pub use folds::{Fold, FoldStrategy, KFold};
pub use forest::{Forest, ForestParams};
pub use grid::{GridError, ParamSet, ParamValue, ParameterGrid};
pub use metrics::Scoring;
pub use search::{CandidateScore, ModelSearchUnit, SearchError, SearchResult, SearchSettings};
pub use tree::{FitError, RegressionTree, SplitStrategy, TreeParams};
