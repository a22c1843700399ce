//! Feature matrix consumed by the estimators.

use ndarray::Array2;

/// Rows are samples, columns are feature channels in view order.
pub type FeatureMatrix = Array2<f64>;
