//! ML Engine types: correlation thresholds, error reports, imputed series and
//! the per-family comparison table.

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::ml_engine::ModelFamily;

/// Thresholds for the channel correlation screen
pub mod correlation_thresholds {
    /// P-value threshold for statistical significance
    pub const SIGNIFICANCE_THRESHOLD: f64 = 0.05;
    /// Minimum complete pairs for a meaningful correlation
    pub const MIN_CORRELATION_SAMPLES: usize = 30;
}

/// Correlation that passed statistical significance test
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SignificantCorrelation {
    pub x_param: String,
    pub y_param: String,
    /// Pearson correlation coefficient (-1 to 1)
    pub r_value: f64,
    /// Coefficient of determination (r²)
    pub r_squared: f64,
    /// p-value for significance testing
    pub p_value: f64,
    /// Sample count used for calculation
    pub sample_count: usize,
}

/// In-sample goodness of fit for one model family on the ground-truth segment.
///
/// These are training-set numbers: the pipeline never holds out rows of the
/// ground-truth segment when computing them.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ErrorReport {
    /// Coefficient of determination
    pub r2: f64,
    /// Mean absolute error
    pub mae: f64,
    /// Mean squared error
    pub mse: f64,
    /// Rows the metrics were computed over
    pub samples: usize,
}

/// Readings of one channel over a span of timestamps.
///
/// Used for the original (unreliable) target readings of the to-impute
/// segment and for the observed target of the ground-truth segment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ObservedSeries {
    pub channel: String,
    pub timestamps: Vec<NaiveDateTime>,
    pub values: Vec<f64>,
}

impl ObservedSeries {
    pub fn len(&self) -> usize {
        self.timestamps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.timestamps.is_empty()
    }
}

/// Reconstructed target values produced by one model family for the
/// to-impute segment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImputedSeries {
    pub family: ModelFamily,
    pub channel: String,
    pub timestamps: Vec<NaiveDateTime>,
    pub values: Vec<f64>,
}

impl ImputedSeries {
    pub fn len(&self) -> usize {
        self.timestamps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.timestamps.is_empty()
    }

    pub fn mean(&self) -> f64 {
        if self.values.is_empty() {
            return f64::NAN;
        }
        self.values.iter().sum::<f64>() / self.values.len() as f64
    }
}

/// Side-by-side view of every family's error report and imputed values.
///
/// `imputed` columns and `observed` are aligned with `timestamps`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComparisonTable {
    pub errors: BTreeMap<ModelFamily, ErrorReport>,
    pub channel: String,
    pub timestamps: Vec<NaiveDateTime>,
    /// Original readings of the target channel over the to-impute segment
    pub observed: Vec<f64>,
    pub imputed: BTreeMap<ModelFamily, Vec<f64>>,
}

impl ComparisonTable {
    pub fn len(&self) -> usize {
        self.timestamps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.timestamps.is_empty()
    }

    pub fn families(&self) -> Vec<ModelFamily> {
        self.imputed.keys().copied().collect()
    }

    pub fn column(&self, family: ModelFamily) -> Option<&[f64]> {
        self.imputed.get(&family).map(Vec::as_slice)
    }

    /// Family with the lowest in-sample MAE, if any reports are present.
    pub fn best_in_sample(&self) -> Option<(ModelFamily, &ErrorReport)> {
        self.errors
            .iter()
            .min_by(|a, b| a.1.mae.total_cmp(&b.1.mae))
            .map(|(f, r)| (*f, r))
    }
}
