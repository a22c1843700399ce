//! Regression metrics and cross-validation scoring rules.

use crate::types::ErrorReport;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Coefficient of determination.
///
/// A constant target scores 1.0 when predicted exactly and 0.0 otherwise.
/// Empty input is `NaN`.
pub fn r2(y_true: &[f64], y_pred: &[f64]) -> f64 {
    let n = y_true.len().min(y_pred.len());
    if n == 0 {
        return f64::NAN;
    }
    let mean = y_true[..n].iter().sum::<f64>() / n as f64;
    let ss_res: f64 = y_true.iter().zip(y_pred).map(|(t, p)| (t - p).powi(2)).sum();
    let ss_tot: f64 = y_true[..n].iter().map(|t| (t - mean).powi(2)).sum();

    if ss_tot == 0.0 {
        return if ss_res == 0.0 { 1.0 } else { 0.0 };
    }
    1.0 - ss_res / ss_tot
}

pub fn mae(y_true: &[f64], y_pred: &[f64]) -> f64 {
    mean_of(y_true.iter().zip(y_pred).map(|(t, p)| (t - p).abs()))
}

pub fn mse(y_true: &[f64], y_pred: &[f64]) -> f64 {
    mean_of(y_true.iter().zip(y_pred).map(|(t, p)| (t - p).powi(2)))
}

fn mean_of(values: impl Iterator<Item = f64>) -> f64 {
    let (sum, n) = values.fold((0.0, 0usize), |(s, n), v| (s + v, n + 1));
    if n == 0 {
        f64::NAN
    } else {
        sum / n as f64
    }
}

impl ErrorReport {
    pub fn from_predictions(y_true: &[f64], y_pred: &[f64]) -> Self {
        Self {
            r2: r2(y_true, y_pred),
            mae: mae(y_true, y_pred),
            mse: mse(y_true, y_pred),
            samples: y_true.len().min(y_pred.len()),
        }
    }
}

/// Held-out fold score; higher is better for every variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Scoring {
    #[default]
    R2,
    NegMeanSquaredError,
    NegMeanAbsoluteError,
}

impl Scoring {
    pub fn score(self, y_true: &[f64], y_pred: &[f64]) -> f64 {
        match self {
            Self::R2 => r2(y_true, y_pred),
            Self::NegMeanSquaredError => -mse(y_true, y_pred),
            Self::NegMeanAbsoluteError => -mae(y_true, y_pred),
        }
    }
}

impl fmt::Display for Scoring {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::R2 => "r2",
            Self::NegMeanSquaredError => "neg_mean_squared_error",
            Self::NegMeanAbsoluteError => "neg_mean_absolute_error",
        };
        write!(f, "{name}")
    }
}
