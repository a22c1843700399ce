//! Boosted ensembles: gradient boosting (squared loss) and AdaBoost.R2.

use super::tree::{check_training_data, normalize, FitError, RegressionTree, TreeParams};
use crate::types::FeatureMatrix;
use ndarray::ArrayView1;
use rand::distributions::{Distribution, WeightedIndex};
use rand::rngs::StdRng;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use tracing::debug;

// ============================================================================
// Gradient boosting
// ============================================================================

#[derive(Debug, Clone, PartialEq)]
pub struct GradientBoostingParams {
    pub n_estimators: usize,
    pub learning_rate: f64,
    pub tree: TreeParams,
}

impl Default for GradientBoostingParams {
    fn default() -> Self {
        Self {
            n_estimators: 100,
            learning_rate: 0.1,
            tree: TreeParams {
                max_depth: Some(3),
                ..Default::default()
            },
        }
    }
}

/// Stagewise additive model: starts from the target mean, each tree fits the
/// residuals of the ensemble so far.
#[derive(Debug, Clone, PartialEq)]
pub struct GradientBoosting {
    init: f64,
    learning_rate: f64,
    trees: Vec<RegressionTree>,
}

impl GradientBoosting {
    pub fn fit(x: &FeatureMatrix, y: &[f64], params: &GradientBoostingParams, seed: u64) -> Result<Self, FitError> {
        check_training_data(x, y)?;
        let n = y.len();
        let mut rng = StdRng::seed_from_u64(seed);
        let samples: Vec<usize> = (0..n).collect();

        let init = y.iter().sum::<f64>() / n as f64;
        let mut current = vec![init; n];
        let mut residuals = vec![0.0; n];
        let mut trees = Vec::with_capacity(params.n_estimators);

        for _ in 0..params.n_estimators {
            for i in 0..n {
                residuals[i] = y[i] - current[i];
            }
            let tree = RegressionTree::fit(x, &residuals, &samples, &params.tree, &mut rng);
            for (c, row) in current.iter_mut().zip(x.rows()) {
                *c += params.learning_rate * tree.predict_row(row);
            }
            trees.push(tree);
        }

        Ok(Self {
            init,
            learning_rate: params.learning_rate,
            trees,
        })
    }

    pub fn n_trees(&self) -> usize {
        self.trees.len()
    }

    pub fn predict_row(&self, row: ArrayView1<'_, f64>) -> f64 {
        self.init + self.learning_rate * self.trees.iter().map(|t| t.predict_row(row)).sum::<f64>()
    }

    pub fn predict(&self, x: &FeatureMatrix) -> Vec<f64> {
        x.rows().into_iter().map(|r| self.predict_row(r)).collect()
    }

    pub fn feature_importances(&self) -> Vec<f64> {
        let Some(first) = self.trees.first() else {
            return Vec::new();
        };
        let mut acc = vec![0.0; first.n_features()];
        for tree in &self.trees {
            for (a, v) in acc.iter_mut().zip(tree.feature_importances()) {
                *a += v;
            }
        }
        normalize(&acc)
    }
}

// ============================================================================
// AdaBoost.R2
// ============================================================================

/// How per-sample errors (scaled to [0, 1]) are turned into losses
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AdaBoostLoss {
    #[default]
    Linear,
    Square,
    Exponential,
}

impl AdaBoostLoss {
    pub const NAMES: [&'static str; 3] = ["linear", "square", "exponential"];

    fn apply(self, e: f64) -> f64 {
        match self {
            Self::Linear => e,
            Self::Square => e * e,
            Self::Exponential => 1.0 - (-e).exp(),
        }
    }
}

impl fmt::Display for AdaBoostLoss {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Linear => "linear",
            Self::Square => "square",
            Self::Exponential => "exponential",
        };
        write!(f, "{name}")
    }
}

impl FromStr for AdaBoostLoss {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "linear" => Ok(Self::Linear),
            "square" => Ok(Self::Square),
            "exponential" => Ok(Self::Exponential),
            other => Err(format!("unknown loss '{other}'")),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct AdaBoostParams {
    pub n_estimators: usize,
    pub learning_rate: f64,
    pub loss: AdaBoostLoss,
    pub base: TreeParams,
}

impl Default for AdaBoostParams {
    fn default() -> Self {
        Self {
            n_estimators: 50,
            learning_rate: 1.0,
            loss: AdaBoostLoss::Linear,
            base: TreeParams {
                max_depth: Some(3),
                ..Default::default()
            },
        }
    }
}

/// Drucker's AdaBoost.R2: each round fits a tree on a weighted resample,
/// predictions are the weighted median of the rounds.
#[derive(Debug, Clone, PartialEq)]
pub struct AdaBoost {
    estimators: Vec<RegressionTree>,
    weights: Vec<f64>,
}

impl AdaBoost {
    pub fn fit(x: &FeatureMatrix, y: &[f64], params: &AdaBoostParams, seed: u64) -> Result<Self, FitError> {
        check_training_data(x, y)?;
        let n = y.len();
        let mut rng = StdRng::seed_from_u64(seed);
        let mut sample_weight = vec![1.0 / n as f64; n];
        let mut estimators = Vec::with_capacity(params.n_estimators);
        let mut weights = Vec::with_capacity(params.n_estimators);

        for round in 0..params.n_estimators.max(1) {
            let Ok(dist) = WeightedIndex::new(&sample_weight) else {
                debug!(round, "Sample weights degenerate, stopping boosting");
                break;
            };
            let samples: Vec<usize> = (0..n).map(|_| dist.sample(&mut rng)).collect();
            let tree = RegressionTree::fit(x, y, &samples, &params.base, &mut rng);

            let mut error: Vec<f64> = x
                .rows()
                .into_iter()
                .zip(y)
                .map(|(row, target)| (tree.predict_row(row) - target).abs())
                .collect();
            let max_error = error.iter().copied().fold(0.0, f64::max);
            if max_error > 0.0 {
                for e in &mut error {
                    *e /= max_error;
                }
            }
            for e in &mut error {
                *e = params.loss.apply(*e);
            }

            let estimator_error: f64 = sample_weight.iter().zip(&error).map(|(w, e)| w * e).sum();

            if estimator_error <= 0.0 {
                estimators.push(tree);
                weights.push(1.0);
                break;
            }
            if estimator_error >= 0.5 {
                // Worse than chance: keep it only if nothing else exists
                if estimators.is_empty() {
                    estimators.push(tree);
                    weights.push(1.0);
                }
                debug!(round, estimator_error, "Boosting stopped early");
                break;
            }

            let beta = estimator_error / (1.0 - estimator_error);
            estimators.push(tree);
            weights.push(params.learning_rate * (1.0 / beta).ln());

            if round + 1 < params.n_estimators {
                for (w, e) in sample_weight.iter_mut().zip(&error) {
                    *w *= beta.powf((1.0 - e) * params.learning_rate);
                }
                let total: f64 = sample_weight.iter().sum();
                if total <= 0.0 || !total.is_finite() {
                    break;
                }
                for w in &mut sample_weight {
                    *w /= total;
                }
            }
        }

        Ok(Self { estimators, weights })
    }

    pub fn n_estimators(&self) -> usize {
        self.estimators.len()
    }

    /// Weighted median of the estimator predictions.
    pub fn predict_row(&self, row: ArrayView1<'_, f64>) -> f64 {
        let mut preds: Vec<(f64, f64)> = self
            .estimators
            .iter()
            .zip(&self.weights)
            .map(|(t, w)| (t.predict_row(row), *w))
            .collect();
        preds.sort_by(|a, b| a.0.total_cmp(&b.0));

        let total: f64 = preds.iter().map(|p| p.1).sum();
        let mut cumulative = 0.0;
        for (pred, w) in &preds {
            cumulative += w;
            if cumulative >= 0.5 * total {
                return *pred;
            }
        }
        preds.last().map_or(f64::NAN, |p| p.0)
    }

    pub fn predict(&self, x: &FeatureMatrix) -> Vec<f64> {
        x.rows().into_iter().map(|r| self.predict_row(r)).collect()
    }

    /// Estimator-weighted mean of the per-tree importances.
    pub fn feature_importances(&self) -> Vec<f64> {
        let Some(first) = self.estimators.first() else {
            return Vec::new();
        };
        let mut acc = vec![0.0; first.n_features()];
        for (tree, w) in self.estimators.iter().zip(&self.weights) {
            for (a, v) in acc.iter_mut().zip(tree.feature_importances()) {
                *a += w * v;
            }
        }
        normalize(&acc)
    }
}
