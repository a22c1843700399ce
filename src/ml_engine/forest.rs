//! Averaging ensembles: random forest and extra trees.
//!
//! Random forest grows best-split trees on bootstrap resamples; extra trees
//! grows random-split trees on the full training set. Both consider every
//! feature at each node. Trees are fitted in parallel, each from its own
//! seed, and kept in index order.

use super::seed::derive_seed;
use super::tree::{check_training_data, normalize, FitError, RegressionTree, TreeParams};
use crate::types::FeatureMatrix;
use ndarray::ArrayView1;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rayon::prelude::*;

#[derive(Debug, Clone, PartialEq)]
pub struct ForestParams {
    pub n_estimators: usize,
    pub tree: TreeParams,
    /// Draw each tree's rows with replacement
    pub bootstrap: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Forest {
    trees: Vec<RegressionTree>,
}

impl Forest {
    pub fn fit(x: &FeatureMatrix, y: &[f64], params: &ForestParams, seed: u64) -> Result<Self, FitError> {
        check_training_data(x, y)?;
        let n = y.len();

        let trees = (0..params.n_estimators.max(1))
            .into_par_iter()
            .map(|i| {
                let mut rng = StdRng::seed_from_u64(derive_seed(seed, i as u64));
                let samples: Vec<usize> = if params.bootstrap {
                    (0..n).map(|_| rng.gen_range(0..n)).collect()
                } else {
                    (0..n).collect()
                };
                RegressionTree::fit(x, y, &samples, &params.tree, &mut rng)
            })
            .collect();

        Ok(Self { trees })
    }

    pub fn n_trees(&self) -> usize {
        self.trees.len()
    }

    pub fn predict_row(&self, row: ArrayView1<'_, f64>) -> f64 {
        let total: f64 = self.trees.iter().map(|t| t.predict_row(row)).sum();
        total / self.trees.len() as f64
    }

    pub fn predict(&self, x: &FeatureMatrix) -> Vec<f64> {
        x.rows().into_iter().map(|r| self.predict_row(r)).collect()
    }

    /// Mean of the per-tree normalised importances, renormalised.
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
