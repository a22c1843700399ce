//! CART regression tree
//!
//! Squared-error regression tree shared by every ensemble family. Nodes live
//! in a flat arena and are grown with an explicit work stack, so deep trees
//! (`max_depth` up to 100) never recurse.
//!
//! Two split strategies:
//! - `Best`: exhaustive search over every feature, midpoint thresholds
//!   between consecutive distinct values (random forest, gradient boosting)
//! - `Random`: one uniform threshold per feature drawn between the node's
//!   min and max, best of those kept (extra trees)

use crate::types::FeatureMatrix;
use ndarray::ArrayView1;
use rand::Rng;
use thiserror::Error;

/// Errors raised before a fit starts
#[derive(Error, Debug, Clone, PartialEq)]
pub enum FitError {
    #[error("Cannot fit on an empty training set")]
    EmptyTrainingSet,

    #[error("Feature matrix has {features} rows but target has {targets}")]
    LengthMismatch { features: usize, targets: usize },

    #[error("Non-finite value in training row {row}")]
    NonFinite { row: usize },
}

/// Reject inputs no tree can be grown on.
pub fn check_training_data(x: &FeatureMatrix, y: &[f64]) -> Result<(), FitError> {
    if x.nrows() != y.len() {
        return Err(FitError::LengthMismatch {
            features: x.nrows(),
            targets: y.len(),
        });
    }
    if y.is_empty() {
        return Err(FitError::EmptyTrainingSet);
    }
    for (row, (features, target)) in x.rows().into_iter().zip(y).enumerate() {
        if !target.is_finite() || features.iter().any(|v| !v.is_finite()) {
            return Err(FitError::NonFinite { row });
        }
    }
    Ok(())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SplitStrategy {
    Best,
    Random,
}

/// Growth limits for a single tree
#[derive(Debug, Clone, PartialEq)]
pub struct TreeParams {
    /// `None` grows until leaves are pure or too small to split
    pub max_depth: Option<usize>,
    pub min_samples_split: usize,
    pub min_samples_leaf: usize,
    pub split: SplitStrategy,
}

impl Default for TreeParams {
    fn default() -> Self {
        Self {
            max_depth: None,
            min_samples_split: 2,
            min_samples_leaf: 1,
            split: SplitStrategy::Best,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
enum Node {
    Leaf {
        value: f64,
    },
    Split {
        feature: usize,
        threshold: f64,
        left: usize,
        right: usize,
    },
}

#[derive(Debug, Clone, Copy)]
struct Candidate {
    feature: usize,
    threshold: f64,
    gain: f64,
}

/// Node awaiting growth: arena slot, index range in the work buffer, depth
struct Pending {
    node: usize,
    start: usize,
    end: usize,
    depth: usize,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RegressionTree {
    nodes: Vec<Node>,
    n_features: usize,
    /// Total squared-error reduction per feature
    importances: Vec<f64>,
}

impl RegressionTree {
    /// Grow a tree on the rows listed in `samples` (duplicates allowed, as
    /// produced by bootstrapping).
    pub fn fit<R: Rng + ?Sized>(
        x: &FeatureMatrix,
        y: &[f64],
        samples: &[usize],
        params: &TreeParams,
        rng: &mut R,
    ) -> Self {
        let n_features = x.ncols();
        let mut tree = Self {
            nodes: vec![Node::Leaf { value: 0.0 }],
            n_features,
            importances: vec![0.0; n_features],
        };
        if samples.is_empty() {
            return tree;
        }

        let min_leaf = params.min_samples_leaf.max(1);
        let min_split = params.min_samples_split.max(2).max(2 * min_leaf);

        let mut work = samples.to_vec();
        let mut stack = vec![Pending {
            node: 0,
            start: 0,
            end: work.len(),
            depth: 0,
        }];

        while let Some(p) = stack.pop() {
            let idx = &mut work[p.start..p.end];
            let n = idx.len();
            let sum: f64 = idx.iter().map(|&i| y[i]).sum();
            let mean = sum / n as f64;

            let depth_reached = params.max_depth.is_some_and(|d| p.depth >= d);
            let pure = idx.iter().all(|&i| y[i] == y[idx[0]]);
            if n < min_split || depth_reached || pure {
                tree.nodes[p.node] = Node::Leaf { value: mean };
                continue;
            }

            let candidate = match params.split {
                SplitStrategy::Best => best_split(x, y, idx, min_leaf, sum),
                SplitStrategy::Random => random_split(x, y, idx, min_leaf, sum, rng),
            };
            let Some(c) = candidate else {
                tree.nodes[p.node] = Node::Leaf { value: mean };
                continue;
            };

            let n_left = partition_in_place(idx, |i| x[[i, c.feature]] <= c.threshold);
            if n_left == 0 || n_left == n {
                tree.nodes[p.node] = Node::Leaf { value: mean };
                continue;
            }

            let left = tree.nodes.len();
            let right = left + 1;
            tree.nodes.push(Node::Leaf { value: 0.0 });
            tree.nodes.push(Node::Leaf { value: 0.0 });
            tree.nodes[p.node] = Node::Split {
                feature: c.feature,
                threshold: c.threshold,
                left,
                right,
            };
            tree.importances[c.feature] += c.gain.max(0.0);

            let mid = p.start + n_left;
            stack.push(Pending {
                node: right,
                start: mid,
                end: p.end,
                depth: p.depth + 1,
            });
            stack.push(Pending {
                node: left,
                start: p.start,
                end: mid,
                depth: p.depth + 1,
            });
        }

        tree
    }

    pub fn predict_row(&self, row: ArrayView1<'_, f64>) -> f64 {
        let mut node = 0;
        loop {
            match self.nodes[node] {
                Node::Leaf { value } => return value,
                Node::Split {
                    feature,
                    threshold,
                    left,
                    right,
                } => {
                    node = if row[feature] <= threshold { left } else { right };
                }
            }
        }
    }

    pub fn predict(&self, x: &FeatureMatrix) -> Vec<f64> {
        x.rows().into_iter().map(|r| self.predict_row(r)).collect()
    }

    pub fn n_features(&self) -> usize {
        self.n_features
    }

    pub fn n_leaves(&self) -> usize {
        self.nodes.iter().filter(|n| matches!(n, Node::Leaf { .. })).count()
    }

    pub fn depth(&self) -> usize {
        let mut deepest = 0;
        let mut stack = vec![(0usize, 0usize)];
        while let Some((node, d)) = stack.pop() {
            deepest = deepest.max(d);
            if let Node::Split { left, right, .. } = self.nodes[node] {
                stack.push((left, d + 1));
                stack.push((right, d + 1));
            }
        }
        deepest
    }

    /// Impurity-decrease importances normalised to sum to 1 (all zero for a
    /// single-leaf tree).
    pub fn feature_importances(&self) -> Vec<f64> {
        normalize(&self.importances)
    }
}

/// Scale to unit sum; zero vectors stay zero.
pub(crate) fn normalize(values: &[f64]) -> Vec<f64> {
    let total: f64 = values.iter().sum();
    if total > 0.0 {
        values.iter().map(|v| v / total).collect()
    } else {
        vec![0.0; values.len()]
    }
}

/// Squared-error reduction of splitting a node into (left, right) sums.
fn gain(sum_left: f64, n_left: usize, sum_right: f64, n_right: usize, sum: f64, n: usize) -> f64 {
    sum_left * sum_left / n_left as f64 + sum_right * sum_right / n_right as f64 - sum * sum / n as f64
}

fn best_split(x: &FeatureMatrix, y: &[f64], idx: &[usize], min_leaf: usize, sum: f64) -> Option<Candidate> {
    let n = idx.len();
    let mut best: Option<Candidate> = None;
    let mut pairs: Vec<(f64, f64)> = Vec::with_capacity(n);

    for feature in 0..x.ncols() {
        pairs.clear();
        pairs.extend(idx.iter().map(|&i| (x[[i, feature]], y[i])));
        pairs.sort_by(|a, b| a.0.total_cmp(&b.0));

        let mut sum_left = 0.0;
        for i in 1..n {
            sum_left += pairs[i - 1].1;
            if i < min_leaf || n - i < min_leaf {
                continue;
            }
            let (lo, hi) = (pairs[i - 1].0, pairs[i].0);
            if lo >= hi {
                continue;
            }
            let g = gain(sum_left, i, sum - sum_left, n - i, sum, n);
            if best.map_or(true, |b| g > b.gain) {
                let mut threshold = lo + (hi - lo) / 2.0;
                if threshold >= hi {
                    threshold = lo;
                }
                best = Some(Candidate {
                    feature,
                    threshold,
                    gain: g,
                });
            }
        }
    }
    best
}

fn random_split<R: Rng + ?Sized>(
    x: &FeatureMatrix,
    y: &[f64],
    idx: &[usize],
    min_leaf: usize,
    sum: f64,
    rng: &mut R,
) -> Option<Candidate> {
    let n = idx.len();
    let mut best: Option<Candidate> = None;

    for feature in 0..x.ncols() {
        let (lo, hi) = idx.iter().fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), &i| {
            let v = x[[i, feature]];
            (lo.min(v), hi.max(v))
        });
        if lo >= hi {
            continue;
        }
        let threshold = rng.gen_range(lo..hi);

        let (mut sum_left, mut n_left) = (0.0, 0usize);
        for &i in idx {
            if x[[i, feature]] <= threshold {
                sum_left += y[i];
                n_left += 1;
            }
        }
        if n_left < min_leaf || n - n_left < min_leaf {
            continue;
        }

        let g = gain(sum_left, n_left, sum - sum_left, n - n_left, sum, n);
        if best.map_or(true, |b| g > b.gain) {
            best = Some(Candidate {
                feature,
                threshold,
                gain: g,
            });
        }
    }
    best
}

/// Move elements matching `pred` to the front; returns how many matched.
fn partition_in_place<F: Fn(usize) -> bool>(idx: &mut [usize], pred: F) -> usize {
    let mut next = 0;
    for i in 0..idx.len() {
        if pred(idx[i]) {
            idx.swap(next, i);
            next += 1;
        }
    }
    next
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::{aview1, Array2};
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn step_data() -> (FeatureMatrix, Vec<f64>) {
        // y jumps at x0 = 5; x1 is noise-free but irrelevant
        let x = Array2::from_shape_fn((10, 2), |(i, j)| if j == 0 { i as f64 } else { (i % 3) as f64 });
        let y = (0..10).map(|i| if i < 5 { 1.0 } else { 3.0 }).collect();
        (x, y)
    }

    fn all(n: usize) -> Vec<usize> {
        (0..n).collect()
    }

    #[test]
    fn best_split_finds_step() {
        let (x, y) = step_data();
        let mut rng = StdRng::seed_from_u64(1);
        let tree = RegressionTree::fit(&x, &y, &all(10), &TreeParams::default(), &mut rng);

        assert_eq!(tree.n_leaves(), 2);
        assert_eq!(tree.depth(), 1);
        assert_eq!(tree.predict_row(aview1(&[4.0, 0.0])), 1.0);
        assert_eq!(tree.predict_row(aview1(&[4.6, 0.0])), 3.0);
        assert_eq!(tree.feature_importances(), vec![1.0, 0.0]);
    }

    #[test]
    fn deep_tree_interpolates_training_data() {
        let x = Array2::from_shape_fn((50, 1), |(i, _)| i as f64);
        let y: Vec<f64> = (0..50).map(|i| (i * i) as f64).collect();
        let mut rng = StdRng::seed_from_u64(1);
        let tree = RegressionTree::fit(&x, &y, &all(50), &TreeParams::default(), &mut rng);
        assert_eq!(tree.predict(&x), y);
    }

    #[test]
    fn max_depth_and_min_leaf_limit_growth() {
        let x = Array2::from_shape_fn((64, 1), |(i, _)| i as f64);
        let y: Vec<f64> = (0..64).map(|i| i as f64).collect();
        let mut rng = StdRng::seed_from_u64(1);

        let shallow = TreeParams {
            max_depth: Some(3),
            ..Default::default()
        };
        let tree = RegressionTree::fit(&x, &y, &all(64), &shallow, &mut rng);
        assert!(tree.depth() <= 3);
        assert!(tree.n_leaves() <= 8);

        let big_leaves = TreeParams {
            min_samples_leaf: 16,
            ..Default::default()
        };
        let tree = RegressionTree::fit(&x, &y, &all(64), &big_leaves, &mut rng);
        assert!(tree.n_leaves() <= 4);
    }

    #[test]
    fn random_split_still_separates_step() {
        let (x, y) = step_data();
        let params = TreeParams {
            split: SplitStrategy::Random,
            ..Default::default()
        };
        let mut rng = StdRng::seed_from_u64(9);
        let tree = RegressionTree::fit(&x, &y, &all(10), &params, &mut rng);
        assert_eq!(tree.predict(&x), y);
    }

    #[test]
    fn constant_target_is_single_leaf() {
        let (x, _) = step_data();
        let y = vec![7.0; 10];
        let mut rng = StdRng::seed_from_u64(1);
        let tree = RegressionTree::fit(&x, &y, &all(10), &TreeParams::default(), &mut rng);
        assert_eq!(tree.n_leaves(), 1);
        assert_eq!(tree.predict_row(aview1(&[100.0, 100.0])), 7.0);
        assert_eq!(tree.feature_importances(), vec![0.0, 0.0]);
    }

    #[test]
    fn training_data_checks() {
        let (x, y) = step_data();
        assert!(check_training_data(&x, &y).is_ok());
        assert_eq!(
            check_training_data(&x, &y[..3]),
            Err(FitError::LengthMismatch { features: 10, targets: 3 })
        );
        let mut bad = y.clone();
        bad[4] = f64::NAN;
        assert_eq!(check_training_data(&x, &bad), Err(FitError::NonFinite { row: 4 }));
    }
}
