//! Model Search Unit
//!
//! Randomized k-fold hyperparameter search for one model family:
//!
//! 1. Sample `n_iter` distinct combinations from the family grid (seeded)
//! 2. Cut the ground-truth rows into `k` folds (seeded)
//! 3. Fit every candidate on every k−1 training folds and score the held-out
//!    fold; candidate × fold jobs run on rayon and are collected in order
//! 4. Pick the best mean score, earliest sampled candidate on ties
//! 5. Refit the winner on the whole ground-truth view
//!
//! Same seed and same view give the same `SearchResult`.

use super::family::{FamilyDescriptor, Hyperparameters, ModelFamily, TrainedModel};
use super::folds::{FoldStrategy, KFold};
use super::grid::{GridError, ParamSet};
use super::metrics::Scoring;
use super::seed::{derive_seed, FOLD_STREAM};
use super::tree::FitError;
use crate::config::defaults;
use crate::partition::FeatureTargetView;
use rand::rngs::StdRng;
use rand::SeedableRng;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info};

#[derive(Error, Debug, Clone, PartialEq)]
pub enum SearchError {
    #[error(transparent)]
    Grid(#[from] GridError),

    #[error("Insufficient data: {rows} rows cannot be split into {folds} folds")]
    InsufficientData { rows: usize, folds: usize },

    #[error("Fold count must be at least 2, got {0}")]
    InvalidFoldCount(usize),

    #[error("Sample count must be at least 1")]
    NoCandidates,

    #[error("Model fit failed: {0}")]
    Fit(#[from] FitError),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchSettings {
    /// Parameter combinations to sample
    pub n_iter: usize,
    /// Cross-validation folds
    pub folds: usize,
    pub fold_strategy: FoldStrategy,
}

impl Default for SearchSettings {
    fn default() -> Self {
        Self {
            n_iter: defaults::SEARCH_N_ITER,
            folds: defaults::CV_FOLDS,
            fold_strategy: FoldStrategy::default(),
        }
    }
}

/// Cross-validation outcome for one sampled combination
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CandidateScore {
    pub params: ParamSet,
    pub fold_scores: Vec<f64>,
    pub mean_score: f64,
}

/// Winner of a search plus the model refit with it. One per family per run.
#[derive(Debug, Clone, PartialEq)]
pub struct SearchResult {
    pub family: ModelFamily,
    pub scoring: Scoring,
    pub best_params: ParamSet,
    pub best_score: f64,
    /// Every candidate in sampled order
    pub candidates: Vec<CandidateScore>,
    pub model: TrainedModel,
}

pub struct ModelSearchUnit {
    descriptor: FamilyDescriptor,
    settings: SearchSettings,
}

impl ModelSearchUnit {
    pub fn new(descriptor: FamilyDescriptor, settings: SearchSettings) -> Self {
        Self { descriptor, settings }
    }

    pub fn family(&self) -> ModelFamily {
        self.descriptor.family
    }

    pub fn run(&self, view: &FeatureTargetView) -> Result<SearchResult, SearchError> {
        let d = &self.descriptor;
        d.validate()?;
        if self.settings.n_iter == 0 {
            return Err(SearchError::NoCandidates);
        }

        let folds = KFold::new(
            self.settings.folds,
            self.settings.fold_strategy,
            derive_seed(d.seed, FOLD_STREAM),
        )
        .split(view.n_rows())?;

        let mut rng = StdRng::seed_from_u64(d.seed);
        let candidates = d.grid.sample(self.settings.n_iter, &mut rng)?;
        let hyper = candidates
            .iter()
            .map(|p| d.family.hyperparameters(p))
            .collect::<Result<Vec<Hyperparameters>, _>>()?;

        info!(
            family = %d.family,
            candidates = candidates.len(),
            folds = folds.len(),
            rows = view.n_rows(),
            scoring = %d.scoring,
            "Starting randomized search"
        );

        let splits: Vec<(FeatureTargetView, FeatureTargetView)> = folds
            .iter()
            .map(|f| (view.select_rows(&f.train), view.select_rows(&f.test)))
            .collect();
        let k = splits.len();
        let seed = d.model_seed();

        let jobs: Vec<(usize, usize)> = (0..hyper.len())
            .flat_map(|c| (0..k).map(move |f| (c, f)))
            .collect();
        let scores = jobs
            .par_iter()
            .map(|&(c, f)| -> Result<f64, SearchError> {
                let (train, test) = &splits[f];
                let model = hyper[c].fit(train.features(), train.target(), seed)?;
                let predicted = model.predict(test.features());
                Ok(d.scoring.score(test.target(), &predicted))
            })
            .collect::<Result<Vec<f64>, SearchError>>()?;

        let scored: Vec<CandidateScore> = candidates
            .into_iter()
            .zip(scores.chunks(k))
            .map(|(params, fold_scores)| CandidateScore {
                mean_score: fold_scores.iter().sum::<f64>() / fold_scores.len() as f64,
                fold_scores: fold_scores.to_vec(),
                params,
            })
            .collect();

        for (i, c) in scored.iter().enumerate() {
            debug!(family = %d.family, candidate = i, params = %c.params, score = c.mean_score, "Candidate scored");
        }

        // NaN never wins; strict > keeps the earliest of equal scores
        let rank = |s: f64| if s.is_nan() { f64::NEG_INFINITY } else { s };
        let mut best = 0;
        for i in 1..scored.len() {
            if rank(scored[i].mean_score) > rank(scored[best].mean_score) {
                best = i;
            }
        }

        let best_params = scored[best].params.clone();
        let best_score = scored[best].mean_score;
        let fitted = hyper[best].fit(view.features(), view.target(), seed)?;

        info!(
            family = %d.family,
            params = %best_params,
            score = best_score,
            "Search complete, refit on full ground truth"
        );

        Ok(SearchResult {
            family: d.family,
            scoring: d.scoring,
            best_params: best_params.clone(),
            best_score,
            candidates: scored,
            model: TrainedModel {
                family: d.family,
                params: best_params,
                feature_names: view.feature_names().to_vec(),
                target_name: view.target_name().to_string(),
                model: fitted,
            },
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ml_engine::grid::ParameterGrid;
    use crate::types::{parse_timestamp, FeatureMatrix};
    use chrono::Duration;

    fn view(n: usize) -> FeatureTargetView {
        let start = parse_timestamp("2008-01-01").unwrap();
        let timestamps = (0..n).map(|i| start + Duration::days(i as i64)).collect();
        let x = FeatureMatrix::from_shape_fn((n, 2), |(i, j)| if j == 0 { (i % 10) as f64 } else { (i % 5) as f64 });
        let target = x.rows().into_iter().map(|r| 2.0 * r[0] + 3.0 * r[1] + 60.0).collect();
        FeatureTargetView::new(timestamps, vec!["CHOKE".into(), "DP".into()], x, "TEMP", target).unwrap()
    }

    fn small_rf() -> FamilyDescriptor {
        FamilyDescriptor::new(
            ModelFamily::RandomForest,
            ParameterGrid::new()
                .with("n_estimators", &[5_i64, 10])
                .with("max_depth", &[2_i64, 15]),
            Scoring::R2,
            22,
        )
    }

    fn settings(n_iter: usize, folds: usize) -> SearchSettings {
        SearchSettings {
            n_iter,
            folds,
            fold_strategy: FoldStrategy::Shuffled,
        }
    }

    #[test]
    fn search_is_deterministic() {
        let v = view(120);
        let unit = ModelSearchUnit::new(small_rf(), settings(3, 4));
        let a = unit.run(&v).unwrap();
        let b = unit.run(&v).unwrap();
        assert_eq!(a, b);
        assert_eq!(a.candidates.len(), 3);
        assert!(a.candidates.iter().all(|c| c.fold_scores.len() == 4));
    }

    #[test]
    fn best_candidate_has_top_mean_score() {
        let v = view(120);
        let result = ModelSearchUnit::new(small_rf(), settings(4, 3)).run(&v).unwrap();
        let top = result
            .candidates
            .iter()
            .map(|c| c.mean_score)
            .fold(f64::NEG_INFINITY, f64::max);
        assert_eq!(result.best_score, top);
        // Depth 2 cannot carve a 10×5 grid; the winner must be the deep one
        assert_eq!(result.best_params.get("max_depth").and_then(|v| v.as_i64()), Some(15));
        assert_eq!(result.model.feature_names, v.feature_names());
    }

    #[test]
    fn oversampling_uses_whole_grid() {
        let result = ModelSearchUnit::new(small_rf(), settings(50, 2)).run(&view(40)).unwrap();
        assert_eq!(result.candidates.len(), 4);
    }

    #[test]
    fn fewer_rows_than_folds() {
        let err = ModelSearchUnit::new(small_rf(), settings(1, 10)).run(&view(9)).unwrap_err();
        assert_eq!(err, SearchError::InsufficientData { rows: 9, folds: 10 });
    }

    #[test]
    fn empty_hyperparameter_list() {
        let mut d = small_rf();
        d.grid.insert("min_samples_leaf", Vec::new());
        let err = ModelSearchUnit::new(d, settings(1, 2)).run(&view(20)).unwrap_err();
        assert_eq!(err, SearchError::Grid(GridError::EmptyGrid("min_samples_leaf".into())));
    }

    #[test]
    fn ties_go_to_first_sampled() {
        // Constant target: every candidate predicts it exactly and scores 1.0
        let n = 30;
        let start = parse_timestamp("2008-01-01").unwrap();
        let v = FeatureTargetView::new(
            (0..n).map(|i| start + Duration::days(i as i64)).collect(),
            vec!["CHOKE".into()],
            FeatureMatrix::from_shape_fn((n, 1), |(i, _)| i as f64),
            "TEMP",
            vec![100.0; n],
        )
        .unwrap();
        let result = ModelSearchUnit::new(small_rf(), settings(4, 3)).run(&v).unwrap();
        assert!(result.candidates.iter().all(|c| c.mean_score == 1.0));
        assert_eq!(result.best_params, result.candidates[0].params);
    }
}
