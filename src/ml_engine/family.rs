//! Model families and their descriptors.
//!
//! A family descriptor bundles everything the search unit needs to tune one
//! family: how to build an estimator from a parameter set, the grid to sample
//! from, the scoring rule and the seed. Four families are registered.

use super::boosting::{AdaBoost, AdaBoostLoss, AdaBoostParams, GradientBoosting, GradientBoostingParams};
use super::forest::{Forest, ForestParams};
use super::grid::{GridError, ParamSet, ParamValue, ParameterGrid};
use super::metrics::Scoring;
use super::search::SearchError;
use super::seed::{derive_seed, MODEL_STREAM};
use super::tree::{SplitStrategy, TreeParams};
use crate::config::defaults;
use crate::types::FeatureMatrix;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ModelFamily {
    RandomForest,
    ExtraTrees,
    GradientBoosting,
    AdaBoost,
}

impl ModelFamily {
    pub const ALL: [ModelFamily; 4] = [
        Self::RandomForest,
        Self::ExtraTrees,
        Self::GradientBoosting,
        Self::AdaBoost,
    ];

    /// Config key, e.g. `random_forest`
    pub fn name(self) -> &'static str {
        match self {
            Self::RandomForest => "random_forest",
            Self::ExtraTrees => "extra_trees",
            Self::GradientBoosting => "gradient_boosting",
            Self::AdaBoost => "ada_boost",
        }
    }

    /// Column code used in exports, e.g. `rf`
    pub fn short(self) -> &'static str {
        match self {
            Self::RandomForest => "rf",
            Self::ExtraTrees => "et",
            Self::GradientBoosting => "gbr",
            Self::AdaBoost => "ada",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::RandomForest => "Random Forest",
            Self::ExtraTrees => "Extra Trees",
            Self::GradientBoosting => "Gradient Boosting",
            Self::AdaBoost => "AdaBoost",
        }
    }

    pub fn default_seed(self) -> u64 {
        match self {
            Self::RandomForest => defaults::RANDOM_FOREST_SEED,
            Self::ExtraTrees => defaults::EXTRA_TREES_SEED,
            Self::GradientBoosting => defaults::GRADIENT_BOOSTING_SEED,
            Self::AdaBoost => defaults::ADA_BOOST_SEED,
        }
    }

    pub fn default_grid(self) -> ParameterGrid {
        match self {
            Self::RandomForest => ParameterGrid::new()
                .with("n_estimators", &defaults::RF_N_ESTIMATORS)
                .with("criterion", &["squared_error"])
                .with("max_depth", &defaults::FOREST_MAX_DEPTHS)
                .with("min_samples_split", &defaults::MIN_SAMPLES_SPLIT)
                .with("min_samples_leaf", &defaults::MIN_SAMPLES_LEAF),
            Self::ExtraTrees => ParameterGrid::new()
                .with("n_estimators", &defaults::ET_N_ESTIMATORS)
                .with("criterion", &["squared_error"])
                .with("max_depth", &defaults::FOREST_MAX_DEPTHS)
                .with("min_samples_split", &defaults::MIN_SAMPLES_SPLIT)
                .with("min_samples_leaf", &defaults::MIN_SAMPLES_LEAF),
            Self::GradientBoosting => ParameterGrid::new()
                .with("n_estimators", &defaults::GBR_N_ESTIMATORS)
                .with("criterion", &["squared_error"])
                .with("max_depth", &defaults::GBR_MAX_DEPTHS)
                .with("min_samples_split", &defaults::MIN_SAMPLES_SPLIT)
                .with("min_samples_leaf", &defaults::MIN_SAMPLES_LEAF),
            Self::AdaBoost => ParameterGrid::new()
                .with("n_estimators", &defaults::ADA_N_ESTIMATORS)
                .with("learning_rate", &defaults::ADA_LEARNING_RATES)
                .with("loss", &AdaBoostLoss::NAMES),
        }
    }

    /// Hyperparameters this family accepts.
    pub fn param_specs(self) -> &'static [ParamSpec] {
        match self {
            Self::RandomForest | Self::ExtraTrees => FOREST_PARAMS,
            Self::GradientBoosting => GBR_PARAMS,
            Self::AdaBoost => ADA_PARAMS,
        }
    }

    pub fn param_names(self) -> impl Iterator<Item = &'static str> {
        self.param_specs().iter().map(|s| s.name)
    }

    fn check(self, name: &str, value: &ParamValue) -> Result<(), GridError> {
        let spec = self
            .param_specs()
            .iter()
            .find(|s| s.name == name)
            .ok_or_else(|| GridError::UnknownParameter {
                family: self,
                name: name.to_string(),
            })?;
        spec.check(value).map_err(|reason| GridError::InvalidParameter {
            family: self,
            name: name.to_string(),
            value: value.clone(),
            reason,
        })
    }

    /// Every name known to the family, every candidate valid, none empty.
    pub fn validate_grid(self, grid: &ParameterGrid) -> Result<(), GridError> {
        grid.check_non_empty()?;
        for (name, values) in grid.iter() {
            for value in values {
                self.check(name, value)?;
            }
        }
        Ok(())
    }

    /// Typed hyperparameters for one assignment; names not in `params` take
    /// the estimator defaults.
    pub fn hyperparameters(self, params: &ParamSet) -> Result<Hyperparameters, GridError> {
        for (name, value) in params.iter() {
            self.check(name, value)?;
        }

        let tree = |split, default_depth: Option<usize>| TreeParams {
            max_depth: count(params, "max_depth").or(default_depth),
            min_samples_split: count(params, "min_samples_split").unwrap_or(2),
            min_samples_leaf: count(params, "min_samples_leaf").unwrap_or(1),
            split,
        };

        Ok(match self {
            Self::RandomForest => Hyperparameters::Forest(ForestParams {
                n_estimators: count(params, "n_estimators").unwrap_or(100),
                tree: tree(SplitStrategy::Best, None),
                bootstrap: true,
            }),
            Self::ExtraTrees => Hyperparameters::Forest(ForestParams {
                n_estimators: count(params, "n_estimators").unwrap_or(100),
                tree: tree(SplitStrategy::Random, None),
                bootstrap: false,
            }),
            Self::GradientBoosting => Hyperparameters::GradientBoosting(GradientBoostingParams {
                n_estimators: count(params, "n_estimators").unwrap_or(100),
                learning_rate: real(params, "learning_rate").unwrap_or(0.1),
                tree: tree(SplitStrategy::Best, Some(3)),
            }),
            Self::AdaBoost => Hyperparameters::AdaBoost(AdaBoostParams {
                n_estimators: count(params, "n_estimators").unwrap_or(50),
                learning_rate: real(params, "learning_rate").unwrap_or(1.0),
                loss: params
                    .get("loss")
                    .and_then(ParamValue::as_str)
                    .and_then(|s| s.parse().ok())
                    .unwrap_or_default(),
                base: TreeParams {
                    max_depth: Some(3),
                    ..Default::default()
                },
            }),
        })
    }
}

fn count(params: &ParamSet, name: &str) -> Option<usize> {
    params
        .get(name)
        .and_then(ParamValue::as_i64)
        .and_then(|v| usize::try_from(v).ok())
}

fn real(params: &ParamSet, name: &str) -> Option<f64> {
    params.get(name).and_then(ParamValue::as_f64)
}

impl fmt::Display for ModelFamily {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

impl FromStr for ModelFamily {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let key = s.trim().to_ascii_lowercase().replace('-', "_");
        Self::ALL
            .into_iter()
            .find(|f| f.name() == key || f.short() == key)
            .ok_or_else(|| format!("unknown model family '{s}' (expected one of rf, et, gbr, ada)"))
    }
}

// ============================================================================
// Hyperparameter specs
// ============================================================================

#[derive(Debug, Clone, Copy)]
pub enum ParamKind {
    /// Integer with a lower bound
    Count { min: i64 },
    /// Finite number > 0
    Positive,
    /// One of a fixed set of names
    Choice(&'static [&'static str]),
}

#[derive(Debug, Clone, Copy)]
pub struct ParamSpec {
    pub name: &'static str,
    pub kind: ParamKind,
}

impl ParamSpec {
    fn check(&self, value: &ParamValue) -> Result<(), String> {
        match (self.kind, value) {
            (ParamKind::Count { min }, ParamValue::Int(v)) if *v >= min => Ok(()),
            (ParamKind::Count { min }, ParamValue::Int(_)) => Err(format!("must be at least {min}")),
            (ParamKind::Count { .. }, _) => Err("expected an integer".into()),
            (ParamKind::Positive, v) => match v.as_f64() {
                Some(x) if x > 0.0 && x.is_finite() => Ok(()),
                Some(_) => Err("must be a positive number".into()),
                None => Err("expected a number".into()),
            },
            (ParamKind::Choice(options), ParamValue::Text(s)) if options.contains(&s.as_str()) => Ok(()),
            (ParamKind::Choice(options), _) => Err(format!("expected one of {options:?}")),
        }
    }
}

const FOREST_PARAMS: &[ParamSpec] = &[
    ParamSpec { name: "n_estimators", kind: ParamKind::Count { min: 1 } },
    ParamSpec { name: "criterion", kind: ParamKind::Choice(&["squared_error"]) },
    ParamSpec { name: "max_depth", kind: ParamKind::Count { min: 1 } },
    ParamSpec { name: "min_samples_split", kind: ParamKind::Count { min: 2 } },
    ParamSpec { name: "min_samples_leaf", kind: ParamKind::Count { min: 1 } },
];

// friedman_mse and squared_error pick the same splits for single-output trees
const GBR_PARAMS: &[ParamSpec] = &[
    ParamSpec { name: "n_estimators", kind: ParamKind::Count { min: 1 } },
    ParamSpec { name: "learning_rate", kind: ParamKind::Positive },
    ParamSpec { name: "criterion", kind: ParamKind::Choice(&["squared_error", "friedman_mse"]) },
    ParamSpec { name: "max_depth", kind: ParamKind::Count { min: 1 } },
    ParamSpec { name: "min_samples_split", kind: ParamKind::Count { min: 2 } },
    ParamSpec { name: "min_samples_leaf", kind: ParamKind::Count { min: 1 } },
];

const ADA_PARAMS: &[ParamSpec] = &[
    ParamSpec { name: "n_estimators", kind: ParamKind::Count { min: 1 } },
    ParamSpec { name: "learning_rate", kind: ParamKind::Positive },
    ParamSpec { name: "loss", kind: ParamKind::Choice(&AdaBoostLoss::NAMES) },
];

// ============================================================================
// Estimators
// ============================================================================

#[derive(Debug, Clone, PartialEq)]
pub enum Hyperparameters {
    Forest(ForestParams),
    GradientBoosting(GradientBoostingParams),
    AdaBoost(AdaBoostParams),
}

impl Hyperparameters {
    pub fn fit(&self, x: &FeatureMatrix, y: &[f64], seed: u64) -> Result<FittedModel, SearchError> {
        Ok(match self {
            Self::Forest(p) => FittedModel::Forest(Forest::fit(x, y, p, seed)?),
            Self::GradientBoosting(p) => FittedModel::GradientBoosting(GradientBoosting::fit(x, y, p, seed)?),
            Self::AdaBoost(p) => FittedModel::AdaBoost(AdaBoost::fit(x, y, p, seed)?),
        })
    }
}

/// A fitted estimator of any family
#[derive(Debug, Clone, PartialEq)]
pub enum FittedModel {
    Forest(Forest),
    GradientBoosting(GradientBoosting),
    AdaBoost(AdaBoost),
}

impl FittedModel {
    pub fn predict(&self, x: &FeatureMatrix) -> Vec<f64> {
        match self {
            Self::Forest(m) => m.predict(x),
            Self::GradientBoosting(m) => m.predict(x),
            Self::AdaBoost(m) => m.predict(x),
        }
    }

    pub fn feature_importances(&self) -> Vec<f64> {
        match self {
            Self::Forest(m) => m.feature_importances(),
            Self::GradientBoosting(m) => m.feature_importances(),
            Self::AdaBoost(m) => m.feature_importances(),
        }
    }
}

/// Family constructor, grid, scoring rule and seed for one search unit.
#[derive(Debug, Clone, PartialEq)]
pub struct FamilyDescriptor {
    pub family: ModelFamily,
    pub grid: ParameterGrid,
    pub scoring: Scoring,
    pub seed: u64,
}

impl FamilyDescriptor {
    pub fn new(family: ModelFamily, grid: ParameterGrid, scoring: Scoring, seed: u64) -> Self {
        Self {
            family,
            grid,
            scoring,
            seed,
        }
    }

    /// Built-in grid and seed, R² scoring.
    pub fn default_for(family: ModelFamily) -> Self {
        Self::new(family, family.default_grid(), Scoring::default(), family.default_seed())
    }

    pub fn validate(&self) -> Result<(), GridError> {
        self.family.validate_grid(&self.grid)
    }

    /// Every fit of this family uses the same model seed so candidates are
    /// compared on equal footing.
    pub fn model_seed(&self) -> u64 {
        derive_seed(self.seed, MODEL_STREAM)
    }

    pub fn fit(&self, params: &ParamSet, x: &FeatureMatrix, y: &[f64]) -> Result<FittedModel, SearchError> {
        self.family.hyperparameters(params)?.fit(x, y, self.model_seed())
    }
}

/// A model refit on the full ground-truth view, with the column layout it
/// was trained on.
#[derive(Debug, Clone, PartialEq)]
pub struct TrainedModel {
    pub family: ModelFamily,
    pub params: ParamSet,
    pub feature_names: Vec<String>,
    pub target_name: String,
    pub model: FittedModel,
}

impl TrainedModel {
    pub fn predict(&self, x: &FeatureMatrix) -> Vec<f64> {
        self.model.predict(x)
    }

    /// (feature, importance) sorted by importance, largest first.
    pub fn feature_importances(&self) -> Vec<(String, f64)> {
        let mut ranked: Vec<(String, f64)> = self
            .feature_names
            .iter()
            .cloned()
            .zip(self.model.feature_importances())
            .collect();
        ranked.sort_by(|a, b| b.1.total_cmp(&a.1));
        ranked
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_grids_are_valid() {
        for family in ModelFamily::ALL {
            let d = FamilyDescriptor::default_for(family);
            assert!(d.validate().is_ok(), "{family} default grid should validate");
        }
        assert_eq!(ModelFamily::RandomForest.default_grid().combinations(), 4 * 10 * 5 * 4);
        assert_eq!(ModelFamily::AdaBoost.default_grid().combinations(), 3 * 4 * 3);
    }

    #[test]
    fn family_names_parse() {
        assert_eq!("rf".parse::<ModelFamily>().unwrap(), ModelFamily::RandomForest);
        assert_eq!("extra-trees".parse::<ModelFamily>().unwrap(), ModelFamily::ExtraTrees);
        assert_eq!("GBR".parse::<ModelFamily>().unwrap(), ModelFamily::GradientBoosting);
        assert_eq!("ada_boost".parse::<ModelFamily>().unwrap(), ModelFamily::AdaBoost);
        assert!("svm".parse::<ModelFamily>().is_err());
    }

    #[test]
    fn unknown_parameter_is_rejected() {
        let grid = ParameterGrid::new().with("loss", &["linear"]);
        assert!(matches!(
            ModelFamily::RandomForest.validate_grid(&grid),
            Err(GridError::UnknownParameter { ref name, .. }) if name == "loss"
        ));
    }

    #[test]
    fn invalid_candidates_are_rejected() {
        let grid = ParameterGrid::new().with("min_samples_split", &[1_i64, 2]);
        assert!(matches!(
            ModelFamily::ExtraTrees.validate_grid(&grid),
            Err(GridError::InvalidParameter { ref name, .. }) if name == "min_samples_split"
        ));

        let grid = ParameterGrid::new().with("loss", &["huber"]);
        assert!(ModelFamily::AdaBoost.validate_grid(&grid).is_err());

        let grid = ParameterGrid::new().with("learning_rate", &[0.0]);
        assert!(ModelFamily::GradientBoosting.validate_grid(&grid).is_err());
    }

    #[test]
    fn hyperparameters_follow_family() {
        let params = ParamSet::new().with("n_estimators", 150_i64).with("max_depth", 15_i64);
        match ModelFamily::ExtraTrees.hyperparameters(&params).unwrap() {
            Hyperparameters::Forest(p) => {
                assert_eq!(p.n_estimators, 150);
                assert!(!p.bootstrap);
                assert_eq!(p.tree.split, SplitStrategy::Random);
                assert_eq!(p.tree.max_depth, Some(15));
            }
            other => panic!("unexpected {other:?}"),
        }

        let params = ParamSet::new().with("loss", "square").with("learning_rate", 0.3);
        match ModelFamily::AdaBoost.hyperparameters(&params).unwrap() {
            Hyperparameters::AdaBoost(p) => {
                assert_eq!(p.loss, AdaBoostLoss::Square);
                assert_eq!(p.learning_rate, 0.3);
                assert_eq!(p.n_estimators, 50);
                assert_eq!(p.base.max_depth, Some(3));
            }
            other => panic!("unexpected {other:?}"),
        }
    }
}
