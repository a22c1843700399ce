//! Row-aligned feature/target views handed to the estimators.

use crate::dataset::{Dataset, DatasetError};
use crate::types::FeatureMatrix;
use chrono::NaiveDateTime;
use ndarray::Axis;
use serde::{Deserialize, Serialize};
use tracing::warn;

/// What to do with rows that contain a missing reading when building a view.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MissingValuePolicy {
    /// Fail with `DatasetError::MissingValue` on the first gap
    #[default]
    Reject,
    /// Drop incomplete rows and log how many were removed
    DropRows,
}

impl std::fmt::Display for MissingValuePolicy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Reject => write!(f, "reject"),
            Self::DropRows => write!(f, "drop_rows"),
        }
    }
}

/// Features are every channel except the target, in dataset order.
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureTargetView {
    timestamps: Vec<NaiveDateTime>,
    feature_names: Vec<String>,
    features: FeatureMatrix,
    target_name: String,
    target: Vec<f64>,
}

impl FeatureTargetView {
    pub fn from_dataset(
        dataset: &Dataset,
        target: &str,
        policy: MissingValuePolicy,
    ) -> Result<Self, DatasetError> {
        let target_idx = dataset.channel_index(target)?;
        let dataset = apply_policy(dataset, policy)?;

        let columns: Vec<usize> = (0..dataset.channels().len()).filter(|i| *i != target_idx).collect();
        let feature_names = columns.iter().map(|&i| dataset.channels()[i].clone()).collect();

        let records = dataset.records();
        let features = FeatureMatrix::from_shape_fn((records.len(), columns.len()), |(r, c)| {
            records[r].values[columns[c]]
        });
        let target_values = records.iter().map(|r| r.values[target_idx]).collect();

        Ok(Self {
            timestamps: dataset.timestamps(),
            feature_names,
            features,
            target_name: target.to_string(),
            target: target_values,
        })
    }

    /// Build directly from parts. The matrix must have one row per
    /// timestamp and target value, one column per feature name.
    pub fn new(
        timestamps: Vec<NaiveDateTime>,
        feature_names: Vec<String>,
        features: FeatureMatrix,
        target_name: impl Into<String>,
        target: Vec<f64>,
    ) -> Result<Self, DatasetError> {
        check_shape(&timestamps, &feature_names, &features)?;
        if target.len() != timestamps.len() {
            return Err(DatasetError::ViewShape {
                part: "target",
                expected: timestamps.len(),
                found: target.len(),
            });
        }
        Ok(Self {
            timestamps,
            feature_names,
            features,
            target_name: target_name.into(),
            target,
        })
    }

    pub fn timestamps(&self) -> &[NaiveDateTime] {
        &self.timestamps
    }

    pub fn feature_names(&self) -> &[String] {
        &self.feature_names
    }

    pub fn features(&self) -> &FeatureMatrix {
        &self.features
    }

    pub fn target_name(&self) -> &str {
        &self.target_name
    }

    pub fn target(&self) -> &[f64] {
        &self.target
    }

    pub fn n_rows(&self) -> usize {
        self.target.len()
    }

    pub fn is_empty(&self) -> bool {
        self.target.is_empty()
    }

    /// Rows at `indices`, in the given order (fold construction).
    pub fn select_rows(&self, indices: &[usize]) -> Self {
        Self {
            timestamps: indices.iter().map(|&i| self.timestamps[i]).collect(),
            feature_names: self.feature_names.clone(),
            features: self.features.select(Axis(0), indices),
            target_name: self.target_name.clone(),
            target: indices.iter().map(|&i| self.target[i]).collect(),
        }
    }

    /// The features half, without the target.
    pub fn to_prediction_view(&self) -> PredictionView {
        PredictionView {
            timestamps: self.timestamps.clone(),
            feature_names: self.feature_names.clone(),
            features: self.features.clone(),
        }
    }
}

/// Features-only view of the segment to reconstruct. Carries no target.
#[derive(Debug, Clone, PartialEq)]
pub struct PredictionView {
    timestamps: Vec<NaiveDateTime>,
    feature_names: Vec<String>,
    features: FeatureMatrix,
}

impl PredictionView {
    /// Every channel of `dataset` becomes a feature.
    pub fn from_dataset(dataset: &Dataset, policy: MissingValuePolicy) -> Result<Self, DatasetError> {
        let dataset = apply_policy(dataset, policy)?;
        let records = dataset.records();
        let features =
            FeatureMatrix::from_shape_fn((records.len(), dataset.channels().len()), |(r, c)| records[r].values[c]);
        Ok(Self {
            timestamps: dataset.timestamps(),
            feature_names: dataset.channels().to_vec(),
            features,
        })
    }

    pub fn new(
        timestamps: Vec<NaiveDateTime>,
        feature_names: Vec<String>,
        features: FeatureMatrix,
    ) -> Result<Self, DatasetError> {
        check_shape(&timestamps, &feature_names, &features)?;
        Ok(Self {
            timestamps,
            feature_names,
            features,
        })
    }

    pub fn timestamps(&self) -> &[NaiveDateTime] {
        &self.timestamps
    }

    pub fn feature_names(&self) -> &[String] {
        &self.feature_names
    }

    pub fn features(&self) -> &FeatureMatrix {
        &self.features
    }

    pub fn n_rows(&self) -> usize {
        self.timestamps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.timestamps.is_empty()
    }
}

fn check_shape(
    timestamps: &[NaiveDateTime],
    feature_names: &[String],
    features: &FeatureMatrix,
) -> Result<(), DatasetError> {
    if features.nrows() != timestamps.len() {
        return Err(DatasetError::ViewShape {
            part: "feature rows",
            expected: timestamps.len(),
            found: features.nrows(),
        });
    }
    if features.ncols() != feature_names.len() {
        return Err(DatasetError::ViewShape {
            part: "feature columns",
            expected: feature_names.len(),
            found: features.ncols(),
        });
    }
    Ok(())
}

fn apply_policy(dataset: &Dataset, policy: MissingValuePolicy) -> Result<Dataset, DatasetError> {
    match policy {
        MissingValuePolicy::Reject => match dataset.first_missing() {
            Some((channel, timestamp)) => Err(DatasetError::MissingValue { channel, timestamp }),
            None => Ok(dataset.clone()),
        },
        MissingValuePolicy::DropRows => {
            let complete = dataset.complete_rows();
            let dropped = dataset.len() - complete.len();
            if dropped > 0 {
                warn!(dropped, kept = complete.len(), "Dropped rows with missing readings");
            }
            Ok(complete)
        }
    }
}
