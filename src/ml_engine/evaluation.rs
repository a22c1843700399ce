//! Evaluation & Imputation Unit
//!
//! In-sample diagnostics on the ground-truth segment and reconstruction of
//! the to-impute segment. Feature columns must match the fitted layout by
//! name and order; reordered or renamed columns are rejected.

use super::family::TrainedModel;
use crate::partition::{FeatureTargetView, PredictionView};
use crate::types::{ErrorReport, FeatureMatrix, ImputedSeries};
use thiserror::Error;
use tracing::info;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum EvaluationError {
    #[error("Feature columns {found:?} ({width} in the matrix) do not match the fitted columns {expected:?}")]
    FeatureMismatch {
        expected: Vec<String>,
        found: Vec<String>,
        width: usize,
    },

    #[error("No rows to {0}")]
    EmptyInput(&'static str),
}

pub struct Evaluator;

impl Evaluator {
    /// Training-set R², MAE and MSE of `model` on the view it was fitted on.
    pub fn evaluate(model: &TrainedModel, view: &FeatureTargetView) -> Result<ErrorReport, EvaluationError> {
        Self::check_features(model, view.feature_names(), view.features())?;
        if view.is_empty() {
            return Err(EvaluationError::EmptyInput("evaluate"));
        }

        let predicted = model.predict(view.features());
        let report = ErrorReport::from_predictions(view.target(), &predicted);
        info!(
            family = %model.family,
            r2 = report.r2,
            mae = report.mae,
            mse = report.mse,
            "In-sample fit"
        );
        Ok(report)
    }

    /// Reconstruct the target over the to-impute segment.
    pub fn impute(model: &TrainedModel, view: &PredictionView) -> Result<ImputedSeries, EvaluationError> {
        Self::check_features(model, view.feature_names(), view.features())?;
        if view.is_empty() {
            return Err(EvaluationError::EmptyInput("impute"));
        }

        let values = model.predict(view.features());
        let series = ImputedSeries {
            family: model.family,
            channel: model.target_name.clone(),
            timestamps: view.timestamps().to_vec(),
            values,
        };
        info!(family = %model.family, rows = series.len(), mean = series.mean(), "Imputed series");
        Ok(series)
    }

    /// Same names, same order, and a matrix exactly that wide.
    fn check_features(model: &TrainedModel, found: &[String], features: &FeatureMatrix) -> Result<(), EvaluationError> {
        let width = features.ncols();
        if model.feature_names.as_slice() == found && width == model.feature_names.len() {
            Ok(())
        } else {
            Err(EvaluationError::FeatureMismatch {
                expected: model.feature_names.clone(),
                found: found.to_vec(),
                width,
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ml_engine::family::{FamilyDescriptor, ModelFamily};
    use crate::ml_engine::grid::{ParamSet, ParameterGrid};
    use crate::ml_engine::metrics::Scoring;
    use crate::types::parse_timestamp;
    use chrono::Duration;
    use ndarray::Axis;

    fn fitted() -> (TrainedModel, FeatureTargetView) {
        let start = parse_timestamp("2008-01-01").unwrap();
        let x = FeatureMatrix::from_shape_fn((60, 2), |(i, j)| if j == 0 { (i % 6) as f64 } else { (i % 4) as f64 });
        let target: Vec<f64> = x.rows().into_iter().map(|r| r[0] * 2.0 + r[1] + 90.0).collect();
        let view = FeatureTargetView::new(
            (0..60).map(|i| start + Duration::days(i)).collect(),
            vec!["CHOKE".into(), "DP".into()],
            x,
            "TEMP",
            target,
        )
        .unwrap();

        let d = FamilyDescriptor::new(ModelFamily::ExtraTrees, ParameterGrid::new(), Scoring::R2, 32);
        let params = ParamSet::new().with("n_estimators", 10_i64);
        let model = TrainedModel {
            family: d.family,
            params: params.clone(),
            feature_names: view.feature_names().to_vec(),
            target_name: "TEMP".into(),
            model: d.fit(&params, view.features(), view.target()).unwrap(),
        };
        (model, view)
    }

    #[test]
    fn in_sample_report_is_bounded() {
        let (model, view) = fitted();
        let report = Evaluator::evaluate(&model, &view).unwrap();
        assert!(report.mse >= 0.0);
        assert!(report.r2 <= 1.0);
        assert_eq!(report.samples, 60);
        // Extra trees without bootstrap interpolate the training rows
        assert!(report.mae < 1e-9);
    }

    #[test]
    fn imputed_series_follows_prediction_timestamps() {
        let (model, view) = fitted();
        let pv = view.select_rows(&[10, 11, 12]).to_prediction_view();
        let series = Evaluator::impute(&model, &pv).unwrap();
        assert_eq!(series.timestamps, pv.timestamps());
        assert_eq!(series.channel, "TEMP");
        assert_eq!(series.family, ModelFamily::ExtraTrees);
        assert_eq!(series.values.len(), 3);
    }

    #[test]
    fn reordered_columns_are_rejected() {
        let (model, view) = fitted();
        let pv = view.to_prediction_view();
        let swapped = PredictionView::new(
            pv.timestamps().to_vec(),
            vec!["DP".into(), "CHOKE".into()],
            pv.features().clone(),
        )
        .unwrap();
        let err = Evaluator::impute(&model, &swapped).unwrap_err();
        assert!(matches!(err, EvaluationError::FeatureMismatch { .. }));
    }

    #[test]
    fn missing_column_is_rejected() {
        let (model, view) = fitted();
        let pv = view.to_prediction_view();
        let narrow = PredictionView::new(
            pv.timestamps().to_vec(),
            vec!["CHOKE".into()],
            pv.features().select(Axis(1), &[0]),
        )
        .unwrap();
        assert!(matches!(
            Evaluator::impute(&model, &narrow),
            Err(EvaluationError::FeatureMismatch { .. })
        ));
    }

    #[test]
    fn matrix_narrower_than_fitted_width_is_rejected() {
        let (model, view) = fitted();
        let one_column = FeatureMatrix::from_shape_fn((view.n_rows(), 1), |(i, _)| (i % 6) as f64);
        let err = Evaluator::check_features(&model, view.feature_names(), &one_column).unwrap_err();
        assert_eq!(
            err,
            EvaluationError::FeatureMismatch {
                expected: vec!["CHOKE".into(), "DP".into()],
                found: vec!["CHOKE".into(), "DP".into()],
                width: 1,
            }
        );

        // A view cannot be built with that mismatch in the first place
        assert!(PredictionView::new(view.timestamps().to_vec(), view.feature_names().to_vec(), one_column).is_err());
    }
}
