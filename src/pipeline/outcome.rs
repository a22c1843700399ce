//! Results of one pipeline run.

use crate::dataset::Dataset;
use crate::ml_engine::{CandidateScore, ModelFamily, ParamSet, Scoring, SearchResult, TrainedModel};
use crate::types::record::serde_timestamp;
use crate::types::{ComparisonTable, ErrorReport, SignificantCorrelation};
use chrono::NaiveDateTime;
use serde::Serialize;

/// Row counts through the stages, plus wall time.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct PipelineStats {
    pub rows_loaded: usize,
    /// Leading all-zero rows seen before startup truncation (diagnostic only)
    pub leading_inactive_rows: usize,
    pub rows_after_startup: usize,
    pub ground_truth_rows: usize,
    pub to_impute_rows: usize,
    /// Rows used after the missing-value policy was applied
    pub training_rows: usize,
    pub imputed_rows: usize,
    pub elapsed_ms: u128,
}

/// Everything one family produced.
#[derive(Debug, Clone, Serialize)]
pub struct FamilyOutcome {
    pub family: ModelFamily,
    pub scoring: Scoring,
    pub best_params: ParamSet,
    /// Mean cross-validated score of the winning combination
    pub cv_score: f64,
    pub candidates: Vec<CandidateScore>,
    /// In-sample fit on the ground-truth segment
    pub error_report: ErrorReport,
    pub feature_importances: Vec<(String, f64)>,
    #[serde(skip)]
    pub model: TrainedModel,
}

impl FamilyOutcome {
    pub(crate) fn new(search: SearchResult, error_report: ErrorReport) -> Self {
        Self {
            family: search.family,
            scoring: search.scoring,
            feature_importances: search.model.feature_importances(),
            best_params: search.best_params,
            cv_score: search.best_score,
            candidates: search.candidates,
            error_report,
            model: search.model,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct PipelineReport {
    pub target_channel: String,
    #[serde(with = "serde_timestamp")]
    pub cutover: NaiveDateTime,
    pub stats: PipelineStats,
    /// Channels significantly correlated with the target on the
    /// ground-truth segment, strongest first
    pub correlations: Vec<SignificantCorrelation>,
    /// In family registration order
    pub outcomes: Vec<FamilyOutcome>,
    pub table: ComparisonTable,
    /// Modelling dataset (after startup truncation and channel drop)
    #[serde(skip)]
    pub dataset: Dataset,
}

impl PipelineReport {
    pub fn outcome(&self, family: ModelFamily) -> Option<&FamilyOutcome> {
        self.outcomes.iter().find(|o| o.family == family)
    }
}
