//! Pipeline Coordinator: runs the eight stages for one dataset.

use super::outcome::{FamilyOutcome, PipelineReport, PipelineStats};
use crate::config::{ConfigError, ImputeConfig};
use crate::dataset::{CsvError, CsvLoader, Dataset, DatasetError};
use crate::ml_engine::{
    AggregateError, CorrelationMatrix, EvaluationError, Evaluator, FamilyDescriptor, ModelFamily,
    ModelSearchUnit, ResultAggregator, SearchError,
};
use crate::partition::{
    FeatureTargetView, MissingValuePolicy, PartitionError, PredictionView, SensorFailurePartitioner,
};
use crate::types::{format_timestamp, ImputedSeries, ObservedSeries};
use rayon::prelude::*;
use std::collections::HashSet;
use std::path::Path;
use std::time::Instant;
use thiserror::Error;
use tracing::{debug, info, warn};

/// A pipeline failure, tagged with the stage that raised it.
#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("config: {0}")]
    Config(#[from] ConfigError),

    #[error("ingest: {0}")]
    Ingest(#[from] CsvError),

    #[error("startup: {0}")]
    Startup(#[source] DatasetError),

    #[error("channel_drop: {0}")]
    ChannelDrop(#[source] DatasetError),

    #[error("partition: {0}")]
    Partition(#[from] PartitionError),

    #[error("search ({family}): {source}")]
    Search {
        family: ModelFamily,
        #[source]
        source: SearchError,
    },

    #[error("evaluate ({family}): {source}")]
    Evaluate {
        family: ModelFamily,
        #[source]
        source: EvaluationError,
    },

    #[error("impute ({family}): {source}")]
    Impute {
        family: ModelFamily,
        #[source]
        source: EvaluationError,
    },

    #[error("aggregate: {0}")]
    Aggregate(#[from] AggregateError),

    #[error("search: no model family is enabled")]
    NoFamiliesEnabled,
}

impl PipelineError {
    pub fn stage(&self) -> &'static str {
        match self {
            Self::Config(_) => "config",
            Self::Ingest(_) => "ingest",
            Self::Startup(_) => "startup",
            Self::ChannelDrop(_) => "channel_drop",
            Self::Partition(_) => "partition",
            Self::Search { .. } | Self::NoFamiliesEnabled => "search",
            Self::Evaluate { .. } => "evaluate",
            Self::Impute { .. } => "impute",
            Self::Aggregate(_) => "aggregate",
        }
    }

    /// Family the failure belongs to, for per-family stages.
    pub fn family(&self) -> Option<ModelFamily> {
        match self {
            Self::Search { family, .. } | Self::Evaluate { family, .. } | Self::Impute { family, .. } => {
                Some(*family)
            }
            _ => None,
        }
    }
}

/// Runs startup truncation, partitioning, per-family search, evaluation,
/// imputation and aggregation for one configuration.
pub struct ImputationPipeline {
    config: ImputeConfig,
}

impl ImputationPipeline {
    pub fn new(config: ImputeConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &ImputeConfig {
        &self.config
    }

    /// STAGE 1 then the rest of the run.
    pub fn run_file(&self, path: &Path) -> Result<PipelineReport, PipelineError> {
        let dataset = CsvLoader::default().load(path)?;
        self.run(dataset)
    }

    pub fn run(&self, dataset: Dataset) -> Result<PipelineReport, PipelineError> {
        let started = Instant::now();
        self.config.validate()?;
        let descriptors = self.config.descriptors();
        if descriptors.is_empty() {
            return Err(PipelineError::NoFamiliesEnabled);
        }

        let ds = &self.config.dataset;
        let mut stats = PipelineStats {
            rows_loaded: dataset.len(),
            leading_inactive_rows: dataset.leading_inactive_rows(),
            ..PipelineStats::default()
        };

        // STAGE 2: Startup truncation
        let dataset = match ds.startup_boundary {
            Some(start) => {
                let truncated = dataset.truncate_startup(start).map_err(PipelineError::Startup)?;
                info!(
                    boundary = %format_timestamp(&start),
                    dropped = dataset.len() - truncated.len(),
                    leading_inactive = stats.leading_inactive_rows,
                    "Startup window removed"
                );
                let remaining = truncated.leading_inactive_rows();
                if remaining > 0 {
                    warn!(rows = remaining, "Inactive rows remain after the startup boundary");
                }
                truncated
            }
            None => dataset,
        };
        stats.rows_after_startup = dataset.len();

        // STAGE 3: Channel drop
        let dataset = dataset
            .drop_channels(&ds.dropped_channels)
            .map_err(PipelineError::ChannelDrop)?;
        debug!(channels = ?dataset.channels(), "Modelling channels");

        // STAGE 4: Partition
        let partition = SensorFailurePartitioner::new(&ds.target_channel, ds.cutover).partition(&dataset)?;
        stats.ground_truth_rows = partition.ground_truth.len();
        stats.to_impute_rows = partition.to_impute.len();

        let correlations = CorrelationMatrix::compute(&partition.ground_truth)
            .strongest_with(&ds.target_channel)
            .map_err(PartitionError::from)?;
        for c in correlations.iter().take(5) {
            info!(channel = %c.x_param, r = c.r_value, p = c.p_value, "Correlated with target");
        }

        let policy = ds.missing_values;
        let training = partition.ground_truth_view(policy).map_err(PartitionError::from)?;
        let prediction = partition.prediction_view(policy).map_err(PartitionError::from)?;
        stats.training_rows = training.n_rows();
        stats.imputed_rows = prediction.n_rows();
        let observed = align_observed(partition.broken_readings, &prediction, policy);

        // STAGES 5-7: one independent unit per family
        let settings = self.config.search_settings();
        let results: Vec<Result<(FamilyOutcome, ImputedSeries), PipelineError>> = descriptors
            .into_par_iter()
            .map(|d| run_family(d, &settings, &training, &prediction))
            .collect();

        let mut outcomes = Vec::with_capacity(results.len());
        let mut series = Vec::with_capacity(results.len());
        for r in results {
            let (outcome, imputed) = r?;
            outcomes.push(outcome);
            series.push(imputed);
        }

        // STAGE 8: Aggregate
        let reports = outcomes.iter().map(|o| (o.family, o.error_report)).collect();
        let table = ResultAggregator::aggregate(reports, series, &observed)?;

        stats.elapsed_ms = started.elapsed().as_millis();
        info!(
            families = outcomes.len(),
            imputed_rows = table.len(),
            elapsed_ms = stats.elapsed_ms,
            "Imputation run complete"
        );

        Ok(PipelineReport {
            target_channel: ds.target_channel.clone(),
            cutover: ds.cutover,
            stats,
            correlations,
            outcomes,
            table,
            dataset,
        })
    }
}

fn run_family(
    descriptor: FamilyDescriptor,
    settings: &crate::ml_engine::SearchSettings,
    training: &FeatureTargetView,
    prediction: &PredictionView,
) -> Result<(FamilyOutcome, ImputedSeries), PipelineError> {
    let family = descriptor.family;
    let search = ModelSearchUnit::new(descriptor, settings.clone())
        .run(training)
        .map_err(|source| PipelineError::Search { family, source })?;
    let report = Evaluator::evaluate(&search.model, training)
        .map_err(|source| PipelineError::Evaluate { family, source })?;
    let imputed = Evaluator::impute(&search.model, prediction)
        .map_err(|source| PipelineError::Impute { family, source })?;
    Ok((FamilyOutcome::new(search, report), imputed))
}

/// Under `DropRows` the prediction view may skip rows with a missing feature;
/// the broken readings are cut down to the rows that were actually imputed.
fn align_observed(
    observed: ObservedSeries,
    prediction: &PredictionView,
    policy: MissingValuePolicy,
) -> ObservedSeries {
    if policy == MissingValuePolicy::Reject || observed.len() == prediction.n_rows() {
        return observed;
    }
    let kept: HashSet<_> = prediction.timestamps().iter().collect();
    let (timestamps, values) = observed
        .timestamps
        .iter()
        .zip(&observed.values)
        .filter(|(t, _)| kept.contains(t))
        .map(|(t, v)| (*t, *v))
        .unzip();
    ObservedSeries {
        channel: observed.channel,
        timestamps,
        values,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dataset::{SyntheticWell, SyntheticWellConfig};
    use crate::ml_engine::ParameterGrid;

    fn quick_config(well: &SyntheticWell) -> ImputeConfig {
        let mut config = ImputeConfig::default();
        config.dataset.startup_boundary = Some(well.timestamp_at(50));
        config.dataset.cutover = well.timestamp_at(800);
        config.search.folds = 3;
        config.restrict_to(&[ModelFamily::ExtraTrees]);
        config.families.extra_trees.grid = Some(
            ParameterGrid::new()
                .with("n_estimators", &[10_i64])
                .with("max_depth", &[20_i64]),
        );
        config
    }

    fn well() -> SyntheticWell {
        SyntheticWell::generate(SyntheticWellConfig::default()).unwrap()
    }

    #[test]
    fn stages_report_row_counts() {
        let well = well();
        let report = ImputationPipeline::new(quick_config(&well))
            .run(well.dataset().clone())
            .unwrap();

        assert_eq!(report.stats.rows_loaded, 1000);
        assert_eq!(report.stats.leading_inactive_rows, 50);
        assert_eq!(report.stats.rows_after_startup, 950);
        assert_eq!(report.stats.ground_truth_rows, 750);
        assert_eq!(report.stats.to_impute_rows, 200);
        assert_eq!(report.table.len(), 200);
        assert_eq!(report.outcomes.len(), 1);
        assert!(!report.dataset.has_channel("AVG_DOWNHOLE_PRESSURE"));
    }

    #[test]
    fn errors_carry_their_stage() {
        let well = well();

        let mut config = quick_config(&well);
        config.dataset.dropped_channels = vec!["NO_SUCH_CHANNEL".into()];
        let err = ImputationPipeline::new(config).run(well.dataset().clone()).unwrap_err();
        assert_eq!(err.stage(), "channel_drop");

        let mut config = quick_config(&well);
        config.dataset.startup_boundary = None;
        config.dataset.cutover = well.timestamp_at(0);
        let err = ImputationPipeline::new(config).run(well.dataset().clone()).unwrap_err();
        assert_eq!(err.stage(), "partition");
        assert!(matches!(
            err,
            PipelineError::Partition(PartitionError::InvalidCutover { .. })
        ));

        let mut config = quick_config(&well);
        config.search.folds = 1;
        let err = ImputationPipeline::new(config).run(well.dataset().clone()).unwrap_err();
        assert_eq!(err.stage(), "config");
    }

    #[test]
    fn search_failure_names_the_family() {
        let well = well();
        let mut config = quick_config(&well);
        // Truncate so far that fewer ground-truth rows than folds remain
        config.dataset.startup_boundary = Some(well.timestamp_at(798));
        let err = ImputationPipeline::new(config).run(well.dataset().clone()).unwrap_err();
        assert_eq!(err.stage(), "search");
        assert_eq!(err.family(), Some(ModelFamily::ExtraTrees));
    }

    #[test]
    fn dropped_rows_keep_observed_aligned() {
        let well = well();
        let ts = well.timestamp_at(810);
        let records = well
            .dataset()
            .records()
            .iter()
            .map(|r| {
                let mut r = r.clone();
                if r.timestamp == ts {
                    r.values[0] = f64::NAN;
                }
                r
            })
            .collect();
        let dataset = Dataset::new(well.dataset().channels().to_vec(), records).unwrap();

        let mut config = quick_config(&well);
        let err = ImputationPipeline::new(config.clone()).run(dataset.clone()).unwrap_err();
        assert_eq!(err.stage(), "partition");

        config.dataset.missing_values = MissingValuePolicy::DropRows;
        let report = ImputationPipeline::new(config).run(dataset).unwrap();
        assert_eq!(report.table.len(), 199);
        assert!(!report.table.timestamps.contains(&ts));
    }
}
