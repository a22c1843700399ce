//! Pipeline End-to-End Tests
//!
//! Runs the full pipeline on a synthetic well whose temperature is a known
//! linear function of choke size and tubing differential pressure:
//! 1000 daily rows, 50 rows of zero startup, gauges failing at row 800.
//! The reconstruction over rows 800..1000 is compared with the true
//! (noise-free) temperature the gauge would have read.

use volve_impute::config::ImputeConfig;
use volve_impute::dataset::{CsvLoader, SyntheticWell, SyntheticWellConfig};
use volve_impute::ml_engine::{ModelFamily, ParameterGrid};
use volve_impute::partition::PartitionError;
use volve_impute::pipeline::{ImputationPipeline, PipelineError, PipelineReport};

const STARTUP_ROWS: usize = 50;
const CUTOVER_ROW: usize = 800;

fn well() -> SyntheticWell {
    SyntheticWell::generate(SyntheticWellConfig::default()).unwrap()
}

/// Small grids so the whole run stays fast.
fn config_for(well: &SyntheticWell) -> ImputeConfig {
    let mut config = ImputeConfig::default();
    config.dataset.startup_boundary = Some(well.timestamp_at(STARTUP_ROWS));
    config.dataset.cutover = well.timestamp_at(CUTOVER_ROW);
    config.search.n_iter = 2;
    config.search.folds = 3;

    config.families.random_forest.grid = Some(
        ParameterGrid::new()
            .with("n_estimators", &[20_i64, 30])
            .with("max_depth", &[26_i64])
            .with("min_samples_leaf", &[1_i64]),
    );
    config.families.extra_trees.grid = Some(
        ParameterGrid::new()
            .with("n_estimators", &[20_i64, 30])
            .with("max_depth", &[26_i64]),
    );
    config.families.gradient_boosting.grid = Some(
        ParameterGrid::new()
            .with("n_estimators", &[100_i64])
            .with("max_depth", &[8_i64, 10]),
    );
    config.families.ada_boost.grid = Some(
        ParameterGrid::new()
            .with("n_estimators", &[30_i64])
            .with("learning_rate", &[0.3, 1.0])
            .with("loss", &["linear"]),
    );
    config
}

fn std_dev(values: &[f64]) -> f64 {
    let n = values.len() as f64;
    let mean = values.iter().sum::<f64>() / n;
    (values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n).sqrt()
}

fn imputation_mae(report: &PipelineReport, well: &SyntheticWell, family: ModelFamily) -> f64 {
    let truth = &well.true_temperature()[CUTOVER_ROW..];
    let imputed = report.table.column(family).unwrap();
    assert_eq!(imputed.len(), truth.len());
    imputed.iter().zip(truth).map(|(p, t)| (p - t).abs()).sum::<f64>() / truth.len() as f64
}

#[test]
fn synthetic_well_is_reconstructed() {
    let well = well();
    let report = ImputationPipeline::new(config_for(&well))
        .run(well.dataset().clone())
        .unwrap();

    // 50 startup rows discarded, train on 50..800, impute 800..1000
    assert_eq!(report.stats.rows_after_startup, 950);
    assert_eq!(report.stats.training_rows, 750);
    assert_eq!(report.table.len(), 200);
    assert_eq!(report.table.timestamps[0], well.timestamp_at(CUTOVER_ROW));
    assert!(report.table.observed.iter().all(|v| *v == 0.0));

    let sd = std_dev(&well.true_temperature()[STARTUP_ROWS..CUTOVER_ROW]);
    for family in [ModelFamily::RandomForest, ModelFamily::ExtraTrees, ModelFamily::GradientBoosting] {
        let mae = imputation_mae(&report, &well, family);
        assert!(mae < 0.1 * sd, "{family}: MAE {mae:.4} should be below {:.4}", 0.1 * sd);
    }
    let ada = imputation_mae(&report, &well, ModelFamily::AdaBoost);
    assert!(ada < sd, "AdaBoost MAE {ada:.4} should be below {sd:.4}");

    for outcome in &report.outcomes {
        let e = outcome.error_report;
        assert!(e.mse >= 0.0);
        assert!(e.r2 <= 1.0);
        assert_eq!(e.samples, 750);
        let total: f64 = outcome.feature_importances.iter().map(|(_, v)| v).sum();
        assert!((total - 1.0).abs() < 1e-6, "{}: importances sum to {total}", outcome.family);
    }
}

#[test]
fn choke_dominates_the_correlation_screen() {
    let well = well();
    let report = ImputationPipeline::new(config_for(&well))
        .run(well.dataset().clone())
        .unwrap();
    let strongest = report.correlations.first().unwrap();
    assert!(
        strongest.x_param == "AVG_CHOKE_SIZE_P" || strongest.x_param == "BORE_OIL_VOL",
        "unexpected strongest channel {}",
        strongest.x_param
    );
    assert!(report.correlations.iter().all(|c| c.x_param != "AVG_DOWNHOLE_PRESSURE"));
}

#[test]
fn identical_runs_give_identical_tables() {
    let well = well();
    let mut config = config_for(&well);
    config.restrict_to(&[ModelFamily::RandomForest, ModelFamily::AdaBoost]);

    let a = ImputationPipeline::new(config.clone()).run(well.dataset().clone()).unwrap();
    let b = ImputationPipeline::new(config).run(well.dataset().clone()).unwrap();
    assert_eq!(a.table, b.table);
    for (x, y) in a.outcomes.iter().zip(&b.outcomes) {
        assert_eq!(x.best_params, y.best_params);
        assert_eq!(x.candidates, y.candidates);
    }
}

#[test]
fn cutover_at_first_timestamp_is_rejected() {
    let well = well();
    let mut config = config_for(&well);
    config.dataset.startup_boundary = None;
    config.dataset.cutover = well.timestamp_at(0);

    let err = ImputationPipeline::new(config).run(well.dataset().clone()).unwrap_err();
    assert_eq!(err.stage(), "partition");
    assert!(matches!(
        err,
        PipelineError::Partition(PartitionError::InvalidCutover { .. })
    ));
}

#[test]
fn cutover_past_last_timestamp_is_rejected() {
    let well = well();
    let mut config = config_for(&well);
    config.dataset.cutover = well.timestamp_at(1000);
    let err = ImputationPipeline::new(config).run(well.dataset().clone()).unwrap_err();
    assert!(matches!(
        err,
        PipelineError::Partition(PartitionError::InvalidCutover { .. })
    ));
}

#[test]
fn run_from_csv_file() {
    let well = well();
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("well.csv");
    std::fs::write(&path, well.to_csv()).unwrap();

    let mut config = config_for(&well);
    config.restrict_to(&[ModelFamily::ExtraTrees]);
    let report = ImputationPipeline::new(config).run_file(&path).unwrap();
    assert_eq!(report.table.families(), vec![ModelFamily::ExtraTrees]);
    assert_eq!(report.stats.rows_loaded, 1000);

    // The loaded copy matches the in-memory dataset to CSV precision
    let loaded = CsvLoader::default().load(&path).unwrap();
    assert_eq!(loaded.channels(), well.dataset().channels());
}

#[test]
fn missing_file_fails_at_ingest() {
    let well = well();
    let err = ImputationPipeline::new(config_for(&well))
        .run_file(std::path::Path::new("/nonexistent/well.csv"))
        .unwrap_err();
    assert_eq!(err.stage(), "ingest");
}
