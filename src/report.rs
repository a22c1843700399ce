//! Run reports: console summary and CSV/JSON export.
//!
//! - `comparison.csv`: the to-impute segment, one column per family next to
//!   the original (broken) readings
//! - `reconstruction.csv`: every modelling channel over the whole record plus
//!   one `T_<family>_Prediction` column per family, equal to the observed
//!   target before the cutover and the imputed value from it on
//! - `report.json`: the full `PipelineReport`

use crate::config::{defaults, OutputConfig};
use crate::dataset::DatasetError;
use crate::pipeline::PipelineReport;
use crate::types::{format_timestamp, ComparisonTable};
use statrs::statistics::Statistics;
use std::collections::HashMap;
use std::fmt::Write as _;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::info;

#[derive(Error, Debug)]
pub enum ReportError {
    #[error("I/O error writing {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("JSON serialization failed: {0}")]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Dataset(#[from] DatasetError),
}

/// Human-readable run summary: tuned parameters, CV score, in-sample errors
/// and imputed-series statistics per family.
pub fn render_summary(report: &PipelineReport) -> String {
    let mut out = String::new();
    let s = &report.stats;

    let _ = writeln!(out, "Target channel : {}", report.target_channel);
    let _ = writeln!(out, "Cutover        : {}", format_timestamp(&report.cutover));
    let _ = writeln!(
        out,
        "Rows           : {} loaded, {} after startup, {} ground truth, {} to impute",
        s.rows_loaded, s.rows_after_startup, s.ground_truth_rows, s.to_impute_rows
    );

    if !report.correlations.is_empty() {
        let _ = writeln!(out, "\nCorrelation with target (ground truth):");
        for c in report.correlations.iter().take(5) {
            let _ = writeln!(out, "  {:<24} r = {:>7.4}  (n = {})", c.x_param, c.r_value, c.sample_count);
        }
    }

    let _ = writeln!(out, "\nTuned parameters:");
    for o in &report.outcomes {
        let _ = writeln!(out, "  {:<18} {}", o.family.label(), o.best_params);
        let _ = writeln!(out, "  {:<18} CV {} = {:.4}", "", o.scoring, o.cv_score);
    }

    let _ = writeln!(out, "\nIn-sample error (ground truth):");
    let _ = writeln!(out, "  {:<18} {:>9} {:>9} {:>9}", "family", "R²", "MAE", "MSE");
    for o in &report.outcomes {
        let e = &o.error_report;
        let _ = writeln!(out, "  {:<18} {:>9.4} {:>9.4} {:>9.4}", o.family.label(), e.r2, e.mae, e.mse);
    }

    let _ = writeln!(out, "\nImputed {} over {} rows:", report.table.channel, report.table.len());
    for (family, values) in &report.table.imputed {
        let _ = writeln!(
            out,
            "  {:<18} mean {:>9.4}  std {:>8.4}  min {:>9.4}  max {:>9.4}",
            family.label(),
            values.iter().mean(),
            values.iter().std_dev(),
            values.iter().copied().fold(f64::INFINITY, f64::min),
            values.iter().copied().fold(f64::NEG_INFINITY, f64::max),
        );
    }

    for o in &report.outcomes {
        if let Some((feature, importance)) = o.feature_importances.first() {
            let _ = writeln!(
                out,
                "  {:<18} top feature {feature} ({:.1}%)",
                o.family.label(),
                importance * 100.0
            );
        }
    }

    if let Some((family, e)) = report.table.best_in_sample() {
        let _ = writeln!(out, "\nLowest in-sample MAE: {} ({:.4})", family.label(), e.mae);
    }
    out
}

/// Wide to-impute table: timestamp, original readings, one column per family.
pub fn write_comparison_csv(table: &ComparisonTable, path: &Path) -> Result<(), ReportError> {
    let mut writer = create(path)?;
    let io = |source| io_error(path, source);

    let mut header = vec!["DATEPRD".to_string(), table.channel.clone()];
    header.extend(table.families().iter().map(|f| prediction_column(f.short())));
    writeln!(writer, "{}", header.join(",")).map_err(io)?;

    for (i, ts) in table.timestamps.iter().enumerate() {
        let mut row = vec![format_timestamp(ts), cell(table.observed[i])];
        row.extend(table.imputed.values().map(|v| cell(v[i])));
        writeln!(writer, "{}", row.join(",")).map_err(io)?;
    }
    writer.flush().map_err(io)?;
    Ok(())
}

/// Full-range reconstruction over the modelling dataset.
///
/// Prediction columns hold the observed target before the cutover and the
/// family's imputed value from the cutover on. Rows the family did not
/// impute (dropped for a missing feature) are left empty.
pub fn write_reconstruction_csv(report: &PipelineReport, path: &Path) -> Result<(), ReportError> {
    let dataset = &report.dataset;
    let table = &report.table;
    let target = dataset.channel_index(&report.target_channel)?;
    let imputed_row: HashMap<_, usize> = table.timestamps.iter().enumerate().map(|(i, t)| (*t, i)).collect();
    let families = table.families();

    let mut writer = create(path)?;
    let io = |source| io_error(path, source);

    let mut header = vec!["DATEPRD".to_string()];
    header.extend(dataset.channels().iter().cloned());
    header.extend(families.iter().map(|f| prediction_column(f.short())));
    writeln!(writer, "{}", header.join(",")).map_err(io)?;

    for record in dataset.records() {
        let mut row = vec![format_timestamp(&record.timestamp)];
        row.extend(record.values.iter().map(|v| cell(*v)));
        for family in &families {
            let value = if record.timestamp < report.cutover {
                record.values[target]
            } else {
                imputed_row
                    .get(&record.timestamp)
                    .and_then(|&i| table.column(*family).map(|c| c[i]))
                    .unwrap_or(f64::NAN)
            };
            row.push(cell(value));
        }
        writeln!(writer, "{}", row.join(",")).map_err(io)?;
    }
    writer.flush().map_err(io)?;
    Ok(())
}

pub fn write_json(report: &PipelineReport, path: &Path) -> Result<(), ReportError> {
    let mut writer = create(path)?;
    serde_json::to_writer_pretty(&mut writer, report)?;
    writer.flush().map_err(|e| io_error(path, e))?;
    Ok(())
}

/// Write every enabled output into `config.dir`; returns the files written.
pub fn write_outputs(report: &PipelineReport, config: &OutputConfig) -> Result<Vec<PathBuf>, ReportError> {
    std::fs::create_dir_all(&config.dir).map_err(|e| io_error(&config.dir, e))?;
    let mut written = Vec::new();

    if config.write_csv {
        let comparison = config.dir.join(defaults::COMPARISON_FILE);
        write_comparison_csv(&report.table, &comparison)?;
        written.push(comparison);

        let reconstruction = config.dir.join(defaults::RECONSTRUCTION_FILE);
        write_reconstruction_csv(report, &reconstruction)?;
        written.push(reconstruction);
    }
    if config.write_json {
        let json = config.dir.join(defaults::REPORT_JSON_FILE);
        write_json(report, &json)?;
        written.push(json);
    }

    for p in &written {
        info!(path = %p.display(), "Wrote report");
    }
    Ok(written)
}

fn prediction_column(short: &str) -> String {
    format!("T_{short}_Prediction")
}

/// Missing readings are written as empty cells.
fn cell(v: f64) -> String {
    if v.is_finite() {
        format!("{v:.4}")
    } else {
        String::new()
    }
}

fn create(path: &Path) -> Result<BufWriter<File>, ReportError> {
    File::create(path)
        .map(BufWriter::new)
        .map_err(|e| io_error(path, e))
}

fn io_error(path: &Path, source: std::io::Error) -> ReportError {
    ReportError::Io {
        path: path.to_path_buf(),
        source,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ImputeConfig;
    use crate::dataset::{CsvLoader, SyntheticWell, SyntheticWellConfig};
    use crate::ml_engine::{ModelFamily, ParameterGrid};
    use crate::pipeline::ImputationPipeline;

    fn small_report() -> (SyntheticWell, PipelineReport) {
        let well = SyntheticWell::generate(SyntheticWellConfig {
            rows: 300,
            startup_rows: 20,
            cutover_row: 250,
            ..SyntheticWellConfig::default()
        })
        .unwrap();
        let mut config = ImputeConfig::default();
        config.dataset.startup_boundary = Some(well.timestamp_at(20));
        config.dataset.cutover = well.timestamp_at(250);
        config.search.folds = 3;
        config.restrict_to(&[ModelFamily::RandomForest, ModelFamily::AdaBoost]);
        config.families.random_forest.grid = Some(ParameterGrid::new().with("n_estimators", &[5_i64]));
        config.families.ada_boost.grid = Some(ParameterGrid::new().with("n_estimators", &[5_i64]));
        let report = ImputationPipeline::new(config).run(well.dataset().clone()).unwrap();
        (well, report)
    }

    #[test]
    fn summary_lists_every_family() {
        let (_, report) = small_report();
        let summary = render_summary(&report);
        assert!(summary.contains("AVG_DOWNHOLE_TEMPERATURE"));
        assert!(summary.contains(ModelFamily::RandomForest.label()));
        assert!(summary.contains(ModelFamily::AdaBoost.label()));
        assert!(summary.contains("n_estimators=5"));
        assert!(summary.contains("Lowest in-sample MAE"));
    }

    #[test]
    fn comparison_csv_has_one_row_per_imputed_timestamp() {
        let (_, report) = small_report();
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("comparison.csv");
        write_comparison_csv(&report.table, &path).unwrap();

        let contents = std::fs::read_to_string(&path).unwrap();
        let mut lines = contents.lines();
        assert_eq!(
            lines.next().unwrap(),
            "DATEPRD,AVG_DOWNHOLE_TEMPERATURE,T_rf_Prediction,T_ada_Prediction"
        );
        assert_eq!(lines.count(), 50);
    }

    #[test]
    fn reconstruction_switches_to_predictions_at_cutover() {
        let (well, report) = small_report();
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("reconstruction.csv");
        write_reconstruction_csv(&report, &path).unwrap();

        // The export is itself a loadable production CSV
        let loaded = CsvLoader::default().load(&path).unwrap();
        assert_eq!(loaded.len(), 280);
        let observed = loaded.column("AVG_DOWNHOLE_TEMPERATURE").unwrap();
        let rf = loaded.column("T_rf_Prediction").unwrap();

        let cut = 250 - 20;
        assert_eq!(&rf[..cut], &observed[..cut]);
        let imputed = report.table.column(ModelFamily::RandomForest).unwrap();
        for (written, exact) in rf[cut..].iter().zip(imputed) {
            assert!((written - exact).abs() < 1e-3);
        }
        assert_eq!(well.dataset().len(), 300);
    }

    #[test]
    fn outputs_follow_config() {
        let (_, report) = small_report();
        let dir = tempfile::tempdir().unwrap();
        let config = OutputConfig {
            dir: dir.path().join("out"),
            write_csv: true,
            write_json: true,
        };
        let written = write_outputs(&report, &config).unwrap();
        assert_eq!(written.len(), 3);

        let json: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&written[2]).unwrap()).unwrap();
        assert_eq!(json["target_channel"], "AVG_DOWNHOLE_TEMPERATURE");
        assert_eq!(json["outcomes"].as_array().unwrap().len(), 2);
        assert_eq!(json["table"]["timestamps"].as_array().unwrap().len(), 50);
    }
}
