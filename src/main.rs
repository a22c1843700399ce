//! volve-impute - downhole temperature recovery for a failed sensor window
//!
//! Loads a daily production CSV, trains the configured tree-ensemble
//! families on the readings before the cutover and reconstructs the target
//! channel from the cutover on.
//!
//! # Usage
//!
//! ```bash
//! # Defaults: Volve dates, all four families
//! volve-impute production.csv
//!
//! # Quick run on a synthetic well
//! volve-synthetic --output well.csv
//! volve-impute well.csv --startup 2007-05-05 --cutover 2009-05-24 --families rf,et --json
//! ```
//!
//! # Environment Variables
//!
//! - `VOLVE_IMPUTE_CONFIG`: Path to a TOML config (default: ./impute_config.toml)
//! - `RUST_LOG`: Logging level (default: info)

use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;
use tracing::{error, info};
use volve_impute::config::ImputeConfig;
use volve_impute::ml_engine::ModelFamily;
use volve_impute::pipeline::ImputationPipeline;
use volve_impute::report;
use volve_impute::types::parse_timestamp;

// ============================================================================
// CLI Arguments
// ============================================================================

#[derive(Parser, Debug)]
#[command(name = "volve-impute")]
#[command(about = "Reconstruct a failed downhole temperature channel with tuned tree ensembles")]
#[command(version)]
struct CliArgs {
    /// Production CSV (first column the timestamp)
    csv: PathBuf,

    /// TOML config file (overrides VOLVE_IMPUTE_CONFIG and ./impute_config.toml)
    #[arg(short, long, value_name = "PATH")]
    config: Option<PathBuf>,

    /// First day of the sensor failure, e.g. 2010-01-14
    #[arg(long, value_name = "DATE")]
    cutover: Option<String>,

    /// First operational day; earlier rows are discarded. "none" keeps all rows
    #[arg(long, value_name = "DATE")]
    startup: Option<String>,

    /// Parameter combinations sampled per family
    #[arg(long)]
    n_iter: Option<usize>,

    /// Cross-validation folds
    #[arg(long)]
    folds: Option<usize>,

    /// Families to run, comma separated (rf, et, gbr, ada)
    #[arg(long, value_delimiter = ',')]
    families: Option<Vec<ModelFamily>>,

    /// Directory for CSV/JSON output
    #[arg(short, long, value_name = "DIR")]
    output_dir: Option<PathBuf>,

    /// Also write the full report as JSON
    #[arg(long)]
    json: bool,
}

impl CliArgs {
    /// Apply command-line overrides on top of the loaded config.
    fn apply(&self, config: &mut ImputeConfig) -> Result<()> {
        if let Some(ref raw) = self.cutover {
            config.dataset.cutover =
                parse_timestamp(raw).with_context(|| format!("invalid --cutover date '{raw}'"))?;
        }
        if let Some(ref raw) = self.startup {
            config.dataset.startup_boundary = if raw.eq_ignore_ascii_case("none") {
                None
            } else {
                Some(parse_timestamp(raw).with_context(|| format!("invalid --startup date '{raw}'"))?)
            };
        }
        if let Some(n) = self.n_iter {
            config.search.n_iter = n;
        }
        if let Some(k) = self.folds {
            config.search.folds = k;
        }
        if let Some(ref families) = self.families {
            config.restrict_to(families);
        }
        if let Some(ref dir) = self.output_dir {
            config.output.dir = dir.clone();
        }
        if self.json {
            config.output.write_json = true;
        }
        Ok(())
    }
}

// ============================================================================
// Main Entry Point
// ============================================================================

fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_target(false)
        .init();

    let args = CliArgs::parse();

    let mut config = match args.config {
        Some(ref path) => ImputeConfig::load_from_file(path)
            .with_context(|| format!("loading config {}", path.display()))?,
        None => ImputeConfig::load(),
    };
    args.apply(&mut config)?;
    config.validate().context("invalid configuration after CLI overrides")?;

    info!(
        csv = %args.csv.display(),
        target = %config.dataset.target_channel,
        families = ?config.enabled_families(),
        n_iter = config.search.n_iter,
        folds = config.search.folds,
        "Starting imputation run"
    );

    let output = config.output.clone();
    let report = match ImputationPipeline::new(config).run_file(&args.csv) {
        Ok(report) => report,
        Err(e) => {
            error!(stage = e.stage(), family = ?e.family(), "Run aborted");
            return Err(e.into());
        }
    };

    println!("{}", report::render_summary(&report));

    let written = report::write_outputs(&report, &output).context("writing reports")?;
    for path in written {
        println!("wrote {}", path.display());
    }
    Ok(())
}
