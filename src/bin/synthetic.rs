//! Synthetic Well Generator
//!
//! Writes a daily production CSV with a startup window of zero readings and
//! a downhole gauge failure at a chosen row. Temperature is a known linear
//! function of choke size and tubing differential pressure, so imputation
//! accuracy can be checked against the truth.
//!
//! # Usage
//! ```bash
//! volve-synthetic --rows 1000 --cutover-row 800 --output well.csv
//! volve-impute well.csv --startup 2007-05-05 --cutover 2009-05-24
//! ```

use anyhow::{Context, Result};
use clap::Parser;
use std::io::{self, Write};
use std::path::PathBuf;
use tracing::info;
use volve_impute::dataset::{SyntheticWell, SyntheticWellConfig};
use volve_impute::types::format_timestamp;

// ============================================================================
// CLI Arguments
// ============================================================================

#[derive(Parser, Debug)]
#[command(name = "volve-synthetic")]
#[command(about = "Synthetic production data with a failed downhole gauge")]
#[command(version)]
struct Args {
    /// Total daily rows
    #[arg(long, default_value = "1000")]
    rows: usize,

    /// Leading rows with every reading zero
    #[arg(long, default_value = "50")]
    startup_rows: usize,

    /// First row whose downhole gauges read zero
    #[arg(long, default_value = "800")]
    cutover_row: usize,

    /// Random seed for reproducibility
    #[arg(long, default_value = "7")]
    seed: u64,

    /// Standard deviation of Gaussian noise on the observed temperature
    #[arg(long, default_value = "0.0")]
    noise: f64,

    /// Output file (stdout when omitted)
    #[arg(short, long)]
    output: Option<PathBuf>,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_target(false)
        .with_writer(io::stderr)
        .init();

    let args = Args::parse();
    if args.startup_rows >= args.cutover_row || args.cutover_row >= args.rows {
        anyhow::bail!(
            "need startup-rows < cutover-row < rows (got {} / {} / {})",
            args.startup_rows,
            args.cutover_row,
            args.rows
        );
    }

    let well = SyntheticWell::generate(SyntheticWellConfig {
        rows: args.rows,
        startup_rows: args.startup_rows,
        cutover_row: args.cutover_row,
        noise_std: args.noise,
        seed: args.seed,
        ..SyntheticWellConfig::default()
    })
    .context("generating synthetic well")?;
    let csv = well.to_csv();

    match args.output {
        Some(ref path) => {
            std::fs::write(path, csv).with_context(|| format!("writing {}", path.display()))?;
            info!(path = %path.display(), rows = args.rows, "Wrote synthetic well");
        }
        None => {
            io::stdout().lock().write_all(csv.as_bytes())?;
        }
    }

    info!(
        startup = %format_timestamp(&well.timestamp_at(args.startup_rows)),
        cutover = %format_timestamp(&well.timestamp_at(args.cutover_row)),
        "Use these as --startup and --cutover"
    );
    Ok(())
}
