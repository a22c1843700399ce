//! Synthetic well generator
//!
//! Produces a daily production series shaped like the Volve export: a
//! zero-filled startup window, then operating days where downhole
//! temperature is a known linear function of choke opening and tubing
//! differential pressure. From the cutover row onward the temperature and
//! pressure gauges flatline at zero, mimicking the failed sensors.

use super::{Dataset, DatasetError};
use crate::types::{format_timestamp, TimeSeriesRecord};
use chrono::{Duration, NaiveDate, NaiveDateTime, NaiveTime};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rand_distr::{Distribution, Normal};

pub const ON_STREAM_HRS: &str = "ON_STREAM_HRS";
pub const AVG_CHOKE_SIZE_P: &str = "AVG_CHOKE_SIZE_P";
pub const AVG_DP_TUBING: &str = "AVG_DP_TUBING";
pub const BORE_OIL_VOL: &str = "BORE_OIL_VOL";
pub const AVG_DOWNHOLE_PRESSURE: &str = "AVG_DOWNHOLE_PRESSURE";
pub const AVG_DOWNHOLE_TEMPERATURE: &str = "AVG_DOWNHOLE_TEMPERATURE";

/// Temperature = choke × 0.2 + dp_tubing × 0.05 + 95 (°C)
const CHOKE_COEFF: f64 = 0.2;
const DP_TUBING_COEFF: f64 = 0.05;
const TEMPERATURE_INTERCEPT: f64 = 95.0;

/// Choke settings (%) an operator steps through
const CHOKE_LEVELS: [f64; 10] = [10.0, 20.0, 30.0, 40.0, 50.0, 60.0, 70.0, 80.0, 90.0, 100.0];
/// Tubing differential pressure regimes (bar)
const DP_TUBING_LEVELS: [f64; 5] = [150.0, 160.0, 170.0, 180.0, 190.0];

/// Generator settings
#[derive(Debug, Clone)]
pub struct SyntheticWellConfig {
    /// Total daily rows
    pub rows: usize,
    /// Leading rows with all readings zero (facility not yet on stream)
    pub startup_rows: usize,
    /// First row whose temperature/pressure gauges read zero
    pub cutover_row: usize,
    /// Date of row 0
    pub start_date: NaiveDate,
    /// Gaussian noise added to the observed temperature (°C)
    pub noise_std: f64,
    pub seed: u64,
}

impl Default for SyntheticWellConfig {
    fn default() -> Self {
        Self {
            rows: 1000,
            startup_rows: 50,
            cutover_row: 800,
            start_date: NaiveDate::from_ymd_opt(2007, 3, 16).unwrap_or_default(),
            noise_std: 0.0,
            seed: 7,
        }
    }
}

/// A generated series plus the noise-free temperature for every row.
#[derive(Debug, Clone)]
pub struct SyntheticWell {
    config: SyntheticWellConfig,
    dataset: Dataset,
    true_temperature: Vec<f64>,
}

impl SyntheticWell {
    pub fn generate(config: SyntheticWellConfig) -> Result<Self, DatasetError> {
        let mut rng = StdRng::seed_from_u64(config.seed);
        let noise = Normal::new(0.0, config.noise_std.max(0.0)).ok();

        let channels: Vec<String> = [
            ON_STREAM_HRS,
            AVG_CHOKE_SIZE_P,
            AVG_DP_TUBING,
            BORE_OIL_VOL,
            AVG_DOWNHOLE_PRESSURE,
            AVG_DOWNHOLE_TEMPERATURE,
        ]
        .iter()
        .map(|s| (*s).to_string())
        .collect();

        let mut records = Vec::with_capacity(config.rows);
        let mut true_temperature = Vec::with_capacity(config.rows);

        for row in 0..config.rows {
            let ts = row_timestamp(config.start_date, row);

            if row < config.startup_rows {
                records.push(TimeSeriesRecord::new(ts, vec![0.0; channels.len()]));
                true_temperature.push(0.0);
                continue;
            }

            let choke = CHOKE_LEVELS[rng.gen_range(0..CHOKE_LEVELS.len())];
            let dp_tubing = DP_TUBING_LEVELS[rng.gen_range(0..DP_TUBING_LEVELS.len())];
            let on_stream = f64::from(rng.gen_range(20_u8..=24));
            let oil_vol = choke * 25.0 + rng.gen_range(-50.0..50.0);
            let pressure = 320.0 - dp_tubing * 0.4 + rng.gen_range(-1.0..1.0);

            let temperature = choke * CHOKE_COEFF + dp_tubing * DP_TUBING_COEFF + TEMPERATURE_INTERCEPT;
            true_temperature.push(temperature);

            let (observed_temp, observed_pressure) = if row >= config.cutover_row {
                (0.0, 0.0)
            } else {
                let jitter = noise.map_or(0.0, |n| n.sample(&mut rng));
                (temperature + jitter, pressure)
            };

            records.push(TimeSeriesRecord::new(
                ts,
                vec![on_stream, choke, dp_tubing, oil_vol, observed_pressure, observed_temp],
            ));
        }

        let dataset = Dataset::new(channels, records)?;
        Ok(Self {
            config,
            dataset,
            true_temperature,
        })
    }

    pub fn dataset(&self) -> &Dataset {
        &self.dataset
    }

    pub fn config(&self) -> &SyntheticWellConfig {
        &self.config
    }

    /// Noise-free temperature for every row (zero during startup).
    pub fn true_temperature(&self) -> &[f64] {
        &self.true_temperature
    }

    pub fn timestamp_at(&self, row: usize) -> NaiveDateTime {
        row_timestamp(self.config.start_date, row)
    }

    /// CSV text with a `DATEPRD` row key, readable by `CsvLoader`.
    pub fn to_csv(&self) -> String {
        let mut out = String::from("DATEPRD");
        for c in self.dataset.channels() {
            out.push(',');
            out.push_str(c);
        }
        out.push('\n');

        for r in self.dataset.records() {
            out.push_str(&format_timestamp(&r.timestamp));
            for v in &r.values {
                out.push(',');
                out.push_str(&format!("{v:.4}"));
            }
            out.push('\n');
        }
        out
    }
}

fn row_timestamp(start: NaiveDate, row: usize) -> NaiveDateTime {
    let days = i64::try_from(row).unwrap_or(i64::MAX);
    (start + Duration::days(days)).and_time(NaiveTime::MIN)
}
