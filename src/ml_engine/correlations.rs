//! Channel Correlation Screen
//!
//! Pearson correlations between dataset channels with p-values from the
//! Student's t distribution (statrs). Used before modelling to show which
//! channels carry the downhole temperature signal.
//!
//! ## Key Features
//! - Pairwise-complete correlation matrix (rows with a gap in either channel
//!   are skipped for that pair only)
//! - Significance filter (p < 0.05, at least 30 complete pairs)
//! - Channels ranked by |r| against the target

use crate::dataset::{Dataset, DatasetError};
use crate::types::correlation_thresholds::{MIN_CORRELATION_SAMPLES, SIGNIFICANCE_THRESHOLD};
use crate::types::SignificantCorrelation;
use serde::Serialize;
use statrs::distribution::{ContinuousCDF, StudentsT};

/// Correlation analysis with statistical significance testing
pub struct CorrelationEngine;

impl CorrelationEngine {
    /// Pearson correlation with significance testing.
    ///
    /// Returns `Some` only if there are enough samples and p < 0.05.
    pub fn calculate(x: &[f64], y: &[f64], x_name: &str, y_name: &str) -> Option<SignificantCorrelation> {
        let n = x.len();
        if n < MIN_CORRELATION_SAMPLES || n != y.len() {
            return None;
        }

        let r = Self::pearson(x, y);
        let p_value = Self::p_value_for_r(r, n);
        if p_value >= SIGNIFICANCE_THRESHOLD {
            return None;
        }

        Some(SignificantCorrelation {
            x_param: x_name.to_string(),
            y_param: y_name.to_string(),
            r_value: r,
            r_squared: r * r,
            p_value,
            sample_count: n,
        })
    }

    /// Pearson correlation coefficient
    ///
    /// Formula: r = Σ[(xi - x̄)(yi - ȳ)] / sqrt(Σ(xi - x̄)² × Σ(yi - ȳ)²)
    ///
    /// A constant series has no defined correlation and yields 0.
    pub fn pearson(x: &[f64], y: &[f64]) -> f64 {
        let n = x.len().min(y.len());
        if n == 0 {
            return 0.0;
        }
        let mean_x = x[..n].iter().sum::<f64>() / n as f64;
        let mean_y = y[..n].iter().sum::<f64>() / n as f64;

        let (mut sxy, mut sxx, mut syy) = (0.0, 0.0, 0.0);
        for (a, b) in x.iter().zip(y) {
            let (dx, dy) = (a - mean_x, b - mean_y);
            sxy += dx * dy;
            sxx += dx * dx;
            syy += dy * dy;
        }

        let denominator = (sxx * syy).sqrt();
        if denominator == 0.0 {
            0.0
        } else {
            (sxy / denominator).clamp(-1.0, 1.0)
        }
    }

    /// Two-tailed p-value for r with n samples.
    ///
    /// Formula: t = r × sqrt(n-2) / sqrt(1-r²), t-distribution with n-2
    /// degrees of freedom
    pub fn p_value_for_r(r: f64, n: usize) -> f64 {
        if n < 3 {
            return 1.0;
        }

        // Perfect or near-perfect correlation is highly significant
        if r.abs() >= 0.9999 {
            return 0.0;
        }

        let df = (n - 2) as f64;
        let t_stat = r * df.sqrt() / (1.0 - r * r).sqrt();

        match StudentsT::new(0.0, 1.0, df) {
            Ok(t_dist) => 2.0 * (1.0 - t_dist.cdf(t_stat.abs())),
            Err(_) => 1.0,
        }
    }
}

/// Pairwise Pearson correlations over every channel of a dataset.
#[derive(Debug, Clone, Serialize)]
pub struct CorrelationMatrix {
    channels: Vec<String>,
    /// Row-major r values, channels × channels
    r: Vec<f64>,
    /// Complete pairs behind each entry
    counts: Vec<usize>,
}

impl CorrelationMatrix {
    pub fn compute(dataset: &Dataset) -> Self {
        let channels = dataset.channels().to_vec();
        let k = channels.len();
        let columns: Vec<Vec<f64>> = (0..k)
            .map(|c| dataset.records().iter().map(|r| r.values[c]).collect())
            .collect();

        let mut r = vec![0.0; k * k];
        let mut counts = vec![0; k * k];
        for i in 0..k {
            for j in i..k {
                let (xs, ys): (Vec<f64>, Vec<f64>) = columns[i]
                    .iter()
                    .zip(&columns[j])
                    .filter(|(a, b)| a.is_finite() && b.is_finite())
                    .map(|(a, b)| (*a, *b))
                    .unzip();
                let value = if i == j && !xs.is_empty() {
                    1.0
                } else {
                    CorrelationEngine::pearson(&xs, &ys)
                };
                r[i * k + j] = value;
                r[j * k + i] = value;
                counts[i * k + j] = xs.len();
                counts[j * k + i] = xs.len();
            }
        }

        Self { channels, r, counts }
    }

    pub fn channels(&self) -> &[String] {
        &self.channels
    }

    fn index(&self, name: &str) -> Option<usize> {
        self.channels.iter().position(|c| c == name)
    }

    /// r between two channels, if both exist.
    pub fn get(&self, a: &str, b: &str) -> Option<f64> {
        let (i, j) = (self.index(a)?, self.index(b)?);
        Some(self.r[i * self.channels.len() + j])
    }

    /// Significant correlations of every other channel with `target`,
    /// strongest |r| first.
    pub fn strongest_with(&self, target: &str) -> Result<Vec<SignificantCorrelation>, DatasetError> {
        let t = self
            .index(target)
            .ok_or_else(|| DatasetError::UnknownChannel(target.to_string()))?;
        let k = self.channels.len();

        let mut ranked: Vec<SignificantCorrelation> = (0..k)
            .filter(|&c| c != t)
            .filter_map(|c| {
                let r = self.r[c * k + t];
                let n = self.counts[c * k + t];
                let p_value = CorrelationEngine::p_value_for_r(r, n);
                (n >= MIN_CORRELATION_SAMPLES && p_value < SIGNIFICANCE_THRESHOLD).then(|| SignificantCorrelation {
                    x_param: self.channels[c].clone(),
                    y_param: target.to_string(),
                    r_value: r,
                    r_squared: r * r,
                    p_value,
                    sample_count: n,
                })
            })
            .collect();

        ranked.sort_by(|a, b| b.r_value.abs().total_cmp(&a.r_value.abs()));
        Ok(ranked)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{parse_timestamp, TimeSeriesRecord};
    use chrono::Duration;

    fn make_dataset(rows: &[(f64, f64, f64)]) -> Dataset {
        let start = parse_timestamp("2008-01-01").unwrap();
        let records = rows
            .iter()
            .enumerate()
            .map(|(i, (choke, noise, temp))| {
                TimeSeriesRecord::new(start + Duration::days(i as i64), vec![*choke, *noise, *temp])
            })
            .collect();
        Dataset::new(
            vec!["AVG_CHOKE_SIZE_P".into(), "ON_STREAM_HRS".into(), "AVG_DOWNHOLE_TEMPERATURE".into()],
            records,
        )
        .unwrap()
    }

    #[test]
    fn test_perfect_positive_correlation() {
        let x: Vec<f64> = (0..100).map(|i| i as f64).collect();
        let y: Vec<f64> = (0..100).map(|i| i as f64).collect();

        let corr = CorrelationEngine::calculate(&x, &y, "X", "Y").unwrap();
        assert!((corr.r_value - 1.0).abs() < 0.001);
        assert!(corr.p_value < 0.05);
    }

    #[test]
    fn test_perfect_negative_correlation() {
        let x: Vec<f64> = (0..100).map(|i| i as f64).collect();
        let y: Vec<f64> = (0..100).map(|i| 100.0 - i as f64).collect();

        let corr = CorrelationEngine::calculate(&x, &y, "X", "Y").unwrap();
        assert!((corr.r_value + 1.0).abs() < 0.001);
    }

    #[test]
    fn test_weak_correlation_rejected() {
        let x: Vec<f64> = (0..100).map(|i| i as f64).collect();
        let y: Vec<f64> = (0..100).map(|i| if i % 2 == 0 { 50.0 } else { 51.0 }).collect();

        let r = CorrelationEngine::pearson(&x, &y);
        let p = CorrelationEngine::p_value_for_r(r, 100);
        assert!(r.abs() < 0.1, "Test data should produce weak correlation, got r={}", r);
        assert!(p > 0.05, "Weak correlation should have p > 0.05, got p={}", p);
        assert!(CorrelationEngine::calculate(&x, &y, "X", "Y").is_none());
    }

    #[test]
    fn test_insufficient_samples_rejected() {
        let x: Vec<f64> = (0..20).map(|i| i as f64).collect();
        let y: Vec<f64> = (0..20).map(|i| i as f64 * 2.0).collect();
        assert!(CorrelationEngine::calculate(&x, &y, "X", "Y").is_none());
    }

    #[test]
    fn test_p_value_calculation_accuracy() {
        // r=0.5, n=30 gives p ≈ 0.005
        let p = CorrelationEngine::p_value_for_r(0.5, 30);
        assert!(p < 0.01 && p > 0.001, "r=0.5, n=30 should have p ≈ 0.005, got {}", p);

        // r=0.2, n=30 gives p ≈ 0.29
        let p = CorrelationEngine::p_value_for_r(0.2, 30);
        assert!(p > 0.2, "r=0.2, n=30 should have p > 0.2, got {}", p);
    }

    #[test]
    fn test_matrix_is_symmetric_with_unit_diagonal() {
        let rows: Vec<_> = (0..50)
            .map(|i| {
                let choke = (i % 10) as f64 * 10.0;
                (choke, 24.0 - (i % 3) as f64, choke * 0.2 + 95.0)
            })
            .collect();
        let m = CorrelationMatrix::compute(&make_dataset(&rows));

        assert_eq!(m.get("AVG_CHOKE_SIZE_P", "AVG_CHOKE_SIZE_P"), Some(1.0));
        assert_eq!(
            m.get("AVG_CHOKE_SIZE_P", "ON_STREAM_HRS"),
            m.get("ON_STREAM_HRS", "AVG_CHOKE_SIZE_P")
        );
        let r = m.get("AVG_CHOKE_SIZE_P", "AVG_DOWNHOLE_TEMPERATURE").unwrap();
        assert!((r - 1.0).abs() < 1e-9);
        assert!(m.get("AVG_CHOKE_SIZE_P", "BORE_OIL_VOL").is_none());
    }

    #[test]
    fn test_strongest_with_target_ranks_by_strength() {
        let rows: Vec<_> = (0..60)
            .map(|i| {
                let choke = (i % 10) as f64 * 10.0;
                let hrs = 20.0 + (i % 5) as f64;
                (choke, hrs, choke * 0.2 + hrs * 0.05 + 95.0)
            })
            .collect();
        let m = CorrelationMatrix::compute(&make_dataset(&rows));
        let ranked = m.strongest_with("AVG_DOWNHOLE_TEMPERATURE").unwrap();

        assert!(!ranked.is_empty());
        assert_eq!(ranked[0].x_param, "AVG_CHOKE_SIZE_P");
        for pair in ranked.windows(2) {
            assert!(
                pair[0].r_value.abs() >= pair[1].r_value.abs(),
                "Correlations should be sorted by |r|"
            );
        }
        assert!(m.strongest_with("NOPE").is_err());
    }

    #[test]
    fn test_gaps_skip_only_the_affected_pair() {
        let mut rows: Vec<_> = (0..40)
            .map(|i| (i as f64, (i % 2) as f64, i as f64 * 2.0))
            .collect();
        rows[3].1 = f64::NAN;
        let m = CorrelationMatrix::compute(&make_dataset(&rows));
        let ranked = m.strongest_with("AVG_DOWNHOLE_TEMPERATURE").unwrap();
        let choke = ranked.iter().find(|c| c.x_param == "AVG_CHOKE_SIZE_P").unwrap();
        assert_eq!(choke.sample_count, 40);
    }
}
