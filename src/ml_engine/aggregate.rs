//! Result Aggregator
//!
//! Merges per-family error reports and imputed series into one comparison
//! table. Every series must cover exactly the timestamps of the original
//! (broken) readings; nothing is reindexed or filled.

use super::family::ModelFamily;
use crate::types::{format_timestamp, ComparisonTable, ErrorReport, ImputedSeries, ObservedSeries};
use std::collections::BTreeMap;
use thiserror::Error;
use tracing::debug;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum AggregateError {
    #[error("Timestamps of {left} and {right} differ: {detail}")]
    MisalignedTimestamps {
        left: String,
        right: String,
        detail: String,
    },

    #[error("{0} reported more than once")]
    DuplicateFamily(ModelFamily),

    #[error("{0} has an error report but no imputed series, or the reverse")]
    UnpairedFamily(ModelFamily),
}

pub struct ResultAggregator;

impl ResultAggregator {
    pub fn aggregate(
        reports: Vec<(ModelFamily, ErrorReport)>,
        series: Vec<ImputedSeries>,
        observed: &ObservedSeries,
    ) -> Result<ComparisonTable, AggregateError> {
        let mut errors = BTreeMap::new();
        for (family, report) in reports {
            if errors.insert(family, report).is_some() {
                return Err(AggregateError::DuplicateFamily(family));
            }
        }

        let reference = format!("observed {}", observed.channel);
        let mut imputed = BTreeMap::new();
        for s in series {
            if let Some(detail) = describe_mismatch(&observed.timestamps, &s.timestamps) {
                return Err(AggregateError::MisalignedTimestamps {
                    left: reference,
                    right: s.family.to_string(),
                    detail,
                });
            }
            if imputed.insert(s.family, s.values).is_some() {
                return Err(AggregateError::DuplicateFamily(s.family));
            }
        }

        if let Some(f) = errors
            .keys()
            .find(|f| !imputed.contains_key(*f))
            .or_else(|| imputed.keys().find(|f| !errors.contains_key(*f)))
        {
            return Err(AggregateError::UnpairedFamily(*f));
        }

        debug!(families = imputed.len(), rows = observed.len(), "Aggregated comparison table");

        Ok(ComparisonTable {
            errors,
            channel: observed.channel.clone(),
            timestamps: observed.timestamps.clone(),
            observed: observed.values.clone(),
            imputed,
        })
    }
}

/// Both sides are strictly increasing, so equal sets means equal vectors.
fn describe_mismatch(
    expected: &[chrono::NaiveDateTime],
    found: &[chrono::NaiveDateTime],
) -> Option<String> {
    if expected == found {
        return None;
    }
    if expected.len() != found.len() {
        return Some(format!("{} rows vs {} rows", expected.len(), found.len()));
    }
    expected
        .iter()
        .zip(found)
        .find(|(a, b)| a != b)
        .map(|(a, b)| format!("{} vs {}", format_timestamp(a), format_timestamp(b)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::parse_timestamp;
    use chrono::NaiveDateTime;

    fn days(range: std::ops::Range<u32>) -> Vec<NaiveDateTime> {
        range
            .map(|d| parse_timestamp(&format!("2010-01-{d:02}")).unwrap())
            .collect()
    }

    fn observed() -> ObservedSeries {
        ObservedSeries {
            channel: "AVG_DOWNHOLE_TEMPERATURE".into(),
            timestamps: days(14..18),
            values: vec![0.0; 4],
        }
    }

    fn series(family: ModelFamily, timestamps: Vec<NaiveDateTime>, v: f64) -> ImputedSeries {
        ImputedSeries {
            family,
            channel: "AVG_DOWNHOLE_TEMPERATURE".into(),
            values: vec![v; timestamps.len()],
            timestamps,
        }
    }

    fn report(mae: f64) -> ErrorReport {
        ErrorReport {
            r2: 0.9,
            mae,
            mse: mae * mae,
            samples: 100,
        }
    }

    #[test]
    fn merges_families_into_wide_table() {
        let table = ResultAggregator::aggregate(
            vec![(ModelFamily::ExtraTrees, report(0.2)), (ModelFamily::RandomForest, report(0.1))],
            vec![
                series(ModelFamily::ExtraTrees, days(14..18), 106.0),
                series(ModelFamily::RandomForest, days(14..18), 105.0),
            ],
            &observed(),
        )
        .unwrap();

        assert_eq!(table.len(), 4);
        assert_eq!(table.families(), vec![ModelFamily::RandomForest, ModelFamily::ExtraTrees]);
        assert_eq!(table.column(ModelFamily::ExtraTrees), Some(&[106.0; 4][..]));
        assert_eq!(table.observed, vec![0.0; 4]);
        assert_eq!(table.best_in_sample().map(|(f, _)| f), Some(ModelFamily::RandomForest));
    }

    #[test]
    fn shifted_series_is_misaligned() {
        let err = ResultAggregator::aggregate(
            vec![(ModelFamily::AdaBoost, report(0.3))],
            vec![series(ModelFamily::AdaBoost, days(15..19), 106.0)],
            &observed(),
        )
        .unwrap_err();
        assert!(matches!(err, AggregateError::MisalignedTimestamps { .. }));
    }

    #[test]
    fn short_series_is_misaligned() {
        let err = ResultAggregator::aggregate(
            vec![(ModelFamily::AdaBoost, report(0.3))],
            vec![series(ModelFamily::AdaBoost, days(14..17), 106.0)],
            &observed(),
        )
        .unwrap_err();
        assert!(matches!(err, AggregateError::MisalignedTimestamps { ref detail, .. } if detail.contains("4 rows vs 3 rows")));
    }

    #[test]
    fn duplicate_and_unpaired_families() {
        let err = ResultAggregator::aggregate(
            vec![(ModelFamily::AdaBoost, report(0.3)), (ModelFamily::AdaBoost, report(0.4))],
            vec![],
            &observed(),
        )
        .unwrap_err();
        assert_eq!(err, AggregateError::DuplicateFamily(ModelFamily::AdaBoost));

        let err = ResultAggregator::aggregate(
            vec![(ModelFamily::AdaBoost, report(0.3))],
            vec![],
            &observed(),
        )
        .unwrap_err();
        assert_eq!(err, AggregateError::UnpairedFamily(ModelFamily::AdaBoost));
    }
}
