//! Dataset and Partition Invariants
//!
//! Property tests over randomly sized datasets: partition halves are
//! disjoint and cover the input, slicing is idempotent, channel drops fail
//! on unknown names.

use chrono::{Duration, NaiveDateTime};
use proptest::prelude::*;
use volve_impute::dataset::{Dataset, DatasetError};
use volve_impute::partition::{MissingValuePolicy, PartitionError, SensorFailurePartitioner};
use volve_impute::types::{parse_timestamp, TimeSeriesRecord};

const CHANNELS: [&str; 3] = ["AVG_CHOKE_SIZE_P", "AVG_DP_TUBING", "AVG_DOWNHOLE_TEMPERATURE"];

fn start() -> NaiveDateTime {
    parse_timestamp("2008-02-01").unwrap()
}

/// `rows` records with strictly increasing (possibly uneven) timestamps.
fn dataset(gaps: &[i64]) -> Dataset {
    let mut ts = start();
    let records = gaps
        .iter()
        .enumerate()
        .map(|(i, gap)| {
            ts += Duration::hours(*gap);
            let x = i as f64;
            TimeSeriesRecord::new(ts, vec![x % 10.0, x % 7.0, 90.0 + x % 10.0])
        })
        .collect();
    Dataset::new(CHANNELS.iter().map(|c| (*c).to_string()).collect(), records).unwrap()
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn partition_halves_are_disjoint_and_cover_input(
        gaps in prop::collection::vec(1i64..72, 2..120),
        cut in 1usize..120,
    ) {
        let ds = dataset(&gaps);
        let cut = cut % (ds.len() - 1) + 1;
        let cutover = ds.timestamps()[cut];

        let p = SensorFailurePartitioner::new("AVG_DOWNHOLE_TEMPERATURE", cutover)
            .partition(&ds)
            .unwrap();

        let before = p.ground_truth.timestamps();
        let after = p.to_impute.timestamps();
        prop_assert!(before.iter().all(|t| *t < cutover));
        prop_assert!(after.iter().all(|t| *t >= cutover));

        let mut union = before.clone();
        union.extend(after.iter().copied());
        prop_assert_eq!(union, ds.timestamps());

        prop_assert!(!p.to_impute.has_channel("AVG_DOWNHOLE_TEMPERATURE"));
        prop_assert_eq!(&p.broken_readings.timestamps, &after);

        let view = p.ground_truth_view(MissingValuePolicy::Reject).unwrap();
        prop_assert_eq!(view.n_rows(), cut);
        prop_assert_eq!(view.feature_names().len(), 2);
    }

    #[test]
    fn slice_is_idempotent(
        gaps in prop::collection::vec(1i64..48, 1..80),
        a in 0usize..80,
        b in 0usize..80,
    ) {
        let ds = dataset(&gaps);
        let ts = ds.timestamps();
        let (lo, hi) = (a.min(b) % ts.len(), a.max(b) % ts.len());
        let (lo, hi) = (lo.min(hi), lo.max(hi));

        let once = ds.slice(ts[lo], ts[hi]).unwrap();
        let twice = once.slice(ts[lo], ts[hi]).unwrap();
        prop_assert_eq!(&once, &twice);
        prop_assert_eq!(once.len(), hi - lo + 1);
    }

    #[test]
    fn cutover_outside_the_data_is_rejected(
        gaps in prop::collection::vec(1i64..48, 1..40),
        before_hours in 0i64..1000,
        after_hours in 1i64..1000,
    ) {
        let ds = dataset(&gaps);
        let first = ds.first_timestamp().unwrap();
        let last = ds.last_timestamp().unwrap();

        let early = SensorFailurePartitioner::new("AVG_DOWNHOLE_TEMPERATURE", first - Duration::hours(before_hours))
            .partition(&ds);
        let is_invalid_cutover = matches!(early, Err(PartitionError::InvalidCutover { .. }));
        prop_assert!(is_invalid_cutover);

        let late = SensorFailurePartitioner::new("AVG_DOWNHOLE_TEMPERATURE", last + Duration::hours(after_hours))
            .partition(&ds);
        let is_invalid_cutover = matches!(late, Err(PartitionError::InvalidCutover { .. }));
        prop_assert!(is_invalid_cutover);
    }
}

#[test]
fn dropping_an_unknown_channel_fails() {
    let ds = dataset(&[24; 10]);
    assert_eq!(
        ds.drop_channel("AVG_DOWNHOLE_PRESSURE"),
        Err(DatasetError::UnknownChannel("AVG_DOWNHOLE_PRESSURE".into()))
    );
    assert!(ds.drop_channels(&["AVG_DP_TUBING", "NOPE"]).is_err());
}

#[test]
fn empty_slice_fails() {
    let ds = dataset(&[24; 10]);
    let last = ds.last_timestamp().unwrap();
    let err = ds.slice(last + Duration::days(1), last + Duration::days(2)).unwrap_err();
    assert!(matches!(err, DatasetError::EmptyRange(_)));
}

#[test]
fn missing_target_channel_fails_before_splitting() {
    let ds = dataset(&[24; 10]);
    let cut = ds.timestamps()[5];
    let err = SensorFailurePartitioner::new("AVG_DOWNHOLE_PRESSURE", cut)
        .partition(&ds)
        .unwrap_err();
    assert_eq!(
        err,
        PartitionError::Dataset(DatasetError::UnknownChannel("AVG_DOWNHOLE_PRESSURE".into()))
    );
}
