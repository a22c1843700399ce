//! Sensor-Failure Partitioner
//!
//! Splits a dataset at a fixed cutover timestamp into the ground-truth
//! segment (target readings valid, `timestamp < cutover`) and the to-impute
//! segment (`timestamp >= cutover`, target channel removed). The target
//! readings of the to-impute segment are kept aside as the broken series so
//! they can be shown next to the reconstructions.
//!
//! The cutover is configuration. Nothing here tries to detect it, and startup
//! truncation has already happened upstream.

mod view;

pub use view::{FeatureTargetView, MissingValuePolicy, PredictionView};

use crate::dataset::{Dataset, DatasetError};
use crate::types::{format_timestamp, ObservedSeries};
use chrono::NaiveDateTime;
use thiserror::Error;
use tracing::info;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum PartitionError {
    #[error("Invalid cutover {}: {reason} (data spans {} to {})", format_timestamp(.cutover), format_timestamp(.first), format_timestamp(.last))]
    InvalidCutover {
        cutover: NaiveDateTime,
        first: NaiveDateTime,
        last: NaiveDateTime,
        reason: &'static str,
    },

    #[error("Cannot partition an empty dataset")]
    EmptyDataset,

    #[error("Target channel '{0}' is the only channel; no features remain")]
    NoFeatureChannels(String),

    #[error(transparent)]
    Dataset(#[from] DatasetError),
}

/// Splits datasets at a fixed cutover for one target channel.
#[derive(Debug, Clone)]
pub struct SensorFailurePartitioner {
    target: String,
    cutover: NaiveDateTime,
}

impl SensorFailurePartitioner {
    pub fn new(target: impl Into<String>, cutover: NaiveDateTime) -> Self {
        Self {
            target: target.into(),
            cutover,
        }
    }

    pub fn partition(&self, dataset: &Dataset) -> Result<Partition, PartitionError> {
        let (first, last) = match (dataset.first_timestamp(), dataset.last_timestamp()) {
            (Some(f), Some(l)) => (f, l),
            _ => return Err(PartitionError::EmptyDataset),
        };
        dataset.channel_index(&self.target)?;
        if dataset.channels().len() < 2 {
            return Err(PartitionError::NoFeatureChannels(self.target.clone()));
        }

        let invalid = |reason| PartitionError::InvalidCutover {
            cutover: self.cutover,
            first,
            last,
            reason,
        };
        if self.cutover <= first {
            return Err(invalid("ground-truth segment would be empty"));
        }
        if self.cutover > last {
            return Err(invalid("to-impute segment would be empty"));
        }

        let ground_truth = dataset.slice_before(self.cutover)?;
        let after = dataset.slice_from(self.cutover)?;

        let broken_readings = ObservedSeries {
            channel: self.target.clone(),
            timestamps: after.timestamps(),
            values: after.column(&self.target)?,
        };
        let to_impute = after.drop_channel(&self.target)?;

        info!(
            cutover = %format_timestamp(&self.cutover),
            ground_truth = ground_truth.len(),
            to_impute = to_impute.len(),
            "Partitioned at sensor failure"
        );

        Ok(Partition {
            target_channel: self.target.clone(),
            cutover: self.cutover,
            ground_truth,
            to_impute,
            broken_readings,
        })
    }
}

/// Result of a partition. Both halves are independent copies.
#[derive(Debug, Clone, PartialEq)]
pub struct Partition {
    pub target_channel: String,
    pub cutover: NaiveDateTime,
    /// Records before the cutover, target retained
    pub ground_truth: Dataset,
    /// Records from the cutover on, target removed
    pub to_impute: Dataset,
    /// Original target readings over the to-impute segment
    pub broken_readings: ObservedSeries,
}

impl Partition {
    pub fn ground_truth_view(&self, policy: MissingValuePolicy) -> Result<FeatureTargetView, DatasetError> {
        FeatureTargetView::from_dataset(&self.ground_truth, &self.target_channel, policy)
    }

    pub fn prediction_view(&self, policy: MissingValuePolicy) -> Result<PredictionView, DatasetError> {
        PredictionView::from_dataset(&self.to_impute, policy)
    }

    /// Target readings of the ground-truth segment.
    pub fn observed_target(&self) -> Result<ObservedSeries, DatasetError> {
        Ok(ObservedSeries {
            channel: self.target_channel.clone(),
            timestamps: self.ground_truth.timestamps(),
            values: self.ground_truth.column(&self.target_channel)?,
        })
    }
}
