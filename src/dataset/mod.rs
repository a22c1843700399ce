//! Time-Segmented Dataset
//!
//! Holds the full production record set ordered by timestamp. Every transform
//! (range slicing, channel removal, startup truncation) returns a new
//! `Dataset`; nothing mutates a dataset that has already been handed out.
//!
//! ## Architecture
//! - `csv_loader`: quote-aware CSV ingestion with numeric column typing
//! - `synthetic`: generator for a synthetic well with a known target relation

pub mod csv_loader;
pub mod synthetic;

pub use csv_loader::{CsvError, CsvLoader, CsvOptions};
pub use synthetic::{SyntheticWell, SyntheticWellConfig};

use crate::types::{format_timestamp, TimeSeriesRecord};
use chrono::NaiveDateTime;
use std::collections::HashSet;
use std::ops::{Bound, RangeBounds};
use thiserror::Error;

/// Errors raised by dataset transforms
#[derive(Error, Debug, Clone, PartialEq)]
pub enum DatasetError {
    #[error("No records fall in range {0}")]
    EmptyRange(String),

    #[error("Unknown channel: {0}")]
    UnknownChannel(String),

    #[error("Duplicate channel name: {0}")]
    DuplicateChannel(String),

    #[error("Timestamps must be strictly increasing: {current} follows {previous}")]
    NonMonotonicTimestamp {
        previous: NaiveDateTime,
        current: NaiveDateTime,
    },

    #[error("Record at {timestamp} has {found} values, expected {expected}")]
    RowWidth {
        timestamp: NaiveDateTime,
        expected: usize,
        found: usize,
    },

    #[error("Missing {channel} reading at {timestamp}")]
    MissingValue {
        channel: String,
        timestamp: NaiveDateTime,
    },

    #[error("View {part} has {found} entries, expected {expected}")]
    ViewShape {
        part: &'static str,
        expected: usize,
        found: usize,
    },
}

/// Ordered production records sharing one channel list.
#[derive(Debug, Clone, PartialEq)]
pub struct Dataset {
    channels: Vec<String>,
    records: Vec<TimeSeriesRecord>,
}

impl Dataset {
    /// Build a dataset, checking that channel names are unique, every record
    /// has one value per channel and timestamps strictly increase.
    pub fn new(channels: Vec<String>, records: Vec<TimeSeriesRecord>) -> Result<Self, DatasetError> {
        let mut seen = HashSet::new();
        for name in &channels {
            if !seen.insert(name.as_str()) {
                return Err(DatasetError::DuplicateChannel(name.clone()));
            }
        }

        for record in &records {
            if record.values.len() != channels.len() {
                return Err(DatasetError::RowWidth {
                    timestamp: record.timestamp,
                    expected: channels.len(),
                    found: record.values.len(),
                });
            }
        }

        for pair in records.windows(2) {
            if pair[1].timestamp <= pair[0].timestamp {
                return Err(DatasetError::NonMonotonicTimestamp {
                    previous: pair[0].timestamp,
                    current: pair[1].timestamp,
                });
            }
        }

        Ok(Self { channels, records })
    }

    pub fn channels(&self) -> &[String] {
        &self.channels
    }

    pub fn records(&self) -> &[TimeSeriesRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn first_timestamp(&self) -> Option<NaiveDateTime> {
        self.records.first().map(|r| r.timestamp)
    }

    pub fn last_timestamp(&self) -> Option<NaiveDateTime> {
        self.records.last().map(|r| r.timestamp)
    }

    pub fn timestamps(&self) -> Vec<NaiveDateTime> {
        self.records.iter().map(|r| r.timestamp).collect()
    }

    pub fn has_channel(&self, name: &str) -> bool {
        self.channels.iter().any(|c| c == name)
    }

    pub fn channel_index(&self, name: &str) -> Result<usize, DatasetError> {
        self.channels
            .iter()
            .position(|c| c == name)
            .ok_or_else(|| DatasetError::UnknownChannel(name.to_string()))
    }

    /// Copy of one channel's readings in record order.
    pub fn column(&self, name: &str) -> Result<Vec<f64>, DatasetError> {
        let idx = self.channel_index(name)?;
        Ok(self.records.iter().map(|r| r.values[idx]).collect())
    }

    /// Records with `start <= timestamp <= end`, in order.
    pub fn slice(&self, start: NaiveDateTime, end: NaiveDateTime) -> Result<Self, DatasetError> {
        self.slice_by(start..=end)
    }

    /// Records strictly before `end`.
    pub fn slice_before(&self, end: NaiveDateTime) -> Result<Self, DatasetError> {
        self.slice_by(..end)
    }

    /// Records at or after `start`.
    pub fn slice_from(&self, start: NaiveDateTime) -> Result<Self, DatasetError> {
        self.slice_by(start..)
    }

    /// Drop the non-operational startup window: keep records at or after the
    /// first operational timestamp.
    pub fn truncate_startup(&self, operations_start: NaiveDateTime) -> Result<Self, DatasetError> {
        self.slice_from(operations_start)
    }

    fn slice_by<R: RangeBounds<NaiveDateTime>>(&self, range: R) -> Result<Self, DatasetError> {
        let lo = match range.start_bound() {
            Bound::Included(t) => self.records.partition_point(|r| r.timestamp < *t),
            Bound::Excluded(t) => self.records.partition_point(|r| r.timestamp <= *t),
            Bound::Unbounded => 0,
        };
        let hi = match range.end_bound() {
            Bound::Included(t) => self.records.partition_point(|r| r.timestamp <= *t),
            Bound::Excluded(t) => self.records.partition_point(|r| r.timestamp < *t),
            Bound::Unbounded => self.records.len(),
        };

        if lo >= hi {
            return Err(DatasetError::EmptyRange(describe_range(&range)));
        }

        Ok(Self {
            channels: self.channels.clone(),
            records: self.records[lo..hi].to_vec(),
        })
    }

    /// Copy without the named channel.
    pub fn drop_channel(&self, name: &str) -> Result<Self, DatasetError> {
        let idx = self.channel_index(name)?;
        let mut channels = self.channels.clone();
        channels.remove(idx);

        let records = self
            .records
            .iter()
            .map(|r| {
                let mut values = r.values.clone();
                values.remove(idx);
                TimeSeriesRecord::new(r.timestamp, values)
            })
            .collect();

        Ok(Self { channels, records })
    }

    /// Drop several channels. Fails on the first unknown name before
    /// touching anything.
    pub fn drop_channels<S: AsRef<str>>(&self, names: &[S]) -> Result<Self, DatasetError> {
        for name in names {
            self.channel_index(name.as_ref())?;
        }
        let keep: Vec<&str> = self
            .channels
            .iter()
            .map(String::as_str)
            .filter(|c| !names.iter().any(|n| n.as_ref() == *c))
            .collect();
        self.select_channels(&keep)
    }

    /// Projection onto the given channels, in the given order.
    pub fn select_channels<S: AsRef<str>>(&self, names: &[S]) -> Result<Self, DatasetError> {
        let indices = names
            .iter()
            .map(|n| self.channel_index(n.as_ref()))
            .collect::<Result<Vec<_>, _>>()?;
        let channels = names.iter().map(|n| n.as_ref().to_string()).collect();

        let records = self
            .records
            .iter()
            .map(|r| TimeSeriesRecord::new(r.timestamp, indices.iter().map(|&i| r.values[i]).collect()))
            .collect();

        Self::new(channels, records)
    }

    /// Records whose readings are all present.
    pub fn complete_rows(&self) -> Self {
        Self {
            channels: self.channels.clone(),
            records: self.records.iter().filter(|r| r.is_complete()).cloned().collect(),
        }
    }

    /// First missing reading, scanning records in order.
    pub fn first_missing(&self) -> Option<(String, NaiveDateTime)> {
        self.records.iter().find_map(|r| {
            r.values
                .iter()
                .position(|v| v.is_nan())
                .map(|i| (self.channels[i].clone(), r.timestamp))
        })
    }

    /// Number of leading records whose readings are all zero or missing.
    pub fn leading_inactive_rows(&self) -> usize {
        self.records.iter().take_while(|r| r.is_inactive()).count()
    }
}

fn describe_range<R: RangeBounds<NaiveDateTime>>(range: &R) -> String {
    let lo = match range.start_bound() {
        Bound::Included(t) => format!("[{}", format_timestamp(t)),
        Bound::Excluded(t) => format!("({}", format_timestamp(t)),
        Bound::Unbounded => "(..".to_string(),
    };
    let hi = match range.end_bound() {
        Bound::Included(t) => format!("{}]", format_timestamp(t)),
        Bound::Excluded(t) => format!("{})", format_timestamp(t)),
        Bound::Unbounded => "..)".to_string(),
    };
    format!("{lo}, {hi}")
}
