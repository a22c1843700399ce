//! Time-indexed production records and timestamp parsing.

use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use serde::{Deserialize, Serialize};

/// Timestamp formats accepted for the row key and for configured dates.
///
/// The Volve production export writes `DATEPRD` as `DD-Mon-YY`; cleaned
/// extracts use ISO dates.
const DATETIME_FORMATS: [&str; 4] = [
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%d %H:%M",
    "%d/%m/%Y %H:%M",
];

const DATE_FORMATS: [&str; 4] = ["%Y-%m-%d", "%d-%b-%y", "%d-%b-%Y", "%d/%m/%Y"];

/// Parse a timestamp in any of the supported formats.
///
/// Plain dates resolve to midnight.
pub fn parse_timestamp(raw: &str) -> Option<NaiveDateTime> {
    let raw = raw.trim().trim_matches('"');
    if raw.is_empty() {
        return None;
    }

    for fmt in DATETIME_FORMATS {
        if let Ok(ts) = NaiveDateTime::parse_from_str(raw, fmt) {
            return Some(ts);
        }
    }
    for fmt in DATE_FORMATS {
        if let Ok(date) = NaiveDate::parse_from_str(raw, fmt) {
            return Some(date.and_time(NaiveTime::MIN));
        }
    }
    None
}

/// Render a timestamp the way it is written back to CSV and JSON.
///
/// Midnight timestamps print as a bare date since production data is daily.
pub fn format_timestamp(ts: &NaiveDateTime) -> String {
    if ts.time() == NaiveTime::MIN {
        ts.format("%Y-%m-%d").to_string()
    } else {
        ts.format("%Y-%m-%d %H:%M:%S").to_string()
    }
}

/// One row of the production series: a timestamp plus one reading per channel.
///
/// `values` is aligned with the owning dataset's channel list. A missing
/// reading is stored as `NaN`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimeSeriesRecord {
    pub timestamp: NaiveDateTime,
    pub values: Vec<f64>,
}

impl TimeSeriesRecord {
    pub fn new(timestamp: NaiveDateTime, values: Vec<f64>) -> Self {
        Self { timestamp, values }
    }

    /// True when every reading is present.
    pub fn is_complete(&self) -> bool {
        self.values.iter().all(|v| !v.is_nan())
    }

    /// True when every reading is zero or missing (placeholder rows before
    /// the facility came on stream).
    pub fn is_inactive(&self) -> bool {
        self.values.iter().all(|v| v.is_nan() || *v == 0.0)
    }
}

/// Serde adapter storing timestamps as the strings `parse_timestamp` accepts.
pub mod serde_timestamp {
    use super::{format_timestamp, parse_timestamp};
    use chrono::NaiveDateTime;
    use serde::{de::Error, Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(ts: &NaiveDateTime, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&format_timestamp(ts))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<NaiveDateTime, D::Error> {
        let raw = String::deserialize(deserializer)?;
        parse_timestamp(&raw).ok_or_else(|| D::Error::custom(format!("invalid timestamp '{raw}'")))
    }

    /// Same as the parent module for `Option<NaiveDateTime>` fields.
    pub mod option {
        use super::{format_timestamp, parse_timestamp};
        use chrono::NaiveDateTime;
        use serde::{de::Error, Deserialize, Deserializer, Serializer};

        pub fn serialize<S: Serializer>(
            ts: &Option<NaiveDateTime>,
            serializer: S,
        ) -> Result<S::Ok, S::Error> {
            match ts {
                Some(ts) => serializer.serialize_some(&format_timestamp(ts)),
                None => serializer.serialize_none(),
            }
        }

        pub fn deserialize<'de, D: Deserializer<'de>>(
            deserializer: D,
        ) -> Result<Option<NaiveDateTime>, D::Error> {
            let raw = Option::<String>::deserialize(deserializer)?;
            match raw {
                None => Ok(None),
                Some(s) if s.trim().is_empty() => Ok(None),
                Some(s) => parse_timestamp(&s)
                    .map(Some)
                    .ok_or_else(|| D::Error::custom(format!("invalid timestamp '{s}'"))),
            }
        }
    }
}
