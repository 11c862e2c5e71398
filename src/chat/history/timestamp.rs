//! Normalization of persisted timestamps.
//!
//! Chat records written over the lifetime of the service carry `createdAt`
//! values in three shapes:
//! - a native timestamp `{"seconds": .., "nanoseconds": ..}`,
//! - an ISO-8601 string,
//! - a partially-deserialized timestamp `{"_seconds": .., "_nanoseconds": ..}`.
//!
//! Every read normalizes them to one `DateTime<Utc>` truncated to the
//! millisecond. Anything unrecognized falls back to the current time; this
//! never fails.

use chrono::{DateTime, NaiveDate, NaiveDateTime, SecondsFormat, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Nanoseconds per millisecond.
const NANOS_PER_MILLI: i64 = 1_000_000;
/// Milliseconds per second.
const MILLIS_PER_SECOND: i64 = 1_000;

/// A timestamp in any of the persisted shapes.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum StoredTimestamp {
    /// Native structured timestamp.
    Native {
        /// Whole seconds since the Unix epoch.
        seconds: i64,
        /// Sub-second nanoseconds.
        nanoseconds: i64,
    },
    /// Structured timestamp that lost its type during deserialization.
    Raw {
        /// Whole seconds since the Unix epoch.
        #[serde(rename = "_seconds")]
        seconds: i64,
        /// Sub-second nanoseconds.
        #[serde(rename = "_nanoseconds")]
        nanoseconds: i64,
    },
    /// ISO-8601 string.
    Iso(String),
}

impl StoredTimestamp {
    /// Native timestamp for the current instant. New writes use this shape.
    #[must_use]
    pub fn now() -> Self {
        Self::from_datetime(Utc::now())
    }

    /// Native timestamp for a given instant.
    #[must_use]
    pub fn from_datetime(at: DateTime<Utc>) -> Self {
        Self::Native {
            seconds: at.timestamp(),
            nanoseconds: i64::from(at.timestamp_subsec_nanos()),
        }
    }

    /// Recognize a persisted value; `None` for unsupported shapes.
    #[must_use]
    pub fn from_value(value: &Value) -> Option<Self> {
        Self::deserialize(value).ok()
    }

    /// Convert to an instant truncated to the millisecond, if representable.
    #[must_use]
    pub fn to_datetime(&self) -> Option<DateTime<Utc>> {
        match self {
            Self::Native {
                seconds,
                nanoseconds,
            }
            | Self::Raw {
                seconds,
                nanoseconds,
            } => {
                let millis = seconds
                    .checked_mul(MILLIS_PER_SECOND)?
                    .checked_add(nanoseconds / NANOS_PER_MILLI)?;
                Utc.timestamp_millis_opt(millis).single()
            }
            Self::Iso(text) => parse_iso(text),
        }
    }
}

/// Normalize a persisted timestamp value, falling back to "now".
#[must_use]
pub fn normalize(value: &Value) -> DateTime<Utc> {
    StoredTimestamp::from_value(value)
        .and_then(|ts| ts.to_datetime())
        .unwrap_or_else(|| truncate_to_millis(Utc::now()))
}

/// Canonical ISO-8601 rendering: millisecond precision, `Z` suffix.
#[must_use]
pub fn to_iso(at: DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Millis, true)
}

fn truncate_to_millis(at: DateTime<Utc>) -> DateTime<Utc> {
    Utc.timestamp_millis_opt(at.timestamp_millis())
        .single()
        .unwrap_or(at)
}

fn parse_iso(text: &str) -> Option<DateTime<Utc>> {
    let text = text.trim();
    if let Ok(parsed) = DateTime::parse_from_rfc3339(text) {
        return Some(truncate_to_millis(parsed.with_timezone(&Utc)));
    }
    // Offset-less forms are read as UTC.
    if let Ok(naive) = NaiveDateTime::parse_from_str(text, "%Y-%m-%dT%H:%M:%S%.f") {
        return Some(truncate_to_millis(naive.and_utc()));
    }
    NaiveDate::parse_from_str(text, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
}
