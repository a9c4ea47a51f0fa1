use chrono::{DateTime, TimeZone, Utc};
use serde::{Deserialize, Deserializer};
use serde_json::Value;
use tracing::warn;

use crate::error::{AnalyzerError, Result};

// ── TimestampProcessor ────────────────────────────────────────────────────────

/// Parses the `time` field of bot log records.
///
/// The bot's structured logger writes epoch milliseconds, but hand-written
/// fixtures and older log files use RFC 3339 strings, so both are accepted.
pub struct TimestampProcessor;

impl TimestampProcessor {
    /// Attempt to parse a [`serde_json::Value`] into a UTC [`DateTime`].
    ///
    /// Handles:
    /// * `null`       → `None`
    /// * JSON number  → Unix epoch **milliseconds** (integer or float).
    /// * JSON string  → RFC 3339 (including `Z`-suffix) or a naive
    ///   `YYYY-MM-DD HH:MM:SS[.f]` interpreted as UTC.
    pub fn parse(value: &Value) -> Option<DateTime<Utc>> {
        match value {
            Value::Null => None,
            Value::String(s) => Self::parse_str(s.as_str()),
            Value::Number(n) => {
                if let Some(millis) = n.as_i64() {
                    DateTime::from_timestamp_millis(millis)
                } else if let Some(f) = n.as_f64() {
                    DateTime::from_timestamp_millis(f.round() as i64)
                } else {
                    None
                }
            }
            _ => None,
        }
    }

    /// Like [`parse`](Self::parse), but an unusable value is an error.
    pub fn parse_required(value: &Value) -> Result<DateTime<Utc>> {
        Self::parse(value).ok_or_else(|| AnalyzerError::TimestampParse(value.to_string()))
    }

    pub fn parse_str(s: &str) -> Option<DateTime<Utc>> {
        if s.is_empty() {
            return None;
        }

        if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
            return Some(dt.with_timezone(&Utc));
        }

        const FORMATS: &[&str] = &[
            "%Y-%m-%dT%H:%M:%S%.f",
            "%Y-%m-%dT%H:%M:%S",
            "%Y-%m-%d %H:%M:%S%.f",
            "%Y-%m-%d %H:%M:%S",
        ];

        for fmt in FORMATS {
            if let Ok(naive) = chrono::NaiveDateTime::parse_from_str(s, fmt) {
                return Some(Utc.from_utc_datetime(&naive));
            }
        }

        warn!(
            "TimestampProcessor: could not parse timestamp string \"{}\"",
            s
        );
        None
    }
}

/// `serde(deserialize_with)` adapter: a timestamp that cannot be parsed is a
/// decode error, which makes the whole record undecodable.
pub fn deserialize_timestamp<'de, D>(deserializer: D) -> std::result::Result<DateTime<Utc>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    TimestampProcessor::parse_required(&value).map_err(serde::de::Error::custom)
}

// ── Tests ─────────────────────────────────────────────────────────────────────
