use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::timestamp::deserialize_timestamp;

/// Severity of a bot log record, as written by its structured logger.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(from = "u64", into = "u64")]
pub enum Severity {
    Trace,
    Debug,
    Info,
    Warn,
    Error,
    Fatal,
    /// A numeric level outside the standard ladder.
    Other(u64),
}

impl From<u64> for Severity {
    fn from(level: u64) -> Self {
        match level {
            10 => Self::Trace,
            20 => Self::Debug,
            30 => Self::Info,
            40 => Self::Warn,
            50 => Self::Error,
            60 => Self::Fatal,
            other => Self::Other(other),
        }
    }
}

impl From<Severity> for u64 {
    fn from(severity: Severity) -> Self {
        match severity {
            Severity::Trace => 10,
            Severity::Debug => 20,
            Severity::Info => 30,
            Severity::Warn => 40,
            Severity::Error => 50,
            Severity::Fatal => 60,
            Severity::Other(n) => n,
        }
    }
}

/// One line of the bot's newline-delimited JSON log.
///
/// Extra fields written by the logger (`pid`, `hostname`, ...) are ignored.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Log {
    /// When the record was emitted (UTC).
    #[serde(rename = "time", deserialize_with = "deserialize_timestamp")]
    pub timestamp: DateTime<Utc>,
    /// Free-text message; session markers are matched against it.
    #[serde(rename = "msg")]
    pub message: String,
    /// Name of the error the bot ran into, if any.
    #[serde(rename = "err", default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub level: Option<Severity>,
}

impl Log {
    pub fn new(timestamp: DateTime<Utc>, message: impl Into<String>) -> Self {
        Self {
            timestamp,
            message: message.into(),
            error: None,
            level: None,
        }
    }

    pub fn with_error(mut self, error: impl Into<String>) -> Self {
        self.error = Some(error.into());
        self
    }

    pub fn with_level(mut self, level: Severity) -> Self {
        self.level = Some(level);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_log_decodes_logger_line() {
        let line = r#"{"level":50,"time":1705312800000,"pid":42,"hostname":"bot","msg":"CHECK","err":"NoAppointmentsError"}"#;
        let log: Log = serde_json::from_str(line).unwrap();

        assert_eq!(
            log.timestamp,
            Utc.with_ymd_and_hms(2024, 1, 15, 10, 0, 0).unwrap()
        );
        assert_eq!(log.message, "CHECK");
        assert_eq!(log.error.as_deref(), Some("NoAppointmentsError"));
        assert_eq!(log.level, Some(Severity::Error));
    }

    #[test]
    fn test_log_optional_fields_default_to_none() {
        let log: Log =
            serde_json::from_str(r#"{"time":"2024-01-15T10:00:00Z","msg":"SESSION_START"}"#)
                .unwrap();
        assert!(log.error.is_none());
        assert!(log.level.is_none());
    }

    #[test]
    fn test_log_missing_message_is_rejected() {
        let result = serde_json::from_str::<Log>(r#"{"time":1705312800000}"#);
        assert!(result.is_err());
    }

    #[test]
    fn test_log_bad_time_is_rejected() {
        let result = serde_json::from_str::<Log>(r#"{"time":"later","msg":"x"}"#);
        assert!(result.is_err());
    }

    #[test]
    fn test_severity_mapping() {
        assert_eq!(Severity::from(30), Severity::Info);
        assert_eq!(Severity::from(35), Severity::Other(35));
        assert_eq!(u64::from(Severity::Warn), 40);
    }

    #[test]
    fn test_log_builder() {
        let ts = Utc.with_ymd_and_hms(2024, 1, 15, 10, 0, 0).unwrap();
        let log = Log::new(ts, "CHECK")
            .with_error("TimeoutError")
            .with_level(Severity::Warn);
        assert_eq!(log.error.as_deref(), Some("TimeoutError"));
        assert_eq!(log.level, Some(Severity::Warn));
    }
}
