use std::path::PathBuf;
use thiserror::Error;

/// All errors produced while analysing appointment-bot logs.
#[derive(Error, Debug)]
pub enum AnalyzerError {
    /// A log line could not be decoded. Aborts the whole ingest pass.
    #[error("Failed to decode log record at {path}:{line}: {source}")]
    Ingest {
        path: PathBuf,
        line: usize,
        #[source]
        source: serde_json::Error,
    },

    /// A configuration value is unusable (e.g. a bucket size that does not
    /// divide 24 hours).
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// An operation was called on a session in the wrong lifecycle state.
    #[error("Invalid session state: {0}")]
    InvalidState(String),

    /// A consumer asked for statistics over too few sessions.
    #[error("Not enough data: {found} session(s) available, {required} required")]
    NotEnoughData { required: usize, found: usize },

    /// A timestamp string did not match any recognised format.
    #[error("Invalid timestamp format: {0}")]
    TimestampParse(String),

    /// A file could not be opened or read from disk.
    #[error("Failed to read file {path}: {source}")]
    FileRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The log path given to the reader does not exist.
    #[error("Log path not found: {0}")]
    DataPathNotFound(PathBuf),
}

/// Convenience alias used throughout the analyzer crates.
pub type Result<T> = std::result::Result<T, AnalyzerError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display_ingest() {
        let json_err = serde_json::from_str::<serde_json::Value>("{oops}").unwrap_err();
        let err = AnalyzerError::Ingest {
            path: PathBuf::from("/logs/bot.log"),
            line: 7,
            source: json_err,
        };
        let msg = err.to_string();
        assert!(msg.starts_with("Failed to decode log record at /logs/bot.log:7"));
    }

    #[test]
    fn test_error_display_configuration() {
        let err = AnalyzerError::Configuration("bucket size 7h does not divide 24h".to_string());
        assert_eq!(
            err.to_string(),
            "Configuration error: bucket size 7h does not divide 24h"
        );
    }

    #[test]
    fn test_error_display_invalid_state() {
        let err = AnalyzerError::InvalidState("session 3 is not closed".to_string());
        assert_eq!(err.to_string(), "Invalid session state: session 3 is not closed");
    }

    #[test]
    fn test_error_display_not_enough_data() {
        let err = AnalyzerError::NotEnoughData {
            required: 2,
            found: 1,
        };
        assert_eq!(
            err.to_string(),
            "Not enough data: 1 session(s) available, 2 required"
        );
    }

    #[test]
    fn test_error_display_data_path_not_found() {
        let err = AnalyzerError::DataPathNotFound(PathBuf::from("/missing/logs"));
        assert_eq!(err.to_string(), "Log path not found: /missing/logs");
    }

    #[test]
    fn test_error_display_timestamp_parse() {
        let err = AnalyzerError::TimestampParse("\"yesterday\"".to_string());
        assert_eq!(err.to_string(), "Invalid timestamp format: \"yesterday\"");
    }
}
