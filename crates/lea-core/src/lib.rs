//! Domain types for the appointment-bot log analyzer.
//!
//! Durations, log records, sessions and their classification, the local
//! calendar projection, settings and the shared error type. Nothing in here
//! touches the filesystem.

pub mod error;
pub mod models;
pub mod session;
pub mod settings;
pub mod stats;
pub mod time_duration;
pub mod time_utils;
pub mod timestamp;

pub use error::{AnalyzerError, Result};
pub use models::{Log, Severity};
pub use session::{CompleteSession, Session, SessionClassifier, SessionId, SessionState};
pub use time_duration::{TimeDuration, TimeUnit};
pub use time_utils::{TimezoneHandler, WEEKDAYS};
