use clap::Parser;
use std::path::PathBuf;

use crate::session::{
    SessionClassifier, SESSION_END_MARKER, SESSION_START_MARKER, SUCCESS_MARKER,
};
use crate::time_duration::{TimeDuration, TimeUnit};

// ── Settings (CLI) ─────────────────────────────────────────────────────────────

/// Rebuild appointment-bot sessions from its log and compare them by weekday
/// and time of day
#[derive(Parser, Debug, Clone)]
#[command(
    name = "lea-analyzer",
    about = "Rebuild appointment-bot sessions from its log and compare them by weekday and time of day",
    version
)]
pub struct Settings {
    /// Log file, or directory of `*.log` / `*.jsonl` files (default: ~/.lea-bot/logs)
    #[arg(long)]
    pub log_path: Option<PathBuf>,

    /// IANA timezone the bot ran in (auto-detected if not specified)
    #[arg(long, default_value = "auto")]
    pub timezone: String,

    /// Width of the time-of-day buckets, in minutes; must divide 24 hours
    #[arg(long, default_value = "60", value_parser = clap::value_parser!(u32).range(1..=1440))]
    pub bucket_minutes: u32,

    /// Width of the coarser buckets the history is rebuilt with, in minutes
    #[arg(long, default_value = "120", value_parser = clap::value_parser!(u32).range(1..=1440))]
    pub rebuild_bucket_minutes: u32,

    /// Sessions lasting at least this many minutes count as stalled
    #[arg(long, default_value = "5", value_parser = clap::value_parser!(u32).range(1..))]
    pub lengthy_session_minutes: u32,

    /// Log message that opens a session
    #[arg(long, default_value = SESSION_START_MARKER)]
    pub start_marker: String,

    /// Log message that closes a session
    #[arg(long, default_value = SESSION_END_MARKER)]
    pub end_marker: String,

    /// Log message that signals a bookable appointment
    #[arg(long, default_value = SUCCESS_MARKER)]
    pub success_marker: String,

    /// Print the summary as JSON on stdout
    #[arg(long)]
    pub json: bool,

    /// Logging level
    #[arg(long, default_value = "INFO", value_parser = ["TRACE", "DEBUG", "INFO", "WARNING", "ERROR"])]
    pub log_level: String,

    /// Enable debug logging
    #[arg(long)]
    pub debug: bool,
}

// ── Settings impl ──────────────────────────────────────────────────────────────

impl Settings {
    /// Parse the process arguments and apply the `--debug` override.
    pub fn load() -> Self {
        Self::load_from_args(std::env::args_os())
    }

    /// Same as [`Settings::load`] but with an explicit argument list.
    pub fn load_from_args<I, T>(args: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Into<std::ffi::OsString> + Clone,
    {
        let mut settings = Settings::parse_from(args);
        if settings.debug {
            settings.log_level = "DEBUG".to_string();
        }
        settings
    }

    /// The explicit `--log-path`, or `~/.lea-bot/logs`.
    pub fn resolve_log_path(&self) -> PathBuf {
        if let Some(path) = &self.log_path {
            return path.clone();
        }
        let home = dirs::home_dir().unwrap_or_else(|| PathBuf::from("."));
        default_log_dir(&home)
    }

    pub fn bucket_size(&self) -> TimeDuration {
        TimeDuration::new(i64::from(self.bucket_minutes), TimeUnit::Minutes)
    }

    pub fn rebuild_bucket_size(&self) -> TimeDuration {
        TimeDuration::new(i64::from(self.rebuild_bucket_minutes), TimeUnit::Minutes)
    }

    pub fn classifier(&self) -> SessionClassifier {
        SessionClassifier {
            success_message: self.success_marker.clone(),
            lengthy_session_threshold: TimeDuration::new(
                i64::from(self.lengthy_session_minutes),
                TimeUnit::Minutes,
            ),
            ..SessionClassifier::default()
        }
    }
}

/// Where the bot writes its logs, relative to `home`.
pub fn default_log_dir(home: &std::path::Path) -> PathBuf {
    home.join(".lea-bot").join("logs")
}

// ── Tests ──────────────────────────────────────────────────────────────────────
