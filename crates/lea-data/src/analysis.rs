//! Main analysis pipeline for the appointment-bot log.
//!
//! Loads the log, reconstructs sessions, buckets them at two granularities
//! and condenses the result into a serialisable [`HistorySummary`].

use std::collections::BTreeMap;
use std::path::PathBuf;

use chrono::{DateTime, Utc, Weekday};
use lea_core::error::{AnalyzerError, Result};
use lea_core::session::{CompleteSession, SessionClassifier};
use lea_core::settings::Settings;
use lea_core::stats::LatencyStats;
use lea_core::time_duration::{TimeDuration, TimeUnit, ONE_HOUR};
use lea_core::time_utils::{TimezoneHandler, WEEKDAYS};
use serde::Serialize;
use tracing::{debug, info};

use crate::bucket::SessionBucket;
use crate::builder::SessionHistoryBuilder;
use crate::history::SessionHistory;
use crate::reader::load_logs;
use crate::reconstructor::{DiscardedSession, SessionReconstructor};

// ── Public types ──────────────────────────────────────────────────────────────

/// Everything [`analyze_logs`] needs to know.
#[derive(Debug, Clone)]
pub struct AnalysisOptions {
    pub log_path: PathBuf,
    pub timezone: TimezoneHandler,
    pub bucket_size: TimeDuration,
    pub rebuild_bucket_size: TimeDuration,
    pub classifier: SessionClassifier,
    pub reconstructor: SessionReconstructor,
}

impl AnalysisOptions {
    /// Hourly and two-hourly buckets in UTC with the default markers.
    pub fn new(log_path: impl Into<PathBuf>) -> Self {
        Self {
            log_path: log_path.into(),
            timezone: TimezoneHandler::utc(),
            bucket_size: ONE_HOUR,
            rebuild_bucket_size: ONE_HOUR * 2,
            classifier: SessionClassifier::default(),
            reconstructor: SessionReconstructor::default(),
        }
    }

    /// Resolve CLI settings. Fails on an unknown timezone or unusable markers;
    /// bucket sizes are checked when the histories are built.
    pub fn from_settings(settings: &Settings) -> Result<Self> {
        Ok(Self {
            log_path: settings.resolve_log_path(),
            timezone: TimezoneHandler::from_name(&settings.timezone)?,
            bucket_size: settings.bucket_size(),
            rebuild_bucket_size: settings.rebuild_bucket_size(),
            classifier: settings.classifier(),
            reconstructor: SessionReconstructor::new(
                settings.start_marker.clone(),
                settings.end_marker.clone(),
            )?,
        })
    }
}

/// Metadata produced alongside the analysis result.
#[derive(Debug, Clone, Serialize)]
pub struct AnalysisMetadata {
    /// RFC 3339 timestamp when this result was generated.
    pub generated_at: String,
    pub log_path: PathBuf,
    pub timezone: String,
    pub records_processed: usize,
    pub sessions_built: usize,
    pub sessions_discarded: usize,
    /// End markers seen while no session was open.
    pub stray_ends: usize,
    /// Wall-clock seconds spent reading and decoding the log.
    pub load_time_seconds: f64,
    /// Wall-clock seconds spent reconstructing and bucketing.
    pub build_time_seconds: f64,
}

/// "No appointment" latency within one bucket.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BucketSummary {
    /// `[HH:MM-HH:MM]`
    pub range: String,
    pub sessions: usize,
    pub no_appointment: Option<LatencyStats>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WeekdaySummary {
    pub weekday: Weekday,
    pub sessions: usize,
    pub buckets: Vec<BucketSummary>,
}

/// Condensed, serialisable view of one [`SessionHistory`].
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HistorySummary {
    /// Bucket width, e.g. `1h`.
    pub bucket_size: String,
    pub total_sessions: usize,
    pub discarded_sessions: usize,
    pub first_session: Option<DateTime<Utc>>,
    pub last_session: Option<DateTime<Utc>>,
    /// End times of sessions that saw a bookable slot, newest first.
    pub successes: Vec<DateTime<Utc>>,
    pub error_counts: BTreeMap<String, usize>,
    /// Occurrences of errors outside the classifier's expected list.
    pub unexpected_error_counts: BTreeMap<String, usize>,
    pub weekdays: Vec<WeekdaySummary>,
}

/// One session in the "no appointment" latency series.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct LatencyPoint {
    pub hours_since_midnight: f64,
    pub duration_secs: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WeekdaySeries {
    pub weekday: Weekday,
    pub points: Vec<LatencyPoint>,
}

/// The complete output of [`analyze_logs`].
#[derive(Debug, Clone)]
pub struct AnalysisResult {
    /// History at the requested bucket size.
    pub primary: SessionHistory,
    /// The same sessions rebucketed at the coarser size.
    pub secondary: SessionHistory,
    /// Sessions dropped during reconstruction.
    pub discarded: Vec<DiscardedSession>,
    pub summary: HistorySummary,
    pub metadata: AnalysisMetadata,
}

// ── Pipeline ──────────────────────────────────────────────────────────────────

/// Run the full analysis pipeline.
///
/// 1. Load and decode the log under `options.log_path`.
/// 2. Reconstruct sessions and bucket them at `bucket_size`.
/// 3. Rebuild the history at `rebuild_bucket_size`.
/// 4. Summarise the primary history.
pub fn analyze_logs(options: &AnalysisOptions) -> Result<AnalysisResult> {
    // Fail on bucket sizes before touching the disk.
    let builder = SessionHistoryBuilder::new(options.timezone)
        .with_bucket_size(options.bucket_size)?
        .with_classifier(options.classifier.clone())
        .with_reconstructor(options.reconstructor.clone());
    crate::history::validate_bucket_size(options.rebuild_bucket_size)?;

    // ── Step 1: Load logs ─────────────────────────────────────────────────────
    let load_start = std::time::Instant::now();
    let logs = load_logs(&options.log_path)?;
    let load_time = load_start.elapsed().as_secs_f64();

    // ── Step 2: Build primary history ─────────────────────────────────────────
    let build_start = std::time::Instant::now();
    let (primary, reconstruction) = builder.build_with_report(&logs)?;

    // ── Step 3: Rebuild at the coarser size ───────────────────────────────────
    let secondary = SessionHistoryBuilder::rebuild_with_different_bucket_size(
        &primary,
        options.rebuild_bucket_size,
    )?;
    let build_time = build_start.elapsed().as_secs_f64();

    // ── Step 4: Summarise ─────────────────────────────────────────────────────
    let summary = summarize_history(&primary, reconstruction.discarded.len());

    let metadata = AnalysisMetadata {
        generated_at: Utc::now().to_rfc3339(),
        log_path: options.log_path.clone(),
        timezone: options.timezone.name().to_string(),
        records_processed: logs.len(),
        sessions_built: primary.size(),
        sessions_discarded: reconstruction.discarded.len(),
        stray_ends: reconstruction.stray_ends,
        load_time_seconds: load_time,
        build_time_seconds: build_time,
    };

    info!(
        "Analyzed {} records: {} sessions, {} discarded",
        metadata.records_processed, metadata.sessions_built, metadata.sessions_discarded
    );

    Ok(AnalysisResult {
        primary,
        secondary,
        discarded: reconstruction.discarded,
        summary,
        metadata,
    })
}

/// Condense `history` into a [`HistorySummary`].
pub fn summarize_history(history: &SessionHistory, discarded_sessions: usize) -> HistorySummary {
    let classifier = history.classifier();

    let mut successes: Vec<DateTime<Utc>> = history
        .successes()
        .into_iter()
        .map(CompleteSession::end_time)
        .collect();
    successes.reverse();

    let mut unexpected_error_counts: BTreeMap<String, usize> = BTreeMap::new();
    for session in history.sessions() {
        for err in classifier.unexpected_errors(session) {
            *unexpected_error_counts.entry(err.to_string()).or_default() += 1;
        }
    }

    let weekdays = WEEKDAYS
        .iter()
        .map(|&weekday| {
            let buckets: Vec<BucketSummary> = history
                .buckets_by_weekday(weekday)
                .iter()
                .map(|bucket| BucketSummary {
                    range: bucket.format(),
                    sessions: bucket.len(),
                    no_appointment: bucket_latency_stats(bucket, classifier),
                })
                .collect();
            WeekdaySummary {
                weekday,
                sessions: buckets.iter().map(|b| b.sessions).sum(),
                buckets,
            }
        })
        .collect();

    debug!(
        "Summarised {} sessions at {} buckets",
        history.size(),
        history.bucket_size()
    );

    HistorySummary {
        bucket_size: history.bucket_size().to_string(),
        total_sessions: history.size(),
        discarded_sessions,
        first_session: history.earliest_session().map(CompleteSession::start_time),
        last_session: history.latest_session().map(CompleteSession::start_time),
        successes,
        error_counts: history.error_counts(|_| true),
        unexpected_error_counts,
        weekdays,
    }
}

/// Durations of the bucket's plain "no appointment" sessions, stalled
/// sessions excluded. `None` when there are none.
pub fn bucket_latency_stats(
    bucket: &SessionBucket,
    classifier: &SessionClassifier,
) -> Option<LatencyStats> {
    let durations: Vec<TimeDuration> = bucket
        .sessions()
        .iter()
        .filter(|s| classifier.found_no_appointment(s, true))
        .map(CompleteSession::duration)
        .collect();
    LatencyStats::from_durations(&durations)
}

/// Per weekday, the start time of day and duration of every plain
/// "no appointment" session, stalled sessions excluded.
pub fn no_appointment_latency_series(history: &SessionHistory) -> Vec<WeekdaySeries> {
    let classifier = history.classifier();
    let tz = history.timezone();

    WEEKDAYS
        .iter()
        .map(|&weekday| WeekdaySeries {
            weekday,
            points: history
                .sessions_by_weekday_matching(weekday, |s| classifier.found_no_appointment(s, true))
                .into_iter()
                .map(|s| LatencyPoint {
                    hours_since_midnight: tz
                        .time_since_midnight(s.start_time())
                        .amount_in(TimeUnit::Hours),
                    duration_secs: s.duration().amount_in(TimeUnit::Seconds),
                })
                .collect(),
        })
        .collect()
}

/// Guard for consumers that need a minimum sample size.
pub fn ensure_enough_data(history: &SessionHistory, required: usize) -> Result<()> {
    let found = history.size();
    if found < required {
        return Err(AnalyzerError::NotEnoughData { required, found });
    }
    Ok(())
}

// ── Tests ─────────────────────────────────────────────────────────────────────
