//! Per-weekday, per-time-of-day view over reconstructed sessions.
//!
//! A [`SessionHistory`] is built once by
//! [`SessionHistoryBuilder`](crate::builder::SessionHistoryBuilder) and then
//! only read. Every weekday always has the full set of buckets, even when no
//! session fell on that day.

use std::collections::{BTreeMap, BTreeSet};

use chrono::Weekday;
use lea_core::error::{AnalyzerError, Result};
use lea_core::session::{CompleteSession, SessionClassifier, SessionId};
use lea_core::time_duration::{TimeDuration, ONE_DAY};
use lea_core::time_utils::{weekday_index, TimezoneHandler, WEEKDAYS};
use tracing::{trace, warn};

use crate::bucket::SessionBucket;

/// Sessions partitioned by local weekday and time-of-day bucket.
#[derive(Debug, Clone)]
pub struct SessionHistory {
    /// Indexed by [`weekday_index`], Monday first.
    buckets: [Vec<SessionBucket>; 7],
    bucket_size: TimeDuration,
    timezone: TimezoneHandler,
    classifier: SessionClassifier,
    /// Every distinct error identifier across all sessions.
    error_universe: BTreeSet<String>,
}

impl SessionHistory {
    /// An empty history whose buckets tile each day in steps of `bucket_size`.
    ///
    /// Fails before creating anything when `bucket_size` does not divide 24h.
    pub(crate) fn new(
        bucket_size: TimeDuration,
        timezone: TimezoneHandler,
        classifier: SessionClassifier,
    ) -> Result<Self> {
        validate_bucket_size(bucket_size)?;

        let count = ONE_DAY / bucket_size;
        let day: Vec<SessionBucket> = (0..count)
            .map(|k| SessionBucket::new(bucket_size * k, bucket_size * (k + 1)))
            .collect();

        Ok(Self {
            buckets: std::array::from_fn(|_| day.clone()),
            bucket_size,
            timezone,
            classifier,
            error_universe: BTreeSet::new(),
        })
    }

    /// File `session` under its local weekday and start-time bucket.
    pub(crate) fn add_session(&mut self, session: CompleteSession) {
        let start = session.start_time();
        let weekday = self.timezone.weekday(start);
        let since_midnight = self.timezone.time_since_midnight(start);

        let buckets = &mut self.buckets[weekday_index(weekday)];
        let Some(bucket) = buckets.iter_mut().find(|b| b.contains(since_midnight)) else {
            warn!(
                "No bucket for session {} at {} on {}",
                session.id(),
                since_midnight.format_clock(),
                weekday
            );
            return;
        };

        trace!("Adding session {} to bucket {} ({})", session.id(), bucket.format(), weekday);
        self.error_universe
            .extend(session.errors().iter().cloned());
        bucket.add(session);
    }

    // ── Metadata ──────────────────────────────────────────────────────────────

    pub fn bucket_size(&self) -> TimeDuration {
        self.bucket_size
    }

    pub fn timezone(&self) -> TimezoneHandler {
        self.timezone
    }

    pub fn classifier(&self) -> &SessionClassifier {
        &self.classifier
    }

    /// Total number of sessions.
    pub fn size(&self) -> usize {
        self.buckets
            .iter()
            .flatten()
            .map(SessionBucket::len)
            .sum()
    }

    pub fn is_empty(&self) -> bool {
        self.size() == 0
    }

    // ── Sessions ──────────────────────────────────────────────────────────────

    pub fn buckets_by_weekday(&self, weekday: Weekday) -> &[SessionBucket] {
        &self.buckets[weekday_index(weekday)]
    }

    /// All sessions, ascending by start time.
    pub fn sessions(&self) -> Vec<&CompleteSession> {
        self.sessions_matching(|_| true)
    }

    /// Sessions accepted by `filter`, ascending by start time.
    pub fn sessions_matching(&self, filter: impl Fn(&CompleteSession) -> bool) -> Vec<&CompleteSession> {
        let mut sessions: Vec<&CompleteSession> = self
            .buckets
            .iter()
            .flatten()
            .flat_map(|b| b.sessions().iter())
            .filter(|s| filter(s))
            .collect();
        sessions.sort();
        sessions
    }

    /// Sessions that started on `weekday`, ascending by start time.
    pub fn sessions_by_weekday(&self, weekday: Weekday) -> Vec<&CompleteSession> {
        self.sessions_by_weekday_matching(weekday, |_| true)
    }

    pub fn sessions_by_weekday_matching(
        &self,
        weekday: Weekday,
        filter: impl Fn(&CompleteSession) -> bool,
    ) -> Vec<&CompleteSession> {
        let mut sessions: Vec<&CompleteSession> = self
            .buckets_by_weekday(weekday)
            .iter()
            .flat_map(|b| b.sessions().iter())
            .filter(|s| filter(s))
            .collect();
        sessions.sort();
        sessions
    }

    pub fn session_by_id(&self, id: SessionId) -> Option<&CompleteSession> {
        self.buckets
            .iter()
            .flatten()
            .flat_map(|b| b.sessions().iter())
            .find(|s| s.id() == id)
    }

    pub fn earliest_session(&self) -> Option<&CompleteSession> {
        self.sessions().first().copied()
    }

    pub fn latest_session(&self) -> Option<&CompleteSession> {
        self.sessions().last().copied()
    }

    /// Sessions in which an appointment seemed to be available.
    pub fn successes(&self) -> Vec<&CompleteSession> {
        self.sessions_matching(|s| self.classifier.found_appointment(s))
    }

    // ── Errors ────────────────────────────────────────────────────────────────

    /// Every recorded error, session by session in start order.
    pub fn errors(&self) -> Vec<&str> {
        flatten_errors(self.sessions())
    }

    pub fn errors_by_weekday(&self, weekday: Weekday) -> Vec<&str> {
        flatten_errors(self.sessions_by_weekday(weekday))
    }

    /// Occurrences of each error across the sessions accepted by `filter`.
    ///
    /// The key set is always every error seen anywhere in the history, with
    /// zero for errors that none of the filtered sessions recorded, so
    /// consumers get the same labels whatever the filter.
    pub fn error_counts(&self, filter: impl Fn(&CompleteSession) -> bool) -> BTreeMap<String, usize> {
        let mut counts: BTreeMap<String, usize> = self
            .error_universe
            .iter()
            .map(|err| (err.clone(), 0))
            .collect();

        for err in self
            .sessions_matching(filter)
            .into_iter()
            .flat_map(|s| s.errors().iter())
        {
            *counts.entry(err.clone()).or_default() += 1;
        }
        counts
    }

    /// Per-weekday session counts, Monday first.
    pub fn weekday_sizes(&self) -> [(Weekday, usize); 7] {
        WEEKDAYS.map(|weekday| {
            let count = self
                .buckets_by_weekday(weekday)
                .iter()
                .map(SessionBucket::len)
                .sum();
            (weekday, count)
        })
    }
}

fn flatten_errors(sessions: Vec<&CompleteSession>) -> Vec<&str> {
    sessions
        .into_iter()
        .flat_map(|s| s.errors().iter().map(String::as_str))
        .collect()
}

/// A bucket size is usable when it is positive and tiles a day exactly.
pub fn validate_bucket_size(bucket_size: TimeDuration) -> Result<()> {
    if bucket_size.divides(ONE_DAY) {
        Ok(())
    } else {
        Err(AnalyzerError::Configuration(format!(
            "bucket size {bucket_size} does not evenly divide 24h"
        )))
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
