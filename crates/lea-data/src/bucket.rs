use std::collections::BTreeMap;

use lea_core::session::CompleteSession;
use lea_core::time_duration::TimeDuration;

/// Sessions whose local start time falls in the half-open interval
/// `[start, end)` after midnight.
#[derive(Debug, Clone)]
pub struct SessionBucket {
    start: TimeDuration,
    end: TimeDuration,
    sessions: Vec<CompleteSession>,
}

impl SessionBucket {
    pub(crate) fn new(start: TimeDuration, end: TimeDuration) -> Self {
        Self {
            start,
            end,
            sessions: Vec::new(),
        }
    }

    pub fn start_time(&self) -> TimeDuration {
        self.start
    }

    pub fn end_time(&self) -> TimeDuration {
        self.end
    }

    /// Sessions in ascending start order.
    pub fn sessions(&self) -> &[CompleteSession] {
        &self.sessions
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }

    /// Whether a time-of-day offset belongs in this bucket.
    pub fn contains(&self, since_midnight: TimeDuration) -> bool {
        self.start <= since_midnight && since_midnight < self.end
    }

    /// Insert keeping ascending start order. Sessions mostly arrive in
    /// order, so the common case is a push.
    pub(crate) fn add(&mut self, session: CompleteSession) {
        if self.sessions.last().map(|s| s <= &session).unwrap_or(true) {
            self.sessions.push(session);
        } else {
            let idx = self.sessions.partition_point(|s| s <= &session);
            self.sessions.insert(idx, session);
        }
    }

    /// Occurrences of each error accepted by `error_filter`, across all
    /// sessions in this bucket.
    pub fn error_counts(&self, error_filter: impl Fn(&str) -> bool) -> BTreeMap<String, usize> {
        let mut counts: BTreeMap<String, usize> = BTreeMap::new();
        for err in self
            .sessions
            .iter()
            .flat_map(|s| s.errors().iter())
            .filter(|err| error_filter(err))
        {
            *counts.entry(err.clone()).or_default() += 1;
        }
        counts
    }

    /// `[HH:MM-HH:MM]`
    pub fn format(&self) -> String {
        format!("[{}-{}]", self.start.format_clock(), self.end.format_clock())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{DateTime, TimeDelta, TimeZone, Utc};
    use lea_core::models::Log;
    use lea_core::session::{Session, SessionId};
    use lea_core::time_duration::{TimeUnit, ONE_HOUR};

    fn at(secs: i64) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, 15, 0, 0, 0).unwrap() + TimeDelta::seconds(secs)
    }

    fn session(id: u64, start: i64, errors: &[&str]) -> CompleteSession {
        let mut s = Session::open(SessionId::new(id), at(start));
        for err in errors {
            s.push_log(Log::new(at(start), "CHECK").with_error(*err)).unwrap();
        }
        s.end(at(start + 1)).unwrap();
        s.into_complete().unwrap()
    }

    #[test]
    fn test_contains_is_half_open() {
        let bucket = SessionBucket::new(ONE_HOUR, ONE_HOUR * 2);
        assert!(!bucket.contains(ONE_HOUR - TimeDuration::from_millis(1)));
        assert!(bucket.contains(ONE_HOUR));
        assert!(bucket.contains(ONE_HOUR * 2 - TimeDuration::from_millis(1)));
        assert!(!bucket.contains(ONE_HOUR * 2));
    }

    #[test]
    fn test_add_keeps_start_order() {
        let mut bucket = SessionBucket::new(TimeDuration::ZERO, ONE_HOUR);
        bucket.add(session(3, 30, &[]));
        bucket.add(session(1, 10, &[]));
        bucket.add(session(2, 20, &[]));

        let ids: Vec<u64> = bucket.sessions().iter().map(|s| s.id().get()).collect();
        assert_eq!(ids, vec![1, 2, 3]);
        assert_eq!(bucket.len(), 3);
    }

    #[test]
    fn test_add_in_order_and_equal_starts() {
        let mut bucket = SessionBucket::new(TimeDuration::ZERO, ONE_HOUR);
        bucket.add(session(1, 10, &[]));
        bucket.add(session(2, 20, &[]));
        bucket.add(session(4, 20, &[]));
        bucket.add(session(3, 20, &[]));

        let ids: Vec<u64> = bucket.sessions().iter().map(|s| s.id().get()).collect();
        assert_eq!(ids, vec![1, 2, 3, 4]);
    }

    #[test]
    fn test_error_counts_with_filter() {
        let mut bucket = SessionBucket::new(TimeDuration::ZERO, ONE_HOUR);
        bucket.add(session(1, 0, &["NoAppointmentsError"]));
        bucket.add(session(2, 5, &["TimeoutError", "TimeoutError"]));

        let all = bucket.error_counts(|_| true);
        assert_eq!(all.get("NoAppointmentsError"), Some(&1));
        assert_eq!(all.get("TimeoutError"), Some(&2));

        let only_timeouts = bucket.error_counts(|e| e == "TimeoutError");
        assert_eq!(only_timeouts.len(), 1);
        assert_eq!(only_timeouts.get("TimeoutError"), Some(&2));
    }

    #[test]
    fn test_format() {
        let bucket = SessionBucket::new(
            TimeDuration::new(90, TimeUnit::Minutes),
            TimeDuration::new(24, TimeUnit::Hours),
        );
        assert_eq!(bucket.format(), "[01:30-24:00]");
        assert!(bucket.is_empty());
    }
}
