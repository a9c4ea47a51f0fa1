//! Session reconstruction for the appointment-bot log.
//!
//! Replays an ordered [`Log`] sequence once and pairs start/end marker
//! records into [`CompleteSession`]s. Anything that does not pair up cleanly
//! is dropped and reported as a [`DiscardedSession`], never as an error.

use chrono::{DateTime, Utc};
use lea_core::error::{AnalyzerError, Result};
use lea_core::models::Log;
use lea_core::session::{CompleteSession, Session, SessionId, SESSION_END_MARKER, SESSION_START_MARKER};
use tracing::debug;

// ── Diagnostics ───────────────────────────────────────────────────────────────

/// Why an in-flight session was dropped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DiscardReason {
    /// Another start marker arrived before this session's end marker.
    Superseded,
    /// The log ended while the session was still open.
    Unterminated,
    /// The end marker carried a timestamp earlier than the start marker.
    EndsBeforeStart,
}

/// A session that was started but never made it to [`CompleteSession`].
#[derive(Debug, Clone, PartialEq)]
pub struct DiscardedSession {
    pub id: SessionId,
    pub start_time: DateTime<Utc>,
    /// Number of log records that had been attributed to it.
    pub log_count: usize,
    pub reason: DiscardReason,
}

/// Output of one reconstruction pass.
#[derive(Debug, Clone, Default)]
pub struct Reconstruction {
    /// Closed sessions, in the order they were closed (ascending start).
    pub sessions: Vec<CompleteSession>,
    pub discarded: Vec<DiscardedSession>,
    /// End markers seen while no session was open.
    pub stray_ends: usize,
}

// ── SessionReconstructor ──────────────────────────────────────────────────────

/// Single-pass state machine turning a log into sessions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionReconstructor {
    start_marker: String,
    end_marker: String,
}

impl Default for SessionReconstructor {
    fn default() -> Self {
        Self {
            start_marker: SESSION_START_MARKER.to_string(),
            end_marker: SESSION_END_MARKER.to_string(),
        }
    }
}

impl SessionReconstructor {
    /// A reconstructor matching the given marker texts.
    ///
    /// Markers are matched as substrings of the log message, so they must be
    /// non-empty and distinct.
    pub fn new(start_marker: impl Into<String>, end_marker: impl Into<String>) -> Result<Self> {
        let start_marker = start_marker.into();
        let end_marker = end_marker.into();

        if start_marker.is_empty() || end_marker.is_empty() {
            return Err(AnalyzerError::Configuration(
                "session markers must not be empty".to_string(),
            ));
        }
        if start_marker == end_marker {
            return Err(AnalyzerError::Configuration(format!(
                "start and end marker are both \"{start_marker}\""
            )));
        }

        Ok(Self {
            start_marker,
            end_marker,
        })
    }

    pub fn start_marker(&self) -> &str {
        &self.start_marker
    }

    pub fn end_marker(&self) -> &str {
        &self.end_marker
    }

    /// Pair start/end markers in `logs` into sessions.
    ///
    /// The algorithm:
    /// 1. A start marker drops whatever session is still open and opens a new
    ///    one at the marker's timestamp.
    /// 2. While a session is open, every other record is attributed to it and
    ///    its error (if any) is recorded.
    /// 3. An end marker closes the open session. Without an open session it
    ///    is a no-op.
    /// 4. A session still open when the log runs out is dropped.
    ///
    /// Marker records themselves are not attributed to the session.
    pub fn reconstruct(&self, logs: &[Log]) -> Result<Reconstruction> {
        let mut output = Reconstruction::default();
        let mut next_id: u64 = 0;
        let mut current: Option<Session> = None;

        for log in logs {
            if self.is_start(log) {
                if let Some(open) = current.take() {
                    Self::discard(&mut output, open, DiscardReason::Superseded);
                }
                next_id += 1;
                current = Some(Session::open(SessionId::new(next_id), log.timestamp));
                continue;
            }

            if self.is_end(log) {
                let Some(mut session) = current.take() else {
                    debug!("Ignoring end marker at {} without an open session", log.timestamp);
                    output.stray_ends += 1;
                    continue;
                };

                if session.start_time().is_some_and(|start| log.timestamp < start) {
                    Self::discard(&mut output, session, DiscardReason::EndsBeforeStart);
                    continue;
                }

                session.end(log.timestamp)?;
                output.sessions.push(session.into_complete()?);
                continue;
            }

            if let Some(session) = current.as_mut() {
                session.push_log(log.clone())?;
            }
        }

        if let Some(open) = current.take() {
            Self::discard(&mut output, open, DiscardReason::Unterminated);
        }

        debug!(
            "SessionReconstructor: created {} sessions from {} logs ({} discarded, {} stray ends)",
            output.sessions.len(),
            logs.len(),
            output.discarded.len(),
            output.stray_ends
        );
        Ok(output)
    }

    fn is_start(&self, log: &Log) -> bool {
        log.message.contains(&self.start_marker)
    }

    fn is_end(&self, log: &Log) -> bool {
        log.message.contains(&self.end_marker)
    }

    fn discard(output: &mut Reconstruction, session: Session, reason: DiscardReason) {
        let Some(start_time) = session.start_time() else {
            return;
        };
        debug!(
            "Ignoring incomplete session {} started at {} ({:?})",
            session.id(),
            start_time,
            reason
        );
        output.discarded.push(DiscardedSession {
            id: session.id(),
            start_time,
            log_count: session.logs().len(),
            reason,
        });
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeDelta, TimeZone};
    use lea_core::time_duration::{TimeDuration, TimeUnit};

    fn at(secs: i64) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, 15, 0, 0, 0).unwrap() + TimeDelta::seconds(secs)
    }

    fn log(secs: i64, msg: &str) -> Log {
        Log::new(at(secs), msg)
    }

    fn start(secs: i64) -> Log {
        log(secs, SESSION_START_MARKER)
    }

    fn end(secs: i64) -> Log {
        log(secs, SESSION_END_MARKER)
    }

    fn reconstruct(logs: &[Log]) -> Reconstruction {
        SessionReconstructor::default().reconstruct(logs).unwrap()
    }

    #[test]
    fn test_empty_logs_yield_no_sessions() {
        let out = reconstruct(&[]);
        assert!(out.sessions.is_empty());
        assert!(out.discarded.is_empty());
        assert_eq!(out.stray_ends, 0);
    }

    #[test]
    fn test_single_session_with_error() {
        let logs = vec![
            start(0),
            log(5, "CHECK").with_error("NoAppointmentsError"),
            end(6),
        ];
        let out = reconstruct(&logs);

        assert_eq!(out.sessions.len(), 1);
        let session = &out.sessions[0];
        assert_eq!(session.start_time(), at(0));
        assert_eq!(session.end_time(), at(6));
        assert_eq!(session.duration(), TimeDuration::new(6, TimeUnit::Seconds));
        assert_eq!(session.logs().len(), 1);
        assert_eq!(session.errors(), ["NoAppointmentsError"]);
    }

    #[test]
    fn test_nested_start_discards_earlier_session() {
        let logs = vec![start(0), log(1, "A"), start(2), log(3, "B"), end(4)];
        let out = reconstruct(&logs);

        assert_eq!(out.sessions.len(), 1);
        assert_eq!(out.sessions[0].start_time(), at(2));
        assert_eq!(out.sessions[0].end_time(), at(4));
        assert_eq!(out.sessions[0].logs()[0].message, "B");

        assert_eq!(out.discarded.len(), 1);
        assert_eq!(out.discarded[0].reason, DiscardReason::Superseded);
        assert_eq!(out.discarded[0].start_time, at(0));
        assert_eq!(out.discarded[0].log_count, 1);
    }

    #[test]
    fn test_duplicate_end_is_noop() {
        let logs = vec![start(0), end(1), log(2, "between").with_error("X"), end(3)];
        let out = reconstruct(&logs);

        assert_eq!(out.sessions.len(), 1);
        assert_eq!(out.sessions[0].end_time(), at(1));
        assert!(out.sessions[0].errors().is_empty());
        assert_eq!(out.stray_ends, 1);
        assert!(out.discarded.is_empty());
    }

    #[test]
    fn test_end_before_any_start_is_noop() {
        let logs = vec![end(0), start(1), end(2)];
        let out = reconstruct(&logs);
        assert_eq!(out.sessions.len(), 1);
        assert_eq!(out.stray_ends, 1);
    }

    #[test]
    fn test_unterminated_tail_discarded() {
        let logs = vec![start(0), end(1), start(2), log(3, "hanging")];
        let out = reconstruct(&logs);

        assert_eq!(out.sessions.len(), 1);
        assert_eq!(out.discarded.len(), 1);
        assert_eq!(out.discarded[0].reason, DiscardReason::Unterminated);
    }

    #[test]
    fn test_logs_outside_sessions_ignored() {
        let logs = vec![
            log(0, "boot").with_error("TimeoutError"),
            start(1),
            end(2),
            log(3, "idle").with_error("TimeoutError"),
        ];
        let out = reconstruct(&logs);
        assert_eq!(out.sessions.len(), 1);
        assert!(out.sessions[0].logs().is_empty());
        assert!(out.sessions[0].errors().is_empty());
    }

    #[test]
    fn test_start_then_end_gives_empty_session() {
        let out = reconstruct(&[start(0), end(0)]);
        assert_eq!(out.sessions.len(), 1);
        assert!(out.sessions[0].logs().is_empty());
        assert_eq!(out.sessions[0].duration(), TimeDuration::ZERO);
    }

    #[test]
    fn test_errors_keep_order_and_duplicates() {
        let logs = vec![
            start(0),
            log(1, "a").with_error("TimeoutError"),
            log(2, "b"),
            log(3, "c").with_error("InternalServerError"),
            log(4, "d").with_error("TimeoutError"),
            end(5),
        ];
        let out = reconstruct(&logs);
        assert_eq!(
            out.sessions[0].errors(),
            ["TimeoutError", "InternalServerError", "TimeoutError"]
        );
        assert_eq!(out.sessions[0].logs().len(), 4);
    }

    #[test]
    fn test_ids_are_unique_and_sessions_ordered() {
        let logs = vec![start(0), end(1), start(2), end(3), start(4), end(5)];
        let out = reconstruct(&logs);

        let ids: Vec<u64> = out.sessions.iter().map(|s| s.id().get()).collect();
        assert_eq!(ids, vec![1, 2, 3]);
        assert!(out.sessions.windows(2).all(|w| w[0] < w[1]));
    }

    #[test]
    fn test_count_matches_well_formed_pairs() {
        // START START END | END | START END | START
        let logs = vec![
            start(0),
            start(1),
            end(2),
            end(3),
            start(4),
            end(5),
            start(6),
        ];
        let out = reconstruct(&logs);
        assert_eq!(out.sessions.len(), 2);
        assert_eq!(out.discarded.len(), 2);
        assert_eq!(out.stray_ends, 1);
    }

    #[test]
    fn test_end_before_start_discarded() {
        let out = reconstruct(&[start(10), end(5)]);
        assert!(out.sessions.is_empty());
        assert_eq!(out.discarded[0].reason, DiscardReason::EndsBeforeStart);
    }

    #[test]
    fn test_markers_match_as_substrings() {
        let logs = vec![
            log(0, "[bot] SESSION_START (attempt 3)"),
            log(1, "CHECK"),
            log(2, "[bot] SESSION_END"),
        ];
        let out = reconstruct(&logs);
        assert_eq!(out.sessions.len(), 1);
        assert_eq!(out.sessions[0].logs().len(), 1);
    }

    #[test]
    fn test_custom_markers() {
        let reconstructor = SessionReconstructor::new("BEGIN", "DONE").unwrap();
        let logs = vec![log(0, "BEGIN"), log(1, SESSION_END_MARKER), log(2, "DONE")];
        let out = reconstructor.reconstruct(&logs).unwrap();
        assert_eq!(out.sessions.len(), 1);
        assert_eq!(out.sessions[0].logs()[0].message, SESSION_END_MARKER);
    }

    #[test]
    fn test_invalid_markers_rejected() {
        assert!(matches!(
            SessionReconstructor::new("", "END"),
            Err(AnalyzerError::Configuration(_))
        ));
        assert!(matches!(
            SessionReconstructor::new("X", "X"),
            Err(AnalyzerError::Configuration(_))
        ));
    }
}
