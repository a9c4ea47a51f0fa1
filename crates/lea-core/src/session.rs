//! Bot sessions: one walk through the booking UI, from the start marker to the
//! end marker.
//!
//! A [`Session`] is the mutable accumulator used while replaying the log; it
//! becomes an immutable [`CompleteSession`] once both ends are known. The
//! [`SessionClassifier`] decides what a finished session tells us about
//! appointment availability.

use std::cmp::Ordering;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{AnalyzerError, Result};
use crate::models::Log;
use crate::time_duration::{TimeDuration, FIVE_MINUTES};

// ── Markers ───────────────────────────────────────────────────────────────────

/// Message the bot logs when it starts walking the booking flow.
pub const SESSION_START_MARKER: &str = "SESSION_START";
/// Message the bot logs when it leaves the booking flow.
pub const SESSION_END_MARKER: &str = "SESSION_END";
/// Message the bot logs when a bookable slot was on screen.
pub const SUCCESS_MARKER: &str = "SUCCESS";

/// The site's genuine "no slots left" answer.
pub const NO_APPOINTMENTS_ERROR: &str = "NoAppointmentsError";
/// The site bounced the bot back to the search page, which also means no slots.
pub const BACK_TO_FIND_APPOINTMENT_PAGE_ERROR: &str = "BackToFindAppointmentPageError";

/// Errors the bot routinely runs into; anything else is worth a look.
pub const EXPECTED_ERRORS: &[&str] = &[
    NO_APPOINTMENTS_ERROR,
    BACK_TO_FIND_APPOINTMENT_PAGE_ERROR,
    "TimeoutError",
    "InternalServerError",
    "ServiceUnavailableError",
];

// ── SessionId ─────────────────────────────────────────────────────────────────

/// Identity of a session, unique within one reconstruction run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionId(u64);

impl SessionId {
    pub const fn new(id: u64) -> Self {
        Self(id)
    }

    pub const fn get(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

// ── SessionState ──────────────────────────────────────────────────────────────

/// Lifecycle of a session. Each variant carries only the timestamps that are
/// known in that state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Ready,
    Open {
        start: DateTime<Utc>,
    },
    Closed {
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    },
}

impl SessionState {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Ready => "ready",
            Self::Open { .. } => "open",
            Self::Closed { .. } => "closed",
        }
    }
}

// ── Session ───────────────────────────────────────────────────────────────────

/// A session under reconstruction.
#[derive(Debug, Clone)]
pub struct Session {
    id: SessionId,
    state: SessionState,
    logs: Vec<Log>,
    errors: Vec<String>,
}

impl Session {
    pub fn new(id: SessionId) -> Self {
        Self {
            id,
            state: SessionState::Ready,
            logs: Vec::new(),
            errors: Vec::new(),
        }
    }

    /// A session that is already running since `start`.
    pub fn open(id: SessionId, start: DateTime<Utc>) -> Self {
        Self {
            id,
            state: SessionState::Open { start },
            logs: Vec::new(),
            errors: Vec::new(),
        }
    }

    pub fn id(&self) -> SessionId {
        self.id
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn is_ready(&self) -> bool {
        matches!(self.state, SessionState::Ready)
    }

    pub fn is_open(&self) -> bool {
        matches!(self.state, SessionState::Open { .. })
    }

    pub fn is_closed(&self) -> bool {
        matches!(self.state, SessionState::Closed { .. })
    }

    pub fn start_time(&self) -> Option<DateTime<Utc>> {
        match self.state {
            SessionState::Ready => None,
            SessionState::Open { start } | SessionState::Closed { start, .. } => Some(start),
        }
    }

    pub fn end_time(&self) -> Option<DateTime<Utc>> {
        match self.state {
            SessionState::Closed { end, .. } => Some(end),
            _ => None,
        }
    }

    pub fn logs(&self) -> &[Log] {
        &self.logs
    }

    pub fn errors(&self) -> &[String] {
        &self.errors
    }

    /// Ready → Open.
    pub fn start(&mut self, at: DateTime<Utc>) -> Result<()> {
        match self.state {
            SessionState::Ready => {
                self.state = SessionState::Open { start: at };
                Ok(())
            }
            other => Err(self.invalid_state("start", other)),
        }
    }

    /// Open → Closed. The end may not precede the start.
    pub fn end(&mut self, at: DateTime<Utc>) -> Result<()> {
        match self.state {
            SessionState::Open { start } if at >= start => {
                self.state = SessionState::Closed { start, end: at };
                Ok(())
            }
            SessionState::Open { start } => Err(AnalyzerError::InvalidState(format!(
                "session {} cannot end at {} before its start at {}",
                self.id, at, start
            ))),
            other => Err(self.invalid_state("end", other)),
        }
    }

    /// Attribute `log` to this session, recording its error (if any).
    pub fn push_log(&mut self, log: Log) -> Result<()> {
        if !self.is_open() {
            return Err(self.invalid_state("attribute a log to", self.state));
        }
        if let Some(err) = &log.error {
            self.errors.push(err.clone());
        }
        self.logs.push(log);
        Ok(())
    }

    pub fn duration(&self) -> Result<TimeDuration> {
        match self.state {
            SessionState::Closed { start, end } => Ok((end - start).into()),
            other => Err(self.invalid_state("measure", other)),
        }
    }

    /// Whether the session finished in less than `threshold`.
    pub fn is_duration_reasonable(&self, threshold: TimeDuration) -> Result<bool> {
        Ok(self.duration()? < threshold)
    }

    /// Freeze a closed session.
    pub fn into_complete(self) -> Result<CompleteSession> {
        match self.state {
            SessionState::Closed { start, end } => Ok(CompleteSession {
                id: self.id,
                start,
                end,
                logs: self.logs,
                errors: self.errors,
            }),
            other => Err(self.invalid_state("complete", other)),
        }
    }

    fn invalid_state(&self, action: &str, state: SessionState) -> AnalyzerError {
        AnalyzerError::InvalidState(format!(
            "cannot {} session {} while it is {}",
            action,
            self.id,
            state.name()
        ))
    }
}

// ── CompleteSession ───────────────────────────────────────────────────────────

/// A session with both a start and an end. Ordered by start time, then id.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompleteSession {
    id: SessionId,
    start: DateTime<Utc>,
    end: DateTime<Utc>,
    logs: Vec<Log>,
    errors: Vec<String>,
}

impl CompleteSession {
    pub fn id(&self) -> SessionId {
        self.id
    }

    pub fn start_time(&self) -> DateTime<Utc> {
        self.start
    }

    pub fn end_time(&self) -> DateTime<Utc> {
        self.end
    }

    pub fn duration(&self) -> TimeDuration {
        (self.end - self.start).into()
    }

    /// Logs seen between the start and end markers, in emission order.
    pub fn logs(&self) -> &[Log] {
        &self.logs
    }

    /// Error identifiers in the order they were logged, duplicates included.
    pub fn errors(&self) -> &[String] {
        &self.errors
    }
}

impl PartialEq for CompleteSession {
    fn eq(&self, other: &Self) -> bool {
        self.start == other.start && self.id == other.id
    }
}

impl Eq for CompleteSession {}

impl PartialOrd for CompleteSession {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for CompleteSession {
    fn cmp(&self, other: &Self) -> Ordering {
        self.start
            .cmp(&other.start)
            .then_with(|| self.id.cmp(&other.id))
    }
}

// ── SessionClassifier ─────────────────────────────────────────────────────────

/// Rules for reading appointment availability out of a finished session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionClassifier {
    /// Exact log message signalling a bookable slot.
    pub success_message: String,
    /// Error identifiers that mean "no slot available".
    pub no_appointment_errors: Vec<String>,
    /// Error identifiers that are routine for the bot.
    pub expected_errors: Vec<String>,
    /// Sessions lasting this long or longer are considered stalled.
    pub lengthy_session_threshold: TimeDuration,
}

impl Default for SessionClassifier {
    fn default() -> Self {
        Self {
            success_message: SUCCESS_MARKER.to_string(),
            no_appointment_errors: vec![
                NO_APPOINTMENTS_ERROR.to_string(),
                BACK_TO_FIND_APPOINTMENT_PAGE_ERROR.to_string(),
            ],
            expected_errors: EXPECTED_ERRORS.iter().map(|e| e.to_string()).collect(),
            lengthy_session_threshold: FIVE_MINUTES,
        }
    }
}

impl SessionClassifier {
    /// No error was recorded and the success message was logged: a slot
    /// seemed to be available.
    pub fn found_appointment(&self, session: &CompleteSession) -> bool {
        session.errors().is_empty()
            && session
                .logs()
                .iter()
                .any(|log| log.message == self.success_message)
    }

    /// The site answered with a plain "no slots" error and nothing else.
    ///
    /// With `ignore_lengthy_sessions`, sessions that stalled for longer than
    /// the lengthy threshold are excluded: their duration measures the stall,
    /// not the site's response time.
    pub fn found_no_appointment(
        &self,
        session: &CompleteSession,
        ignore_lengthy_sessions: bool,
    ) -> bool {
        let single_no_slot_error = match session.errors() {
            [only] => self.no_appointment_errors.iter().any(|e| e == only),
            _ => false,
        };

        single_no_slot_error && (!ignore_lengthy_sessions || self.is_duration_reasonable(session))
    }

    pub fn is_duration_reasonable(&self, session: &CompleteSession) -> bool {
        session.duration() < self.lengthy_session_threshold
    }

    /// Recorded errors that are not on the expected list, in log order.
    pub fn unexpected_errors<'a>(&self, session: &'a CompleteSession) -> Vec<&'a str> {
        session
            .errors()
            .iter()
            .filter(|err| !self.expected_errors.contains(*err))
            .map(String::as_str)
            .collect()
    }

    pub fn has_unexpected_errors(&self, session: &CompleteSession) -> bool {
        !self.unexpected_errors(session).is_empty()
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
