use chrono::{DateTime, Timelike, Utc, Weekday};
use chrono_tz::Tz;

use crate::error::{AnalyzerError, Result};
use crate::time_duration::TimeDuration;

/// The seven weekdays in calendar order, Monday first.
pub const WEEKDAYS: [Weekday; 7] = [
    Weekday::Mon,
    Weekday::Tue,
    Weekday::Wed,
    Weekday::Thu,
    Weekday::Fri,
    Weekday::Sat,
    Weekday::Sun,
];

// ── System timezone detection ─────────────────────────────────────────────────

/// Detect the IANA timezone name of the running system.
///
/// Uses the `iana-time-zone` crate directly – no subprocess calls.
/// Falls back to `"UTC"` if detection fails.
pub fn get_system_timezone() -> String {
    iana_time_zone::get_timezone().unwrap_or_else(|_| "UTC".to_string())
}

// ── TimezoneHandler ───────────────────────────────────────────────────────────

/// Projects UTC timestamps onto the local calendar the bot ran in.
///
/// Weekday and time-of-day are always read from the wall clock of this
/// timezone, so a session started at 08:15 local time lands in the 08:00
/// bucket in winter and in summer alike.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimezoneHandler {
    tz: Tz,
}

impl Default for TimezoneHandler {
    fn default() -> Self {
        Self::utc()
    }
}

impl TimezoneHandler {
    pub fn new(tz: Tz) -> Self {
        Self { tz }
    }

    pub fn utc() -> Self {
        Self { tz: Tz::UTC }
    }

    /// Resolve an IANA name, or `"auto"` for the system timezone.
    ///
    /// An unknown name is a configuration error rather than a silent UTC
    /// fallback: every weekday and bucket assignment depends on it.
    pub fn from_name(tz_name: &str) -> Result<Self> {
        let resolved = if tz_name.eq_ignore_ascii_case("auto") {
            get_system_timezone()
        } else {
            tz_name.to_string()
        };

        resolved
            .parse::<Tz>()
            .map(Self::new)
            .map_err(|_| AnalyzerError::Configuration(format!("unknown timezone \"{resolved}\"")))
    }

    /// Validate that `tz_name` is a recognised IANA timezone identifier.
    pub fn validate_timezone(tz_name: &str) -> bool {
        tz_name.parse::<Tz>().is_ok()
    }

    pub fn tz(&self) -> Tz {
        self.tz
    }

    pub fn name(&self) -> &'static str {
        self.tz.name()
    }

    /// Local calendar weekday of `ts`.
    pub fn weekday(&self, ts: DateTime<Utc>) -> Weekday {
        use chrono::Datelike as _;
        ts.with_timezone(&self.tz).weekday()
    }

    /// Wall-clock time elapsed since local midnight, always in `[0, 24h)`.
    pub fn time_since_midnight(&self, ts: DateTime<Utc>) -> TimeDuration {
        let local = ts.with_timezone(&self.tz);
        let secs = i64::from(local.num_seconds_from_midnight());
        // Leap-second nanos (>= 1e9) are folded into the last millisecond.
        let millis = i64::from(local.nanosecond().min(999_999_999) / 1_000_000);
        TimeDuration::from_millis(secs * 1_000 + millis)
    }
}

/// Position of `weekday` in [`WEEKDAYS`].
pub fn weekday_index(weekday: Weekday) -> usize {
    weekday.num_days_from_monday() as usize
}

// ── Tests ─────────────────────────────────────────────────────────────────────
