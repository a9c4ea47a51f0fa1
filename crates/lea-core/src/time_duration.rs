//! Exact, unit-aware durations.
//!
//! [`TimeDuration`] stores whole milliseconds and only converts to other units
//! at the edges (display, charts), so comparisons and bucket arithmetic never
//! accumulate floating-point drift.

use std::fmt;
use std::ops::{Add, Div, Mul, Rem, Sub};

use chrono::TimeDelta;
use serde::{Deserialize, Serialize};

// ── TimeUnit ──────────────────────────────────────────────────────────────────

/// Granularities a [`TimeDuration`] can be expressed in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TimeUnit {
    Milliseconds,
    Seconds,
    Minutes,
    Hours,
    Days,
}

impl TimeUnit {
    /// Number of milliseconds in one of this unit.
    pub const fn millis(self) -> i64 {
        match self {
            Self::Milliseconds => 1,
            Self::Seconds => 1_000,
            Self::Minutes => 60_000,
            Self::Hours => 3_600_000,
            Self::Days => 86_400_000,
        }
    }

    pub const fn suffix(self) -> &'static str {
        match self {
            Self::Milliseconds => "ms",
            Self::Seconds => "s",
            Self::Minutes => "m",
            Self::Hours => "h",
            Self::Days => "d",
        }
    }
}

// ── TimeDuration ──────────────────────────────────────────────────────────────

/// A signed span of time with millisecond resolution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TimeDuration {
    millis: i64,
}

pub const ONE_SECOND: TimeDuration = TimeDuration::from_millis(1_000);
pub const FIVE_MINUTES: TimeDuration = TimeDuration::from_millis(5 * 60_000);
pub const ONE_HOUR: TimeDuration = TimeDuration::from_millis(3_600_000);
pub const ONE_DAY: TimeDuration = TimeDuration::from_millis(86_400_000);

impl TimeDuration {
    pub const ZERO: TimeDuration = TimeDuration::from_millis(0);

    /// `amount` of `unit`, e.g. `TimeDuration::new(2, TimeUnit::Hours)`.
    /// Saturates at the `i64` millisecond range.
    pub const fn new(amount: i64, unit: TimeUnit) -> Self {
        Self {
            millis: amount.saturating_mul(unit.millis()),
        }
    }

    pub const fn from_millis(millis: i64) -> Self {
        Self { millis }
    }

    pub const fn as_millis(&self) -> i64 {
        self.millis
    }

    /// The magnitude expressed in `unit`, possibly fractional.
    pub fn amount_in(&self, unit: TimeUnit) -> f64 {
        self.millis as f64 / unit.millis() as f64
    }

    /// The number of whole `unit`s contained in this duration (truncating).
    pub const fn whole(&self, unit: TimeUnit) -> i64 {
        self.millis / unit.millis()
    }

    pub const fn is_zero(&self) -> bool {
        self.millis == 0
    }

    pub const fn is_negative(&self) -> bool {
        self.millis < 0
    }

    /// Whether `self` fits into `whole` an exact, positive number of times.
    pub const fn divides(&self, whole: TimeDuration) -> bool {
        self.millis > 0 && whole.millis % self.millis == 0
    }

    /// Format as a wall-clock offset, `HH:MM`. Used for bucket labels, so
    /// 24 hours renders as `24:00` rather than wrapping.
    pub fn format_clock(&self) -> String {
        let total_minutes = self.whole(TimeUnit::Minutes);
        format!("{:02}:{:02}", total_minutes / 60, total_minutes % 60)
    }
}

impl From<TimeDelta> for TimeDuration {
    fn from(delta: TimeDelta) -> Self {
        Self::from_millis(delta.num_milliseconds())
    }
}

impl From<TimeDuration> for TimeDelta {
    fn from(duration: TimeDuration) -> Self {
        // `TimeDelta` is symmetric and stops at -i64::MAX ms.
        TimeDelta::milliseconds(duration.millis.max(-i64::MAX))
    }
}

// Arithmetic saturates rather than overflowing.

impl Add for TimeDuration {
    type Output = TimeDuration;

    fn add(self, rhs: TimeDuration) -> TimeDuration {
        TimeDuration::from_millis(self.millis.saturating_add(rhs.millis))
    }
}

impl Sub for TimeDuration {
    type Output = TimeDuration;

    fn sub(self, rhs: TimeDuration) -> TimeDuration {
        TimeDuration::from_millis(self.millis.saturating_sub(rhs.millis))
    }
}

impl Mul<i64> for TimeDuration {
    type Output = TimeDuration;

    fn mul(self, rhs: i64) -> TimeDuration {
        TimeDuration::from_millis(self.millis.saturating_mul(rhs))
    }
}

/// How many times `rhs` fits into `self`. Panics when `rhs` is zero.
impl Div for TimeDuration {
    type Output = i64;

    fn div(self, rhs: TimeDuration) -> i64 {
        self.millis / rhs.millis
    }
}

impl Rem for TimeDuration {
    type Output = TimeDuration;

    fn rem(self, rhs: TimeDuration) -> TimeDuration {
        TimeDuration::from_millis(self.millis % rhs.millis)
    }
}

/// Compact human form: `"1h 30m"`, `"6s"`, `"250ms"`, `"0ms"`.
impl fmt::Display for TimeDuration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.millis == 0 {
            return f.write_str("0ms");
        }
        if self.millis < 0 {
            f.write_str("-")?;
        }

        let mut remaining = self.millis.unsigned_abs();
        let mut parts: Vec<String> = Vec::new();
        for unit in [
            TimeUnit::Days,
            TimeUnit::Hours,
            TimeUnit::Minutes,
            TimeUnit::Seconds,
            TimeUnit::Milliseconds,
        ] {
            let size = unit.millis() as u64;
            let count = remaining / size;
            if count > 0 {
                parts.push(format!("{}{}", count, unit.suffix()));
                remaining %= size;
            }
        }
        f.write_str(&parts.join(" "))
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
