use serde::{Deserialize, Serialize};

use crate::time_duration::{TimeDuration, TimeUnit};

// ── Percentile helper ─────────────────────────────────────────────────────────

/// Compute the `p`-th percentile of a **sorted** slice using standard linear
/// interpolation (the same algorithm used by NumPy's `percentile` function).
///
/// Returns `0.0` for an empty slice.
pub fn percentile(sorted_data: &[f64], p: f64) -> f64 {
    if sorted_data.is_empty() {
        return 0.0;
    }
    let len = sorted_data.len();
    if len == 1 {
        return sorted_data[0];
    }
    let rank = (p / 100.0) * (len as f64 - 1.0);
    let lo = rank.floor() as usize;
    let hi = rank.ceil() as usize;
    if lo == hi {
        return sorted_data[lo];
    }
    let frac = rank - lo as f64;
    sorted_data[lo] + frac * (sorted_data[hi] - sorted_data[lo])
}

// ── LatencyStats ──────────────────────────────────────────────────────────────

/// Distribution summary of a set of session durations, in seconds.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct LatencyStats {
    pub count: usize,
    pub min_secs: f64,
    pub median_secs: f64,
    pub p90_secs: f64,
    pub max_secs: f64,
}

impl LatencyStats {
    /// Summarise `durations` (any order). `None` when empty.
    pub fn from_durations(durations: &[TimeDuration]) -> Option<Self> {
        if durations.is_empty() {
            return None;
        }
        let mut secs: Vec<f64> = durations
            .iter()
            .map(|d| d.amount_in(TimeUnit::Seconds))
            .collect();
        secs.sort_by(|a, b| a.total_cmp(b));

        Some(Self {
            count: secs.len(),
            min_secs: secs[0],
            median_secs: percentile(&secs, 50.0),
            p90_secs: percentile(&secs, 90.0),
            max_secs: secs[secs.len() - 1],
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_percentile_empty() {
        assert_eq!(percentile(&[], 90.0), 0.0);
    }

    #[test]
    fn test_percentile_single() {
        assert_eq!(percentile(&[4.0], 50.0), 4.0);
    }

    #[test]
    fn test_percentile_interpolates() {
        let data = [1.0, 2.0, 3.0, 4.0];
        assert!((percentile(&data, 50.0) - 2.5).abs() < 1e-12);
        assert!((percentile(&data, 90.0) - 3.7).abs() < 1e-12);
        assert_eq!(percentile(&data, 100.0), 4.0);
    }

    #[test]
    fn test_latency_stats_empty_is_none() {
        assert!(LatencyStats::from_durations(&[]).is_none());
    }

    #[test]
    fn test_latency_stats_unsorted_input() {
        let durations = [
            TimeDuration::new(3, TimeUnit::Seconds),
            TimeDuration::new(1, TimeUnit::Seconds),
            TimeDuration::new(2, TimeUnit::Seconds),
        ];
        let stats = LatencyStats::from_durations(&durations).unwrap();
        assert_eq!(stats.count, 3);
        assert_eq!(stats.min_secs, 1.0);
        assert_eq!(stats.median_secs, 2.0);
        assert!((stats.p90_secs - 2.8).abs() < 1e-12);
        assert_eq!(stats.max_secs, 3.0);
    }
}
