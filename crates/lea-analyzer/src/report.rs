use lea_data::analysis::{summarize_history, AnalysisMetadata, AnalysisResult, HistorySummary};
use serde::Serialize;
use tracing::info;

// ── JSON output ────────────────────────────────────────────────────────────────

#[derive(Serialize)]
struct JsonReport<'a> {
    metadata: &'a AnalysisMetadata,
    primary: &'a HistorySummary,
    secondary: HistorySummary,
}

/// Both histories and the run metadata as pretty-printed JSON.
pub fn to_json(result: &AnalysisResult) -> serde_json::Result<String> {
    let report = JsonReport {
        metadata: &result.metadata,
        primary: &result.summary,
        secondary: summarize_history(&result.secondary, result.discarded.len()),
    };
    serde_json::to_string_pretty(&report)
}

// ── Text output ────────────────────────────────────────────────────────────────

/// Human-readable report lines for `summary`.
pub fn summary_lines(summary: &HistorySummary) -> Vec<String> {
    let mut lines = vec![format!(
        "{} sessions in {} buckets, {} discarded",
        summary.total_sessions, summary.bucket_size, summary.discarded_sessions
    )];

    if let (Some(first), Some(last)) = (summary.first_session, summary.last_session) {
        lines.push(format!(
            "First session {}, last session {}",
            first.to_rfc3339(),
            last.to_rfc3339()
        ));
    }

    lines.push(format!("Appointments found: {}", summary.successes.len()));
    for end in &summary.successes {
        lines.push(format!("  session ended {}", end.to_rfc3339()));
    }

    if !summary.error_counts.is_empty() {
        lines.push("Errors:".to_string());
        for (err, count) in &summary.error_counts {
            let marker = if summary.unexpected_error_counts.contains_key(err) {
                " (unexpected)"
            } else {
                ""
            };
            lines.push(format!("  {err}: {count}{marker}"));
        }
    }

    for day in summary.weekdays.iter().filter(|d| d.sessions > 0) {
        lines.push(format!("{}: {} sessions", day.weekday, day.sessions));
        for bucket in &day.buckets {
            if let Some(stats) = &bucket.no_appointment {
                lines.push(format!(
                    "  {} {} no-appointment, median {:.1}s, p90 {:.1}s",
                    bucket.range, stats.count, stats.median_secs, stats.p90_secs
                ));
            }
        }
    }

    lines
}

/// Emit [`summary_lines`] through `tracing`.
pub fn log_summary(result: &AnalysisResult) {
    info!(
        "Loaded {} records in {:.3}s, built sessions in {:.3}s",
        result.metadata.records_processed,
        result.metadata.load_time_seconds,
        result.metadata.build_time_seconds
    );
    for line in summary_lines(&result.summary) {
        info!("{}", line);
    }
}

// ── Tests ──────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use lea_data::analysis::{analyze_logs, AnalysisOptions};
    use std::io::Write;
    use tempfile::TempDir;

    const LOG: &[&str] = &[
        r#"{"time":"2024-01-15T10:00:00Z","msg":"SESSION_START"}"#,
        r#"{"time":"2024-01-15T10:00:02Z","msg":"CHECK","err":"NoAppointmentsError"}"#,
        r#"{"time":"2024-01-15T10:00:04Z","msg":"SESSION_END"}"#,
        r#"{"time":"2024-01-16T09:00:00Z","msg":"SESSION_START"}"#,
        r#"{"time":"2024-01-16T09:00:01Z","msg":"CHECK","err":"WeirdError"}"#,
        r#"{"time":"2024-01-16T09:00:02Z","msg":"SESSION_END"}"#,
        r#"{"time":"2024-01-16T11:00:00Z","msg":"SESSION_START"}"#,
        r#"{"time":"2024-01-16T11:00:03Z","msg":"SUCCESS"}"#,
        r#"{"time":"2024-01-16T11:00:05Z","msg":"SESSION_END"}"#,
    ];

    fn analyze_fixture() -> AnalysisResult {
        let dir = TempDir::new().unwrap();
        let mut file = std::fs::File::create(dir.path().join("bot.log")).unwrap();
        for line in LOG {
            writeln!(file, "{}", line).unwrap();
        }
        analyze_logs(&AnalysisOptions::new(dir.path())).unwrap()
    }

    #[test]
    fn test_summary_lines() {
        let result = analyze_fixture();
        let lines = summary_lines(&result.summary);

        assert_eq!(lines[0], "3 sessions in 1h buckets, 0 discarded");
        assert!(lines.contains(&"Appointments found: 1".to_string()));
        assert!(lines.contains(&"  session ended 2024-01-16T11:00:05+00:00".to_string()));
        assert!(lines.contains(&"  NoAppointmentsError: 1".to_string()));
        assert!(lines.contains(&"  WeirdError: 1 (unexpected)".to_string()));
        assert!(lines.contains(&"Mon: 1 sessions".to_string()));
        assert!(lines.contains(&"  [10:00-11:00] 1 no-appointment, median 4.0s, p90 4.0s".to_string()));
        assert!(!lines.iter().any(|l| l.starts_with("Wed")));
    }

    #[test]
    fn test_summary_lines_empty_history() {
        let dir = TempDir::new().unwrap();
        let result = analyze_logs(&AnalysisOptions::new(dir.path())).unwrap();
        let lines = summary_lines(&result.summary);
        assert_eq!(
            lines,
            vec![
                "0 sessions in 1h buckets, 0 discarded".to_string(),
                "Appointments found: 0".to_string(),
            ]
        );
    }

    #[test]
    fn test_to_json_contains_both_histories() {
        let result = analyze_fixture();
        let json: serde_json::Value = serde_json::from_str(&to_json(&result).unwrap()).unwrap();

        assert_eq!(json["metadata"]["sessions_built"], 3);
        assert_eq!(json["primary"]["bucket_size"], "1h");
        assert_eq!(json["secondary"]["bucket_size"], "2h");
        assert_eq!(json["secondary"]["weekdays"][0]["buckets"].as_array().unwrap().len(), 12);
    }
}
