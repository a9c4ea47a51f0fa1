//! Log file discovery and decoding.
//!
//! The bot writes one JSON object per line. Every non-blank line must decode
//! into a [`Log`]; the first one that does not aborts the whole pass with
//! [`AnalyzerError::Ingest`].

use std::io::BufRead;
use std::path::{Path, PathBuf};

use lea_core::error::{AnalyzerError, Result};
use lea_core::models::Log;
use tracing::{debug, warn};

const LOG_EXTENSIONS: &[&str] = &["log", "jsonl"];

// ── Public API ────────────────────────────────────────────────────────────────

/// Files to read for `log_path`.
///
/// A file is returned as-is whatever its extension. A directory is walked
/// recursively for `*.log` / `*.jsonl` files, sorted by path.
pub fn find_log_files(log_path: &Path) -> Result<Vec<PathBuf>> {
    if !log_path.exists() {
        return Err(AnalyzerError::DataPathNotFound(log_path.to_path_buf()));
    }
    if log_path.is_file() {
        return Ok(vec![log_path.to_path_buf()]);
    }

    let mut files: Vec<PathBuf> = walkdir::WalkDir::new(log_path)
        .follow_links(true)
        .into_iter()
        .filter_map(|entry| entry.ok())
        .filter(|entry| {
            entry.file_type().is_file()
                && entry
                    .path()
                    .extension()
                    .and_then(|ext| ext.to_str())
                    .map(|ext| LOG_EXTENSIONS.contains(&ext))
                    .unwrap_or(false)
        })
        .map(|entry| entry.into_path())
        .collect();

    files.sort();
    Ok(files)
}

/// Decode every log record under `log_path`, in file order then line order.
pub fn load_logs(log_path: &Path) -> Result<Vec<Log>> {
    let files = find_log_files(log_path)?;
    if files.is_empty() {
        warn!("No log files found in {}", log_path.display());
        return Ok(Vec::new());
    }

    let mut logs = Vec::new();
    for file_path in &files {
        let file = std::fs::File::open(file_path).map_err(|source| AnalyzerError::FileRead {
            path: file_path.clone(),
            source,
        })?;
        let before = logs.len();
        decode_lines(file_path, std::io::BufReader::new(file), &mut logs)?;
        debug!("File {}: {} records", file_path.display(), logs.len() - before);
    }

    debug!("Loaded {} records from {} files", logs.len(), files.len());
    Ok(logs)
}

/// Decode newline-delimited records held in memory.
pub fn parse_logs(text: &str) -> Result<Vec<Log>> {
    let mut logs = Vec::new();
    decode_lines(Path::new("<memory>"), text.as_bytes(), &mut logs)?;
    Ok(logs)
}

// ── Internal helpers ──────────────────────────────────────────────────────────

/// Lines are split on raw bytes so that a line which is not valid UTF-8 is
/// reported as an undecodable record with its line number. Only genuine read
/// failures become [`AnalyzerError::FileRead`].
fn decode_lines(source: &Path, reader: impl BufRead, out: &mut Vec<Log>) -> Result<()> {
    for (idx, line) in reader.split(b'\n').enumerate() {
        let line = line.map_err(|source_err| AnalyzerError::FileRead {
            path: source.to_path_buf(),
            source: source_err,
        })?;
        if line.iter().all(u8::is_ascii_whitespace) {
            continue;
        }
        let log = serde_json::from_slice(&line).map_err(|err| AnalyzerError::Ingest {
            path: source.to_path_buf(),
            line: idx + 1,
            source: err,
        })?;
        out.push(log);
    }
    Ok(())
}

// ── Tests ─────────────────────────────────────────────────────────────────────
