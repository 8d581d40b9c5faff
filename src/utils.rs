//! Utility functions for text cleanup, date parsing, and file system checks.
//!
//! This module provides helper functions used throughout the application:
//! - HTML tag stripping and character-based truncation for descriptions
//! - Lenient publication date parsing
//! - String truncation and error chain flattening for logging
//! - File system validation for output directories

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use once_cell::sync::Lazy;
use regex::Regex;
use std::error::Error;
use std::fs as stdfs;
use std::path::Path;
use tokio::fs;
use tracing::{info, instrument};

use crate::models::RawDate;

static HTML_TAG: Lazy<Regex> = Lazy::new(|| Regex::new(r"<[^>]+>").unwrap());

/// Naive formats accepted after RFC 3339 and RFC 2822 fail. Interpreted as UTC.
const NAIVE_DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y/%m/%d %H:%M:%S",
];

/// Remove everything that looks like an HTML tag.
///
/// This is a plain `<[^>]+>` pass: entities are left alone and whitespace is
/// not collapsed.
///
/// # Examples
///
/// ```ignore
/// assert_eq!(strip_html("<b>Breaking</b> news"), "Breaking news");
/// ```
pub fn strip_html(s: &str) -> String {
    HTML_TAG.replace_all(s, "").into_owned()
}

/// Keep at most `max` characters of `s`.
///
/// Counts Unicode scalar values, so multi-byte text is never split.
pub fn truncate_chars(s: &str, max: usize) -> String {
    match s.char_indices().nth(max) {
        Some((idx, _)) => s[..idx].to_string(),
        None => s.to_string(),
    }
}

/// Parse an upstream publication date into a UTC instant.
///
/// Accepts RFC 3339, RFC 2822, a few naive `YYYY-MM-DD[ T]HH:MM:SS` shapes,
/// bare dates, epoch milliseconds, and instants the feed parser resolved.
/// Returns `None` when nothing matches.
pub fn parse_timestamp(raw: &RawDate) -> Option<DateTime<Utc>> {
    match raw {
        RawDate::EpochMillis(ms) => DateTime::from_timestamp_millis(*ms),
        RawDate::Instant(dt) => Some(*dt),
        RawDate::Text(text) => {
            let text = text.trim();
            if text.is_empty() {
                return None;
            }
            if let Ok(dt) = DateTime::parse_from_rfc3339(text) {
                return Some(dt.with_timezone(&Utc));
            }
            if let Ok(dt) = DateTime::parse_from_rfc2822(text) {
                return Some(dt.with_timezone(&Utc));
            }
            for fmt in NAIVE_DATETIME_FORMATS {
                if let Ok(naive) = NaiveDateTime::parse_from_str(text, fmt) {
                    return Some(naive.and_utc());
                }
            }
            NaiveDate::parse_from_str(text, "%Y-%m-%d")
                .ok()
                .and_then(|d| d.and_hms_opt(0, 0, 0))
                .map(|naive| naive.and_utc())
        }
    }
}

/// Truncate a string for logging purposes.
///
/// Long strings are truncated to `max` characters with an ellipsis and
/// byte count indicator appended.
///
/// # Examples
///
/// ```ignore
/// assert_eq!(truncate_for_log("short", 100), "short");
/// assert_eq!(truncate_for_log(&"a".repeat(500), 10), "aaaaaaaaaa…(+490 bytes)");
/// ```
pub fn truncate_for_log(s: &str, max: usize) -> String {
    match s.char_indices().nth(max) {
        Some((idx, _)) => format!("{}…(+{} bytes)", &s[..idx], s.len() - idx),
        None => s.to_string(),
    }
}

/// Render an error followed by each of its sources, joined with `": "`.
///
/// `reqwest` errors print only their outermost context ("error sending
/// request"); the cause (DNS, TLS, timeout) lives further down the chain.
pub fn error_chain(e: &dyn Error) -> String {
    let mut out = e.to_string();
    let mut source = e.source();
    while let Some(cause) = source {
        let msg = cause.to_string();
        if !out.ends_with(&msg) {
            out.push_str(": ");
            out.push_str(&msg);
        }
        source = cause.source();
    }
    out
}

/// Ensure a directory exists and is writable.
///
/// This function creates the directory if it doesn't exist, then performs
/// a write test by creating and immediately deleting a scratch file.
///
/// # Errors
///
/// Returns an error if:
/// - The directory cannot be created
/// - The directory is not writable (permission denied, read-only filesystem, etc.)
#[instrument(level = "info", skip_all, fields(path = %path.display()))]
pub async fn ensure_writable_dir(path: &Path) -> Result<(), Box<dyn Error>> {
    fs::create_dir_all(path).await?;
    // Try a small sync write using std fs (simpler error surface)
    let scratch_path = path.join("..__write_check__");
    stdfs::File::create(&scratch_path)?;
    let _ = stdfs::remove_file(&scratch_path);
    info!("Output directory is writable");
    Ok(())
}
