//! Payload parsing and normalization for feed sources.
//!
//! Each source returns either a JSON document or an RSS/Atom document. Both
//! shapes are first reduced to [`RawItem`]s by a shape-specific parser, then
//! pass through the same [`normalize`] step, so the item cap, description
//! cleanup and timestamp fallback are identical for every source.
//!
//! # Supported Shapes
//!
//! | Format | Module | Items |
//! |--------|--------|-------|
//! | JSON | [`json`] | `items` or `data` array |
//! | RSS / Atom | [`rss`] | `<item>` / `<entry>` elements |
//! | Auto | this module | sniffed from the leading bytes of the body |

pub mod json;
pub mod rss;

use chrono::{DateTime, Utc};
use std::error::Error;

use crate::config::{FeedFormat, SourceConfig};
use crate::models::{FeedItem, RawItem};
use crate::utils::{parse_timestamp, strip_html, truncate_chars};

/// Per-source normalization limits.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NormalizeLimits {
    /// Raw items taken from the head of each source.
    pub items_per_source: usize,
    /// Maximum description length, in characters.
    pub description_length: usize,
}

const UTF8_BOM: &[u8] = b"\xEF\xBB\xBF";

/// Resolve `Auto` by looking at the body.
///
/// A UTF-16 BOM can only introduce an XML document here; after a UTF-8 BOM
/// and leading whitespace, `<` means XML and anything else JSON.
pub fn detect_format(body: &[u8], declared: FeedFormat) -> FeedFormat {
    match declared {
        FeedFormat::Auto => {
            if body.starts_with(b"\xFE\xFF") || body.starts_with(b"\xFF\xFE") {
                return FeedFormat::Rss;
            }
            let body = body.strip_prefix(UTF8_BOM).unwrap_or(body);
            match body.iter().find(|b| !b.is_ascii_whitespace()) {
                Some(b'<') => FeedFormat::Rss,
                _ => FeedFormat::Json,
            }
        }
        other => other,
    }
}

/// Parse a payload into raw items according to its shape, keeping at most
/// `limit` upstream entries.
pub fn parse_payload(
    body: &[u8],
    format: FeedFormat,
    limit: usize,
) -> Result<Vec<RawItem>, Box<dyn Error>> {
    match detect_format(body, format) {
        FeedFormat::Json => json::parse_items(body.strip_prefix(UTF8_BOM).unwrap_or(body), limit),
        FeedFormat::Rss => rss::parse_items(body, limit),
        FeedFormat::Auto => Err("payload format could not be detected".into()),
    }
}

/// Convert one raw item into the canonical record.
///
/// `now` is the run's single fallback instant for items without a usable date.
pub fn normalize_item(
    raw: RawItem,
    source: &SourceConfig,
    limits: NormalizeLimits,
    now: DateTime<Utc>,
) -> FeedItem {
    let description = raw
        .description
        .as_deref()
        .map(|d| truncate_chars(&strip_html(d), limits.description_length))
        .unwrap_or_default();
    let parsed = raw.date.as_ref().and_then(parse_timestamp);

    FeedItem {
        title: raw.title.as_deref().map(str::trim).unwrap_or_default().to_string(),
        link: raw.link.unwrap_or_default(),
        description,
        source: source.name.clone(),
        timestamp: parsed.unwrap_or(now),
        timestamp_is_fallback: parsed.is_none(),
    }
}

/// Parse and normalize a fetched body for `source`.
///
/// Only the first `items_per_source` upstream entries are considered. Items
/// with empty titles are still returned here; the deduplicator drops them.
pub fn normalize(
    body: &[u8],
    source: &SourceConfig,
    limits: NormalizeLimits,
    now: DateTime<Utc>,
) -> Result<Vec<FeedItem>, Box<dyn Error>> {
    let raw = parse_payload(body, source.format, limits.items_per_source)?;
    Ok(raw
        .into_iter()
        .map(|item| normalize_item(item, source, limits, now))
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::RawDate;
    use chrono::TimeZone;

    const LIMITS: NormalizeLimits = NormalizeLimits {
        items_per_source: 15,
        description_length: 90,
    };

    const CHANNEL_HEAD: &str =
        "<title>Example</title><link>https://example.com</link><description>d</description>";

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap()
    }

    fn source(format: FeedFormat) -> SourceConfig {
        SourceConfig::new("Example", "https://example.com/feed", format)
    }

    #[test]
    fn test_detect_format() {
        assert_eq!(detect_format(b"  <rss/>", FeedFormat::Auto), FeedFormat::Rss);
        assert_eq!(detect_format(b"\xEF\xBB\xBF<?xml?>", FeedFormat::Auto), FeedFormat::Rss);
        assert_eq!(detect_format(b"\xFF\xFE<\0?\0", FeedFormat::Auto), FeedFormat::Rss);
        assert_eq!(detect_format(b"{\"items\":[]}", FeedFormat::Auto), FeedFormat::Json);
        assert_eq!(detect_format(b"", FeedFormat::Auto), FeedFormat::Json);
        assert_eq!(detect_format(b"<rss/>", FeedFormat::Json), FeedFormat::Json);
    }

    #[test]
    fn test_description_stripped_and_truncated() {
        let long = format!("<b>Breaking</b> news update...{}", " more detail".repeat(20));
        let raw = RawItem {
            title: Some("  Headline  ".to_string()),
            description: Some(long),
            ..Default::default()
        };
        let item = normalize_item(raw, &source(FeedFormat::Json), LIMITS, now());
        assert_eq!(item.title, "Headline");
        assert_eq!(item.description.chars().count(), 90);
        assert!(item.description.starts_with("Breaking news update..."));
        assert!(!item.description.contains('<'));
    }

    #[test]
    fn test_fallback_timestamp_is_now_and_flagged() {
        let raw = RawItem {
            title: Some("t".to_string()),
            date: Some(RawDate::Text("not a date".to_string())),
            ..Default::default()
        };
        let item = normalize_item(raw, &source(FeedFormat::Json), LIMITS, now());
        assert_eq!(item.timestamp, now());
        assert!(item.timestamp_is_fallback);
        assert_eq!(item.link, "");
        assert_eq!(item.description, "");
        assert_eq!(item.source, "Example");
    }

    #[test]
    fn test_parsed_timestamp_is_kept() {
        let raw = RawItem {
            title: Some("t".to_string()),
            date: Some(RawDate::Text("2025-05-06T14:30:00Z".to_string())),
            ..Default::default()
        };
        let item = normalize_item(raw, &source(FeedFormat::Json), LIMITS, now());
        assert_eq!(item.timestamp, Utc.with_ymd_and_hms(2025, 5, 6, 14, 30, 0).unwrap());
        assert!(!item.timestamp_is_fallback);
    }

    #[test]
    fn test_json_items_capped_per_source() {
        let entries: Vec<String> = (0..20).map(|i| format!(r#"{{"title": "t{i}"}}"#)).collect();
        let body = format!(r#"{{"items": [{}]}}"#, entries.join(","));
        let items = normalize(body.as_bytes(), &source(FeedFormat::Json), LIMITS, now()).unwrap();
        assert_eq!(items.len(), 15);
        assert_eq!(items[0].title, "t0");
        assert_eq!(items[14].title, "t14");
    }

    #[test]
    fn test_rss_items_follow_the_same_contract() {
        let entries: String = (0..20)
            .map(|i| {
                format!(
                    "<item><title>t{i}</title><description>{}</description></item>",
                    "x".repeat(200)
                )
            })
            .collect();
        let body = format!("<rss version=\"2.0\"><channel>{CHANNEL_HEAD}{entries}</channel></rss>");
        let items = normalize(body.as_bytes(), &source(FeedFormat::Rss), LIMITS, now()).unwrap();
        assert_eq!(items.len(), 15);
        assert!(items.iter().all(|i| i.description.chars().count() == 90));
        assert!(items.iter().all(|i| i.timestamp_is_fallback));
    }

    #[test]
    fn test_auto_format_dispatch() {
        let rss = format!(
            "\u{feff}<rss version=\"2.0\"><channel>{CHANNEL_HEAD}<item><title>x</title></item></channel></rss>"
        );
        let items = normalize(rss.as_bytes(), &source(FeedFormat::Auto), LIMITS, now()).unwrap();
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].title, "x");
        let json = "\u{feff}{\"data\": [{\"title\": \"y\"}]}";
        let items = normalize(json.as_bytes(), &source(FeedFormat::Auto), LIMITS, now()).unwrap();
        assert_eq!(items[0].title, "y");
    }

    #[test]
    fn test_parse_failure_propagates() {
        assert!(normalize(b"<html>", &source(FeedFormat::Json), LIMITS, now()).is_err());
        assert!(normalize(b"<html>", &source(FeedFormat::Auto), LIMITS, now()).is_err());
    }
}
