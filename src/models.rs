//! Data models for feed items and their normalized representation.
//!
//! This module defines the core data structures used throughout the pipeline:
//! - [`RawItem`]: The fields recognized in one upstream item, before normalization
//! - [`FeedItem`]: The canonical record written to the snapshot file
//!
//! `FeedItem` serializes with the short field names the static site expects
//! (`desc`, `ts`), hence the `#[serde(rename)]` attributes.

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// One upstream item reduced to the fields the normalizer understands.
///
/// JSON payloads and RSS/Atom documents both produce `RawItem`s, so a single
/// normalization pass applies to every source shape. Each field keeps the
/// first non-empty alternative found upstream (e.g. `link` before `url`).
#[derive(Debug, Default, Clone, PartialEq)]
pub struct RawItem {
    /// The item headline, untrimmed.
    pub title: Option<String>,
    /// The item permalink.
    pub link: Option<String>,
    /// The item body or summary, possibly containing HTML.
    pub description: Option<String>,
    /// The publication date as found upstream.
    pub date: Option<RawDate>,
}

/// A publication date before parsing.
#[derive(Debug, Clone, PartialEq)]
pub enum RawDate {
    /// A textual date (RFC 3339, RFC 2822, or a naive timestamp).
    Text(String),
    /// Milliseconds since the Unix epoch.
    EpochMillis(i64),
    /// Already parsed upstream (RSS/Atom dates).
    Instant(DateTime<Utc>),
}

/// A normalized feed item as written to the snapshot.
///
/// # JSON Schema
///
/// ```json
/// {
///   "title": "Headline",
///   "link": "https://example.com/story",
///   "desc": "Plain text snippet",
///   "source": "Example Feed",
///   "ts": "2025-05-06T14:30:00.000Z"
/// }
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeedItem {
    /// The trimmed headline.
    pub title: String,
    /// The item permalink; empty when upstream omits it.
    pub link: String,
    /// HTML-free description, truncated to the configured length.
    #[serde(rename = "desc")]
    pub description: String,
    /// Display name of the source this item came from.
    pub source: String,
    /// Publication instant.
    #[serde(rename = "ts", with = "iso_millis")]
    pub timestamp: DateTime<Utc>,
    /// Set when upstream gave no usable date and `timestamp` is the run's "now".
    #[serde(skip)]
    pub timestamp_is_fallback: bool,
}

impl FeedItem {
    /// The case-insensitive key used to detect duplicate titles.
    pub fn dedup_key(&self) -> String {
        self.title.to_lowercase()
    }
}

/// Serialize timestamps as `2025-05-06T14:30:00.000Z`.
mod iso_millis {
    use super::*;

    pub fn serialize<S>(ts: &DateTime<Utc>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&ts.to_rfc3339_opts(SecondsFormat::Millis, true))
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<DateTime<Utc>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        DateTime::parse_from_rfc3339(&s)
            .map(|dt| dt.with_timezone(&Utc))
            .map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn item(title: &str) -> FeedItem {
        FeedItem {
            title: title.to_string(),
            link: "https://example.com/a".to_string(),
            description: "Snippet".to_string(),
            source: "Example".to_string(),
            timestamp: Utc.with_ymd_and_hms(2025, 5, 6, 14, 30, 0).unwrap(),
            timestamp_is_fallback: false,
        }
    }

    #[test]
    fn test_feed_item_serializes_short_field_names() {
        let json = serde_json::to_value(item("Hello")).unwrap();
        assert_eq!(json["title"], "Hello");
        assert_eq!(json["desc"], "Snippet");
        assert_eq!(json["source"], "Example");
        assert_eq!(json["ts"], "2025-05-06T14:30:00.000Z");
        assert!(json.get("description").is_none());
        assert!(json.get("timestamp_is_fallback").is_none());
    }

    #[test]
    fn test_feed_item_deserialization() {
        let json = r#"{
            "title": "Hello",
            "link": "",
            "desc": "",
            "source": "Example",
            "ts": "2025-05-06T14:30:00.000Z"
        }"#;

        let parsed: FeedItem = serde_json::from_str(json).unwrap();
        assert_eq!(parsed.timestamp, Utc.with_ymd_and_hms(2025, 5, 6, 14, 30, 0).unwrap());
        assert!(!parsed.timestamp_is_fallback);
    }

    #[test]
    fn test_dedup_key_is_lowercase() {
        assert_eq!(item("Breaking NEWS").dedup_key(), "breaking news");
        assert_eq!(item(" Breaking ").dedup_key(), " breaking ");
    }
}
