//! RSS and Atom payloads.
//!
//! Parsing is delegated to `feed-rs`. Bodies arrive as raw bytes, so the
//! document is first transcoded to UTF-8 using its BOM or the `encoding=`
//! attribute of the XML declaration; legacy encodings such as GBK are common
//! among Chinese feeds and rarely announced in the `Content-Type` header.

use encoding_rs::{Encoding, UTF_8};
use feed_rs::model::Entry;
use feed_rs::parser;
use once_cell::sync::Lazy;
use regex::Regex;
use std::borrow::Cow;
use std::error::Error;
use tracing::{debug, warn};

use crate::models::{RawDate, RawItem};

static XML_ENCODING: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"encoding\s*=\s*["']([A-Za-z0-9._:-]+)["']"#).unwrap());

/// Bytes inspected for the XML declaration.
const DECLARATION_WINDOW: usize = 256;

/// Transcode an XML document to UTF-8.
///
/// A BOM wins over the declaration. Whenever the source wasn't UTF-8 the
/// declaration's `encoding` attribute is rewritten to `UTF-8` so the parser
/// doesn't decode a second time. Unknown labels fall back to UTF-8 with
/// replacement characters.
pub fn utf8_document(bytes: &[u8]) -> Cow<'_, str> {
    let head = String::from_utf8_lossy(&bytes[..bytes.len().min(DECLARATION_WINDOW)]);
    let declared = XML_ENCODING
        .captures(&head)
        .and_then(|caps| caps.get(1))
        .map(|label| label.as_str().to_string());

    let encoding = match declared.as_deref() {
        Some(label) => Encoding::for_label(label.as_bytes()).unwrap_or_else(|| {
            warn!(%label, "Unknown XML encoding label; assuming UTF-8");
            UTF_8
        }),
        None => UTF_8,
    };

    let (text, used, had_errors) = encoding.decode(bytes);
    if had_errors {
        debug!(encoding = used.name(), "Replaced malformed sequences while decoding");
    }
    if used != UTF_8 {
        return Cow::Owned(XML_ENCODING.replace(&text, r#"encoding="UTF-8""#).into_owned());
    }
    text
}

/// Extract raw items from an RSS or Atom document.
///
/// Only the first `limit` entries are kept. A well-formed feed with no items
/// yields no items. A document `feed-rs` cannot recognise as a feed is an
/// error.
pub fn parse_items(bytes: &[u8], limit: usize) -> Result<Vec<RawItem>, Box<dyn Error>> {
    let document = utf8_document(bytes);
    let feed = parser::parse(document.as_bytes())
        .map_err(|e| format!("feed parsing failed: {e}"))?;
    Ok(feed.entries.into_iter().take(limit).map(raw_item).collect())
}

fn raw_item(entry: Entry) -> RawItem {
    let link = entry
        .links
        .iter()
        .find(|l| matches!(l.rel.as_deref(), None | Some("alternate")))
        .map(|l| l.href.trim().to_string())
        .filter(|href| !href.is_empty())
        .or_else(|| {
            (entry.id.starts_with("http://") || entry.id.starts_with("https://"))
                .then(|| entry.id.clone())
        });

    let description = entry
        .summary
        .map(|s| s.content)
        .filter(|s| !s.trim().is_empty())
        .or_else(|| entry.content.and_then(|c| c.body))
        .filter(|s| !s.trim().is_empty());

    RawItem {
        title: entry.title.map(|t| t.content).filter(|t| !t.is_empty()),
        link,
        description,
        date: entry.published.or(entry.updated).map(RawDate::Instant),
    }
}
