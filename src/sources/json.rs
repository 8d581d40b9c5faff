//! JSON feed payloads (RSSHub `?format=json` and similar).
//!
//! The items array lives under `items` (JSON Feed / RSSHub) or `data` (some
//! hot-list APIs). Each entry is an object; field names vary by upstream, so
//! every concept has a short list of recognized alternatives.

use serde_json::Value;
use std::error::Error;
use tracing::debug;

use crate::models::{RawDate, RawItem};

const ITEM_ARRAY_FIELDS: &[&str] = &["items", "data"];
const TITLE_FIELDS: &[&str] = &["title"];
const LINK_FIELDS: &[&str] = &["link", "url"];
const DESCRIPTION_FIELDS: &[&str] = &["description", "summary"];
const DATE_FIELDS: &[&str] = &["pubDate", "created", "date"];

/// Extract raw items from a JSON payload.
///
/// Only the first `limit` array entries are considered; entries that are not
/// objects count against the limit and are then skipped. A document without
/// a recognized items array yields no items. A body that is not valid JSON is
/// an error.
pub fn parse_items(body: &[u8], limit: usize) -> Result<Vec<RawItem>, Box<dyn Error>> {
    let doc: Value = serde_json::from_slice(body)?;

    let Some(entries) = ITEM_ARRAY_FIELDS
        .iter()
        .find_map(|field| doc.get(field).and_then(Value::as_array))
    else {
        debug!("JSON payload has no items array");
        return Ok(Vec::new());
    };

    Ok(entries
        .iter()
        .take(limit)
        .filter(|entry| entry.is_object())
        .map(raw_item)
        .collect())
}

fn raw_item(entry: &Value) -> RawItem {
    RawItem {
        title: first_string(entry, TITLE_FIELDS),
        link: first_string(entry, LINK_FIELDS),
        description: first_string(entry, DESCRIPTION_FIELDS),
        date: first_date(entry),
    }
}

fn first_string(entry: &Value, fields: &[&str]) -> Option<String> {
    fields
        .iter()
        .filter_map(|field| entry.get(field).and_then(Value::as_str))
        .find(|s| !s.is_empty())
        .map(str::to_string)
}

fn first_date(entry: &Value) -> Option<RawDate> {
    DATE_FIELDS.iter().find_map(|field| match entry.get(field)? {
        Value::String(s) if !s.is_empty() => Some(RawDate::Text(s.clone())),
        // Some APIs emit epoch milliseconds as floats.
        Value::Number(n) => n
            .as_i64()
            .or_else(|| n.as_f64().filter(|f| f.is_finite()).map(|f| f as i64))
            .map(RawDate::EpochMillis),
        _ => None,
    })
}
