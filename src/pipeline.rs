//! The aggregation pipeline: fetch, normalize, merge, dedup, sort, truncate.
//!
//! All sources are fetched concurrently on the current task with
//! [`join_all`], which yields results in registry order regardless of which
//! response arrives first. Per-source failures are logged and turned into an
//! empty contribution; nothing here can fail the run.

use chrono::{DateTime, Utc};
use futures::future::join_all;
use itertools::Itertools;
use tracing::{debug, info, instrument, warn};

use crate::config::{Config, SourceConfig};
use crate::fetcher::FetchBody;
use crate::models::FeedItem;
use crate::sources::{self, NormalizeLimits};
use crate::utils::{error_chain, truncate_for_log};

/// What one source contributed to the run.
#[derive(Debug)]
pub struct SourceOutcome {
    /// The source's display name.
    pub source: String,
    /// Normalized items, or the error (with its causes) when the source was skipped.
    pub result: Result<Vec<FeedItem>, String>,
}

impl SourceOutcome {
    pub fn item_count(&self) -> usize {
        self.result.as_ref().map_or(0, Vec::len)
    }
}

/// Counts gathered while building a snapshot.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct RunStats {
    pub sources_ok: usize,
    pub sources_failed: usize,
    pub fetched: usize,
    pub empty_titles: usize,
    pub duplicates: usize,
    pub fallback_timestamps: usize,
    pub written: usize,
}

/// Fetch and normalize one source, absorbing any failure.
#[instrument(level = "info", skip_all, fields(source = %source.name))]
async fn collect_source<F: FetchBody>(
    fetcher: &F,
    source: &SourceConfig,
    limits: NormalizeLimits,
    now: DateTime<Utc>,
) -> SourceOutcome {
    let result = match fetcher.fetch(&source.url).await {
        Ok(body) => sources::normalize(&body, source, limits, now).map_err(|e| {
            let preview = String::from_utf8_lossy(&body);
            debug!(body_preview = %truncate_for_log(&preview, 200), "Unparseable payload");
            error_chain(e.as_ref())
        }),
        Err(e) => Err(error_chain(e.as_ref())),
    };

    match &result {
        Ok(items) => info!(count = items.len(), "Fetched source"),
        Err(e) => warn!(source = %source.name, url = %source.url, error = %e, "source fetch failed; skipping"),
    }

    SourceOutcome {
        source: source.name.clone(),
        result,
    }
}

/// Fetch every source concurrently and wait for all of them to settle.
///
/// The returned outcomes are in the same order as `sources`.
pub async fn fetch_all<F: FetchBody>(
    fetcher: &F,
    sources: &[SourceConfig],
    limits: NormalizeLimits,
    now: DateTime<Utc>,
) -> Vec<SourceOutcome> {
    join_all(
        sources
            .iter()
            .map(|source| collect_source(fetcher, source, limits, now)),
    )
    .await
}

/// Concatenate per-source items in registry order.
pub fn aggregate(outcomes: Vec<SourceOutcome>) -> Vec<FeedItem> {
    outcomes
        .into_iter()
        .filter_map(|outcome| outcome.result.ok())
        .flatten()
        .collect()
}

/// Drop empty titles, then keep the first item for each case-insensitive title.
pub fn dedup(items: Vec<FeedItem>) -> Vec<FeedItem> {
    items
        .into_iter()
        .filter(|item| !item.title.is_empty())
        .unique_by(FeedItem::dedup_key)
        .collect()
}

/// Stable sort by timestamp, newest first, then keep at most `max` items.
pub fn sort_and_truncate(mut items: Vec<FeedItem>, max: usize) -> Vec<FeedItem> {
    items.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
    items.truncate(max);
    items
}

/// Run fetch through truncate and return the snapshot with its stats.
#[instrument(level = "info", skip_all, fields(sources = config.sources.len()))]
pub async fn build_snapshot<F: FetchBody>(
    fetcher: &F,
    config: &Config,
    now: DateTime<Utc>,
) -> (Vec<FeedItem>, RunStats) {
    let limits = NormalizeLimits {
        items_per_source: config.items_per_source,
        description_length: config.description_length,
    };

    let outcomes = fetch_all(fetcher, &config.sources, limits, now).await;

    let mut stats = RunStats::default();
    for outcome in &outcomes {
        match &outcome.result {
            Ok(_) => stats.sources_ok += 1,
            Err(_) => stats.sources_failed += 1,
        }
        debug!(source = %outcome.source, count = outcome.item_count(), "Source outcome");
    }

    let all = aggregate(outcomes);
    stats.fetched = all.len();
    stats.empty_titles = all.iter().filter(|i| i.title.is_empty()).count();

    let unique = dedup(all);
    stats.duplicates = stats.fetched - stats.empty_titles - unique.len();

    let snapshot = sort_and_truncate(unique, config.max_items);
    stats.fallback_timestamps = snapshot.iter().filter(|i| i.timestamp_is_fallback).count();
    stats.written = snapshot.len();

    if stats.sources_ok == 0 {
        warn!(failed = stats.sources_failed, "every source failed; snapshot is empty");
    }

    (snapshot, stats)
}
