// src/ingest/mod.rs
pub mod presets;
pub mod rss;
pub mod types;

use crate::ingest::types::{FeedFetcher, FetchOptions};
use crate::merge::{merge_with_stats, MergeStats};
use crate::news::{FeedSource, NewsItem};
use chrono::{DateTime, Duration, Utc};
use metrics::{counter, describe_counter, describe_gauge, describe_histogram, gauge};
use once_cell::sync::OnceCell;

/// Windows at or above this many hours are split into per-day Google News shards.
pub const SHARD_MIN_WINDOW_HOURS: u64 = 48;

/// Longest accepted fetch window (30 days). Larger requests are clamped here
/// and rejected at the HTTP edge.
pub const MAX_FETCH_WINDOW_HOURS: u64 = 24 * 30;

/// Summaries longer than this are cut.
pub const SUMMARY_MAX_CHARS: usize = 1500;

/// One-time metrics registration (so series show up on /metrics).
fn ensure_metrics_described() {
    static ONCE: OnceCell<()> = OnceCell::new();
    ONCE.get_or_init(|| {
        describe_counter!("ingest_items_total", "Total items parsed from feeds.");
        describe_counter!(
            "ingest_fetch_errors_total",
            "Feed fetch/parse errors (per URL or shard)."
        );
        describe_counter!(
            "ingest_window_dropped_total",
            "Items older than the fetch window."
        );
        describe_counter!(
            "merge_duplicates_total",
            "Items removed by link or title deduplication."
        );
        describe_counter!("merge_missing_link_total", "Items dropped for lacking a link.");
        describe_histogram!("ingest_parse_ms", "Feed parse time in milliseconds.");
        describe_gauge!(
            "ingest_last_run_ts",
            "Unix ts when fetch_and_merge last ran."
        );
    });
}

/// Normalize feed text: decode entities, strip tags, collapse whitespace, cap length.
pub fn normalize_text(s: &str) -> String {
    // 1) HTML entity decode
    let mut out = html_escape::decode_html_entities(s).to_string();

    // 2) Strip HTML tags
    static RE_TAGS: once_cell::sync::OnceCell<regex::Regex> = once_cell::sync::OnceCell::new();
    let re_tags = RE_TAGS.get_or_init(|| regex::Regex::new(r"(?is)</?[^>]+>").unwrap());
    out = re_tags.replace_all(&out, " ").to_string();

    // 3) Collapse whitespace
    static RE_WS: once_cell::sync::OnceCell<regex::Regex> = once_cell::sync::OnceCell::new();
    let re_ws = RE_WS.get_or_init(|| regex::Regex::new(r"\s+").unwrap());
    out = re_ws.replace_all(&out, " ").to_string();
    out = out.trim().to_string();

    // 4) Length cap
    if out.chars().count() > SUMMARY_MAX_CHARS {
        out = out.chars().take(SUMMARY_MAX_CHARS).collect();
    }

    out
}

fn with_scheme(url: &str) -> String {
    if url.starts_with("http") {
        url.to_string()
    } else {
        format!("https://{url}")
    }
}

fn google_news_path(url: &str) -> Option<(url::Url, String)> {
    let u = url::Url::parse(&with_scheme(url)).ok()?;
    let host = u.host_str()?.to_ascii_lowercase();
    if host != "news.google.com" && !host.ends_with(".news.google.com") {
        return None;
    }
    let path = u.path().to_string();
    Some((u, path))
}

/// Google News search feed (`/rss/search`, honours `after:`/`before:` in `q`).
pub fn is_google_news_search(url: &str) -> bool {
    google_news_path(url).is_some_and(|(_, p)| p.contains("/rss/search"))
}

/// Google News topics feed (`/rss/topics/...`).
pub fn is_google_news_topics(url: &str) -> bool {
    google_news_path(url).is_some_and(|(_, p)| p.contains("/rss/topics/"))
}

/// UTC days covering `[now - window, now]`, each as (after, before) in YYYY-MM-DD.
fn day_ranges(window_hours: u64, now: DateTime<Utc>) -> Vec<(String, String)> {
    let hours = window_hours.min(MAX_FETCH_WINDOW_HOURS) as i64;
    let Some(start) = Duration::try_hours(hours).and_then(|d| now.checked_sub_signed(d)) else {
        return Vec::new();
    };
    let start = start.date_naive();
    let end = now.date_naive();
    let mut out = Vec::new();
    let mut cur = start;
    while cur <= end {
        let Some(next) = cur.succ_opt() else { break };
        out.push((
            cur.format("%Y-%m-%d").to_string(),
            next.format("%Y-%m-%d").to_string(),
        ));
        cur = next;
    }
    out
}

fn set_query_param(u: &mut url::Url, key: &str, value: &str) {
    let mut pairs: Vec<(String, String)> = u
        .query_pairs()
        .map(|(k, v)| (k.into_owned(), v.into_owned()))
        .collect();
    match pairs.iter_mut().find(|(k, _)| k == key) {
        Some(p) => p.1 = value.to_string(),
        None => pairs.push((key.to_string(), value.to_string())),
    }
    u.query_pairs_mut().clear().extend_pairs(pairs);
}

/// URLs to fetch for `url`. Google News search/topics feeds with a window of
/// at least two days are split into one URL per UTC day; anything else is
/// fetched as-is. The window is clamped to [`MAX_FETCH_WINDOW_HOURS`].
pub fn shard_urls(url: &str, window_hours: u64, now: DateTime<Utc>) -> Vec<String> {
    let window_hours = window_hours.min(MAX_FETCH_WINDOW_HOURS);
    if window_hours < SHARD_MIN_WINDOW_HOURS {
        return vec![url.to_string()];
    }
    let search = is_google_news_search(url);
    let topics = !search && is_google_news_topics(url);
    let Some((base, _)) = google_news_path(url).filter(|_| search || topics) else {
        return vec![url.to_string()];
    };

    let q = base
        .query_pairs()
        .find(|(k, _)| k == "q")
        .map(|(_, v)| v.trim().to_string())
        .unwrap_or_default();

    day_ranges(window_hours, now)
        .into_iter()
        .map(|(after, before)| {
            let mut u = base.clone();
            if search {
                let date_part = format!("after:{after} before:{before}");
                let new_q = if q.is_empty() {
                    date_part
                } else {
                    format!("{q} {date_part}")
                };
                set_query_param(&mut u, "q", &new_q);
            } else {
                set_query_param(&mut u, "after", &after);
                set_query_param(&mut u, "before", &before);
            }
            u.to_string()
        })
        .collect()
}

/// Oldest accepted `pub_date` in ms, or `None` for no cutoff (window 0).
fn window_cutoff_ms(window_hours: u64, now: DateTime<Utc>) -> Option<i64> {
    if window_hours == 0 {
        return None;
    }
    let hours = window_hours.min(MAX_FETCH_WINDOW_HOURS) as i64;
    hours
        .checked_mul(3_600_000)
        .and_then(|span| now.timestamp_millis().checked_sub(span))
}

/// Fetch every shard of one source; failed shards are logged and skipped.
pub async fn fetch_source(
    fetcher: &dyn FeedFetcher,
    source: &FeedSource,
    opts: &FetchOptions,
    now: DateTime<Utc>,
) -> Vec<NewsItem> {
    let cutoff_ms = window_cutoff_ms(opts.fetch_window_hours, now);

    let mut out = Vec::new();
    for url in shard_urls(&source.url, opts.fetch_window_hours, now) {
        match fetcher.fetch_url(&url, source).await {
            Ok(items) => {
                let fetched = items.len();
                let kept_before = out.len();
                out.extend(items.into_iter().filter(|it| match (cutoff_ms, it.pub_date) {
                    (Some(cutoff), Some(ts)) => ts >= cutoff,
                    _ => true,
                }));
                let too_old = fetched - (out.len() - kept_before);
                if too_old > 0 {
                    counter!("ingest_window_dropped_total").increment(too_old as u64);
                }
            }
            Err(e) => {
                tracing::warn!(target: "ingest", error = ?e, fetcher = fetcher.name(), %url, "feed fetch failed");
                counter!("ingest_fetch_errors_total").increment(1);
            }
        }
    }
    out
}

/// Fetch all sources in order and merge them into one deduplicated list.
pub async fn fetch_and_merge(
    fetcher: &dyn FeedFetcher,
    sources: &[FeedSource],
    opts: &FetchOptions,
) -> (Vec<NewsItem>, MergeStats) {
    ensure_metrics_described();

    let now = Utc::now();
    let mut batches = Vec::with_capacity(sources.len());
    for s in sources {
        batches.push(fetch_source(fetcher, s, opts, now).await);
    }

    let (merged, stats) = merge_with_stats(batches);

    counter!("merge_duplicates_total").increment((stats.duplicate_links + stats.similar_titles) as u64);
    counter!("merge_missing_link_total").increment(stats.missing_link as u64);
    gauge!("ingest_last_run_ts").set(now.timestamp() as f64);

    tracing::info!(
        target: "ingest",
        sources = sources.len(),
        kept = stats.accepted,
        dropped = stats.dropped(),
        "fetch and merge done"
    );

    (merged, stats)
}
