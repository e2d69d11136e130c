// src/merge.rs
//! Multi-source merge with URL-normalized and fuzzy-title deduplication.
//!
//! - Sources are folded in the order given; items keep fetch order.
//! - Items without a link never reach the output.
//! - Duplicate key: `origin + path` of the link (query and fragment dropped).
//! - Near duplicate: title similarity above [`TITLE_SIMILARITY_THRESHOLD`]
//!   to any already accepted item. The first-seen item always wins.

use std::collections::HashSet;

use crate::news::NewsItem;
use crate::similarity::similarity;

/// Titles scoring strictly above this are treated as the same story.
pub const TITLE_SIMILARITY_THRESHOLD: f64 = 0.85;

/// Reduce a link to `origin + path`. Unparseable links are their own key.
pub fn normalize_link(link: &str) -> String {
    match url::Url::parse(link) {
        Ok(u) => format!("{}{}", u.origin().ascii_serialization(), u.path()),
        Err(_) => link.to_string(),
    }
}

/// Counters describing one merge run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, serde::Serialize)]
pub struct MergeStats {
    pub accepted: usize,
    pub missing_link: usize,
    pub duplicate_links: usize,
    pub similar_titles: usize,
}

impl MergeStats {
    pub fn dropped(&self) -> usize {
        self.missing_link + self.duplicate_links + self.similar_titles
    }
}

/// Merge per-source item lists into one deduplicated sequence.
pub fn merge_sources<B>(batches: B) -> Vec<NewsItem>
where
    B: IntoIterator,
    B::Item: IntoIterator<Item = NewsItem>,
{
    merge_with_stats(batches).0
}

/// Same as [`merge_sources`], also returning what was dropped and why.
pub fn merge_with_stats<B>(batches: B) -> (Vec<NewsItem>, MergeStats)
where
    B: IntoIterator,
    B::Item: IntoIterator<Item = NewsItem>,
{
    let mut stats = MergeStats::default();
    let mut seen: HashSet<String> = HashSet::new();
    // (normalized link, item) in acceptance order
    let mut accepted: Vec<(String, NewsItem)> = Vec::new();

    for batch in batches {
        for item in batch {
            if item.link.is_empty() {
                stats.missing_link += 1;
                continue;
            }
            let norm = normalize_link(&item.link);
            if seen.contains(&norm) {
                stats.duplicate_links += 1;
                continue;
            }

            let near_dup = accepted.iter().any(|(key, prev)| {
                *key == norm || similarity(&prev.title, &item.title) > TITLE_SIMILARITY_THRESHOLD
            });
            if near_dup {
                stats.similar_titles += 1;
                continue;
            }

            seen.insert(norm.clone());
            accepted.push((norm, item));
        }
    }

    stats.accepted = accepted.len();
    let out = accepted.into_iter().map(|(_, item)| item).collect();
    (out, stats)
}
