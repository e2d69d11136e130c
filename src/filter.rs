// src/filter.rs
//! Include/exclude filtering of news items by preset keyword categories.
//!
//! Per item:
//! 1. `raw = lower(title) + " " + lower(summary)`
//! 2. `text = catalog.strip_false_positives(raw)`
//! 3. matched = selected keywords found in `text` (substring)
//! 4. include: keep if matched, unless every match is weak and there is only
//!    one of them, or `raw` carries a commercial marker.
//!    exclude: keep only if nothing matched.
//!
//! An empty keyword selection (no ids, or only unknown ids) disables filtering.

use std::collections::BTreeSet;

use metrics::counter;
use tracing::info;

use crate::catalog::{default_catalog, KeywordCatalog};
use crate::news::{FilterMode, NewsItem};

/// Minimum distinct matches when every match is weak.
pub const WEAK_CORROBORATION_MIN: usize = 2;

/// Outcome of evaluating one item. Not persisted.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct FilterDecision {
    pub keep: bool,
    pub matched: Vec<String>,
    pub weak_only: bool,
    pub commercial: Option<String>,
    pub reasons: Vec<String>,
}

/// Dev logging gate: DIGEST_DEV_LOG=1 AND dev env (debug or SHUTTLE_ENV in {local,development,dev})
pub(crate) fn dev_logging_enabled() -> bool {
    let on = std::env::var("DIGEST_DEV_LOG").ok().as_deref() == Some("1");
    if !on {
        return false;
    }
    if cfg!(debug_assertions) {
        return true;
    }
    matches!(
        std::env::var("SHUTTLE_ENV")
            .unwrap_or_default()
            .to_ascii_lowercase()
            .as_str(),
        "local" | "development" | "dev"
    )
}

/// Short, stable id for log lines so raw headlines never hit the logs.
pub(crate) fn anon_hash(text: &str) -> String {
    use sha2::{Digest, Sha256};
    let mut hasher = Sha256::new();
    hasher.update(text.as_bytes());
    let digest = hasher.finalize();
    let mut out = String::with_capacity(12);
    for b in digest.iter().take(6) {
        use std::fmt::Write as _;
        let _ = write!(&mut out, "{:02x}", b);
    }
    out
}

fn truncate_vec<T: ToString>(v: &[T], max: usize) -> Vec<String> {
    v.iter().take(max).map(|x| x.to_string()).collect()
}

fn dev_log_decision(item: &NewsItem, mode: FilterMode, d: &FilterDecision) {
    if !dev_logging_enabled() {
        return;
    }
    let id = anon_hash(&format!("{}|{}", item.link, item.title));
    info!(
        target: "filter",
        %id, %mode, keep = d.keep,
        matched = ?truncate_vec(&d.matched, 5),
        reasons = ?truncate_vec(&d.reasons, 5)
    );
}

/// Filter engine bound to a catalog.
#[derive(Debug, Clone, Copy)]
pub struct FilterEngine<'a> {
    catalog: &'a KeywordCatalog,
}

impl<'a> FilterEngine<'a> {
    pub fn new(catalog: &'a KeywordCatalog) -> Self {
        Self { catalog }
    }

    /// Keep/drop `items` per rule; survivors keep their input order.
    pub fn filter<S: AsRef<str>>(
        &self,
        items: Vec<NewsItem>,
        mode: FilterMode,
        category_ids: &[S],
    ) -> Vec<NewsItem> {
        let keywords = self.catalog.expand(category_ids);
        if keywords.is_empty() {
            return items;
        }

        let total = items.len();
        let kept: Vec<NewsItem> = items
            .into_iter()
            .filter(|item| {
                let d = self.evaluate_with(item, mode, &keywords);
                dev_log_decision(item, mode, &d);
                d.keep
            })
            .collect();

        counter!("filter_kept_total").increment(kept.len() as u64);
        counter!("filter_dropped_total").increment((total - kept.len()) as u64);
        kept
    }

    /// Evaluate one item against the expanded keywords of `category_ids`.
    /// With no effective keywords every item is kept.
    pub fn evaluate<S: AsRef<str>>(
        &self,
        item: &NewsItem,
        mode: FilterMode,
        category_ids: &[S],
    ) -> FilterDecision {
        let keywords = self.catalog.expand(category_ids);
        if keywords.is_empty() {
            return FilterDecision {
                keep: true,
                reasons: vec!["no_keywords".into()],
                ..FilterDecision::default()
            };
        }
        self.evaluate_with(item, mode, &keywords)
    }

    fn evaluate_with(
        &self,
        item: &NewsItem,
        mode: FilterMode,
        keywords: &BTreeSet<&str>,
    ) -> FilterDecision {
        let raw = format!(
            "{} {}",
            item.title.to_lowercase(),
            item.summary.to_lowercase()
        );
        let text = self.catalog.strip_false_positives(&raw);

        let matched: Vec<String> = keywords
            .iter()
            .filter(|kw| text.contains(&kw.to_lowercase()))
            .map(|kw| kw.to_string())
            .collect();
        let weak_only = !matched.is_empty() && matched.iter().all(|kw| self.catalog.is_weak(kw));

        let mut reasons = Vec::new();
        let (keep, commercial) = match mode {
            FilterMode::Include => {
                let category_hit = !matched.is_empty()
                    && (!weak_only || matched.len() >= WEAK_CORROBORATION_MIN);
                // checked against unstripped text
                let commercial = self
                    .catalog
                    .commercial_keywords()
                    .iter()
                    .find(|kw| raw.contains(kw.as_str()))
                    .cloned();

                if matched.is_empty() {
                    reasons.push("no_match".into());
                } else if !category_hit {
                    reasons.push("weak_only_uncorroborated".into());
                } else {
                    reasons.push(format!("match:{}", matched.len()));
                }
                if let Some(kw) = &commercial {
                    reasons.push(format!("commercial:{kw}"));
                }
                (category_hit && commercial.is_none(), commercial)
            }
            FilterMode::Exclude => {
                if matched.is_empty() {
                    reasons.push("no_match".into());
                } else {
                    reasons.push(format!("excluded_match:{}", matched.len()));
                }
                (matched.is_empty(), None)
            }
        };

        FilterDecision {
            keep,
            matched,
            weak_only,
            commercial,
            reasons,
        }
    }
}

/// Filter with the process-wide default catalog.
pub fn filter_news<S: AsRef<str>>(
    items: Vec<NewsItem>,
    mode: FilterMode,
    category_ids: &[S],
) -> Vec<NewsItem> {
    FilterEngine::new(default_catalog()).filter(items, mode, category_ids)
}
