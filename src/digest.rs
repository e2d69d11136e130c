// src/digest.rs
//! Digest pipeline: fetch → merge → filter → translate → HTML.

use async_trait::async_trait;
use metrics::counter;
use serde::Serialize;
use tracing::info;

use crate::catalog::KeywordCatalog;
use crate::config::DigestConfig;
use crate::filter::FilterEngine;
use crate::ingest::presets::resolve_source;
use crate::ingest::types::FeedFetcher;
use crate::ingest::fetch_and_merge;
use crate::merge::MergeStats;
use crate::news::{FeedSource, NewsItem};

pub const EMPTY_DIGEST_HTML: &str = "<p>今日暂无符合筛选条件的新闻。</p>";

/// Text translation hook. Failures should fall back to the input text.
#[async_trait]
pub trait Translator: Send + Sync {
    async fn translate(&self, text: &str) -> String;
}

/// Leaves text untouched.
#[derive(Debug, Clone, Copy, Default)]
pub struct PassThrough;

#[async_trait]
impl Translator for PassThrough {
    async fn translate(&self, text: &str) -> String {
        text.to_string()
    }
}

/// One rendered digest row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DigestRow {
    pub title: String,
    pub summary: String,
    pub link: String,
    pub source_label: String,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct DigestStats {
    pub merge: MergeStats,
    pub filtered_out: usize,
    pub delivered: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct DigestOutcome {
    pub items: Vec<NewsItem>,
    pub html: String,
    pub stats: DigestStats,
}

fn escape(s: &str) -> String {
    html_escape::encode_double_quoted_attribute(s).to_string()
}

/// Render rows as a bordered HTML table; no rows → a short notice.
pub fn render_digest_html(rows: &[DigestRow]) -> String {
    if rows.is_empty() {
        return EMPTY_DIGEST_HTML.to_string();
    }

    let trs: String = rows
        .iter()
        .map(|r| {
            let link = escape(&r.link);
            format!(
                "\n    <tr>\n      <td><a href=\"{link}\">{}</a></td>\n      <td>{}</td>\n      <td><a href=\"{link}\">{}</a></td>\n    </tr>",
                escape(&r.title),
                escape(&r.summary),
                escape(&r.source_label),
            )
        })
        .collect();

    format!(
        r#"
  <table border="1" cellpadding="8" cellspacing="0" style="border-collapse: collapse; width: 100%;">
    <thead>
      <tr style="background: #f0f0f0;">
        <th>标题</th>
        <th>摘要</th>
        <th>来源</th>
      </tr>
    </thead>
    <tbody>{trs}
    </tbody>
  </table>
"#
    )
}

/// Translate title and summary of each item, in order.
pub async fn translate_items(translator: &dyn Translator, items: &[NewsItem]) -> Vec<DigestRow> {
    let mut rows = Vec::with_capacity(items.len());
    for it in items {
        rows.push(DigestRow {
            title: translator.translate(&it.title).await,
            summary: translator.translate(&it.summary).await,
            link: it.link.clone(),
            source_label: it.source_label.clone(),
        });
    }
    rows
}

/// Run the whole pipeline for one configuration. Never fails: unreachable
/// sources just contribute no items.
pub async fn build_digest(
    fetcher: &dyn FeedFetcher,
    translator: &dyn Translator,
    catalog: &KeywordCatalog,
    cfg: &DigestConfig,
) -> DigestOutcome {
    let sources: Vec<FeedSource> = cfg.sources.iter().cloned().map(resolve_source).collect();
    let (merged, merge) = fetch_and_merge(fetcher, &sources, &cfg.fetch_options()).await;

    let before = merged.len();
    let items = FilterEngine::new(catalog).filter(merged, cfg.filter.mode, &cfg.filter.categories);
    let filtered_out = before - items.len();

    let rows = translate_items(translator, &items).await;
    let html = render_digest_html(&rows);

    counter!("digest_runs_total").increment(1);
    info!(
        target: "digest",
        sources = sources.len(),
        merged = before,
        delivered = items.len(),
        mode = %cfg.filter.mode,
        "digest built"
    );

    DigestOutcome {
        stats: DigestStats {
            merge,
            filtered_out,
            delivered: items.len(),
        },
        items,
        html,
    }
}
