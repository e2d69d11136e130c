// src/ingest/rss.rs
//! RSS 2.0 / Atom fetcher over HTTP, with an in-memory fixture mode.

use std::collections::HashMap;
use std::time::Duration;

use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use metrics::{counter, histogram};
use quick_xml::de::from_str;
use serde::Deserialize;
use time::format_description::well_known::{Rfc2822, Rfc3339};
use time::OffsetDateTime;

use crate::ingest::normalize_text;
use crate::ingest::types::FeedFetcher;
use crate::news::{FeedSource, NewsItem};

pub const USER_AGENT: &str = "NewsDigest/1.0";
pub const FETCH_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, Deserialize)]
struct Rss {
    channel: Channel,
}

#[derive(Debug, Deserialize)]
struct Channel {
    #[serde(rename = "item", default)]
    item: Vec<RssItem>,
}

#[derive(Debug, Deserialize)]
struct RssItem {
    title: Option<String>,
    link: Option<String>,
    guid: Option<String>,
    #[serde(rename = "pubDate")]
    pub_date: Option<String>,
    description: Option<String>,
}

#[derive(Debug, Deserialize)]
struct AtomFeed {
    #[serde(rename = "entry", default)]
    entry: Vec<AtomEntry>,
}

#[derive(Debug, Deserialize)]
struct AtomEntry {
    title: Option<String>,
    #[serde(default)]
    link: Vec<AtomLink>,
    id: Option<String>,
    published: Option<String>,
    updated: Option<String>,
    summary: Option<String>,
}

#[derive(Debug, Deserialize)]
struct AtomLink {
    #[serde(rename = "@href")]
    href: String,
    #[serde(rename = "@rel", default)]
    rel: Option<String>,
}

fn parse_rfc2822_to_ms(ts: &str) -> Option<i64> {
    OffsetDateTime::parse(ts.trim(), &Rfc2822)
        .ok()
        .map(|dt| dt.unix_timestamp() * 1000)
}

fn parse_rfc3339_to_ms(ts: &str) -> Option<i64> {
    OffsetDateTime::parse(ts.trim(), &Rfc3339)
        .ok()
        .map(|dt| dt.unix_timestamp() * 1000)
}

fn scrub_html_entities_for_xml(s: &str) -> String {
    s.replace("&nbsp;", " ")
        .replace("&ndash;", "-")
        .replace("&mdash;", "-")
        .replace("&ldquo;", "\"")
        .replace("&rdquo;", "\"")
        .replace("&lsquo;", "'")
        .replace("&rsquo;", "'")
        .replace("&hellip;", "...")
}

fn clean_title(s: Option<&str>) -> String {
    html_escape::decode_html_entities(s.unwrap_or_default())
        .trim()
        .to_string()
}

/// Parse an RSS 2.0 or Atom document into items for `source`.
/// Items without a parseable date are stamped with `now_ms`.
pub fn parse_feed(xml: &str, source: &FeedSource, now_ms: i64) -> Result<Vec<NewsItem>> {
    let t0 = std::time::Instant::now();
    let xml_clean = scrub_html_entities_for_xml(xml);

    let out = match from_str::<Rss>(&xml_clean) {
        Ok(rss) => rss
            .channel
            .item
            .into_iter()
            .map(|it| NewsItem {
                title: clean_title(it.title.as_deref()),
                summary: normalize_text(it.description.as_deref().unwrap_or_default()),
                link: it
                    .link
                    .or(it.guid)
                    .map(|l| l.trim().to_string())
                    .unwrap_or_default(),
                source_label: source.label.clone(),
                source_url: Some(source.url.clone()),
                pub_date: Some(
                    it.pub_date
                        .as_deref()
                        .and_then(parse_rfc2822_to_ms)
                        .unwrap_or(now_ms),
                ),
            })
            .collect::<Vec<_>>(),
        Err(rss_err) => {
            let feed: AtomFeed = from_str(&xml_clean).map_err(|atom_err| {
                anyhow!("feed is neither RSS ({rss_err}) nor Atom ({atom_err})")
            })?;
            feed.entry
                .into_iter()
                .map(|e| {
                    let link = e
                        .link
                        .iter()
                        .find(|l| l.rel.as_deref().map_or(true, |r| r == "alternate"))
                        .or_else(|| e.link.first())
                        .map(|l| l.href.trim().to_string())
                        .or(e.id)
                        .unwrap_or_default();
                    NewsItem {
                        title: clean_title(e.title.as_deref()),
                        summary: normalize_text(e.summary.as_deref().unwrap_or_default()),
                        link,
                        source_label: source.label.clone(),
                        source_url: Some(source.url.clone()),
                        pub_date: Some(
                            e.published
                                .as_deref()
                                .or(e.updated.as_deref())
                                .and_then(parse_rfc3339_to_ms)
                                .unwrap_or(now_ms),
                        ),
                    }
                })
                .collect::<Vec<_>>()
        }
    };

    let ms = t0.elapsed().as_secs_f64() * 1_000.0;
    histogram!("ingest_parse_ms").record(ms);
    counter!("ingest_items_total").increment(out.len() as u64);
    Ok(out)
}

pub struct RssFetcher {
    mode: Mode,
}

enum Mode {
    /// url -> xml body
    Fixture(HashMap<String, String>),
    Http(reqwest::Client),
}

impl RssFetcher {
    pub fn http() -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(FETCH_TIMEOUT)
            .user_agent(USER_AGENT)
            .build()
            .context("building feed http client")?;
        Ok(Self {
            mode: Mode::Http(client),
        })
    }

    /// Serve canned documents keyed by URL; unknown URLs fail like a 404.
    pub fn from_fixtures<I, K, V>(docs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        Self {
            mode: Mode::Fixture(
                docs.into_iter()
                    .map(|(k, v)| (k.into(), v.into()))
                    .collect(),
            ),
        }
    }
}

#[async_trait]
impl FeedFetcher for RssFetcher {
    async fn fetch_url(&self, url: &str, source: &FeedSource) -> Result<Vec<NewsItem>> {
        let now_ms = chrono::Utc::now().timestamp_millis();
        match &self.mode {
            Mode::Fixture(docs) => {
                let body = docs
                    .get(url)
                    .ok_or_else(|| anyhow!("no fixture for {url}"))?;
                parse_feed(body, source, now_ms)
            }
            Mode::Http(client) => {
                let resp = client
                    .get(url)
                    .send()
                    .await
                    .with_context(|| format!("GET {url}"))?
                    .error_for_status()
                    .with_context(|| format!("GET {url}"))?;
                let body = resp.text().await.context("feed http .text()")?;
                parse_feed(&body, source, now_ms)
                    .with_context(|| format!("parsing feed {url}"))
            }
        }
    }

    fn name(&self) -> &'static str {
        match self.mode {
            Mode::Fixture(_) => "rss-fixture",
            Mode::Http(_) => "rss",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const RSS: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<rss version="2.0">
  <channel>
    <title>Example</title>
    <item>
      <title>Senate passes budget &amp; more</title>
      <link>https://example.com/a?utm_source=rss</link>
      <pubDate>Tue, 10 Jun 2025 12:00:00 +0000</pubDate>
      <description>&lt;p&gt;Lawmakers&nbsp;voted late.&lt;/p&gt;</description>
    </item>
    <item>
      <title>No link here</title>
      <guid isPermaLink="false">urn:example:2</guid>
    </item>
  </channel>
</rss>"#;

    const ATOM: &str = r#"<?xml version="1.0" encoding="utf-8"?>
<feed xmlns="http://www.w3.org/2005/Atom">
  <title>Atom example</title>
  <entry>
    <title>Stadium opens</title>
    <link rel="alternate" href="https://atom.example/stadium"/>
    <id>tag:atom.example,2025:1</id>
    <updated>2025-06-10T08:30:00Z</updated>
    <summary>A new stadium.</summary>
  </entry>
</feed>"#;

    fn src() -> FeedSource {
        FeedSource::new("https://example.com/rss", "Example")
    }

    #[test]
    fn parses_rss_items() {
        let items = parse_feed(RSS, &src(), 42).unwrap();
        assert_eq!(items.len(), 2);
        assert_eq!(items[0].title, "Senate passes budget & more");
        assert_eq!(items[0].link, "https://example.com/a?utm_source=rss");
        assert_eq!(items[0].summary, "Lawmakers voted late.");
        assert_eq!(items[0].source_label, "Example");
        assert_eq!(items[0].source_url.as_deref(), Some("https://example.com/rss"));
        assert_eq!(items[0].pub_date, Some(1_749_556_800_000));
        // guid fallback + missing date -> now
        assert_eq!(items[1].link, "urn:example:2");
        assert_eq!(items[1].pub_date, Some(42));
    }

    #[test]
    fn parses_atom_entries() {
        let items = parse_feed(ATOM, &src(), 0).unwrap();
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].title, "Stadium opens");
        assert_eq!(items[0].link, "https://atom.example/stadium");
        assert_eq!(items[0].summary, "A new stadium.");
        assert_eq!(items[0].pub_date, Some(1_749_544_200_000));
    }

    #[tokio::test]
    async fn fixture_mode_serves_by_url() {
        let f = RssFetcher::from_fixtures([("https://example.com/rss", RSS)]);
        let items = f.fetch_url("https://example.com/rss", &src()).await.unwrap();
        assert_eq!(items.len(), 2);
        assert!(f.fetch_url("https://other.example/rss", &src()).await.is_err());
    }
}
