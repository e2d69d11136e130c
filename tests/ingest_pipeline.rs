// tests/ingest_pipeline.rs
// End-to-end fetch → merge → filter → render over canned feed documents.

use chrono::{Duration, Utc};
use news_digest::config::{DigestConfig, FilterRule};
use news_digest::digest::{build_digest, PassThrough, EMPTY_DIGEST_HTML};
use news_digest::ingest::rss::RssFetcher;
use news_digest::ingest::types::FetchOptions;
use news_digest::{fetch_and_merge, FeedSource, FilterMode, KeywordCatalog};

const WIRE: &str = "https://wire.example/rss";
const DAILY: &str = "https://daily.example/atom";
const DOWN: &str = "https://down.example/rss";

fn rss(items: &[(&str, &str, &str, i64)]) -> String {
    let now = Utc::now();
    let body: String = items
        .iter()
        .map(|(title, desc, link, hours_ago)| {
            let date = (now - Duration::hours(*hours_ago)).to_rfc2822();
            format!(
                "<item><title>{title}</title><description>{desc}</description>\
                 <link>{link}</link><pubDate>{date}</pubDate></item>"
            )
        })
        .collect();
    format!(
        "<?xml version=\"1.0\"?><rss version=\"2.0\"><channel><title>t</title>{body}</channel></rss>"
    )
}

fn atom(entries: &[(&str, &str, &str, i64)]) -> String {
    let now = Utc::now();
    let body: String = entries
        .iter()
        .map(|(title, summary, href, hours_ago)| {
            let date = (now - Duration::hours(*hours_ago)).to_rfc3339();
            format!(
                "<entry><title>{title}</title><summary>{summary}</summary>\
                 <link href=\"{href}\"/><updated>{date}</updated></entry>"
            )
        })
        .collect();
    format!("<?xml version=\"1.0\"?><feed xmlns=\"http://www.w3.org/2005/Atom\"><title>t</title>{body}</feed>")
}

fn fixtures() -> RssFetcher {
    RssFetcher::from_fixtures([
        (
            WIRE,
            rss(&[
                ("Senate passes budget bill", "Vote was close", "https://wire.example/a?ref=rss", 1),
                ("Chip maker unveils new AI processor", "Technology news", "https://wire.example/b", 2),
                ("Old election recap", "From last week", "https://wire.example/c", 24 * 7),
            ]),
        ),
        (
            DAILY,
            atom(&[
                ("Senate passes budget bill", "Same story", "https://wire.example/a#comments", 1),
                ("Football final goes to penalties", "Sports", "https://daily.example/f", 3),
            ]),
        ),
    ])
}

fn sources() -> Vec<FeedSource> {
    vec![
        FeedSource::new(WIRE, "Wire"),
        FeedSource::new(DOWN, "Down"),
        FeedSource::new(DAILY, "Daily"),
    ]
}

#[tokio::test]
async fn failing_source_is_skipped_and_duplicates_merge() {
    let fetcher = fixtures();
    let (items, stats) = fetch_and_merge(&fetcher, &sources(), &FetchOptions::default()).await;

    let titles: Vec<_> = items.iter().map(|i| i.title.as_str()).collect();
    assert_eq!(
        titles,
        vec![
            "Senate passes budget bill",
            "Chip maker unveils new AI processor",
            "Old election recap",
            "Football final goes to penalties",
        ]
    );
    assert_eq!(items[0].source_label, "Wire");
    assert_eq!(stats.duplicate_links, 1);
}

#[tokio::test]
async fn fetch_window_drops_stale_items() {
    let fetcher = fixtures();
    let opts = FetchOptions {
        fetch_window_hours: 24,
    };
    let (items, _) = fetch_and_merge(&fetcher, &sources(), &opts).await;
    assert!(items.iter().all(|i| i.title != "Old election recap"));
    assert_eq!(items.len(), 3);
}

#[tokio::test]
async fn digest_filters_and_renders() {
    let fetcher = fixtures();
    let cfg = DigestConfig {
        sources: sources(),
        filter: FilterRule {
            mode: FilterMode::Include,
            categories: vec!["politics".into()],
        },
        fetch_window_hours: 24,
        recipients: vec![],
    };
    let out = build_digest(&fetcher, &PassThrough, &KeywordCatalog::builtin(), &cfg).await;

    assert_eq!(out.items.len(), 1);
    assert_eq!(out.items[0].title, "Senate passes budget bill");
    assert_eq!(out.stats.delivered, 1);
    assert_eq!(out.stats.filtered_out, 2);
    assert!(out.html.contains("<table"));
    assert!(out.html.contains("Senate passes budget bill"));
    assert!(!out.html.contains("Football"));
}

#[tokio::test]
async fn digest_with_no_survivors_renders_notice() {
    let fetcher = fixtures();
    let cfg = DigestConfig {
        sources: vec![FeedSource::new(DOWN, "Down")],
        ..DigestConfig::default()
    };
    let out = build_digest(&fetcher, &PassThrough, &KeywordCatalog::builtin(), &cfg).await;
    assert!(out.items.is_empty());
    assert_eq!(out.html, EMPTY_DIGEST_HTML);
}

#[tokio::test]
async fn exclude_mode_digest_is_the_complement() {
    let fetcher = fixtures();
    let cfg = DigestConfig {
        sources: sources(),
        filter: FilterRule {
            mode: FilterMode::Exclude,
            categories: vec!["politics".into()],
        },
        ..DigestConfig::default()
    };
    let out = build_digest(&fetcher, &PassThrough, &KeywordCatalog::builtin(), &cfg).await;
    let titles: Vec<_> = out.items.iter().map(|i| i.title.as_str()).collect();
    assert_eq!(
        titles,
        vec!["Chip maker unveils new AI processor", "Football final goes to penalties"]
    );
}
