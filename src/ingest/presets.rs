// src/ingest/presets.rs
//! Google News source presets: a `news.google.com` source with a known
//! section label is swapped for that section's RSS URL.

use crate::news::FeedSource;

const US_PARAMS: &str = "hl=en-US&gl=US&ceid=US:en";

const SECTIONS: &[(&str, &str)] = &[
    ("Home", ""),
    ("For you", ""),
    ("U.S.", "CAAqIggKIhxDQkFTRHdvSkwyMHZNRGxqTjNjd0VnSmxiaWdBUAE"),
    ("World", "CAAqJggKIiBDQkFTRWdvSUwyMHZNRGRqTVhZU0FtVnVHZ0pWVXlnQVAB"),
    ("Local", "CAAqIggKIhxDQkFTRHdvSkwyMHZNRGxqTjNjd0VnSmxiaWdBUAE"),
    ("Business", "CAAqJggKIiBDQkFTRWdvSUwyMHZNRGx6TVdZU0FtVnVHZ0pWVXlnQVAB"),
    ("Technology", "CAAqJggKIiBDQkFTRWdvSUwyMHZNRGRqTVhZU0FtVnVHZ0pIUWlnQVAB"),
    ("Entertainment", "CAAqJggKIiBDQkFTRWdvSUwyMHZNREpxYW5RU0FtVnVHZ0pWVXlnQVAB"),
    ("Sports", "CAAqJggKIiBDQkFTRWdvSUwyMHZNREpxYW5RU0FtVnVHZ0pWVXlnQVAB"),
    ("Science", "CAAqJggKIiBDQkFTRWdvSUwyMHZNRFp0Y1RjU0FtVnVHZ0pWVXlnQVAB"),
    ("Health", "CAAqIQgKIhtDQkFTRGdvSUwyMHZNR3QwTlRFU0FtVnVLQUFQAQ"),
];

const LABEL_ALIASES: &[(&str, &str)] = &[
    ("us", "U.S."),
    ("u.s.", "U.S."),
    ("u.s", "U.S."),
    ("world", "World"),
    ("home", "Home"),
    ("business", "Business"),
    ("tech", "Technology"),
    ("technology", "Technology"),
    ("entertainment", "Entertainment"),
    ("sports", "Sports"),
    ("science", "Science"),
    ("health", "Health"),
    ("local", "Local"),
    ("for you", "For you"),
];

fn section_url(topic: &str) -> String {
    if topic.is_empty() {
        format!("https://news.google.com/rss?{US_PARAMS}")
    } else {
        format!("https://news.google.com/rss/topics/{topic}?{US_PARAMS}")
    }
}

fn canonical_label(label: &str) -> &str {
    let trimmed = label.trim();
    let lower = trimmed.to_lowercase();
    LABEL_ALIASES
        .iter()
        .find(|(alias, _)| *alias == lower)
        .map(|(_, canon)| *canon)
        .unwrap_or(trimmed)
}

/// `news.google.com` (or a subdomain) with no feed path, as entered when
/// picking a section. Explicit `/rss/...` feeds are never rewritten.
fn is_bare_google_news(url: &str) -> bool {
    let with_scheme = if url.starts_with("http") {
        url.to_string()
    } else {
        format!("https://{url}")
    };
    let Ok(u) = url::Url::parse(&with_scheme) else {
        return false;
    };
    let host_ok = u.host_str().is_some_and(|h| {
        let h = h.to_ascii_lowercase();
        h == "news.google.com" || h.ends_with(".news.google.com")
    });
    host_ok && u.path().trim_end_matches('/').is_empty()
}

/// Preset RSS URL for a bare Google News source with a known label (empty label = Home).
pub fn google_news_preset_url(url: &str, label: &str) -> Option<String> {
    if !is_bare_google_news(url) {
        return None;
    }
    let label = if label.is_empty() { "Home" } else { label };
    let canon = canonical_label(label);
    SECTIONS
        .iter()
        .find(|(name, _)| *name == canon)
        .map(|(_, topic)| section_url(topic))
}

/// Swap in the preset URL when one applies; otherwise return the source unchanged.
pub fn resolve_source(source: FeedSource) -> FeedSource {
    match google_news_preset_url(&source.url, &source.label) {
        Some(url) => FeedSource { url, ..source },
        None => source,
    }
}

/// `{id, label}` for each Google News section, id = lowercased, dash-joined label.
pub fn google_news_presets_list() -> Vec<crate::catalog::PresetInfo> {
    SECTIONS
        .iter()
        .map(|(label, _)| crate::catalog::PresetInfo {
            id: label
                .to_lowercase()
                .split_whitespace()
                .collect::<Vec<_>>()
                .join("-"),
            label: label.to_string(),
        })
        .collect()
}
