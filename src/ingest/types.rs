// src/ingest/types.rs
use anyhow::Result;

use crate::news::{FeedSource, NewsItem};

/// Options applied while fetching a source.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct FetchOptions {
    /// Only keep items published within this many hours. 0 = no cutoff.
    #[serde(default)]
    pub fetch_window_hours: u64,
}

/// Fetches one feed URL on behalf of `source` (the URL may be a shard of
/// `source.url`). Items come back in feed order.
#[async_trait::async_trait]
pub trait FeedFetcher: Send + Sync {
    async fn fetch_url(&self, url: &str, source: &FeedSource) -> Result<Vec<NewsItem>>;
    fn name(&self) -> &'static str;
}
