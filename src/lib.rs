// src/lib.rs
// Public library surface for integration tests (and potential reuse).

pub mod news;

// Core pipeline: similarity → merge, catalog → filter
pub mod catalog;
pub mod filter;
pub mod merge;
pub mod similarity;

// Fetching, configuration and digest assembly
pub mod config;
pub mod digest;
pub mod ingest;

// Delivery & HTTP surface
pub mod api;
pub mod metrics;
pub mod notify;

// ---- Re-exports for stable public API ----
pub use crate::api::router;
pub use crate::catalog::{default_catalog, KeywordCatalog, PresetInfo};
pub use crate::filter::{filter_news, FilterDecision, FilterEngine};
pub use crate::ingest::fetch_and_merge;
pub use crate::merge::{merge_sources, normalize_link};
pub use crate::news::{FeedSource, FilterMode, NewsItem};
pub use crate::similarity::similarity;

/// `{id, label}` of every filter preset in the default catalog.
pub fn get_filter_presets_list() -> Vec<PresetInfo> {
    default_catalog().categories()
}
