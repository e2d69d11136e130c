// src/news.rs
//! Value types shared by the fetch, merge and filter stages.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// A fetched article. Produced by a fetcher, never mutated afterwards.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct NewsItem {
    pub title: String,
    #[serde(default)]
    pub summary: String,
    /// Canonical article URL; empty for malformed feed entries.
    #[serde(default)]
    pub link: String,
    #[serde(default)]
    pub source_label: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_url: Option<String>,
    /// Unix milliseconds.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pub_date: Option<i64>,
}

impl NewsItem {
    pub fn new(
        title: impl Into<String>,
        summary: impl Into<String>,
        link: impl Into<String>,
        source_label: impl Into<String>,
    ) -> Self {
        Self {
            title: title.into(),
            summary: summary.into(),
            link: link.into(),
            source_label: source_label.into(),
            source_url: None,
            pub_date: None,
        }
    }
}

/// A configured feed: URL plus the label shown in the digest.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub struct FeedSource {
    #[serde(alias = "source_url")]
    pub url: String,
    pub label: String,
}

impl FeedSource {
    pub fn new(url: impl Into<String>, label: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            label: label.into(),
        }
    }
}

/// Filter rule mode: keep only matches, or drop all matches.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum FilterMode {
    #[default]
    Include,
    Exclude,
}

impl FilterMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            FilterMode::Include => "include",
            FilterMode::Exclude => "exclude",
        }
    }
}

impl fmt::Display for FilterMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for FilterMode {
    type Err = anyhow::Error;

    /// Only the exact literals `include` / `exclude` are accepted.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "include" => Ok(FilterMode::Include),
            "exclude" => Ok(FilterMode::Exclude),
            other => Err(anyhow::anyhow!(
                "mode must be 'include' or 'exclude', got '{other}'"
            )),
        }
    }
}
