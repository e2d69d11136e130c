// src/config/digest.rs
use anyhow::{anyhow, Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashSet};
use std::fs;
use std::path::{Path, PathBuf};

use crate::ingest::types::FetchOptions;
use crate::ingest::MAX_FETCH_WINDOW_HOURS;
use crate::news::{FeedSource, FilterMode};

pub const ENV_DIGEST_CONFIG_PATH: &str = "DIGEST_CONFIG_PATH";

/// A user's filter rule: mode plus selected preset ids.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FilterRule {
    #[serde(default)]
    pub mode: FilterMode,
    #[serde(default)]
    pub categories: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DigestConfig {
    #[serde(default)]
    pub sources: Vec<FeedSource>,
    #[serde(default)]
    pub filter: FilterRule,
    /// 0 = no cutoff
    #[serde(default)]
    pub fetch_window_hours: u64,
    #[serde(default)]
    pub recipients: Vec<String>,
}

impl DigestConfig {
    pub fn fetch_options(&self) -> FetchOptions {
        FetchOptions {
            fetch_window_hours: self.fetch_window_hours,
        }
    }
}

/// Load config from an explicit path. Supports TOML or JSON formats.
pub fn load_digest_config_from(path: &Path) -> Result<DigestConfig> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("reading digest config from {}", path.display()))?;
    let ext = path
        .extension()
        .and_then(|s| s.to_str())
        .unwrap_or_default()
        .to_ascii_lowercase();
    parse_digest_config(&content, ext.as_str())
}

/// Load config using env var + fallbacks:
/// 1) $DIGEST_CONFIG_PATH
/// 2) config/digest.toml
/// 3) config/digest.json
/// 4) empty config
pub fn load_digest_config_default() -> Result<DigestConfig> {
    if let Ok(p) = std::env::var(ENV_DIGEST_CONFIG_PATH) {
        let pb = PathBuf::from(p);
        if pb.exists() {
            return load_digest_config_from(&pb);
        } else {
            return Err(anyhow!("DIGEST_CONFIG_PATH points to non-existent path"));
        }
    }
    let toml_p = PathBuf::from("config/digest.toml");
    if toml_p.exists() {
        return load_digest_config_from(&toml_p);
    }
    let json_p = PathBuf::from("config/digest.json");
    if json_p.exists() {
        return load_digest_config_from(&json_p);
    }
    Ok(DigestConfig::default())
}

fn parse_digest_config(s: &str, hint_ext: &str) -> Result<DigestConfig> {
    let try_json_first = hint_ext == "json" || s.trim_start().starts_with('{');
    let parsed = if try_json_first {
        serde_json::from_str::<DigestConfig>(s)
            .map_err(anyhow::Error::from)
            .or_else(|_| toml::from_str::<DigestConfig>(s).map_err(anyhow::Error::from))
    } else {
        toml::from_str::<DigestConfig>(s)
            .map_err(anyhow::Error::from)
            .or_else(|_| serde_json::from_str::<DigestConfig>(s).map_err(anyhow::Error::from))
    };
    let cfg = parsed.context("unsupported digest config format")?;
    Ok(clean(cfg))
}

fn clean(mut cfg: DigestConfig) -> DigestConfig {
    let mut seen = HashSet::new();
    cfg.sources = cfg
        .sources
        .into_iter()
        .map(|s| FeedSource::new(s.url.trim(), s.label.trim()))
        .filter(|s| !s.url.is_empty() && seen.insert(s.url.clone()))
        .collect();
    cfg.filter.categories = clean_list(cfg.filter.categories);
    cfg.recipients = clean_list(cfg.recipients);
    if cfg.fetch_window_hours > MAX_FETCH_WINDOW_HOURS {
        tracing::warn!(
            target: "digest",
            requested = cfg.fetch_window_hours,
            max = MAX_FETCH_WINDOW_HOURS,
            "fetch window clamped"
        );
        cfg.fetch_window_hours = MAX_FETCH_WINDOW_HOURS;
    }
    cfg
}

fn clean_list(items: Vec<String>) -> Vec<String> {
    let mut set = BTreeSet::new();
    for it in items {
        let t = it.trim();
        if !t.is_empty() {
            set.insert(t.to_string());
        }
    }
    set.into_iter().collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::{env, fs};

    const TOML: &str = r#"
fetch_window_hours = 24
recipients = [" reader@example.com ", ""]

[filter]
mode = "exclude"
categories = ["sports", " tech ", "sports"]

[[sources]]
url = " https://a.example/rss "
label = "A"

[[sources]]
url = "https://a.example/rss"
label = "A again"

[[sources]]
url = ""
label = "Broken"
"#;

    #[test]
    fn toml_is_parsed_and_cleaned() {
        let cfg = parse_digest_config(TOML, "toml").unwrap();
        assert_eq!(cfg.fetch_window_hours, 24);
        assert_eq!(cfg.filter.mode, FilterMode::Exclude);
        assert_eq!(cfg.filter.categories, vec!["sports", "tech"]);
        assert_eq!(cfg.recipients, vec!["reader@example.com"]);
        assert_eq!(cfg.sources, vec![FeedSource::new("https://a.example/rss", "A")]);
        assert_eq!(cfg.fetch_options().fetch_window_hours, 24);
    }

    #[test]
    fn json_is_accepted_with_defaults() {
        let json = r#"{"sources":[{"source_url":"https://b.example/rss","label":"B"}]}"#;
        let cfg = parse_digest_config(json, "").unwrap();
        assert_eq!(cfg.filter.mode, FilterMode::Include);
        assert!(cfg.filter.categories.is_empty());
        assert_eq!(cfg.sources.len(), 1);
    }

    #[test]
    fn oversized_window_is_clamped() {
        let cfg = parse_digest_config("fetch_window_hours = 1000000000", "toml").unwrap();
        assert_eq!(cfg.fetch_window_hours, MAX_FETCH_WINDOW_HOURS);
    }

    #[test]
    fn bad_mode_is_rejected() {
        let bad = r#"
[filter]
mode = "maybe"
"#;
        assert!(parse_digest_config(bad, "toml").is_err());
    }

    #[serial_test::serial]
    #[test]
    fn default_uses_env_then_fallbacks() {
        let old = env::current_dir().unwrap();
        let tmp = tempfile::tempdir().unwrap();
        env::set_current_dir(tmp.path()).unwrap();

        env::remove_var(ENV_DIGEST_CONFIG_PATH);

        // No files in the temp CWD -> empty config
        let v = load_digest_config_default().unwrap();
        assert_eq!(v, DigestConfig::default());

        // Env wins
        let p_json = tmp.path().join("digest.json");
        fs::write(&p_json, r#"{"recipients":["x@example.com"]}"#).unwrap();
        env::set_var(ENV_DIGEST_CONFIG_PATH, p_json.display().to_string());
        let v2 = load_digest_config_default().unwrap();
        assert_eq!(v2.recipients, vec!["x@example.com".to_string()]);

        env::set_var(ENV_DIGEST_CONFIG_PATH, tmp.path().join("nope.toml"));
        assert!(load_digest_config_default().is_err());
        env::remove_var(ENV_DIGEST_CONFIG_PATH);

        env::set_current_dir(&old).unwrap();
    }
}
