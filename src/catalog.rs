// src/catalog.rs
//! Keyword catalog: filter preset categories, weak keywords, false-positive
//! phrases and commercial markers, loaded from TOML.
//!
//! The catalog is an immutable value. Derived data (the weak-keyword set) is
//! computed once in [`KeywordCatalog::from_toml_str`], so a built catalog can
//! be shared across tasks behind an `Arc` or through [`default_catalog`].

use anyhow::{anyhow, bail, Context, Result};
use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap, HashSet};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::info;

pub const DEFAULT_FILTER_PRESETS_PATH: &str = "config/filter_presets.toml";
pub const ENV_FILTER_PRESETS_PATH: &str = "FILTER_PRESETS_PATH";

const EMBEDDED_PRESETS: &str = include_str!("../config/filter_presets.toml");

/* ----------------------------
Config schema (from TOML)
---------------------------- */

#[derive(Debug, Clone, Deserialize)]
struct CatalogRoot {
    categories: Vec<CategoryCfg>,
    #[serde(default)]
    ambiguity: AmbiguityCfg,
    #[serde(default)]
    false_positives: FalsePositiveCfg,
    #[serde(default)]
    commercial: CommercialCfg,
}

#[derive(Debug, Clone, Deserialize)]
struct CategoryCfg {
    id: String,
    label: String,
    #[serde(default)]
    keywords: Vec<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
struct AmbiguityCfg {
    #[serde(default)]
    weak: Vec<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
struct FalsePositiveCfg {
    #[serde(default)]
    phrases: Vec<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
struct CommercialCfg {
    #[serde(default)]
    keywords: Vec<String>,
}

/* ----------------------------
Built catalog
---------------------------- */

/// A preset category. Keywords are lowercased, deduplicated, in file order.
#[derive(Debug, Clone)]
pub struct Category {
    pub id: String,
    pub label: String,
    pub keywords: Vec<String>,
}

/// `{id, label}` pair for UI presentation.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PresetInfo {
    pub id: String,
    pub label: String,
}

#[derive(Debug, Clone)]
pub struct KeywordCatalog {
    categories: Vec<Category>,
    index: HashMap<String, usize>,
    weak: HashSet<String>,
    false_positives: Vec<String>,
    commercial: Vec<String>,
}

impl KeywordCatalog {
    /// Build from a TOML string. Fails on empty or duplicate category ids.
    pub fn from_toml_str(toml_str: &str) -> Result<Self> {
        let root: CatalogRoot = toml::from_str(toml_str).context("parsing filter presets toml")?;

        let mut categories = Vec::with_capacity(root.categories.len());
        let mut index = HashMap::new();
        for c in root.categories {
            let id = c.id.trim().to_string();
            if id.is_empty() {
                bail!("filter preset with empty id (label `{}`)", c.label);
            }
            if index.contains_key(&id) {
                bail!("duplicate filter preset id `{id}`");
            }
            index.insert(id.clone(), categories.len());
            categories.push(Category {
                id,
                label: c.label,
                keywords: clean_terms(c.keywords),
            });
        }

        let weak = derive_weak(&categories, &clean_terms(root.ambiguity.weak));

        Ok(Self {
            categories,
            index,
            weak,
            false_positives: clean_terms(root.false_positives.phrases),
            commercial: clean_terms(root.commercial.keywords),
        })
    }

    /// Load from an explicit file path.
    pub fn from_path(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("reading filter presets from {}", path.display()))?;
        Self::from_toml_str(&content)
            .with_context(|| format!("loading filter presets from {}", path.display()))
    }

    /// Load using env var + fallbacks:
    /// 1) $FILTER_PRESETS_PATH (must exist)
    /// 2) config/filter_presets.toml
    /// 3) the copy embedded at build time
    pub fn load_default() -> Result<Self> {
        if let Ok(p) = std::env::var(ENV_FILTER_PRESETS_PATH) {
            let pb = PathBuf::from(p);
            if !pb.exists() {
                return Err(anyhow!(
                    "{ENV_FILTER_PRESETS_PATH} points to non-existent path {}",
                    pb.display()
                ));
            }
            let cat = Self::from_path(&pb)?;
            info!(target: "catalog", path = %pb.display(), categories = cat.categories.len(), "filter presets loaded");
            return Ok(cat);
        }
        let local = PathBuf::from(DEFAULT_FILTER_PRESETS_PATH);
        if local.exists() {
            return Self::from_path(&local);
        }
        Ok(Self::builtin())
    }

    /// The catalog embedded at build time.
    pub fn builtin() -> Self {
        Self::from_toml_str(EMBEDDED_PRESETS).expect("embedded filter presets")
    }

    /// Categories in catalog order, for the preset picker.
    pub fn categories(&self) -> Vec<PresetInfo> {
        self.categories
            .iter()
            .map(|c| PresetInfo {
                id: c.id.clone(),
                label: c.label.clone(),
            })
            .collect()
    }

    pub fn category(&self, id: &str) -> Option<&Category> {
        self.index.get(id).map(|&i| &self.categories[i])
    }

    /// Union of keywords for all known ids. Unknown ids contribute nothing.
    pub fn expand<S: AsRef<str>>(&self, category_ids: &[S]) -> BTreeSet<&str> {
        let mut out = BTreeSet::new();
        for id in category_ids {
            if let Some(c) = self.category(id.as_ref()) {
                out.extend(c.keywords.iter().map(String::as_str));
            }
        }
        out
    }

    /// Weak = explicitly ambiguous, or listed under two or more categories.
    pub fn is_weak(&self, keyword: &str) -> bool {
        self.weak.contains(&keyword.to_lowercase())
    }

    /// Lowercase `text`, then replace every false-positive phrase with a space.
    pub fn strip_false_positives(&self, text: &str) -> String {
        let mut out = text.to_lowercase();
        for phrase in &self.false_positives {
            if out.contains(phrase.as_str()) {
                out = out.replace(phrase.as_str(), " ");
            }
        }
        out
    }

    pub fn commercial_keywords(&self) -> &[String] {
        &self.commercial
    }
}

/// Trim, lowercase, drop empties and repeats; keeps first-seen order.
fn clean_terms(items: Vec<String>) -> Vec<String> {
    let mut seen = HashSet::new();
    let mut out = Vec::with_capacity(items.len());
    for it in items {
        let t = it.trim().to_lowercase();
        if !t.is_empty() && seen.insert(t.clone()) {
            out.push(t);
        }
    }
    out
}

fn derive_weak(categories: &[Category], explicit: &[String]) -> HashSet<String> {
    let mut owners: HashMap<&str, HashSet<&str>> = HashMap::new();
    for c in categories {
        for kw in &c.keywords {
            owners.entry(kw.as_str()).or_default().insert(c.id.as_str());
        }
    }

    let mut weak: HashSet<String> = explicit.iter().cloned().collect();
    weak.extend(
        owners
            .into_iter()
            .filter(|(_, cats)| cats.len() >= 2)
            .map(|(kw, _)| kw.to_string()),
    );
    weak
}

static DEFAULT_CATALOG: Lazy<KeywordCatalog> = Lazy::new(KeywordCatalog::builtin);

/// Process-wide read-only catalog built from the embedded presets.
pub fn default_catalog() -> &'static KeywordCatalog {
    &DEFAULT_CATALOG
}

#[cfg(test)]
mod tests {
    use super::*;

    const TEST_TOML: &str = r#"
[[categories]]
id = "alpha"
label = "Alpha"
keywords = ["Shared", "alpha-only", " ", "ALPHA-ONLY"]

[[categories]]
id = "beta"
label = "Beta"
keywords = ["shared", "beta-only"]

[ambiguity]
weak = ["Beta-Only"]

[false_positives]
phrases = ["Alpha-Only.com", "noise phrase"]

[commercial]
keywords = ["Sale Today"]
"#;

    fn cat() -> KeywordCatalog {
        KeywordCatalog::from_toml_str(TEST_TOML).expect("load test catalog")
    }

    #[test]
    fn keywords_are_cleaned_and_lowercased() {
        let c = cat();
        assert_eq!(
            c.category("alpha").unwrap().keywords,
            vec!["shared".to_string(), "alpha-only".to_string()]
        );
        assert_eq!(c.commercial_keywords(), &["sale today".to_string()]);
    }

    #[test]
    fn categories_keep_file_order() {
        let ids: Vec<_> = cat().categories().into_iter().map(|p| p.id).collect();
        assert_eq!(ids, vec!["alpha", "beta"]);
    }

    #[test]
    fn expand_unions_known_ids_and_ignores_unknown() {
        let c = cat();
        let kws = c.expand(&["alpha", "nope", "beta"]);
        assert_eq!(
            kws.into_iter().collect::<Vec<_>>(),
            vec!["alpha-only", "beta-only", "shared"]
        );
        assert!(c.expand(&["nope"]).is_empty());
        assert!(c.expand::<&str>(&[]).is_empty());
    }

    #[test]
    fn weak_is_derived_from_overlap_plus_explicit() {
        let c = cat();
        assert!(c.is_weak("shared"), "keyword in two categories is weak");
        assert!(c.is_weak("SHARED"));
        assert!(c.is_weak("beta-only"), "explicit ambiguous keyword is weak");
        assert!(!c.is_weak("alpha-only"));
        assert!(!c.is_weak("unknown"));
    }

    #[test]
    fn strip_replaces_phrases_with_space() {
        let c = cat();
        assert_eq!(
            c.strip_false_positives("Read more on ALPHA-ONLY.COM today"),
            "read more on   today"
        );
        assert_eq!(
            c.strip_false_positives("noise phrase and noise phrase"),
            "  and  "
        );
    }

    #[test]
    fn duplicate_or_empty_ids_are_rejected() {
        let dup = r#"
[[categories]]
id = "a"
label = "A"
[[categories]]
id = "a"
label = "A2"
"#;
        assert!(KeywordCatalog::from_toml_str(dup).is_err());
        let empty = r#"
[[categories]]
id = "  "
label = "Empty"
"#;
        assert!(KeywordCatalog::from_toml_str(empty).is_err());
    }

    #[test]
    fn builtin_catalog_has_expected_presets() {
        let c = KeywordCatalog::builtin();
        let ids: Vec<_> = c.categories().into_iter().map(|p| p.id).collect();
        assert_eq!(
            ids,
            vec!["politics", "tech", "sports", "business", "entertainment"]
        );
        // "capital" sits in politics and business.
        assert!(c.is_weak("capital"));
        assert!(c.is_weak("policy"));
        assert!(!c.is_weak("president"));
        assert!(!c.is_weak("war"));
        assert!(c.expand(&["tech"]).contains("ai"));
    }

    #[serial_test::serial]
    #[test]
    fn load_default_prefers_env_path() {
        let dir = tempfile::tempdir().unwrap();
        let p = dir.path().join("presets.toml");
        fs::write(&p, TEST_TOML).unwrap();

        std::env::set_var(ENV_FILTER_PRESETS_PATH, p.display().to_string());
        let c = KeywordCatalog::load_default().unwrap();
        assert!(c.category("alpha").is_some());

        std::env::set_var(ENV_FILTER_PRESETS_PATH, dir.path().join("missing.toml"));
        assert!(KeywordCatalog::load_default().is_err());

        std::env::remove_var(ENV_FILTER_PRESETS_PATH);
    }
}
