//! Static configuration.
//!
//! Loaded from an optional YAML file; every field has a default, so an empty
//! file (or no file) yields the built-in source list below.
//!
//! ```yaml
//! ttl_hours: 24
//! max_pages: 5
//! source_timeout_secs: 20
//! sources:
//!   - name: wire
//!     url: https://wire.example.com/latest?page={page}
//!     pages: 3
//!     strategy:
//!       kind: structured
//!       root: { tag: div, class: listing }
//!       item: { tag: article }
//!   - name: gazette
//!     url: https://gazette.example.com/news/
//!     strategy:
//!       kind: pattern
//!       item: '<h3><a href="(?P<url>[^"]+)">(?P<title>.*?)</a></h3>'
//! ```

use crate::error::Diagnostic;
use crate::scrapers::SourceAdapter;
use crate::scrapers::dom::Matcher;
use crate::scrapers::pattern::PatternRules;
use crate::scrapers::structured::StructuredRules;
use chrono::TimeDelta;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{info, instrument, warn};
use url::Url;

/// Placeholder substituted with the page number in paginated source URLs.
pub const PAGE_PLACEHOLDER: &str = "{page}";

/// Top-level configuration.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct Config {
    /// Hours a cached feed stays fresh.
    pub ttl_hours: u64,
    /// Upper bound on pages fetched per paginated source.
    pub max_pages: u32,
    /// Deadline for one source, all of its pages included.
    pub source_timeout_secs: u64,
    /// Sources fetched at the same time.
    pub concurrency: usize,
    /// Overrides the XDG cache directory.
    pub cache_dir: Option<PathBuf>,
    pub user_agent: String,
    pub retry: RetryConfig,
    pub sources: Vec<SourceConfig>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            ttl_hours: 24,
            max_pages: 5,
            source_timeout_secs: 20,
            concurrency: 4,
            cache_dir: None,
            user_agent: format!("awful_headlines/{}", env!("CARGO_PKG_VERSION")),
            retry: RetryConfig::default(),
            sources: default_sources(),
        }
    }
}

/// Retry policy for individual page requests.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct RetryConfig {
    pub max_retries: usize,
    pub base_delay_ms: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: 2,
            base_delay_ms: 500,
        }
    }
}

fn one_page() -> u32 {
    1
}

/// One remote source.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct SourceConfig {
    /// Identity stamped on every item from this source.
    pub name: String,
    /// Page URL; may contain `{page}` for server-side pagination.
    pub url: String,
    /// Pages to fetch (1-based), clamped to `max_pages`.
    #[serde(default = "one_page")]
    pub pages: u32,
    pub strategy: Strategy,
}

/// How a source's markup is turned into items.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Strategy {
    Structured(StructuredRules),
    Pattern(PatternRules),
}

impl SourceConfig {
    /// URLs to fetch for this source, in page order.
    pub fn page_urls(&self, max_pages: u32) -> Vec<String> {
        if !self.url.contains(PAGE_PLACEHOLDER) {
            return vec![self.url.clone()];
        }
        (1..=self.pages.clamp(1, max_pages.max(1)))
            .map(|page| self.url.replace(PAGE_PLACEHOLDER, &page.to_string()))
            .collect()
    }

    /// Build the extraction adapter for this source.
    ///
    /// # Errors
    ///
    /// [`Diagnostic::Config`] if a pattern source has an invalid regex.
    pub fn adapter(&self) -> Result<SourceAdapter, Diagnostic> {
        match &self.strategy {
            Strategy::Structured(rules) => Ok(SourceAdapter::structured(&self.name, rules.clone())),
            Strategy::Pattern(rules) => SourceAdapter::pattern(&self.name, rules),
        }
    }
}

impl Config {
    /// Load and validate a YAML file.
    #[instrument(level = "info", skip_all, fields(path = %path.display()))]
    pub async fn load(path: &Path) -> Result<Self, Diagnostic> {
        let text = tokio::fs::read_to_string(path)
            .await
            .map_err(|e| Diagnostic::Config(format!("cannot read {}: {e}", path.display())))?;
        let config = Self::from_yaml(&text)?;
        info!(sources = config.sources.len(), "Loaded configuration");
        Ok(config)
    }

    /// Parse and validate YAML text.
    pub fn from_yaml(text: &str) -> Result<Self, Diagnostic> {
        let config: Config = if text.trim().is_empty() {
            Config::default()
        } else {
            serde_yaml::from_str(text).map_err(|e| Diagnostic::Config(e.to_string()))?
        };
        config.validate()?;
        Ok(config)
    }

    /// Check invariants serde cannot express.
    pub fn validate(&self) -> Result<(), Diagnostic> {
        if self.sources.is_empty() {
            return Err(Diagnostic::Config("no sources configured".into()));
        }
        if self.max_pages == 0 {
            return Err(Diagnostic::Config("max_pages must be at least 1".into()));
        }
        let mut seen = HashSet::new();
        for source in &self.sources {
            if source.name.trim().is_empty() {
                return Err(Diagnostic::Config(format!("source with url {} has no name", source.url)));
            }
            if !seen.insert(source.name.as_str()) {
                return Err(Diagnostic::Config(format!("duplicate source name {}", source.name)));
            }
            if source.pages == 0 {
                return Err(Diagnostic::Config(format!("source {}: pages must be at least 1", source.name)));
            }
            if source.pages > self.max_pages {
                warn!(
                    source = %source.name,
                    pages = source.pages,
                    max_pages = self.max_pages,
                    "Page count clamped"
                );
            }
            for page_url in source.page_urls(self.max_pages) {
                Url::parse(&page_url).map_err(|e| {
                    Diagnostic::Config(format!("source {}: bad url {page_url}: {e}", source.name))
                })?;
            }
            source.adapter()?;
        }
        Ok(())
    }

    pub fn ttl(&self) -> TimeDelta {
        i64::try_from(self.ttl_hours)
            .ok()
            .and_then(TimeDelta::try_hours)
            .unwrap_or(TimeDelta::MAX)
    }

    pub fn source_timeout(&self) -> Duration {
        Duration::from_secs(self.source_timeout_secs.max(1))
    }

    pub fn retry_base_delay(&self) -> Duration {
        Duration::from_millis(self.retry.base_delay_ms)
    }
}

/// Sources used when no configuration file is given.
pub fn default_sources() -> Vec<SourceConfig> {
    let mut cnn = StructuredRules::new(Matcher::tag("body"), Matcher::class("card--lite"));
    cnn.heading_tags.clear();

    let mut npr = StructuredRules::new(Matcher::class("topic-list"), Matcher::tag("li"));
    npr.heading_tags.clear();

    vec![
        SourceConfig {
            name: "cnn".into(),
            url: "https://lite.cnn.com".into(),
            pages: 1,
            strategy: Strategy::Structured(cnn),
        },
        SourceConfig {
            name: "npr".into(),
            url: "https://text.npr.org".into(),
            pages: 1,
            strategy: Strategy::Structured(npr),
        },
        SourceConfig {
            name: "aljazeera".into(),
            url: "https://www.aljazeera.com/news/".into(),
            pages: 1,
            strategy: Strategy::Pattern(PatternRules {
                item: concat!(
                    r#"(?s)<h3 class="gc__title">\s*<a[^>]*href="(?P<url>[^"]+)"[^>]*>\s*<span>(?P<title>.*?)</span>"#,
                    r#".*?<div class="gc__date[^"]*">.*?<span aria-hidden="true">(?P<time>[^<]+)</span>"#,
                )
                .to_string(),
                window: 4000,
            }),
        },
    ]
}
