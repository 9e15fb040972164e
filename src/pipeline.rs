//! Orchestration of one aggregation run.
//!
//! ```text
//! sources ─┬─ fetch pages ─ extract ─┐
//!          ├─ fetch pages ─ extract ─┼─ concat (source order) ─ merge sort ─ cache
//!          └─ ...  (bounded, timed) ─┘
//! ```
//!
//! Every source runs inside its own failure boundary and under its own
//! deadline. A failing source contributes zero items and a [`SourceFailure`];
//! only when every source fails does the run itself fail, which lets the
//! cache fall back to the last good list.

use crate::aggregate;
use crate::cache::{CacheManager, Lookup};
use crate::config::{Config, SourceConfig};
use crate::error::Diagnostic;
use crate::fetch::PageFetcher;
use crate::models::Item;
use crate::scrapers::SourceAdapter;
use chrono::TimeDelta;
use futures::stream::{self, StreamExt};
use itertools::{Either, Itertools};
use std::time::{Duration, Instant};
use tokio::time::timeout;
use tracing::{debug, info, instrument, warn};
use url::Url;

/// Cache key of the aggregated item list.
pub const ITEMS_CACHE_KEY: &str = "headlines";

/// A configured source: its adapter plus the page URLs to scrape.
#[derive(Debug, Clone)]
pub struct Source {
    adapter: SourceAdapter,
    page_urls: Vec<String>,
}

impl Source {
    pub fn new(adapter: SourceAdapter, page_urls: Vec<String>) -> Self {
        Self { adapter, page_urls }
    }

    pub fn from_config(config: &SourceConfig, max_pages: u32) -> Result<Self, Diagnostic> {
        Ok(Self::new(config.adapter()?, config.page_urls(max_pages)))
    }

    pub fn name(&self) -> &str {
        self.adapter.name()
    }

    pub fn page_urls(&self) -> &[String] {
        &self.page_urls
    }
}

/// Runtime knobs for [`Pipeline`].
#[derive(Debug, Clone, Copy)]
pub struct PipelineOptions {
    pub ttl: TimeDelta,
    pub source_timeout: Duration,
    pub concurrency: usize,
}

impl Default for PipelineOptions {
    fn default() -> Self {
        Self {
            ttl: TimeDelta::hours(24),
            source_timeout: Duration::from_secs(20),
            concurrency: 4,
        }
    }
}

impl From<&Config> for PipelineOptions {
    fn from(config: &Config) -> Self {
        Self {
            ttl: config.ttl(),
            source_timeout: config.source_timeout(),
            concurrency: config.concurrency.max(1),
        }
    }
}

/// A source that contributed nothing to a run, and why.
#[derive(Debug, Clone, PartialEq)]
pub struct SourceFailure {
    pub source: String,
    pub diagnostic: Diagnostic,
}

/// Outcome of a run in which at least one source succeeded.
#[derive(Debug, Clone)]
pub struct AggregateReport {
    /// Newest first.
    pub items: Vec<Item>,
    pub failures: Vec<SourceFailure>,
}

/// Owns the fetcher, the cache and the source list.
pub struct Pipeline<F> {
    fetcher: F,
    cache: CacheManager,
    sources: Vec<Source>,
    options: PipelineOptions,
}

impl<F> Pipeline<F>
where
    F: PageFetcher,
{
    pub fn new(fetcher: F, cache: CacheManager, sources: Vec<Source>, options: PipelineOptions) -> Self {
        Self {
            fetcher,
            cache,
            sources,
            options,
        }
    }

    /// Build a pipeline for every source in `config`.
    pub fn from_config(config: &Config, fetcher: F, cache: CacheManager) -> Result<Self, Diagnostic> {
        let sources = config
            .sources
            .iter()
            .map(|s| Source::from_config(s, config.max_pages))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self::new(fetcher, cache, sources, PipelineOptions::from(config)))
    }

    pub fn sources(&self) -> &[Source] {
        &self.sources
    }

    pub fn cache(&self) -> &CacheManager {
        &self.cache
    }

    /// The aggregated list, served from cache while it is fresh.
    pub async fn latest(&self) -> Lookup<Vec<Item>> {
        self.cache
            .get_or_fetch_with_status(ITEMS_CACHE_KEY, self.options.ttl, move || async move {
                self.aggregate(&self.sources).await.map(|report| report.items)
            })
            .await
    }

    /// Re-fetch now, ignoring freshness. Falls back to the stale list if the
    /// run fails.
    pub async fn refresh(&self) -> Lookup<Vec<Item>> {
        self.cache
            .refresh(ITEMS_CACHE_KEY, move || async move {
                self.aggregate(&self.sources).await.map(|report| report.items)
            })
            .await
    }

    /// Run every source and merge the results newest first.
    ///
    /// # Errors
    ///
    /// [`Diagnostic::AllSourcesFailed`] when no source produced a result.
    #[instrument(level = "info", skip_all, fields(sources = sources.len()))]
    pub async fn aggregate(&self, sources: &[Source]) -> Result<AggregateReport, Diagnostic> {
        let t0 = Instant::now();

        let results: Vec<(String, Result<Vec<Item>, Diagnostic>)> = stream::iter(sources)
            .map(|source| async move { (source.name().to_string(), self.run_source(source).await) })
            .buffered(self.options.concurrency.max(1))
            .collect()
            .await;

        let (batches, failures): (Vec<Vec<Item>>, Vec<SourceFailure>) =
            results.into_iter().partition_map(|(source, result)| match result {
                Ok(items) => Either::Left(items),
                Err(diagnostic) => {
                    warn!(source = %source, error = %diagnostic, "Source failed; contributing no items");
                    Either::Right(SourceFailure { source, diagnostic })
                }
            });

        if batches.is_empty() && !failures.is_empty() {
            return Err(Diagnostic::AllSourcesFailed(failures.len()));
        }

        let items = aggregate::aggregate(batches);
        info!(
            count = items.len(),
            failed_sources = failures.len(),
            elapsed_ms = t0.elapsed().as_millis() as u64,
            "Aggregation complete"
        );
        Ok(AggregateReport { items, failures })
    }

    /// Pages are fetched in order under one deadline for the whole source.
    /// A failing or timed-out page is skipped; pages scraped before the
    /// deadline are kept. The source fails only when no page succeeds.
    #[instrument(level = "info", skip_all, fields(source = %source.name(), pages = source.page_urls.len()))]
    async fn run_source(&self, source: &Source) -> Result<Vec<Item>, Diagnostic> {
        let deadline = Instant::now() + self.options.source_timeout;
        let mut batches = Vec::with_capacity(source.page_urls.len());
        let mut last_error = None;

        for (index, page_url) in source.page_urls.iter().enumerate() {
            let remaining = deadline.saturating_duration_since(Instant::now());
            let outcome = if remaining.is_zero() {
                Err(self.timed_out(source))
            } else {
                timeout(remaining, self.scrape_page(&source.adapter, page_url))
                    .await
                    .unwrap_or_else(|_| Err(self.timed_out(source)))
            };

            match outcome {
                Ok(items) => {
                    debug!(url = %page_url, count = items.len(), "Page scraped");
                    batches.push(items);
                }
                Err(e @ Diagnostic::Timeout { .. }) => {
                    warn!(
                        url = %page_url,
                        skipped = source.page_urls.len() - index - 1,
                        error = %e,
                        "Source deadline reached; keeping pages scraped so far"
                    );
                    last_error = Some(e);
                    break;
                }
                Err(e) => {
                    warn!(url = %page_url, error = %e, "Page failed");
                    last_error = Some(e);
                }
            }
        }

        match last_error {
            Some(e) if batches.is_empty() => {
                if source.page_urls.len() == 1 {
                    Err(e)
                } else {
                    Err(Diagnostic::AllPagesFailed {
                        source_name: source.name().to_string(),
                        pages: source.page_urls.len() as u32,
                    })
                }
            }
            _ => Ok(batches.into_iter().concat()),
        }
    }

    fn timed_out(&self, source: &Source) -> Diagnostic {
        Diagnostic::Timeout {
            source_name: source.name().to_string(),
            secs: self.options.source_timeout.as_secs(),
        }
    }

    async fn scrape_page(&self, adapter: &SourceAdapter, page_url: &str) -> Result<Vec<Item>, Diagnostic> {
        let base = Url::parse(page_url)
            .map_err(|e| Diagnostic::Config(format!("source {}: bad url {page_url}: {e}", adapter.name())))?;
        let html = self.fetcher.fetch(page_url).await?;
        adapter.extract(&html, &base)
    }
}
