//! Page fetching with exponential backoff retry logic.
//!
//! # Architecture
//!
//! - [`PageFetcher`]: core trait; one GET returning the body text
//! - [`HttpFetcher`]: `reqwest` implementation
//! - [`RetryFetch`]: decorator that retries transient failures of any `PageFetcher`
//!
//! # Retry Strategy
//!
//! - Only transient failures are retried (transport errors, empty bodies,
//!   5xx and 429); a 404 fails immediately
//! - Exponential backoff from `base_delay`, capped at 30 seconds
//! - Random jitter (0-250ms) added to prevent thundering herd

use crate::error::Diagnostic;
use rand::{Rng, rng};
use std::fmt;
use std::time::{Duration as StdDuration, Instant};
use tokio::time::sleep;
use tracing::{debug, error, instrument, warn};

/// Something that can GET a page and hand back its body.
pub trait PageFetcher {
    /// Fetch `url`. Non-2xx statuses and blank bodies are errors.
    async fn fetch(&self, url: &str) -> Result<String, Diagnostic>;
}

/// `reqwest`-backed fetcher sharing one connection pool.
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    client: reqwest::Client,
}

impl HttpFetcher {
    /// # Errors
    ///
    /// [`Diagnostic::Config`] if the TLS backend cannot be initialised.
    pub fn new(user_agent: &str, request_timeout: StdDuration) -> Result<Self, Diagnostic> {
        let client = reqwest::Client::builder()
            .user_agent(user_agent)
            .timeout(request_timeout)
            .connect_timeout(request_timeout.min(StdDuration::from_secs(10)))
            .build()
            .map_err(|e| Diagnostic::Config(format!("cannot build http client: {e}")))?;
        Ok(Self { client })
    }
}

impl PageFetcher for HttpFetcher {
    #[instrument(level = "debug", skip(self))]
    async fn fetch(&self, url: &str) -> Result<String, Diagnostic> {
        let t0 = Instant::now();
        let http_err = |e: reqwest::Error| Diagnostic::Http {
            url: url.to_string(),
            reason: e.to_string(),
        };

        let response = self.client.get(url).send().await.map_err(http_err)?;
        let status = response.status();
        if !status.is_success() {
            return Err(Diagnostic::Status {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        let body = response.text().await.map_err(http_err)?;
        if body.trim().is_empty() {
            return Err(Diagnostic::EmptyBody { url: url.to_string() });
        }

        debug!(
            bytes = body.len(),
            elapsed_ms = t0.elapsed().as_millis() as u64,
            "Fetched page"
        );
        Ok(body)
    }
}

/// Wrapper that adds exponential backoff retry logic to any [`PageFetcher`].
///
/// ```text
/// delay = min(base_delay * 2^(attempt-1), max_delay) + random_jitter(0..250ms)
/// ```
pub struct RetryFetch<T> {
    inner: T,
    max_retries: usize,
    base_delay: StdDuration,
    max_delay: StdDuration,
}

impl<T> RetryFetch<T>
where
    T: PageFetcher,
{
    /// # Example
    ///
    /// ```ignore
    /// let http = HttpFetcher::new("awful_headlines", Duration::from_secs(15))?;
    /// let fetcher = RetryFetch::new(http, 2, Duration::from_millis(500));
    /// ```
    pub fn new(inner: T, max_retries: usize, base_delay: StdDuration) -> Self {
        Self {
            inner,
            max_retries,
            base_delay,
            max_delay: StdDuration::from_secs(30),
        }
    }

    fn backoff(&self, attempt: usize) -> StdDuration {
        let shift = (attempt.saturating_sub(1)).min(16) as u32;
        let delay = self.base_delay.saturating_mul(1 << shift).min(self.max_delay);
        let jitter_ms: u64 = rng().random_range(0..=250);
        delay + StdDuration::from_millis(jitter_ms)
    }
}

impl<T> fmt::Debug for RetryFetch<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RetryFetch")
            .field("max_retries", &self.max_retries)
            .field("base_delay", &self.base_delay)
            .field("max_delay", &self.max_delay)
            .finish()
    }
}

impl<T> PageFetcher for RetryFetch<T>
where
    T: PageFetcher,
{
    #[instrument(level = "debug", skip(self))]
    async fn fetch(&self, url: &str) -> Result<String, Diagnostic> {
        let total_t0 = Instant::now();
        let mut attempt = 0usize;

        loop {
            match self.inner.fetch(url).await {
                Ok(body) => return Ok(body),
                Err(e) => {
                    attempt += 1;
                    let total_dt = total_t0.elapsed();

                    if !e.is_transient() || attempt > self.max_retries {
                        error!(
                            attempt,
                            max = self.max_retries,
                            elapsed_ms_total = total_dt.as_millis() as u64,
                            error = %e,
                            "fetch() giving up"
                        );
                        return Err(e);
                    }

                    let delay = self.backoff(attempt);
                    warn!(
                        attempt,
                        max = self.max_retries,
                        elapsed_ms_total = total_dt.as_millis() as u64,
                        ?delay,
                        error = %e,
                        "fetch() attempt failed; backing off"
                    );
                    sleep(delay).await;
                }
            }
        }
    }
}
