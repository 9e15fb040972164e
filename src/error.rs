//! Error taxonomy for the aggregation pipeline.
//!
//! Nothing in here is fatal to the process. Each type maps to a degradation
//! policy:
//!
//! | Type | Raised by | Policy |
//! |------|-----------|--------|
//! | [`ItemError`] | one markup fragment | skip the item, keep the batch |
//! | [`Diagnostic`] | a page, a source, or the whole pipeline | source contributes zero items |
//! | [`OrderingError`] | the date comparator | order that pair by source name |
//! | [`CacheError`] | the on-disk cache | treat the entry as absent |

use thiserror::Error;

/// Source-level (or pipeline-level) failure.
///
/// Adapters and the fetcher return this instead of panicking; the
/// orchestrator logs it and carries on with the remaining sources.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Diagnostic {
    /// Transport failure (DNS, connection reset, TLS, body decoding).
    #[error("request to {url} failed: {reason}")]
    Http { url: String, reason: String },

    /// Server answered with a non-2xx status.
    #[error("{url} answered with HTTP {status}")]
    Status { url: String, status: u16 },

    /// Server answered 2xx with nothing in it.
    #[error("{url} returned an empty body")]
    EmptyBody { url: String },

    /// The per-source deadline elapsed.
    #[error("source {source_name} timed out after {secs}s")]
    Timeout { source_name: String, secs: u64 },

    /// The container every item lives in is missing from the document.
    #[error("source {source_name}: root container {matcher} not found")]
    RootNotFound { source_name: String, matcher: String },

    /// Every page of a paginated source failed.
    #[error("source {source_name}: all {pages} page(s) failed")]
    AllPagesFailed { source_name: String, pages: u32 },

    /// Every configured source failed.
    #[error("all {0} source(s) failed")]
    AllSourcesFailed(usize),

    /// Static configuration is unusable.
    #[error("invalid configuration: {0}")]
    Config(String),
}

impl Diagnostic {
    /// Whether retrying the same request could plausibly succeed.
    pub fn is_transient(&self) -> bool {
        match self {
            Diagnostic::Http { .. } | Diagnostic::EmptyBody { .. } => true,
            Diagnostic::Status { status, .. } => *status >= 500 || *status == 429,
            _ => false,
        }
    }
}

/// Why a single markup fragment did not produce an item.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ItemError {
    #[error("missing <{0}> element")]
    MissingNode(&'static str),

    #[error("regex group `{0}` absent")]
    MissingGroup(&'static str),

    #[error("link `{0}` cannot be resolved")]
    UnresolvableLink(String),
}

/// Raised by the date comparator when a raw time cannot be turned into a key.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum OrderingError {
    #[error("relative magnitude `{0}` is out of range")]
    MagnitudeOverflow(String),
}

/// On-disk cache failures.
#[derive(Debug, Error)]
pub enum CacheError {
    #[error("cache io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("cache entry is not valid json: {0}")]
    Json(#[from] serde_json::Error),
}
