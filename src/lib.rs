//! # Awful Headlines
//!
//! Scrapes headline listings from several news sites, normalizes them into
//! one [`Item`](models::Item) shape, orders them newest first and caches the
//! result with a TTL and a stale fallback.
//!
//! ## Architecture
//!
//! 1. **Extraction**: each source's HTML is turned into items by a
//!    [`SourceAdapter`](scrapers::SourceAdapter), either by walking the
//!    document tree or by pattern matching
//! 2. **Ordering**: free-form timestamps are compared by [`ordering`]
//! 3. **Aggregation**: [`aggregate`] merge-sorts all items newest first
//! 4. **Caching**: [`cache`] persists the list and serves it while fresh
//! 5. **Orchestration**: [`pipeline`] runs sources concurrently with a
//!    per-source deadline and tolerates partial failure

pub mod aggregate;
pub mod cache;
pub mod cli;
pub mod config;
pub mod error;
pub mod fetch;
pub mod models;
pub mod ordering;
pub mod outputs;
pub mod pipeline;
pub mod scrapers;
pub mod utils;
