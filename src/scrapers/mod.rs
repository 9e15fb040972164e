//! Per-source extraction adapters.
//!
//! Each configured source is scraped with one of two strategies:
//!
//! | Strategy | Module | Use when |
//! |----------|--------|----------|
//! | Structured lookup | [`structured`] | listing markup is regular enough to walk as a tree |
//! | Pattern matching | [`pattern`] | markup is irregular or script-dependent |
//!
//! # Common Patterns
//!
//! Every adapter turns one page of raw HTML into `Vec<Item>`:
//! - a missing root container (or no pattern match) is a source-level
//!   [`Diagnostic`]; the orchestrator logs it and moves on
//! - a malformed item is skipped without affecting its siblings
//! - no input makes an adapter panic

pub mod dom;
pub mod images;
pub mod pattern;
pub mod structured;

use crate::error::Diagnostic;
use crate::models::Item;
use pattern::{CompiledPattern, PatternRules};
use structured::StructuredRules;
use url::Url;

#[derive(Debug, Clone)]
enum Extractor {
    Structured(StructuredRules),
    Pattern(CompiledPattern),
}

/// A named extraction strategy for one source.
#[derive(Debug, Clone)]
pub struct SourceAdapter {
    name: String,
    extractor: Extractor,
}

impl SourceAdapter {
    pub fn structured(name: &str, rules: StructuredRules) -> Self {
        Self {
            name: name.to_string(),
            extractor: Extractor::Structured(rules),
        }
    }

    /// # Errors
    ///
    /// [`Diagnostic::Config`] if the item regex is invalid.
    pub fn pattern(name: &str, rules: &PatternRules) -> Result<Self, Diagnostic> {
        Ok(Self {
            name: name.to_string(),
            extractor: Extractor::Pattern(rules.compile(name)?),
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Turn one page of HTML into items. `page_url` resolves relative links.
    pub fn extract(&self, html: &str, page_url: &Url) -> Result<Vec<Item>, Diagnostic> {
        match &self.extractor {
            Extractor::Structured(rules) => structured::extract(&self.name, rules, html, page_url),
            Extractor::Pattern(pattern) => pattern::extract(&self.name, pattern, html, page_url),
        }
    }
}
