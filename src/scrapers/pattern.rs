//! Pattern-based extraction.
//!
//! For sources whose markup is too irregular (or too script-dependent) to
//! walk as a tree. An item regex with named groups `url`, `title` and `time`
//! finds the heading/link/date triple; the text that follows each match, up
//! to the next match, is then searched for a thumbnail and a summary.

use super::dom::fragment_text;
use super::images::{first_image_in_markup, resolve_url};
use crate::error::{Diagnostic, ItemError};
use crate::models::Item;
use once_cell::sync::Lazy;
use regex::{Captures, Regex};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument, warn};
use url::Url;

const REQUIRED_GROUPS: &[&str] = &["url", "title"];

static SUMMARY: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?is)<p\b[^>]*>(.*?)</p>").unwrap());

fn default_window() -> usize {
    4000
}

/// Regexes describing a pattern source, as written in configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct PatternRules {
    /// Item regex. Must define `url` and `title` groups; `time` is optional.
    pub item: String,
    /// Maximum number of bytes after a match searched for image and summary.
    #[serde(default = "default_window")]
    pub window: usize,
}

impl PatternRules {
    /// Compile and check the item regex.
    ///
    /// # Errors
    ///
    /// [`Diagnostic::Config`] if the regex is invalid or lacks a required group.
    pub fn compile(&self, source: &str) -> Result<CompiledPattern, Diagnostic> {
        let item = Regex::new(&self.item)
            .map_err(|e| Diagnostic::Config(format!("source {source}: bad item pattern: {e}")))?;
        for group in REQUIRED_GROUPS {
            if !item.capture_names().flatten().any(|name| name == *group) {
                return Err(Diagnostic::Config(format!(
                    "source {source}: item pattern has no `{group}` group"
                )));
            }
        }
        Ok(CompiledPattern {
            item,
            window: self.window.max(1),
        })
    }
}

/// A validated item regex ready for extraction.
#[derive(Debug, Clone)]
pub struct CompiledPattern {
    item: Regex,
    window: usize,
}

/// Extract every well-formed item from one page by pattern matching.
///
/// # Errors
///
/// [`Diagnostic::RootNotFound`] when the item pattern matches nothing, which
/// is how a markup change shows up for this strategy.
#[instrument(level = "debug", skip_all, fields(source = %source, url = %page_url))]
pub fn extract(
    source: &str,
    pattern: &CompiledPattern,
    html: &str,
    page_url: &Url,
) -> Result<Vec<Item>, Diagnostic> {
    let matches: Vec<Captures<'_>> = pattern.item.captures_iter(html).collect();
    if matches.is_empty() {
        warn!(pattern = %pattern.item.as_str(), "Item pattern matched nothing");
        return Err(Diagnostic::RootNotFound {
            source_name: source.to_string(),
            matcher: pattern.item.as_str().to_string(),
        });
    }

    let mut items = Vec::new();
    for (index, caps) in matches.iter().enumerate() {
        let next_start = matches.get(index + 1).and_then(|next| next.get(0)).map(|m| m.start());
        match extract_item(source, pattern, html, caps, next_start, page_url) {
            Ok(item) => items.push(item),
            Err(e) => debug!(index, error = %e, "Skipping malformed item"),
        }
    }

    info!(count = items.len(), matched = matches.len(), "Extracted pattern items");
    Ok(items)
}

fn extract_item(
    source: &str,
    pattern: &CompiledPattern,
    html: &str,
    caps: &Captures<'_>,
    next_start: Option<usize>,
    page_url: &Url,
) -> Result<Item, ItemError> {
    let whole = caps.get(0).ok_or(ItemError::MissingGroup("0"))?;
    let href = caps.name("url").ok_or(ItemError::MissingGroup("url"))?.as_str().trim();
    let title = caps.name("title").ok_or(ItemError::MissingGroup("title"))?.as_str();
    let raw_time = caps.name("time").map(|m| fragment_text(m.as_str())).unwrap_or_default();
    let url = resolve_url(page_url, href).ok_or_else(|| ItemError::UnresolvableLink(href.to_string()))?;

    let end = window_end(html, whole.end(), next_start, pattern.window);
    let window = &html[whole.start()..end];
    let tail = &html[whole.end()..end];

    let image = scoped_image(window, href, page_url);
    let summary = SUMMARY
        .captures_iter(tail)
        .map(|c| fragment_text(&c[1]))
        .find(|text| !text.is_empty())
        .unwrap_or_default();

    Item::new(
        source,
        &fragment_text(title),
        &url,
        &raw_time,
        &summary,
        image.as_deref(),
    )
    .ok_or_else(|| ItemError::UnresolvableLink(href.to_string()))
}

/// End of the search window: the next match, or `window` bytes past this
/// one, whichever comes first, backed off to a char boundary.
fn window_end(html: &str, from: usize, next_start: Option<usize>, window: usize) -> usize {
    let mut end = from
        .saturating_add(window)
        .min(next_start.unwrap_or(html.len()))
        .min(html.len());
    while end > from && !html.is_char_boundary(end) {
        end -= 1;
    }
    end
}

/// First image after the item's own link, so a neighbouring article's
/// thumbnail is never picked up.
fn scoped_image(window: &str, href: &str, page_url: &Url) -> Option<String> {
    let scoped = Regex::new(&format!(r"(?is){}.*?(<img\b[^>]*>)", regex::escape(href))).ok()?;
    scoped
        .captures_iter(window)
        .filter_map(|c| c.get(1))
        .find_map(|tag| first_image_in_markup(tag.as_str(), page_url))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::PLACEHOLDER_IMAGE;

    const ITEM: &str = r#"(?s)<h3 class="title"><a href="(?P<url>[^"]+)">(?P<title>.*?)</a></h3>\s*<span class="date">(?P<time>[^<]*)</span>"#;

    fn compiled() -> CompiledPattern {
        PatternRules {
            item: ITEM.to_string(),
            window: default_window(),
        }
        .compile("gazette")
        .unwrap()
    }

    fn page() -> Url {
        Url::parse("https://gazette.example.com/news/").unwrap()
    }

    #[test]
    fn test_extracts_triples_with_scoped_image_and_summary() {
        let html = r#"
            <h3 class="title"><a href="/a?id=1">First &amp; foremost</a></h3>
            <span class="date">January 5, 2025 10:30 am</span>
            <p></p>
            <p>First summary.</p>
            <img src="/img/one.jpg">
            <h3 class="title"><a href="/b?id=2">Second</a></h3>
            <span class="date">2 hours ago</span>
            <p>Second summary.</p>
        "#;
        let items = extract("gazette", &compiled(), html, &page()).unwrap();
        assert_eq!(items.len(), 2);

        assert_eq!(items[0].title(), "First & foremost");
        assert_eq!(items[0].url(), "https://gazette.example.com/a?id=1");
        assert_eq!(items[0].raw_time(), "January 5, 2025 10:30 am");
        assert_eq!(items[0].summary(), "First summary.");
        assert_eq!(items[0].image_url(), "https://gazette.example.com/img/one.jpg");

        // The second article has no image of its own and must not borrow one.
        assert_eq!(items[1].summary(), "Second summary.");
        assert_eq!(items[1].image_url(), PLACEHOLDER_IMAGE);
    }

    #[test]
    fn test_unresolvable_link_skips_only_that_item() {
        let html = r#"
            <h3 class="title"><a href="javascript:void(0)">Broken</a></h3><span class="date">today</span>
            <h3 class="title"><a href="/ok">Fine</a></h3><span class="date">today</span>
        "#;
        let items = extract("gazette", &compiled(), html, &page()).unwrap();
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].title(), "Fine");
    }

    #[test]
    fn test_no_match_is_source_failure() {
        let err = extract("gazette", &compiled(), "<html></html>", &page()).unwrap_err();
        assert!(matches!(err, Diagnostic::RootNotFound { .. }));
    }

    #[test]
    fn test_compile_rejects_missing_groups() {
        let rules = PatternRules {
            item: r#"<a href="(?P<url>[^"]+)">"#.to_string(),
            window: 100,
        };
        assert!(matches!(rules.compile("x"), Err(Diagnostic::Config(_))));

        let bad = PatternRules {
            item: "(unclosed".to_string(),
            window: 100,
        };
        assert!(matches!(bad.compile("x"), Err(Diagnostic::Config(_))));
    }

    #[test]
    fn test_garbage_input_does_not_panic() {
        let full = r#"<h3 class="title"><a href="/a">First</a></h3><span class="date">today</span><p>Sum</p>"#;
        let mut inputs = vec![
            String::new(),
            "<<<>>>".to_string(),
            "\u{0}\u{1}".to_string(),
            r#"<h3 class="title"><a href="#.to_string(),
        ];
        inputs.extend((0..full.len()).map(|cut| full[..cut].to_string()));
        for input in &inputs {
            let _ = extract("gazette", &compiled(), input, &page());
        }
    }

    #[test]
    fn test_match_at_end_of_multibyte_document() {
        let html = r#"<p>日本語のニュース</p><h3 class="title"><a href="/z">終わり</a></h3><span class="date">今日</span>"#;
        let items = extract("gazette", &compiled(), html, &page()).unwrap();
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].title(), "終わり");
        assert_eq!(items[0].summary(), "");

        // A tiny window ending inside a multibyte tail backs off to a boundary.
        let narrow = PatternRules {
            item: ITEM.to_string(),
            window: 1,
        }
        .compile("gazette")
        .unwrap();
        let html = format!("{html}ニュース<p>要約</p>");
        let items = extract("gazette", &narrow, &html, &page()).unwrap();
        assert_eq!(items[0].url(), "https://gazette.example.com/z");
    }

    #[test]
    fn test_window_end_respects_char_boundaries() {
        let html = "aé";
        // Byte 2 is inside the two-byte 'é'.
        assert_eq!(window_end(html, 0, None, 2), 1);
        assert_eq!(window_end(html, 0, Some(1), 100), 1);
    }
}
