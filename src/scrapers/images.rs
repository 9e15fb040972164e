//! Thumbnail selection shared by both extraction strategies.
//!
//! Lazy-loading pages leave `src` pointing at an inline placeholder and put
//! the real URL in a `data-*` attribute, so attributes are tried in priority
//! order and inline payloads are skipped rather than accepted.

use super::dom::Node;
use scraper::Html;
use url::Url;

/// `img` attributes in the order they are tried.
pub const IMAGE_ATTRS: &[&str] = &["src", "data-src", "data-lazy-src", "data-original"];

/// Substrings marking tracking pixels and spacers (checked lowercase).
const TRACKING_PATTERNS: &[&str] = &[
    "pixel",
    "tracking",
    "beacon",
    "spacer",
    "clear.gif",
    "blank.gif",
    "1x1",
];

/// Whether a raw attribute value can be a meaningful thumbnail.
///
/// Rejects inline data URIs, SVG payloads, and tracking pixels.
pub fn is_meaningful_image(candidate: &str) -> bool {
    let lower = candidate.trim().to_ascii_lowercase();
    if lower.is_empty() || lower.starts_with("data:") {
        return false;
    }
    let path = lower.split(['?', '#']).next().unwrap_or_default();
    if path.ends_with(".svg") || lower.contains("image/svg") {
        return false;
    }
    !TRACKING_PATTERNS.iter().any(|p| lower.contains(p))
}

/// Resolve a possibly relative URL against the page it was found on.
///
/// Only `http`/`https` results are accepted.
pub fn resolve_url(base: &Url, raw: &str) -> Option<String> {
    let raw = raw.trim();
    if raw.is_empty() || raw.starts_with('#') {
        return None;
    }
    let resolved = base.join(raw).ok()?;
    matches!(resolved.scheme(), "http" | "https").then(|| resolved.to_string())
}

/// First meaningful image URL carried by an `img` element.
pub fn img_source(img: Node<'_>, base: &Url) -> Option<String> {
    IMAGE_ATTRS
        .iter()
        .filter_map(|attr| img.attr(attr))
        .filter(|value| is_meaningful_image(value))
        .find_map(|value| resolve_url(base, value))
}

/// First meaningful image inside `scope`, checking `noscript` fallbacks before
/// the visible `img` tags.
pub fn find_image(scope: Node<'_>, base: &Url) -> Option<String> {
    scope
        .descendants_of_tag("noscript")
        .find_map(|noscript| noscript_image(noscript, base))
        .or_else(|| {
            scope
                .descendants_of_tag("img")
                .find_map(|img| img_source(img, base))
        })
}

/// Image inside a `noscript` block.
///
/// With scripting enabled the parser keeps `noscript` contents as raw text, so
/// when no `img` element was built the text is parsed as a fragment.
fn noscript_image(noscript: Node<'_>, base: &Url) -> Option<String> {
    if let Some(found) = noscript
        .descendants_of_tag("img")
        .find_map(|img| img_source(img, base))
    {
        return Some(found);
    }
    let raw = noscript.raw_text();
    if !raw.contains("<img") {
        return None;
    }
    first_image_in_markup(&raw, base)
}

/// First meaningful image in a markup fragment.
pub fn first_image_in_markup(markup: &str, base: &Url) -> Option<String> {
    let fragment = Html::parse_fragment(markup);
    Node::root(&fragment)
        .descendants_of_tag("img")
        .find_map(|img| img_source(img, base))
}
