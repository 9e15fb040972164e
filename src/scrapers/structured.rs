//! Structured-lookup extraction.
//!
//! For sources whose listing markup is regular enough to walk as a tree:
//!
//! ```text
//! <root>                      root matcher; missing => source failure
//!   <item>                    item matcher, one per headline
//!     <h2><a href>Title</a>   first anchor in the first heading-like element
//!     <span class="date">     first known date class, else the first <p>
//!     <p>Summary</p>          first <p> not used as the date
//!     <noscript><img></noscript> / <img data-src>
//! ```
//!
//! A container missing its anchor is skipped; its siblings are unaffected.

use super::dom::{Matcher, Node};
use super::images::{find_image, resolve_url};
use crate::error::{Diagnostic, ItemError};
use crate::models::Item;
use crate::utils::truncate_for_log;
use scraper::Html;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument, warn};
use url::Url;

fn default_heading_tags() -> Vec<String> {
    ["h1", "h2", "h3", "h4"].iter().map(|t| t.to_string()).collect()
}

fn default_date_classes() -> Vec<String> {
    ["date", "time", "timestamp", "published", "post-date"]
        .iter()
        .map(|c| c.to_string())
        .collect()
}

/// Where items live in a structured source.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct StructuredRules {
    /// Container holding every item.
    pub root: Matcher,
    /// One element per headline.
    pub item: Matcher,
    /// Heading-like tags searched for the title anchor. Empty means the first
    /// anchor anywhere in the item.
    #[serde(default = "default_heading_tags")]
    pub heading_tags: Vec<String>,
    /// Classes that mark the date element, tried in order.
    #[serde(default = "default_date_classes")]
    pub date_classes: Vec<String>,
}

impl StructuredRules {
    pub fn new(root: Matcher, item: Matcher) -> Self {
        Self {
            root,
            item,
            heading_tags: default_heading_tags(),
            date_classes: default_date_classes(),
        }
    }
}

/// Extract every well-formed item from one structured page.
///
/// # Errors
///
/// [`Diagnostic::RootNotFound`] when the root container is absent.
#[instrument(level = "debug", skip_all, fields(source = %source, url = %page_url))]
pub fn extract(
    source: &str,
    rules: &StructuredRules,
    html: &str,
    page_url: &Url,
) -> Result<Vec<Item>, Diagnostic> {
    let document = Html::parse_document(html);
    let Some(root) = Node::root(&document).first_descendant_matching(&rules.root) else {
        warn!(
            matcher = %rules.root,
            preview = %truncate_for_log(html.trim(), 200),
            "Root container not found"
        );
        return Err(Diagnostic::RootNotFound {
            source_name: source.to_string(),
            matcher: rules.root.to_string(),
        });
    };

    let mut items = Vec::new();
    let mut skipped = 0usize;
    for (index, container) in root.descendants_matching(&rules.item).enumerate() {
        match extract_item(source, rules, container, page_url) {
            Ok(item) => items.push(item),
            Err(e) => {
                skipped += 1;
                debug!(index, error = %e, "Skipping malformed item");
            }
        }
    }

    info!(count = items.len(), skipped, "Extracted structured items");
    Ok(items)
}

fn extract_item(
    source: &str,
    rules: &StructuredRules,
    container: Node<'_>,
    page_url: &Url,
) -> Result<Item, ItemError> {
    let anchor_scope = if rules.heading_tags.is_empty() {
        container
    } else {
        container
            .first_descendant_in(&rules.heading_tags)
            .ok_or(ItemError::MissingNode("heading"))?
    };
    let anchor = anchor_scope
        .first_descendant_of_tag("a")
        .ok_or(ItemError::MissingNode("a"))?;
    let href = anchor.attr("href").ok_or(ItemError::MissingNode("a[href]"))?;
    let url = resolve_url(page_url, href).ok_or_else(|| ItemError::UnresolvableLink(href.to_string()))?;

    let date_node = rules
        .date_classes
        .iter()
        .find_map(|class| container.first_descendant_with_class(class))
        .or_else(|| container.first_descendant_of_tag("p"));
    let raw_time = date_node.map(|n| n.text()).unwrap_or_default();

    let summary = container
        .descendants_of_tag("p")
        .find(|p| date_node.is_none_or(|d| !d.same_node(p)))
        .map(|p| p.text())
        .unwrap_or_default();

    let image = find_image(container, page_url);

    Item::new(
        source,
        &anchor.text(),
        &url,
        &raw_time,
        &summary,
        image.as_deref(),
    )
    .ok_or_else(|| ItemError::UnresolvableLink(href.to_string()))
}
