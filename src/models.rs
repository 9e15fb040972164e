//! Data models for aggregated headlines.
//!
//! - [`Item`]: one normalized headline produced by an extraction adapter
//! - [`Digest`]: one edition of the aggregated, ordered feed as written to disk
//!
//! Items serialize with camelCase field names (`rawTime`, `imageUrl`) so the
//! JSON digest matches what the presentation layer reads.

use crate::error::ItemError;
use serde::{Deserialize, Serialize};

/// Sentinel for items whose source did not carry a usable thumbnail.
pub const PLACEHOLDER_IMAGE: &str = "placeholder";

/// Sentinel title for fragments whose heading anchor has no text.
pub const NO_TITLE: &str = "No Title";

/// Sentinel source identity, only used if an adapter is misconfigured with an empty name.
pub const UNKNOWN_SOURCE: &str = "unknown";

/// A single normalized headline.
///
/// Built once by an adapter and never mutated afterwards; a refetch replaces
/// the whole list. `title` and `source` are never empty and `url` always
/// holds a resolved link. Deserialization goes through [`Item::new`], so a
/// cached entry cannot smuggle in an item without a link.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase", try_from = "StoredItem")]
pub struct Item {
    title: String,
    url: String,
    raw_time: String,
    summary: String,
    image_url: String,
    source: String,
}

impl Item {
    /// Build an item, substituting sentinels for missing fields.
    ///
    /// Returns `None` when `url` is blank: an item without a link is dropped,
    /// never emitted.
    pub fn new(
        source: &str,
        title: &str,
        url: &str,
        raw_time: &str,
        summary: &str,
        image_url: Option<&str>,
    ) -> Option<Self> {
        let url = url.trim();
        if url.is_empty() {
            return None;
        }
        Some(Self {
            title: non_empty_or(title, NO_TITLE),
            url: url.to_string(),
            raw_time: raw_time.trim().to_string(),
            summary: summary.trim().to_string(),
            image_url: non_empty_or(image_url.unwrap_or_default(), PLACEHOLDER_IMAGE),
            source: non_empty_or(source, UNKNOWN_SOURCE),
        })
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    /// The timestamp exactly as the source printed it.
    pub fn raw_time(&self) -> &str {
        &self.raw_time
    }

    pub fn summary(&self) -> &str {
        &self.summary
    }

    pub fn image_url(&self) -> &str {
        &self.image_url
    }

    /// Identity of the adapter that produced the item.
    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn has_image(&self) -> bool {
        self.image_url != PLACEHOLDER_IMAGE
    }
}

/// Wire shape of [`Item`] before its invariants are checked.
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct StoredItem {
    #[serde(default)]
    title: String,
    #[serde(default)]
    url: String,
    #[serde(default)]
    raw_time: String,
    #[serde(default)]
    summary: String,
    #[serde(default)]
    image_url: String,
    #[serde(default)]
    source: String,
}

impl TryFrom<StoredItem> for Item {
    type Error = ItemError;

    fn try_from(stored: StoredItem) -> Result<Self, Self::Error> {
        Item::new(
            &stored.source,
            &stored.title,
            &stored.url,
            &stored.raw_time,
            &stored.summary,
            Some(&stored.image_url),
        )
        .ok_or(ItemError::UnresolvableLink(stored.url))
    }
}

fn non_empty_or(value: &str, fallback: &str) -> String {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        fallback.to_string()
    } else {
        trimmed.to_string()
    }
}

/// One edition of the aggregated feed.
///
/// # Edition Naming
///
/// `time_of_day` is one of `"morning"` (00:00–08:00), `"afternoon"`
/// (08:00–16:00) or `"evening"` (16:00–24:00).
#[derive(Debug, Deserialize, Serialize)]
pub struct Digest {
    /// Local date of the run in `YYYY-MM-DD` format.
    pub local_date: String,
    /// "morning", "afternoon", or "evening".
    pub time_of_day: String,
    /// Local time of the run.
    pub local_time: String,
    /// Whether the items came from a stale cache entry.
    pub stale: bool,
    /// Items ordered newest first.
    pub items: Vec<Item>,
}
