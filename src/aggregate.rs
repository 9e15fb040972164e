//! Merge of all adapters' output into one newest-first list.
//!
//! A stable top-down merge sort driven by [`compare_raw`]. The comparator
//! mixes incompatible date representations and is not guaranteed to be
//! transitive; a hand-written merge still terminates with every item present,
//! where `slice::sort_by` is allowed to panic on such a comparator.
//!
//! No deduplication: the same story from two sources appears twice.

use crate::models::Item;
use crate::ordering::compare_raw;
use itertools::Itertools;
use std::cmp::Ordering;
use tracing::{debug, instrument};

/// Concatenate per-source batches (in source order) and sort newest first.
#[instrument(level = "debug", skip_all, fields(batches = batches.len()))]
pub fn aggregate(batches: Vec<Vec<Item>>) -> Vec<Item> {
    merge_sorted(batches.into_iter().concat())
}

/// Sort items newest first. Equal keys keep their input order.
pub fn merge_sorted(items: Vec<Item>) -> Vec<Item> {
    merge_sort_by(items, &mut compare_items)
}

/// Recency comparison for two items.
///
/// If the date comparator fails for the pair, the pair is ordered by source
/// name instead so the sort always completes.
pub fn compare_items(a: &Item, b: &Item) -> Ordering {
    match compare_raw(a.raw_time(), b.raw_time()) {
        Ok(ordering) => ordering,
        Err(e) => {
            debug!(
                error = %e,
                a = %a.raw_time(),
                b = %b.raw_time(),
                "Comparator failed; ordering by source"
            );
            a.source().cmp(b.source())
        }
    }
}

fn merge_sort_by<T, F>(mut items: Vec<T>, cmp: &mut F) -> Vec<T>
where
    F: FnMut(&T, &T) -> Ordering,
{
    if items.len() <= 1 {
        return items;
    }
    let right = items.split_off(items.len() / 2);
    let left = merge_sort_by(items, cmp);
    let right = merge_sort_by(right, cmp);
    merge(left, right, cmp)
}

fn merge<T, F>(left: Vec<T>, right: Vec<T>, cmp: &mut F) -> Vec<T>
where
    F: FnMut(&T, &T) -> Ordering,
{
    let mut out = Vec::with_capacity(left.len() + right.len());
    let mut left = left.into_iter().peekable();
    let mut right = right.into_iter().peekable();
    loop {
        // Ties go left, which keeps the sort stable.
        let take_right = match (left.peek(), right.peek()) {
            (Some(l), Some(r)) => cmp(r, l) == Ordering::Less,
            (Some(_), None) => false,
            (None, Some(_)) => true,
            (None, None) => break,
        };
        out.extend(if take_right { right.next() } else { left.next() });
    }
    out
}
