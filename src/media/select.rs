//! Media filtering and selection.
//!
//! Filters candidate items by media type (and, in the extended variant, by
//! byte size), then picks either a uniformly random item or the item whose
//! original-capture timestamp lies closest to a target. Empty candidate sets
//! yield `None` in every mode; selection never panics.

use chrono::{DateTime, Duration, Utc};
use rand::Rng;

use crate::commons::types::{MediaItem, MediaType};

/// Default selection size cap for the extended variant: 5 MiB.
pub const DEFAULT_MAX_MEDIA_BYTES: u64 = 5 * 1024 * 1024;

/// Select one media item from `items`, or `None` if nothing qualifies.
///
/// With no `target`, the pick is uniform over the filtered candidates. With a
/// `target`, the candidate minimizing the absolute time distance wins; strict
/// `<` comparison means ties resolve to the earliest-indexed candidate, and
/// items without a parseable capture date are never considered.
pub fn select_media<'a>(
    items: &'a [MediaItem],
    media_type: &MediaType,
    max_size_bytes: Option<u64>,
    target: Option<DateTime<Utc>>,
) -> Option<&'a MediaItem> {
    let candidates = filter_candidates(items, media_type, max_size_bytes);
    if candidates.is_empty() {
        return None;
    }

    match target {
        None => {
            let index = rand::thread_rng().gen_range(0..candidates.len());
            Some(candidates[index])
        }
        Some(target) => nearest_capture(&candidates, target),
    }
}

/// Retain items whose media type matches exactly and, when a size cap is
/// given, whose reported size does not exceed it. Items without a reported
/// size fail the cap.
pub fn filter_candidates<'a>(
    items: &'a [MediaItem],
    media_type: &MediaType,
    max_size_bytes: Option<u64>,
) -> Vec<&'a MediaItem> {
    items
        .iter()
        .filter(|item| item.media_type == *media_type)
        .filter(|item| match max_size_bytes {
            Some(max) => item.size_bytes.is_some_and(|size| size <= max),
            None => true,
        })
        .collect()
}

/// The candidate with minimum absolute distance to `target`, first index
/// winning ties. `None` if no candidate has a usable capture date.
fn nearest_capture<'a>(
    candidates: &[&'a MediaItem],
    target: DateTime<Utc>,
) -> Option<&'a MediaItem> {
    let mut best: Option<&MediaItem> = None;
    let mut min_distance: Option<Duration> = None;

    for item in candidates {
        let Some(captured) = item.original_timestamp else {
            continue;
        };
        let distance = (captured - target).abs();
        if min_distance.is_none_or(|min| distance < min) {
            min_distance = Some(distance);
            best = Some(item);
        }
    }

    best
}
