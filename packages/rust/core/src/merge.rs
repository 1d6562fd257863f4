//! Merge of newly resolved items into the stored collection.
//!
//! This is the only place a [`Collection`] is mutated. Duplicate links are
//! settled here, against both the stored items and earlier items of the same
//! batch, so the outcome depends only on the order of `new_items`.

use chrono::{DateTime, Utc};
use tracing::{debug, instrument};

use feedcollector_shared::{Collection, Entry, ResolvedItem};

use crate::dedup::DedupIndex;

/// Result of [`merge`].
#[derive(Debug, Clone, PartialEq)]
pub struct MergeOutcome {
    pub collection: Collection,
    /// Number of items actually appended.
    pub added: usize,
}

/// Append every item whose link is not yet present, then restore order.
///
/// Items are sorted ascending by `published` with a stable sort. When nothing
/// is appended the collection comes back untouched, `updated` included.
/// Otherwise `updated` becomes the newest `published`, never moving backwards.
#[instrument(skip_all, fields(existing = existing.len(), incoming = new_items.len()))]
pub fn merge(existing: Collection, new_items: Vec<ResolvedItem>) -> MergeOutcome {
    let mut collection = existing;
    let index = DedupIndex::from_links(collection.items.iter().map(|item| item.link.clone()));

    let mut added = 0;
    for item in new_items {
        if index.check_and_record(&item.link) {
            collection.items.push(item);
            added += 1;
        } else {
            debug!(link = %item.link, "duplicate link, skipping");
        }
    }

    if added == 0 {
        return MergeOutcome { collection, added };
    }

    collection.items.sort_by_key(|item| item.published);

    let newest = collection.items.iter().map(|item| item.published).max();
    collection.updated = match (collection.updated, newest) {
        (Some(prior), Some(newest)) => Some(prior.max(newest)),
        (prior, newest) => prior.or(newest),
    };

    debug!(added, total = collection.len(), "merge complete");
    MergeOutcome { collection, added }
}

/// Entries strictly newer than the watermark; all of them when there is none.
pub fn select_candidates(entries: Vec<Entry>, watermark: Option<DateTime<Utc>>) -> Vec<Entry> {
    match watermark {
        Some(mark) => entries.into_iter().filter(|e| e.published > mark).collect(),
        None => entries,
    }
}
