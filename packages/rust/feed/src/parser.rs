//! Conversion of a parsed syndication document into [`Entry`] values.
//!
//! RSS 2.0, Atom and JSON Feed are all accepted; `feed-rs` does the format
//! work and this module only picks the three fields the pipeline needs.

use chrono::SubsecRound;
use feedcollector_shared::{CollectorError, Entry, Result};
use tracing::debug;

/// A feed reduced to what the pipeline consumes.
#[derive(Debug, Clone, Default)]
pub struct ParsedFeed {
    /// Channel title (empty when the feed has none).
    pub title: String,
    /// Usable entries in document order.
    pub entries: Vec<Entry>,
}

/// Parse a raw feed document.
///
/// Entries without a link, or without either a published or an updated
/// date, are skipped: they cannot be placed against the watermark. Dates are
/// truncated to whole seconds, the precision the collection is stored with.
pub fn parse_feed(bytes: &[u8]) -> Result<ParsedFeed> {
    let feed = feed_rs::parser::parse(bytes)
        .map_err(|e| CollectorError::FeedUnavailable(format!("cannot parse feed: {e}")))?;

    let title = feed.title.map(|t| t.content).unwrap_or_default();

    let mut entries = Vec::with_capacity(feed.entries.len());
    for item in feed.entries {
        let Some(link) = item.links.first().map(|l| l.href.trim().to_string()) else {
            debug!(id = %item.id, "entry has no link, skipping");
            continue;
        };
        if link.is_empty() {
            debug!(id = %item.id, "entry has an empty link, skipping");
            continue;
        }

        let Some(published) = item.published.or(item.updated) else {
            debug!(%link, "entry has no date, skipping");
            continue;
        };

        entries.push(Entry {
            title: item.title.map(|t| t.content).unwrap_or_default(),
            link,
            published: published.trunc_subsecs(0),
        });
    }

    Ok(ParsedFeed { title, entries })
}
