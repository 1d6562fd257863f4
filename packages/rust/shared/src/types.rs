//! Core domain types: feed entries, resolved items, and the stored collection.

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};

/// Title used when a page has no usable `<title>`.
pub const UNTITLED: &str = "Untitled";

// ---------------------------------------------------------------------------
// Entry
// ---------------------------------------------------------------------------

/// One entry as handed over by the feed parser.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Entry {
    /// Title as it appears in the feed.
    pub title: String,
    /// Link as it appears in the feed (not yet normalized).
    pub link: String,
    /// Publication instant.
    pub published: DateTime<Utc>,
}

// ---------------------------------------------------------------------------
// ResolvedItem
// ---------------------------------------------------------------------------

/// A stored link: normalized title, canonical link, and publication time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolvedItem {
    /// Normalized page title.
    pub title: String,
    /// Canonical link (post-redirect, tracking parameters removed).
    pub link: String,
    /// Publication instant, taken from the feed entry.
    #[serde(with = "rfc3339")]
    pub published: DateTime<Utc>,
}

// ---------------------------------------------------------------------------
// Collection
// ---------------------------------------------------------------------------

/// The persisted collection, the `data.json` structure.
///
/// Items are unique by `link` and sorted ascending by `published`; both are
/// maintained by the merge stage, never by callers.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Collection {
    /// Feed title.
    #[serde(default)]
    pub title: String,
    /// Watermark: newest publication instant already processed.
    #[serde(default, with = "rfc3339_opt")]
    pub updated: Option<DateTime<Utc>>,
    /// Stored items in chronological order.
    #[serde(default)]
    pub items: Vec<ResolvedItem>,
}

impl Collection {
    /// An empty collection with no watermark.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Number of stored items.
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Whether the collection holds no items.
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

// ---------------------------------------------------------------------------
// Timestamp encoding
// ---------------------------------------------------------------------------

/// Format an instant the way it is persisted: RFC 3339, whole seconds, `Z`.
pub fn format_timestamp(ts: &DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Secs, true)
}

/// Parse an RFC 3339 timestamp with any offset into UTC.
pub fn parse_timestamp(s: &str) -> std::result::Result<DateTime<Utc>, chrono::ParseError> {
    DateTime::parse_from_rfc3339(s.trim()).map(|dt| dt.with_timezone(&Utc))
}

/// Serde adapter for a required RFC 3339 timestamp.
pub mod rfc3339 {
    use chrono::{DateTime, Utc};
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(ts: &DateTime<Utc>, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_str(&super::format_timestamp(ts))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<DateTime<Utc>, D::Error> {
        let raw = String::deserialize(d)?;
        super::parse_timestamp(&raw).map_err(serde::de::Error::custom)
    }
}

/// Serde adapter for an optional timestamp stored as `""` when absent.
pub mod rfc3339_opt {
    use chrono::{DateTime, Utc};
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(ts: &Option<DateTime<Utc>>, s: S) -> Result<S::Ok, S::Error> {
        match ts {
            Some(ts) => s.serialize_str(&super::format_timestamp(ts)),
            None => s.serialize_str(""),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        d: D,
    ) -> Result<Option<DateTime<Utc>>, D::Error> {
        let raw = Option::<String>::deserialize(d)?;
        match raw.as_deref().map(str::trim) {
            None | Some("") => Ok(None),
            Some(s) => super::parse_timestamp(s)
                .map(Some)
                .map_err(serde::de::Error::custom),
        }
    }
}
