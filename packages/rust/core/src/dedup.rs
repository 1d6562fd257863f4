//! Set of canonical links already present in the collection.

use std::collections::HashSet;
use std::sync::{Mutex, PoisonError};

/// Membership index over canonical links, safe to share between tasks.
#[derive(Debug, Default)]
pub struct DedupIndex {
    seen: Mutex<HashSet<String>>,
}

impl DedupIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build an index from the links of an existing collection.
    pub fn from_links<I, S>(links: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            seen: Mutex::new(links.into_iter().map(Into::into).collect()),
        }
    }

    pub fn contains(&self, link: &str) -> bool {
        self.lock().contains(link)
    }

    pub fn record(&self, link: impl Into<String>) {
        self.lock().insert(link.into());
    }

    /// Record `link` and report whether it was new. Test and insert happen
    /// under one lock, so two callers never both see `true` for a link.
    pub fn check_and_record(&self, link: &str) -> bool {
        let mut seen = self.lock();
        if seen.contains(link) {
            false
        } else {
            seen.insert(link.to_string())
        }
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashSet<String>> {
        // The set stays consistent even if a holder panicked
        self.seen.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
