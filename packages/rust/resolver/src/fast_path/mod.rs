//! Host-specific resolution strategies that skip the network.
//!
//! A fast path synthesizes a [`Resolution`] straight from the URL. The
//! registry is consulted before any HTTP fetch; when no strategy claims a URL
//! the general fetch runs.

mod github;

use url::Url;

use crate::Resolution;

pub use github::GitHubFastPath;

// ---------------------------------------------------------------------------
// Trait
// ---------------------------------------------------------------------------

/// A resolution strategy selected by URL host.
pub trait FastPath: Send + Sync {
    /// Whether this strategy handles the URL's host.
    fn matches(&self, url: &Url) -> bool;

    /// Build a resolution without fetching. `None` defers to the next strategy.
    fn resolve(&self, url: &Url) -> Option<Resolution>;

    /// Human-readable strategy name for tracing.
    fn name(&self) -> &str;
}

// ---------------------------------------------------------------------------
// Registry
// ---------------------------------------------------------------------------

/// Holds registered fast paths in priority order.
pub struct FastPathRegistry {
    strategies: Vec<Box<dyn FastPath>>,
}

impl FastPathRegistry {
    /// Create a registry with all built-in strategies.
    pub fn new() -> Self {
        Self {
            strategies: vec![Box::new(GitHubFastPath)],
        }
    }

    /// A registry that never short-circuits.
    pub fn empty() -> Self {
        Self {
            strategies: Vec::new(),
        }
    }

    /// Try each matching strategy in order; returns the first resolution and
    /// the name of the strategy that produced it.
    pub fn resolve(&self, url: &Url) -> Option<(&str, Resolution)> {
        self.strategies
            .iter()
            .filter(|s| s.matches(url))
            .find_map(|s| s.resolve(url).map(|r| (s.name(), r)))
    }
}

impl Default for FastPathRegistry {
    fn default() -> Self {
        Self::new()
    }
}
