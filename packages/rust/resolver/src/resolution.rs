//! The resolution contract shared by the HTTP resolver and its test doubles.

use std::future::Future;

use feedcollector_shared::FetchError;

/// Outcome of resolving one link.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resolution {
    /// URL after following redirects.
    pub final_url: String,
    /// Raw page title (`"Untitled"` when the page has none).
    pub title: String,
}

/// Anything that can turn a link into a [`Resolution`].
///
/// Implementations must be safe to call from many tasks at once.
pub trait Resolve: Send + Sync {
    /// Resolve a single link.
    fn resolve(&self, url: &str) -> impl Future<Output = Result<Resolution, FetchError>> + Send;
}
