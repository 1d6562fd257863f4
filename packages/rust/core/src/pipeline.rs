//! End-to-end `update` pipeline: load → feed → filter → resolve → merge → save.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

use tracing::{info, instrument};

use feedcollector_feed::FeedOptions;
use feedcollector_resolver::{HttpResolver, Resolve, normalize_link};
use feedcollector_shared::{
    AppConfig, Collection, CorruptStatePolicy, FetchError, ResolverConfig, Result,
};
use feedcollector_storage::JsonStore;

use crate::dedup::DedupIndex;
use crate::merge::{self, MergeOutcome};
use crate::scheduler;

/// Configuration for [`run_update`].
#[derive(Debug, Clone)]
pub struct UpdateConfig {
    /// Feed to read entries from.
    pub feed_url: String,
    /// Collection file.
    pub storage_path: PathBuf,
    /// What to do with an unreadable collection file.
    pub on_corrupt: CorruptStatePolicy,
    /// Feed download settings.
    pub feed: FeedOptions,
    /// Link resolution settings.
    pub resolver: ResolverConfig,
}

impl UpdateConfig {
    /// Settings from the loaded config file.
    pub fn from_app(config: &AppConfig, feed_url: String) -> Self {
        Self {
            feed_url,
            storage_path: PathBuf::from(&config.defaults.storage_file),
            on_corrupt: config.storage.on_corrupt,
            feed: FeedOptions::from(config),
            resolver: ResolverConfig::from(config),
        }
    }
}

/// Result of the `update` pipeline.
#[derive(Debug)]
pub struct UpdateResult {
    /// The collection as saved.
    pub collection: Collection,
    /// Usable entries in the feed.
    pub feed_entries: usize,
    /// Entries newer than the watermark.
    pub candidates: usize,
    /// Candidates skipped because their link was already stored.
    pub skipped_known: usize,
    /// Candidates that resolved.
    pub resolved: usize,
    /// Candidates dropped after a failed resolution.
    pub failed: usize,
    /// Items appended to the collection.
    pub added: usize,
    /// Total elapsed time.
    pub elapsed: std::time::Duration,
}

/// Progress callback for reporting pipeline status.
pub trait ProgressReporter: Send + Sync {
    /// Called when entering a new phase.
    fn phase(&self, name: &str);
    /// Called when a link resolves.
    fn item_resolved(&self, link: &str, current: usize, total: usize);
    /// Called when a link is dropped.
    fn item_failed(&self, link: &str, error: &FetchError, current: usize, total: usize);
}

/// No-op progress reporter for headless/test usage.
pub struct SilentProgress;

impl ProgressReporter for SilentProgress {
    fn phase(&self, _name: &str) {}
    fn item_resolved(&self, _link: &str, _current: usize, _total: usize) {}
    fn item_failed(&self, _link: &str, _error: &FetchError, _current: usize, _total: usize) {}
}

/// Run the `update` pipeline with the HTTP resolver.
pub async fn run_update(
    config: &UpdateConfig,
    progress: &dyn ProgressReporter,
) -> Result<UpdateResult> {
    let resolver = Arc::new(HttpResolver::new(&config.resolver)?);
    update_with(config, resolver, progress).await
}

/// Run the `update` pipeline with any resolver.
///
/// 1. Load the stored collection (a corrupt file aborts before any network use)
/// 2. Fetch and parse the feed
/// 3. Keep entries newer than the watermark whose link is not stored yet
/// 4. Resolve them concurrently
/// 5. Merge in feed order and save
///
/// Nothing is written unless every step before the save succeeded.
#[instrument(skip_all, fields(feed = %config.feed_url, storage = %config.storage_path.display()))]
pub async fn update_with<R>(
    config: &UpdateConfig,
    resolver: Arc<R>,
    progress: &dyn ProgressReporter,
) -> Result<UpdateResult>
where
    R: Resolve + 'static,
{
    let start = Instant::now();
    let allowed = &config.resolver.allowed_query_params;

    // --- Phase 1: Load ---
    progress.phase("Loading collection");
    let store = JsonStore::new(&config.storage_path, config.on_corrupt);
    let existing = store.load()?;

    // --- Phase 2: Feed ---
    progress.phase("Fetching feed");
    let feed = feedcollector_feed::fetch_feed(&config.feed_url, &config.feed).await?;
    let feed_entries = feed.entries.len();

    // --- Phase 3: Filter ---
    let candidates = merge::select_candidates(feed.entries, existing.updated);
    let candidate_count = candidates.len();

    let known = DedupIndex::from_links(existing.items.iter().map(|item| item.link.clone()));
    let fresh: Vec<_> = candidates
        .into_iter()
        .filter(|entry| !known.contains(&normalize_link(&entry.link, allowed)))
        .collect();
    let skipped_known = candidate_count - fresh.len();

    info!(
        feed_entries,
        candidates = candidate_count,
        skipped_known,
        "selected candidates"
    );

    // --- Phase 4: Resolve ---
    progress.phase("Resolving links");
    let report = scheduler::fan_out(
        resolver,
        &fresh,
        config.resolver.concurrency,
        allowed,
        progress,
    )
    .await;
    let resolved = report.resolved.len();
    let failed = report.failures.len();

    // --- Phase 5: Merge & save ---
    progress.phase("Saving collection");
    let MergeOutcome {
        mut collection,
        added,
    } = merge::merge(existing, report.into_ordered_items());
    if !feed.title.is_empty() {
        collection.title = feed.title;
    }
    store.save(&collection)?;

    let result = UpdateResult {
        collection,
        feed_entries,
        candidates: candidate_count,
        skipped_known,
        resolved,
        failed,
        added,
        elapsed: start.elapsed(),
    };

    info!(
        resolved = result.resolved,
        failed = result.failed,
        added = result.added,
        total = result.collection.len(),
        elapsed_ms = result.elapsed.as_millis(),
        "update pipeline complete"
    );

    Ok(result)
}
