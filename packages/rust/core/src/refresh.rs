//! `refresh` pipeline: re-resolve every stored item.
//!
//! Titles and canonical links are recomputed with the current resolver and
//! allow-list. Items that no longer resolve are kept as they were, or dropped
//! when `prune` is set. Items that converge on the same canonical link are
//! collapsed by the merge stage, keeping the earliest.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

use tracing::{info, instrument};

use feedcollector_resolver::{HttpResolver, Resolve};
use feedcollector_shared::{
    AppConfig, Collection, CorruptStatePolicy, Entry, ResolvedItem, ResolverConfig, Result,
};
use feedcollector_storage::JsonStore;

use crate::merge;
use crate::pipeline::ProgressReporter;
use crate::scheduler;

/// Configuration for [`run_refresh`].
#[derive(Debug, Clone)]
pub struct RefreshConfig {
    pub storage_path: PathBuf,
    pub on_corrupt: CorruptStatePolicy,
    pub resolver: ResolverConfig,
    /// Drop items whose link no longer resolves.
    pub prune: bool,
}

impl RefreshConfig {
    pub fn from_app(config: &AppConfig, prune: bool) -> Self {
        Self {
            storage_path: PathBuf::from(&config.defaults.storage_file),
            on_corrupt: config.storage.on_corrupt,
            resolver: ResolverConfig::from(config),
            prune,
        }
    }
}

/// Result of the `refresh` pipeline.
#[derive(Debug)]
pub struct RefreshResult {
    pub collection: Collection,
    /// Items re-resolved.
    pub checked: usize,
    /// Items whose title or link changed.
    pub changed: usize,
    /// Items that failed to resolve.
    pub failed: usize,
    /// Failed items removed (only with `prune`).
    pub pruned: usize,
    /// Items collapsed into an earlier item with the same link.
    pub collapsed: usize,
    pub elapsed: std::time::Duration,
}

/// Run the `refresh` pipeline with the HTTP resolver.
pub async fn run_refresh(
    config: &RefreshConfig,
    progress: &dyn ProgressReporter,
) -> Result<RefreshResult> {
    let resolver = Arc::new(HttpResolver::new(&config.resolver)?);
    refresh_with(config, resolver, progress).await
}

/// Run the `refresh` pipeline with any resolver.
#[instrument(skip_all, fields(storage = %config.storage_path.display(), prune = config.prune))]
pub async fn refresh_with<R>(
    config: &RefreshConfig,
    resolver: Arc<R>,
    progress: &dyn ProgressReporter,
) -> Result<RefreshResult>
where
    R: Resolve + 'static,
{
    let start = Instant::now();

    progress.phase("Loading collection");
    let store = JsonStore::new(&config.storage_path, config.on_corrupt);
    let existing = store.load()?;

    if existing.is_empty() {
        info!("collection is empty, nothing to refresh");
        return Ok(RefreshResult {
            collection: existing,
            checked: 0,
            changed: 0,
            failed: 0,
            pruned: 0,
            collapsed: 0,
            elapsed: start.elapsed(),
        });
    }

    let entries: Vec<Entry> = existing
        .items
        .iter()
        .map(|item| Entry {
            title: item.title.clone(),
            link: item.link.clone(),
            published: item.published,
        })
        .collect();

    progress.phase("Resolving links");
    let report = scheduler::fan_out(
        resolver,
        &entries,
        config.resolver.concurrency,
        &config.resolver.allowed_query_params,
        progress,
    )
    .await;
    let failed = report.failures.len();

    let mut fresh: Vec<Option<ResolvedItem>> = vec![None; existing.items.len()];
    for resolved in report.resolved {
        fresh[resolved.index] = Some(resolved.item);
    }

    let mut changed = 0;
    let mut pruned = 0;
    let mut items = Vec::with_capacity(existing.items.len());
    for (old, new) in existing.items.iter().zip(fresh) {
        match new {
            Some(item) => {
                if item != *old {
                    changed += 1;
                }
                items.push(item);
            }
            None if config.prune => pruned += 1,
            None => items.push(old.clone()),
        }
    }
    let kept = items.len();

    progress.phase("Saving collection");
    let base = Collection {
        title: existing.title,
        updated: existing.updated,
        items: Vec::new(),
    };
    let outcome = merge::merge(base, items);
    store.save(&outcome.collection)?;

    let result = RefreshResult {
        collection: outcome.collection,
        checked: entries.len(),
        changed,
        failed,
        pruned,
        collapsed: kept - outcome.added,
        elapsed: start.elapsed(),
    };

    info!(
        checked = result.checked,
        changed = result.changed,
        failed = result.failed,
        pruned = result.pruned,
        collapsed = result.collapsed,
        total = result.collection.len(),
        "refresh pipeline complete"
    );

    Ok(result)
}
