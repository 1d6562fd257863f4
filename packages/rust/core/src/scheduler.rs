//! Bounded-concurrency fan-out of link resolutions.
//!
//! One tokio task per entry, at most `limit` of them in flight. A permit is
//! taken from the semaphore *before* a task is spawned and moves into it, so
//! the number of live tasks never exceeds the limit. Completed tasks are
//! drained while waiting for permits; results arrive in completion order and
//! carry their input index.
//!
//! Failures (a [`FetchError`] or a panicked task) are logged, counted and
//! dropped. They never abort the batch.

use std::sync::Arc;

use tokio::sync::Semaphore;
use tokio::task::{JoinError, JoinSet};
use tracing::{debug, info, instrument, warn};

use feedcollector_resolver::{Resolution, Resolve, normalize_link, normalize_title};
use feedcollector_shared::{Entry, FetchError, ResolvedItem, UNTITLED};

use crate::pipeline::ProgressReporter;

/// A successful resolution tagged with the position of its entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resolved {
    pub index: usize,
    pub item: ResolvedItem,
}

/// Everything a fan-out produced.
#[derive(Debug, Default)]
pub struct FanOutReport {
    /// Successes in completion order.
    pub resolved: Vec<Resolved>,
    /// `(link, error)` for every entry that did not resolve.
    pub failures: Vec<(String, FetchError)>,
}

impl FanOutReport {
    /// Resolved items restored to input order.
    pub fn into_ordered_items(mut self) -> Vec<ResolvedItem> {
        self.resolved.sort_by_key(|r| r.index);
        self.resolved.into_iter().map(|r| r.item).collect()
    }
}

/// Build the stored form of an entry from its resolution.
pub fn resolved_item(entry: &Entry, resolution: &Resolution, allowed: &[String]) -> ResolvedItem {
    let title = normalize_title(&resolution.title);
    ResolvedItem {
        title: if title.is_empty() {
            UNTITLED.to_string()
        } else {
            title
        },
        link: normalize_link(&resolution.final_url, allowed),
        published: entry.published,
    }
}

/// Resolve every entry with at most `limit` resolutions in flight.
///
/// A `limit` of 0 is treated as 1. Returns once every entry has either
/// resolved or failed.
#[instrument(skip_all, fields(entries = entries.len(), limit = limit))]
pub async fn fan_out<R>(
    resolver: Arc<R>,
    entries: &[Entry],
    limit: usize,
    allowed: &[String],
    progress: &dyn ProgressReporter,
) -> FanOutReport
where
    R: Resolve + 'static,
{
    let limit = limit.max(1);
    let semaphore = Arc::new(Semaphore::new(limit));
    let mut tasks: JoinSet<(usize, Result<Resolution, FetchError>)> = JoinSet::new();
    let mut collector = Collector::new(entries, allowed, progress);

    'dispatch: for (index, entry) in entries.iter().enumerate() {
        let permit = loop {
            tokio::select! {
                permit = Arc::clone(&semaphore).acquire_owned() => match permit {
                    Ok(permit) => break permit,
                    Err(_) => {
                        warn!("worker pool closed, stopping dispatch");
                        break 'dispatch;
                    }
                },
                Some(joined) = tasks.join_next(), if !tasks.is_empty() => {
                    collector.accept(joined);
                }
            }
        };

        let resolver = Arc::clone(&resolver);
        let link = entry.link.clone();
        tasks.spawn(async move {
            let _permit = permit;
            let outcome = resolver.resolve(&link).await;
            (index, outcome)
        });
    }

    while let Some(joined) = tasks.join_next().await {
        collector.accept(joined);
    }

    let report = collector.finish();
    info!(
        resolved = report.resolved.len(),
        failed = report.failures.len(),
        "fan-out complete"
    );
    report
}

// ---------------------------------------------------------------------------
// Result collection
// ---------------------------------------------------------------------------

struct Collector<'a> {
    entries: &'a [Entry],
    allowed: &'a [String],
    progress: &'a dyn ProgressReporter,
    seen: Vec<bool>,
    completed: usize,
    report: FanOutReport,
}

impl<'a> Collector<'a> {
    fn new(entries: &'a [Entry], allowed: &'a [String], progress: &'a dyn ProgressReporter) -> Self {
        Self {
            entries,
            allowed,
            progress,
            seen: vec![false; entries.len()],
            completed: 0,
            report: FanOutReport::default(),
        }
    }

    fn accept(&mut self, joined: Result<(usize, Result<Resolution, FetchError>), JoinError>) {
        let total = self.entries.len();
        match joined {
            Ok((index, Ok(resolution))) => {
                self.seen[index] = true;
                self.completed += 1;
                let entry = &self.entries[index];
                let item = resolved_item(entry, &resolution, self.allowed);
                debug!(link = %entry.link, canonical = %item.link, title = %item.title, "resolved");
                self.progress.item_resolved(&item.link, self.completed, total);
                self.report.resolved.push(Resolved { index, item });
            }
            Ok((index, Err(error))) => {
                self.seen[index] = true;
                self.completed += 1;
                let link = &self.entries[index].link;
                warn!(%link, %error, "dropping entry");
                self.progress.item_failed(link, &error, self.completed, total);
                self.report.failures.push((link.clone(), error));
            }
            Err(join_error) => {
                // The index is recovered in `finish`
                warn!(error = %join_error, "resolution task failed");
            }
        }
    }

    fn finish(mut self) -> FanOutReport {
        let total = self.entries.len();
        for (index, entry) in self.entries.iter().enumerate() {
            if self.seen[index] {
                continue;
            }
            self.completed += 1;
            let error = FetchError::Unreachable("resolution task did not complete".into());
            warn!(link = %entry.link, %error, "dropping entry");
            self.progress.item_failed(&entry.link, &error, self.completed, total);
            self.report.failures.push((entry.link.clone(), error));
        }
        self.report
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::Ordering;
    use std::time::Duration;

    use super::*;
    use crate::pipeline::SilentProgress;
    use crate::testing::{GaugeResolver, StubResolver, at, entry};

    fn allowed() -> Vec<String> {
        vec!["id".into()]
    }

    #[tokio::test]
    async fn never_exceeds_the_limit() {
        let resolver = Arc::new(GaugeResolver::new(Duration::from_millis(20)));
        let entries: Vec<Entry> = (0..24)
            .map(|n| entry(&format!("https://example.com/{n}"), at(1, 0)))
            .collect();

        let report = fan_out(Arc::clone(&resolver), &entries, 4, &allowed(), &SilentProgress).await;

        assert_eq!(report.resolved.len(), 24);
        assert!(report.failures.is_empty());
        let peak = resolver.peak.load(Ordering::SeqCst);
        assert_eq!(peak, 4, "peak in-flight was {peak}");
    }

    #[tokio::test]
    async fn zero_limit_runs_one_at_a_time() {
        let resolver = Arc::new(GaugeResolver::new(Duration::from_millis(5)));
        let entries: Vec<Entry> = (0..5)
            .map(|n| entry(&format!("https://example.com/{n}"), at(1, 0)))
            .collect();

        let report = fan_out(Arc::clone(&resolver), &entries, 0, &allowed(), &SilentProgress).await;

        assert_eq!(report.resolved.len(), 5);
        assert_eq!(resolver.peak.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn failures_are_dropped_not_fatal() {
        let resolver = Arc::new(
            StubResolver::new()
                .page("https://a.example/1", "https://a.example/1", "One")
                .failing("https://a.example/2", FetchError::BadStatus(503))
                .page("https://a.example/3", "https://a.example/3?id=9&utm_source=x", "  Three  "),
        );
        let entries = vec![
            entry("https://a.example/1", at(1, 0)),
            entry("https://a.example/2", at(2, 0)),
            entry("https://a.example/3", at(3, 0)),
        ];

        let report = fan_out(resolver, &entries, 2, &allowed(), &SilentProgress).await;

        assert_eq!(
            report.failures,
            vec![("https://a.example/2".to_string(), FetchError::BadStatus(503))]
        );
        let items = report.into_ordered_items();
        assert_eq!(items.len(), 2);
        assert_eq!(items[0].title, "One");
        assert_eq!(items[1].title, "Three");
        assert_eq!(items[1].link, "https://a.example/3?id=9");
        assert_eq!(items[1].published, at(3, 0));
    }

    #[tokio::test]
    async fn panicked_task_counts_as_failure() {
        let resolver = Arc::new(StubResolver::new().page("https://ok.example/", "https://ok.example/", "Ok"));
        let entries = vec![
            entry("https://ok.example/", at(1, 0)),
            entry("https://boom.example/panic", at(2, 0)),
        ];

        let report = fan_out(resolver, &entries, 2, &allowed(), &SilentProgress).await;

        assert_eq!(report.resolved.len(), 1);
        assert_eq!(report.failures.len(), 1);
        assert_eq!(report.failures[0].0, "https://boom.example/panic");
    }

    #[tokio::test]
    async fn blank_title_becomes_untitled() {
        let resolver = Arc::new(StubResolver::new().page("https://x.example/", "https://x.example/", " \u{200b} "));
        let entries = vec![entry("https://x.example/", at(1, 0))];

        let items = fan_out(resolver, &entries, 1, &allowed(), &SilentProgress)
            .await
            .into_ordered_items();

        assert_eq!(items[0].title, UNTITLED);
    }

    #[tokio::test]
    async fn empty_input_is_empty_report() {
        let resolver = Arc::new(StubResolver::new());
        let report = fan_out(Arc::clone(&resolver), &[], 8, &allowed(), &SilentProgress).await;
        assert!(report.resolved.is_empty());
        assert!(report.failures.is_empty());
        assert_eq!(resolver.calls.load(Ordering::SeqCst), 0);
    }
}
