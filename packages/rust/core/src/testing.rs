//! In-memory resolvers for driving the scheduler and pipelines in tests.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use chrono::{DateTime, TimeZone, Utc};
use feedcollector_resolver::{Resolution, Resolve};
use feedcollector_shared::{Entry, FetchError};

pub fn at(day: u32, hour: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 1, day, hour, 0, 0).unwrap()
}

pub fn entry(link: &str, published: DateTime<Utc>) -> Entry {
    Entry {
        title: String::new(),
        link: link.to_string(),
        published,
    }
}

/// Answers from a fixed table; unknown links are unreachable.
#[derive(Default)]
pub struct StubResolver {
    answers: HashMap<String, Result<Resolution, FetchError>>,
    pub calls: AtomicUsize,
}

impl StubResolver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn page(mut self, link: &str, final_url: &str, title: &str) -> Self {
        self.answers.insert(
            link.to_string(),
            Ok(Resolution {
                final_url: final_url.to_string(),
                title: title.to_string(),
            }),
        );
        self
    }

    pub fn failing(mut self, link: &str, error: FetchError) -> Self {
        self.answers.insert(link.to_string(), Err(error));
        self
    }
}

impl Resolve for StubResolver {
    async fn resolve(&self, url: &str) -> Result<Resolution, FetchError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if url.contains("/panic") {
            panic!("resolver blew up on {url}");
        }
        self.answers
            .get(url)
            .cloned()
            .unwrap_or_else(|| Err(FetchError::Unreachable("no route".into())))
    }
}

/// Sleeps on every call and records the highest number of calls in flight.
pub struct GaugeResolver {
    delay: Duration,
    in_flight: AtomicUsize,
    pub peak: AtomicUsize,
}

impl GaugeResolver {
    pub fn new(delay: Duration) -> Self {
        Self {
            delay,
            in_flight: AtomicUsize::new(0),
            peak: AtomicUsize::new(0),
        }
    }
}

impl Resolve for GaugeResolver {
    async fn resolve(&self, url: &str) -> Result<Resolution, FetchError> {
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(now, Ordering::SeqCst);
        tokio::time::sleep(self.delay).await;
        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        Ok(Resolution {
            final_url: url.to_string(),
            title: format!("Page {url}"),
        })
    }
}
