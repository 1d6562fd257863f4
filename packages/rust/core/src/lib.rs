//! Core pipeline orchestration for feedcollector.
//!
//! This crate ties together the feed, the resolver and storage into the
//! end-to-end `update` and `refresh` workflows. The building blocks are:
//! - [`dedup`]: canonical links already seen
//! - [`scheduler`]: bounded-concurrency fan-out of resolutions
//! - [`merge`]: the single place the collection is mutated

pub mod dedup;
pub mod merge;
pub mod pipeline;
pub mod refresh;
pub mod scheduler;

#[cfg(test)]
mod testing;

pub use dedup::DedupIndex;
pub use merge::{MergeOutcome, merge, select_candidates};
pub use pipeline::{
    ProgressReporter, SilentProgress, UpdateConfig, UpdateResult, run_update, update_with,
};
pub use refresh::{RefreshConfig, RefreshResult, refresh_with, run_refresh};
pub use scheduler::{FanOutReport, Resolved, fan_out, resolved_item};
