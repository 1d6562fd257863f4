//! Shared types, error model, and configuration for feedcollector.
//!
//! This crate is the foundation depended on by all other feedcollector crates.
//! It provides:
//! - [`CollectorError`] and [`FetchError`], the error taxonomy
//! - Domain types ([`Entry`], [`ResolvedItem`], [`Collection`])
//! - Configuration ([`AppConfig`], [`ResolverConfig`], config loading)

pub mod config;
pub mod error;
pub mod fs;
pub mod types;

// Re-export public API at crate root for ergonomic imports.
pub use config::{
    AppConfig, CorruptStatePolicy, DEFAULT_USER_AGENT, DefaultsConfig, FeedSourceConfig,
    ResolverConfig, ResolverSection, StorageConfig, config_dir, config_file_path, feed_url,
    init_config, load_config, load_config_from, user_name,
};
pub use error::{CollectorError, FetchError, Result};
pub use fs::write_atomic;
pub use types::{Collection, Entry, ResolvedItem, UNTITLED, format_timestamp, parse_timestamp};
