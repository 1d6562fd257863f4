//! Application configuration for feedcollector.
//!
//! User config lives at `~/.feedcollector/feedcollector.toml`.
//! CLI flags override config file values, which override defaults.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{CollectorError, Result};

/// Default configuration file name.
const CONFIG_FILE_NAME: &str = "feedcollector.toml";

/// Default config directory name under the user's home.
const CONFIG_DIR_NAME: &str = ".feedcollector";

/// User-Agent sent with every outbound request unless configured otherwise.
pub const DEFAULT_USER_AGENT: &str = concat!("feedcollector/", env!("CARGO_PKG_VERSION"));

// ---------------------------------------------------------------------------
// Config structs (matching feedcollector.toml schema)
// ---------------------------------------------------------------------------

/// Top-level application config, deserialized from TOML.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// Global defaults.
    #[serde(default)]
    pub defaults: DefaultsConfig,

    /// Feed source settings.
    #[serde(default)]
    pub feed: FeedSourceConfig,

    /// Link resolution settings.
    #[serde(default)]
    pub resolver: ResolverSection,

    /// Stored state settings.
    #[serde(default)]
    pub storage: StorageConfig,
}

/// `[defaults]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DefaultsConfig {
    /// Path of the JSON collection file.
    #[serde(default = "default_storage_file")]
    pub storage_file: String,

    /// Directory receiving `README.md` and `data/*.md`.
    #[serde(default = "default_output_dir")]
    pub output_dir: String,

    /// Display name used in rendered output.
    #[serde(default = "default_user_name")]
    pub user_name: String,
}

impl Default for DefaultsConfig {
    fn default() -> Self {
        Self {
            storage_file: default_storage_file(),
            output_dir: default_output_dir(),
            user_name: default_user_name(),
        }
    }
}

fn default_storage_file() -> String {
    "data.json".into()
}
fn default_output_dir() -> String {
    ".".into()
}
fn default_user_name() -> String {
    "anonymous".into()
}

/// `[feed]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeedSourceConfig {
    /// Name of the env var holding the feed URL (the URL may embed a token).
    #[serde(default = "default_url_env")]
    pub url_env: String,

    /// Timeout for the feed download in seconds.
    #[serde(default = "default_feed_timeout")]
    pub timeout_secs: u64,
}

impl Default for FeedSourceConfig {
    fn default() -> Self {
        Self {
            url_env: default_url_env(),
            timeout_secs: default_feed_timeout(),
        }
    }
}

fn default_url_env() -> String {
    "FEEDCOLLECTOR_FEED_URL".into()
}
fn default_feed_timeout() -> u64 {
    30
}

/// `[resolver]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResolverSection {
    /// Maximum resolutions in flight at once.
    #[serde(default = "default_concurrency")]
    pub concurrency: usize,

    /// Per-request timeout in seconds.
    #[serde(default = "default_resolve_timeout")]
    pub timeout_secs: u64,

    /// User-Agent header for page fetches.
    #[serde(default = "default_user_agent")]
    pub user_agent: String,

    /// Query parameters kept by link normalization; all others are dropped.
    #[serde(default = "default_allowed_query_params")]
    pub allowed_query_params: Vec<String>,

    /// Whether host-specific fast paths may skip the network.
    #[serde(default = "default_true")]
    pub fast_paths: bool,
}

impl Default for ResolverSection {
    fn default() -> Self {
        Self {
            concurrency: default_concurrency(),
            timeout_secs: default_resolve_timeout(),
            user_agent: default_user_agent(),
            allowed_query_params: default_allowed_query_params(),
            fast_paths: true,
        }
    }
}

fn default_concurrency() -> usize {
    100
}
fn default_resolve_timeout() -> u64 {
    10
}
fn default_user_agent() -> String {
    DEFAULT_USER_AGENT.into()
}
fn default_allowed_query_params() -> Vec<String> {
    ["v", "p", "id", "article"].map(String::from).to_vec()
}
fn default_true() -> bool {
    true
}

/// What to do when the stored collection exists but cannot be decoded.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CorruptStatePolicy {
    /// Abort the run and leave the file untouched.
    #[default]
    Fail,
    /// Log a warning and start from an empty collection.
    Reset,
}

/// `[storage]` section.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Policy for an unreadable collection file.
    #[serde(default)]
    pub on_corrupt: CorruptStatePolicy,
}

// ---------------------------------------------------------------------------
// Resolver config (runtime, merged from config + CLI flags)
// ---------------------------------------------------------------------------

/// Runtime resolver configuration.
#[derive(Debug, Clone)]
pub struct ResolverConfig {
    /// Maximum concurrent resolutions.
    pub concurrency: usize,
    /// Per-request timeout.
    pub timeout: Duration,
    /// User-Agent header.
    pub user_agent: String,
    /// Query parameter allow-list for link normalization.
    pub allowed_query_params: Vec<String>,
    /// Whether fast paths are consulted before fetching.
    pub fast_paths: bool,
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self::from(&AppConfig::default())
    }
}

impl From<&AppConfig> for ResolverConfig {
    fn from(config: &AppConfig) -> Self {
        Self {
            concurrency: config.resolver.concurrency,
            timeout: Duration::from_secs(config.resolver.timeout_secs),
            user_agent: config.resolver.user_agent.clone(),
            allowed_query_params: config.resolver.allowed_query_params.clone(),
            fast_paths: config.resolver.fast_paths,
        }
    }
}

// ---------------------------------------------------------------------------
// Config loading
// ---------------------------------------------------------------------------

/// Get the path to the config directory (`~/.feedcollector/`).
pub fn config_dir() -> Result<PathBuf> {
    let home = dirs::home_dir()
        .ok_or_else(|| CollectorError::config("could not determine home directory"))?;
    Ok(home.join(CONFIG_DIR_NAME))
}

/// Get the path to the config file (`~/.feedcollector/feedcollector.toml`).
pub fn config_file_path() -> Result<PathBuf> {
    Ok(config_dir()?.join(CONFIG_FILE_NAME))
}

/// Load the application config from disk. Returns defaults if the file does not exist.
pub fn load_config() -> Result<AppConfig> {
    let path = config_file_path()?;

    if !path.exists() {
        tracing::debug!(?path, "config file not found, using defaults");
        return Ok(AppConfig::default());
    }

    load_config_from(&path)
}

/// Load the application config from a specific file path.
pub fn load_config_from(path: &Path) -> Result<AppConfig> {
    let content = std::fs::read_to_string(path).map_err(|e| CollectorError::io(path, e))?;

    toml::from_str(&content)
        .map_err(|e| CollectorError::config(format!("failed to parse {}: {e}", path.display())))
}

/// Create the config directory and write a default config file.
/// Returns the path to the created file.
pub fn init_config() -> Result<PathBuf> {
    let dir = config_dir()?;
    std::fs::create_dir_all(&dir).map_err(|e| CollectorError::io(&dir, e))?;

    let path = dir.join(CONFIG_FILE_NAME);
    let config = AppConfig::default();
    let content =
        toml::to_string_pretty(&config).map_err(|e| CollectorError::config(e.to_string()))?;

    std::fs::write(&path, content).map_err(|e| CollectorError::io(&path, e))?;
    tracing::info!(?path, "created default config file");

    Ok(path)
}

/// Read the feed URL from the env var named in the config.
pub fn feed_url(config: &AppConfig) -> Result<String> {
    let var_name = &config.feed.url_env;
    match std::env::var(var_name) {
        Ok(val) if !val.trim().is_empty() => Ok(val.trim().to_string()),
        _ => Err(CollectorError::config(format!(
            "feed URL not found. Set the {var_name} environment variable or pass --feed-url."
        ))),
    }
}

/// Display name for rendered output: `USERNAME` wins over the config value.
pub fn user_name(config: &AppConfig) -> String {
    match std::env::var("USERNAME") {
        Ok(val) if !val.trim().is_empty() => val.trim().to_string(),
        _ => config.defaults.user_name.clone(),
    }
}
