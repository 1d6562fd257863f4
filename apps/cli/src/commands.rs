//! CLI command definitions, routing, and tracing setup.

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use color_eyre::eyre::Result;
use feedcollector_core::{
    ProgressReporter, RefreshConfig, UpdateConfig, run_refresh, run_update,
};
use feedcollector_render::{RenderOptions, render};
use feedcollector_shared::{
    AppConfig, Collection, FetchError, feed_url, init_config, load_config, load_config_from,
    user_name,
};
use feedcollector_storage::JsonStore;
use indicatif::{ProgressBar, ProgressStyle};
use tracing::info;

// ---------------------------------------------------------------------------
// CLI structure
// ---------------------------------------------------------------------------

/// feedcollector: archive the links from a feed as a deduplicated collection.
#[derive(Parser)]
#[command(
    name = "feedcollector",
    version,
    about = "Collect links from an RSS/Atom feed into a deduplicated, dated archive.",
    long_about = None,
)]
pub(crate) struct Cli {
    /// Config file to use instead of ~/.feedcollector/feedcollector.toml.
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Log format: text (default) or json.
    #[arg(long, default_value = "text", global = true)]
    pub log_format: LogFormat,

    /// Verbosity level (-v, -vv).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Command,
}

/// Log output format.
#[derive(Clone, Debug, clap::ValueEnum)]
pub(crate) enum LogFormat {
    Text,
    Json,
}

/// Top-level CLI subcommands.
#[derive(Subcommand)]
pub(crate) enum Command {
    /// Pull new entries from the feed into the collection.
    Update {
        /// Feed URL (overrides the environment variable named in the config).
        #[arg(long)]
        feed_url: Option<String>,

        /// Skip Markdown rendering.
        #[arg(long)]
        no_render: bool,
    },

    /// Re-resolve every stored link, updating titles and canonical links.
    Refresh {
        /// Drop items whose link no longer resolves.
        #[arg(long)]
        prune: bool,

        /// Skip Markdown rendering.
        #[arg(long)]
        no_render: bool,
    },

    /// Render Markdown from the stored collection.
    Render,

    /// Configuration management.
    Config {
        /// Config subcommand.
        #[command(subcommand)]
        action: ConfigAction,
    },
}

/// Config subcommands.
#[derive(Subcommand)]
pub(crate) enum ConfigAction {
    /// Initialize config file with defaults.
    Init,
    /// Show resolved configuration.
    Show,
}

// ---------------------------------------------------------------------------
// Tracing setup
// ---------------------------------------------------------------------------

/// Initialize tracing based on CLI flags.
pub(crate) fn init_tracing(cli: &Cli) {
    use tracing_subscriber::{EnvFilter, fmt};

    let filter = match cli.verbose {
        0 => "feedcollector=info",
        1 => "feedcollector=debug",
        _ => "feedcollector=trace",
    };

    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(filter));

    match cli.log_format {
        LogFormat::Text => {
            fmt()
                .with_env_filter(env_filter)
                .with_target(false)
                .init();
        }
        LogFormat::Json => {
            fmt()
                .json()
                .with_env_filter(env_filter)
                .init();
        }
    }
}

// ---------------------------------------------------------------------------
// Command dispatch
// ---------------------------------------------------------------------------

/// Run the CLI command.
pub(crate) async fn run(cli: Cli) -> Result<()> {
    match cli.command {
        Command::Update {
            feed_url,
            no_render,
        } => cmd_update(cli.config, feed_url, no_render).await,
        Command::Refresh { prune, no_render } => cmd_refresh(cli.config, prune, no_render).await,
        Command::Render => cmd_render(cli.config),
        Command::Config { action } => match action {
            ConfigAction::Init => cmd_config_init(),
            ConfigAction::Show => cmd_config_show(cli.config),
        },
    }
}

fn app_config(path: Option<PathBuf>) -> Result<AppConfig> {
    let config = match path {
        Some(path) => load_config_from(&path)?,
        None => load_config()?,
    };
    Ok(config)
}

// ---------------------------------------------------------------------------
// Command handlers
// ---------------------------------------------------------------------------

async fn cmd_update(
    config_path: Option<PathBuf>,
    url: Option<String>,
    no_render: bool,
) -> Result<()> {
    let config = app_config(config_path)?;
    let url = match url {
        Some(url) => url,
        None => feed_url(&config)?,
    };

    let update_config = UpdateConfig::from_app(&config, url);
    info!(
        storage = %update_config.storage_path.display(),
        concurrency = update_config.resolver.concurrency,
        "updating collection"
    );

    let result = {
        let reporter = CliProgress::new();
        run_update(&update_config, &reporter).await?
    };

    if !no_render {
        render_collection(&config, &result.collection)?;
    }

    println!();
    println!("  Collection updated!");
    println!("  Feed entries: {}", result.feed_entries);
    println!("  Candidates:   {}", result.candidates);
    println!("  Known:        {}", result.skipped_known);
    println!("  Added:        {}", result.added);
    println!("  Failed:       {}", result.failed);
    println!("  Total:        {}", result.collection.len());
    println!("  Time:         {:.1}s", result.elapsed.as_secs_f64());
    println!();

    Ok(())
}

async fn cmd_refresh(config_path: Option<PathBuf>, prune: bool, no_render: bool) -> Result<()> {
    let config = app_config(config_path)?;
    let refresh_config = RefreshConfig::from_app(&config, prune);
    info!(
        storage = %refresh_config.storage_path.display(),
        prune,
        "refreshing collection"
    );

    let result = {
        let reporter = CliProgress::new();
        run_refresh(&refresh_config, &reporter).await?
    };

    if !no_render && result.checked > 0 {
        render_collection(&config, &result.collection)?;
    }

    println!();
    println!("  Collection refreshed!");
    println!("  Checked:   {}", result.checked);
    println!("  Changed:   {}", result.changed);
    println!("  Failed:    {}", result.failed);
    println!("  Pruned:    {}", result.pruned);
    println!("  Collapsed: {}", result.collapsed);
    println!("  Total:     {}", result.collection.len());
    println!("  Time:      {:.1}s", result.elapsed.as_secs_f64());
    println!();

    Ok(())
}

fn cmd_render(config_path: Option<PathBuf>) -> Result<()> {
    let config = app_config(config_path)?;
    let store = JsonStore::new(&config.defaults.storage_file, config.storage.on_corrupt);
    let collection = store.load()?;
    let result = render_collection(&config, &collection)?;
    println!(
        "Rendered {} items into {} week pages.",
        result.item_count,
        result.week_pages.len()
    );
    Ok(())
}

fn render_collection(
    config: &AppConfig,
    collection: &Collection,
) -> Result<feedcollector_render::RenderResult> {
    let opts = RenderOptions {
        output_dir: PathBuf::from(&config.defaults.output_dir),
        user_name: user_name(config),
    };
    Ok(render(collection, &opts)?)
}

fn cmd_config_init() -> Result<()> {
    let path = init_config()?;
    println!("Config initialized at: {}", path.display());
    Ok(())
}

fn cmd_config_show(config_path: Option<PathBuf>) -> Result<()> {
    let config = app_config(config_path)?;
    let toml_str = toml::to_string_pretty(&config)?;
    println!("{toml_str}");
    Ok(())
}

// ---------------------------------------------------------------------------
// CLI progress reporter
// ---------------------------------------------------------------------------

/// CLI progress reporter using an indicatif spinner. Cleared on drop.
struct CliProgress {
    spinner: ProgressBar,
}

impl CliProgress {
    fn new() -> Self {
        let spinner = ProgressBar::new_spinner();
        let style = ProgressStyle::with_template("{spinner:.cyan} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner())
            .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"]);
        spinner.set_style(style);
        spinner.enable_steady_tick(std::time::Duration::from_millis(80));
        Self { spinner }
    }
}

impl ProgressReporter for CliProgress {
    fn phase(&self, name: &str) {
        self.spinner.set_message(name.to_string());
    }

    fn item_resolved(&self, link: &str, current: usize, total: usize) {
        self.spinner
            .set_message(format!("Resolved [{current}/{total}] {link}"));
    }

    fn item_failed(&self, link: &str, error: &FetchError, current: usize, total: usize) {
        self.spinner
            .set_message(format!("Failed [{current}/{total}] {link}: {error}"));
    }
}

impl Drop for CliProgress {
    fn drop(&mut self) {
        self.spinner.finish_and_clear();
    }
}
